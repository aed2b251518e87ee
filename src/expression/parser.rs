use std::sync::{Arc, Mutex};

use crate::expression::ast::ExpressionNode;
use crate::expression::context::{ParserSet, TokenParserContext};
use crate::expression::parsers::{TokenParser, default_parsers};
use crate::foundation::error::{BindError, BindResult};
use crate::foundation::metadata::Metadata;
use crate::foundation::opts::EngineOpts;
use crate::foundation::sync::lock;

/// One `Target Source, Key=Value, ..` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingExpression {
    pub target: Arc<str>,
    /// `None` binds the target to the source object itself.
    pub source: Option<ExpressionNode>,
    pub parameters: Vec<(Arc<str>, ExpressionNode)>,
}

impl BindingExpression {
    pub fn parameter(&self, name: &str) -> Option<&ExpressionNode> {
        self.parameters
            .iter()
            .find(|(key, _)| &**key == name)
            .map(|(_, value)| value)
    }
}

/// Text → AST front end.
///
/// Shares one rule set across threads and keeps a small pool of idle contexts so repeated parses
/// do not reallocate their buffers.
pub struct ExpressionParser {
    parsers: ParserSet,
    pool: Mutex<Vec<TokenParserContext>>,
    pool_size: usize,
}

impl ExpressionParser {
    pub fn new(opts: &EngineOpts) -> Self {
        Self::with_parsers(
            default_parsers(opts.unary_single_expression),
            opts.context_pool_size,
        )
    }

    pub fn with_parsers(parsers: Vec<Arc<dyn TokenParser>>, pool_size: usize) -> Self {
        Self {
            parsers: parsers.into(),
            pool: Mutex::new(Vec::new()),
            pool_size,
        }
    }

    /// Parses `text` as one complete expression; `None` when any of it is not understood.
    pub fn try_parse(&self, text: &str, metadata: Option<&Metadata>) -> Option<ExpressionNode> {
        self.parse(text, metadata).ok()
    }

    /// Like [`try_parse`](Self::try_parse), reporting where parsing stopped.
    pub fn parse(&self, text: &str, metadata: Option<&Metadata>) -> BindResult<ExpressionNode> {
        let mut ctx = self.rent();
        ctx.initialize(text, metadata);
        let node = ctx.parse_expression();
        let stop = ctx.skip_whitespace();
        let complete = ctx.is_eof();
        self.give_back(ctx);
        match node {
            Some(node) if complete => Ok(node),
            _ if text.trim().is_empty() => Err(BindError::parse("empty expression")),
            _ => Err(BindError::parse(format!(
                "unexpected input at {stop} in '{text}'"
            ))),
        }
    }

    /// Parses `;`-separated binding declarations such as
    /// `Text Name, Mode=TwoWay; Visible IsVisible`.
    ///
    /// The first comma-separated item after the target is the source expression; the rest must
    /// be `Key=Value` parameters.
    pub fn try_parse_bindings(
        &self,
        text: &str,
        metadata: Option<&Metadata>,
    ) -> BindResult<Vec<BindingExpression>> {
        let mut out = Vec::new();
        for (offset, declaration) in split_top_level(text, ';') {
            if declaration.trim().is_empty() {
                continue;
            }
            out.push(
                self.parse_binding(declaration, metadata)
                    .map_err(|e| BindError::parse(format!("declaration at {offset}: {e}")))?,
            );
        }
        Ok(out)
    }

    fn parse_binding(
        &self,
        declaration: &str,
        metadata: Option<&Metadata>,
    ) -> BindResult<BindingExpression> {
        let declaration = declaration.trim();
        let target_end = declaration
            .find(|c: char| c.is_whitespace() || c == ',')
            .unwrap_or(declaration.len());
        let target = &declaration[..target_end];
        let is_path = !target.is_empty()
            && target.split('.').all(|part| {
                let mut chars = part.chars();
                chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
                    && chars.all(|c| c.is_alphanumeric() || c == '_')
            });
        if !is_path {
            return Err(BindError::parse(format!("invalid binding target '{target}'")));
        }

        let mut binding = BindingExpression {
            target: Arc::from(target),
            source: None,
            parameters: Vec::new(),
        };
        for (index, (_, item)) in split_top_level(&declaration[target_end..], ',')
            .into_iter()
            .enumerate()
        {
            let item = item.trim();
            if index == 0 {
                if !item.is_empty() {
                    binding.source = Some(self.parse(item, metadata)?);
                }
                continue;
            }
            let (key, value) = item
                .split_once('=')
                .ok_or_else(|| BindError::parse(format!("expected Key=Value, got '{item}'")))?;
            let key = key.trim();
            if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(BindError::parse(format!("invalid parameter name '{key}'")));
            }
            binding
                .parameters
                .push((Arc::from(key), self.parse(value, metadata)?));
        }
        Ok(binding)
    }

    fn rent(&self) -> TokenParserContext {
        lock(&self.pool)
            .pop()
            .unwrap_or_else(|| TokenParserContext::new(Arc::clone(&self.parsers)))
    }

    fn give_back(&self, ctx: TokenParserContext) {
        let mut pool = lock(&self.pool);
        if pool.len() < self.pool_size {
            pool.push(ctx);
        }
    }

    #[cfg(test)]
    fn pooled(&self) -> usize {
        lock(&self.pool).len()
    }
}

impl Default for ExpressionParser {
    fn default() -> Self {
        Self::new(&EngineOpts::default())
    }
}

/// Splits on `sep` outside quotes and brackets, keeping each piece's byte offset.
fn split_top_level(text: &str, sep: char) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            c if c == sep && depth == 0 => {
                pieces.push((start, &text[start..i]));
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    pieces.push((start, &text[start..]));
    pieces
}

#[cfg(test)]
#[path = "../../tests/unit/expression/parser.rs"]
mod tests;
