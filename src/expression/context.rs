use std::sync::Arc;

use crate::expression::ast::ExpressionNode;
use crate::expression::parsers::{ParserTier, TokenParser};
use crate::foundation::metadata::Metadata;

pub(crate) type ParserSet = Arc<[Arc<dyn TokenParser>]>;

pub(crate) fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Cursor over the text being parsed plus the ordered rule set.
///
/// Contexts are reused: [`initialize`](Self::initialize) resets all per-parse state.
pub struct TokenParserContext {
    chars: Vec<char>,
    position: usize,
    parsers: ParserSet,
    metadata: Option<Metadata>,
    lambda_parameters: Vec<Arc<str>>,
}

impl TokenParserContext {
    pub(crate) fn new(parsers: ParserSet) -> Self {
        Self {
            chars: Vec::new(),
            position: 0,
            parsers,
            metadata: None,
            lambda_parameters: Vec::new(),
        }
    }

    pub fn initialize(&mut self, text: &str, metadata: Option<&Metadata>) {
        self.chars.clear();
        self.chars.extend(text.chars());
        self.position = 0;
        self.metadata = metadata.cloned();
        self.lambda_parameters.clear();
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.chars.len());
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.chars.len()
    }

    pub fn seek(&mut self, delta: isize) {
        let target = self.position.saturating_add_signed(delta);
        self.set_position(target);
    }

    pub fn char_at(&self, position: usize) -> Option<char> {
        self.chars.get(position).copied()
    }

    pub fn try_peek_char(&self, offset: usize) -> Option<char> {
        self.char_at(self.position + offset)
    }

    pub fn skip_whitespace(&mut self) -> usize {
        self.position = self.skip_whitespace_at(self.position);
        self.position
    }

    pub fn skip_whitespace_at(&self, mut position: usize) -> usize {
        while self.char_at(position).is_some_and(char::is_whitespace) {
            position += 1;
        }
        position
    }

    /// Whether the text at the cursor begins with `s`.
    pub fn starts_with(&self, s: &str) -> bool {
        self.starts_with_at(self.position, s)
    }

    pub fn starts_with_at(&self, position: usize, s: &str) -> bool {
        let mut p = position;
        for c in s.chars() {
            if self.char_at(p) != Some(c) {
                return false;
            }
            p += 1;
        }
        true
    }

    pub fn slice(&self, start: usize, end: usize) -> String {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        self.chars[start..end].iter().collect()
    }

    /// Reads an identifier starting exactly at `position`; returns it and the end position.
    pub fn read_identifier_at(&self, position: usize) -> Option<(String, usize)> {
        if !self.char_at(position).is_some_and(is_identifier_start) {
            return None;
        }
        let mut end = position + 1;
        while self.char_at(end).is_some_and(is_identifier_char) {
            end += 1;
        }
        Some((self.slice(position, end), end))
    }

    pub fn is_lambda_parameter(&self, name: &str) -> bool {
        self.lambda_parameters.iter().any(|p| &**p == name)
    }

    pub(crate) fn push_lambda_parameters(&mut self, names: &[Arc<str>]) {
        self.lambda_parameters.extend(names.iter().cloned());
    }

    pub(crate) fn pop_lambda_parameters(&mut self, count: usize) {
        let keep = self.lambda_parameters.len().saturating_sub(count);
        self.lambda_parameters.truncate(keep);
    }

    /// Tries every rule once, in priority order.
    pub fn try_parse(&mut self, prev: Option<&ExpressionNode>) -> Option<ExpressionNode> {
        self.try_parse_where(prev, |_| true)
    }

    /// Tries the rules ranked strictly below `tier`.
    pub fn try_parse_below(
        &mut self,
        prev: Option<&ExpressionNode>,
        tier: ParserTier,
    ) -> Option<ExpressionNode> {
        self.try_parse_where(prev, |p| p.tier() < tier)
    }

    pub fn try_parse_where(
        &mut self,
        prev: Option<&ExpressionNode>,
        filter: impl Fn(&dyn TokenParser) -> bool,
    ) -> Option<ExpressionNode> {
        let parsers = Arc::clone(&self.parsers);
        for parser in parsers.iter() {
            if !filter(parser.as_ref()) {
                continue;
            }
            let start = self.position;
            let scope = self.lambda_parameters.len();
            if let Some(node) = parser.try_parse(self, prev) {
                return Some(node);
            }
            self.position = start;
            self.lambda_parameters.truncate(scope);
        }
        None
    }

    /// Folds rules onto `prev` until none matches.
    pub fn parse_while_any(
        &mut self,
        mut prev: Option<ExpressionNode>,
        below: Option<ParserTier>,
    ) -> Option<ExpressionNode> {
        loop {
            let next = match below {
                Some(tier) => self.try_parse_below(prev.as_ref(), tier),
                None => self.try_parse(prev.as_ref()),
            };
            match next {
                Some(node) => prev = Some(node),
                None => return prev,
            }
        }
    }

    /// A complete expression starting at the cursor.
    pub fn parse_expression(&mut self) -> Option<ExpressionNode> {
        self.parse_while_any(None, None)
    }

    /// An operand: a primary expression with its postfix chain, excluding rules at `below` and
    /// lower precedence.
    pub fn parse_operand(&mut self, below: ParserTier) -> Option<ExpressionNode> {
        self.parse_while_any(None, Some(below))
    }

    /// Parses `text` as a whole expression in a fresh context sharing this one's rules and
    /// lambda scope.
    pub fn parse_nested(&self, text: &str) -> Option<ExpressionNode> {
        let mut nested = Self::new(Arc::clone(&self.parsers));
        nested.initialize(text, self.metadata.as_ref());
        nested.lambda_parameters = self.lambda_parameters.clone();
        let node = nested.parse_expression()?;
        nested.skip_whitespace();
        nested.is_eof().then_some(node)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/expression/context.rs"]
mod tests;
