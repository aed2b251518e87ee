use std::sync::Arc;

use crate::expression::ast::ExpressionNode;
use crate::expression::context::TokenParserContext;
use crate::expression::parsers::TokenParser;

/// `x => body`, `(x, y) => body` and `() => body`.
///
/// Parameters are in scope while the body parses, so member references to them become
/// [`ExpressionNode::Parameter`] nodes.
pub struct LambdaTokenParser;

/// `( expression )`.
pub struct ParenTokenParser;

impl LambdaTokenParser {
    fn read_parameters(ctx: &TokenParserContext, start: usize) -> Option<(Vec<Arc<str>>, usize)> {
        if let Some((name, end)) = ctx.read_identifier_at(start) {
            return Some((vec![Arc::from(name)], end));
        }
        if ctx.char_at(start) != Some('(') {
            return None;
        }
        let mut names: Vec<Arc<str>> = Vec::new();
        let mut p = ctx.skip_whitespace_at(start + 1);
        if ctx.char_at(p) == Some(')') {
            return Some((names, p + 1));
        }
        loop {
            let (name, end) = ctx.read_identifier_at(p)?;
            if names.iter().any(|n| **n == *name) {
                return None;
            }
            names.push(Arc::from(name));
            p = ctx.skip_whitespace_at(end);
            match ctx.char_at(p)? {
                ',' => p = ctx.skip_whitespace_at(p + 1),
                ')' => return Some((names, p + 1)),
                _ => return None,
            }
        }
    }
}

impl TokenParser for LambdaTokenParser {
    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        if prev.is_some() {
            return None;
        }
        let start = ctx.skip_whitespace();
        let (names, end) = Self::read_parameters(ctx, start)?;
        let arrow = ctx.skip_whitespace_at(end);
        if !ctx.starts_with_at(arrow, "=>") {
            return None;
        }
        ctx.set_position(arrow + 2);

        ctx.push_lambda_parameters(&names);
        let body = ctx.parse_expression();
        ctx.pop_lambda_parameters(names.len());

        Some(ExpressionNode::Lambda {
            body: Box::new(body?),
            parameters: names.iter().map(|n| ExpressionNode::Parameter(Arc::clone(n))).collect(),
        })
    }
}

impl TokenParser for ParenTokenParser {
    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        if prev.is_some() {
            return None;
        }
        let p = ctx.skip_whitespace();
        if ctx.char_at(p) != Some('(') {
            return None;
        }
        ctx.set_position(p + 1);
        let inner = ctx.parse_expression()?;
        let p = ctx.skip_whitespace();
        if ctx.char_at(p) != Some(')') {
            return None;
        }
        ctx.set_position(p + 1);
        Some(inner)
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/expression/parsers/lambda.rs"]
mod tests;
