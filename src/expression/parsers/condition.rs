use crate::expression::ast::ExpressionNode;
use crate::expression::context::TokenParserContext;
use crate::expression::parsers::{ParserTier, TokenParser};

/// `test ? if_true : if_false`, built on the previous node as the test.
pub struct ConditionTokenParser;

/// `target = value` where the previous node is a member or indexer.
pub struct AssignmentTokenParser;

impl TokenParser for ConditionTokenParser {
    fn tier(&self) -> ParserTier {
        ParserTier::Condition
    }

    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        let test = prev?;
        let p = ctx.skip_whitespace();
        if ctx.char_at(p) != Some('?') {
            return None;
        }
        // `??` and `?.`/`?[` belong to other rules.
        if ctx.char_at(p + 1) == Some('?') {
            return None;
        }
        if matches!(ctx.char_at(ctx.skip_whitespace_at(p + 1)), Some('.' | '[')) {
            return None;
        }
        ctx.set_position(p + 1);
        let if_true = ctx.parse_expression()?;
        let p = ctx.skip_whitespace();
        if ctx.char_at(p) != Some(':') {
            return None;
        }
        ctx.set_position(p + 1);
        let if_false = ctx.parse_expression()?;
        Some(ExpressionNode::condition(test.clone(), if_true, if_false))
    }
}

impl TokenParser for AssignmentTokenParser {
    fn tier(&self) -> ParserTier {
        ParserTier::Assignment
    }

    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        let target = prev.filter(|node| node.is_assignable())?;
        let p = ctx.skip_whitespace();
        if ctx.char_at(p) != Some('=') || matches!(ctx.char_at(p + 1), Some('=' | '>')) {
            return None;
        }
        ctx.set_position(p + 1);
        let value = ctx.parse_expression()?;
        Some(ExpressionNode::assignment(target.clone(), value))
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/expression/parsers/condition.rs"]
mod tests;
