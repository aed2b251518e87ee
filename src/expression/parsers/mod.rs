//! Token parser rules.
//!
//! Each rule inspects the context at its cursor and either produces a node (optionally built on
//! top of the previous node) or declines. The context rewinds the cursor whenever a rule
//! declines, so a rule may consume input freely while probing.

use std::sync::Arc;

use crate::expression::ast::ExpressionNode;
use crate::expression::context::TokenParserContext;
use crate::expression::operators::{default_binary_tokens, default_unary_tokens};

mod binary;
mod condition;
mod constant;
mod digit;
mod lambda;
mod member;
mod string;
mod unary;

pub use binary::BinaryTokenParser;
pub use condition::{AssignmentTokenParser, ConditionTokenParser};
pub use constant::ConstantTokenParser;
pub use digit::{DigitConverter, DigitTokenParser};
pub use lambda::{LambdaTokenParser, ParenTokenParser};
pub use member::{
    IndexerTokenParser, MemberTokenParser, MethodCallTokenParser, NullConditionalMemberTokenParser,
};
pub use string::StringTokenParser;
pub use unary::UnaryTokenParser;

/// Precedence tier of a rule. Operand parsing excludes rules at or after a given tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParserTier {
    Primary,
    Unary,
    Binary,
    Condition,
    Assignment,
}

pub trait TokenParser: Send + Sync {
    fn tier(&self) -> ParserTier {
        ParserTier::Primary
    }

    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode>;
}

/// The built-in rules in priority order.
pub fn default_parsers(unary_single_expression: bool) -> Vec<Arc<dyn TokenParser>> {
    vec![
        Arc::new(NullConditionalMemberTokenParser),
        Arc::new(LambdaTokenParser),
        Arc::new(ParenTokenParser),
        Arc::new(StringTokenParser),
        Arc::new(DigitTokenParser::default()),
        Arc::new(ConstantTokenParser::default()),
        Arc::new(MethodCallTokenParser),
        Arc::new(IndexerTokenParser),
        Arc::new(MemberTokenParser),
        Arc::new(UnaryTokenParser::new(default_unary_tokens(
            unary_single_expression,
        ))),
        Arc::new(BinaryTokenParser::new(default_binary_tokens())),
        Arc::new(ConditionTokenParser),
        Arc::new(AssignmentTokenParser),
    ]
}

/// Parses a comma-separated argument list; the cursor sits just past the opening bracket.
pub(crate) fn parse_arguments(
    ctx: &mut TokenParserContext,
    close: char,
) -> Option<Vec<ExpressionNode>> {
    let mut args = Vec::new();
    let p = ctx.skip_whitespace();
    if ctx.char_at(p) == Some(close) {
        ctx.set_position(p + 1);
        return Some(args);
    }
    loop {
        args.push(ctx.parse_expression()?);
        let p = ctx.skip_whitespace();
        match ctx.char_at(p) {
            Some(',') => ctx.set_position(p + 1),
            Some(c) if c == close => {
                ctx.set_position(p + 1);
                return Some(args);
            }
            _ => return None,
        }
    }
}
