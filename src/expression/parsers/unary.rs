use crate::expression::ast::ExpressionNode;
use crate::expression::context::TokenParserContext;
use crate::expression::operators::UnaryToken;
use crate::expression::parsers::{ParserTier, TokenParser};

/// Prefix operators. A leading character may map to several candidate tokens; the first whose
/// operand parses wins.
pub struct UnaryTokenParser {
    mapping: Vec<(char, Vec<UnaryToken>)>,
}

impl UnaryTokenParser {
    pub fn new(tokens: Vec<UnaryToken>) -> Self {
        let mut mapping: Vec<(char, Vec<UnaryToken>)> = Vec::new();
        for token in tokens {
            let Some(first) = token.sign.chars().next() else {
                continue;
            };
            match mapping.iter_mut().find(|(c, _)| *c == first) {
                Some((_, candidates)) => candidates.push(token),
                None => mapping.push((first, vec![token])),
            }
        }
        Self { mapping }
    }
}

impl TokenParser for UnaryTokenParser {
    fn tier(&self) -> ParserTier {
        ParserTier::Unary
    }

    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        if prev.is_some() {
            return None;
        }
        let start = ctx.skip_whitespace();
        let first = ctx.char_at(start)?;
        let (_, candidates) = self.mapping.iter().find(|(c, _)| *c == first)?;
        for token in candidates {
            if !ctx.starts_with_at(start, &token.sign) {
                continue;
            }
            ctx.set_position(start + token.sign.chars().count());
            let operand = if token.is_single_expression {
                ctx.try_parse_below(None, ParserTier::Binary)
            } else {
                ctx.parse_operand(ParserTier::Binary)
            };
            if let Some(operand) = operand {
                return Some(ExpressionNode::unary(token.op, operand));
            }
            ctx.set_position(start);
        }
        None
    }
}

#[cfg(test)]
#[path = "../../../tests/unit/expression/parsers/unary.rs"]
mod tests;
