use crate::expression::ast::ExpressionNode;
use crate::expression::context::{TokenParserContext, is_identifier_char};
use crate::expression::operators::{BinaryOp, BinaryToken};
use crate::expression::parsers::{ParserTier, TokenParser};

/// Infix operators over a precedence table.
///
/// Collects the whole `operand (op operand)*` run first, then folds it so higher precedence
/// binds tighter and equal precedence associates left.
pub struct BinaryTokenParser {
    tokens: Vec<BinaryToken>,
}

struct Matched {
    op: BinaryOp,
    precedence: u8,
    width: usize,
}

impl BinaryTokenParser {
    pub fn new(tokens: Vec<BinaryToken>) -> Self {
        Self { tokens }
    }

    /// Longest spelling at `position`; word spellings need a boundary after them.
    fn match_at(&self, ctx: &TokenParserContext, position: usize) -> Option<Matched> {
        let mut best: Option<Matched> = None;
        for token in &self.tokens {
            for spelling in token.spellings() {
                if !ctx.starts_with_at(position, spelling) {
                    continue;
                }
                let width = spelling.chars().count();
                let wordy = spelling.chars().last().is_some_and(is_identifier_char);
                if wordy && ctx.char_at(position + width).is_some_and(is_identifier_char) {
                    continue;
                }
                if best.as_ref().is_none_or(|b| width > b.width) {
                    best = Some(Matched {
                        op: token.op,
                        precedence: token.precedence,
                        width,
                    });
                }
            }
        }
        best
    }
}

impl TokenParser for BinaryTokenParser {
    fn tier(&self) -> ParserTier {
        ParserTier::Binary
    }

    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        let first = prev?;
        let p = ctx.skip_whitespace();
        let mut next = self.match_at(ctx, p)?;
        ctx.set_position(p + next.width);

        let mut operands = vec![first.clone()];
        let mut ops: Vec<(BinaryOp, u8)> = Vec::new();
        loop {
            ops.push((next.op, next.precedence));
            operands.push(ctx.parse_operand(ParserTier::Binary)?);
            let p = ctx.skip_whitespace_at(ctx.position());
            match self.match_at(ctx, p) {
                Some(m) => {
                    ctx.set_position(p + m.width);
                    next = m;
                }
                None => break,
            }
        }
        Some(fold(operands, ops))
    }
}

fn fold(operands: Vec<ExpressionNode>, ops: Vec<(BinaryOp, u8)>) -> ExpressionNode {
    fn reduce(nodes: &mut Vec<ExpressionNode>, op: BinaryOp) {
        if let (Some(right), Some(left)) = (nodes.pop(), nodes.pop()) {
            nodes.push(ExpressionNode::binary(op, left, right));
        }
    }

    let mut operands = operands.into_iter();
    let mut nodes: Vec<ExpressionNode> = operands.next().into_iter().collect();
    let mut pending: Vec<(BinaryOp, u8)> = Vec::new();
    for (op, precedence) in ops {
        while let Some(&(top, top_precedence)) = pending.last() {
            if top_precedence < precedence {
                break;
            }
            pending.pop();
            reduce(&mut nodes, top);
        }
        pending.push((op, precedence));
        nodes.extend(operands.next());
    }
    while let Some((op, _)) = pending.pop() {
        reduce(&mut nodes, op);
    }
    nodes.pop().unwrap_or_else(ExpressionNode::null)
}

#[cfg(test)]
#[path = "../../../tests/unit/expression/parsers/binary.rs"]
mod tests;
