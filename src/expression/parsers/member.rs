use std::sync::Arc;

use crate::expression::ast::ExpressionNode;
use crate::expression::context::TokenParserContext;
use crate::expression::parsers::{TokenParser, parse_arguments};

/// `name` at the start of an operand, or `.name` after a previous node.
pub struct MemberTokenParser;

/// `name(args)` and `name<T1, T2>(args)`, optionally after `.`.
pub struct MethodCallTokenParser;

/// `[args]` after a previous node, or at the start of an operand.
pub struct IndexerTokenParser;

/// `?.`, `? .` and `?[` guards around the previous node.
pub struct NullConditionalMemberTokenParser;

impl TokenParser for MemberTokenParser {
    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        parse_member(ctx, prev)
    }
}

impl TokenParser for MethodCallTokenParser {
    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        parse_method_call(ctx, prev)
    }
}

impl TokenParser for IndexerTokenParser {
    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        parse_indexer(ctx, prev)
    }
}

impl TokenParser for NullConditionalMemberTokenParser {
    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        let prev = prev?;
        let p = ctx.skip_whitespace();
        if ctx.char_at(p) != Some('?') {
            return None;
        }
        let p = ctx.skip_whitespace_at(p + 1);
        let guarded = ExpressionNode::null_conditional(prev.clone());
        match ctx.char_at(p)? {
            '.' => {
                ctx.set_position(p);
                if let Some(node) = parse_method_call(ctx, Some(&guarded)) {
                    return Some(node);
                }
                ctx.set_position(p);
                parse_member(ctx, Some(&guarded))
            }
            '[' => {
                ctx.set_position(p);
                parse_indexer(ctx, Some(&guarded))
            }
            _ => None,
        }
    }
}

/// Consumes the `.` that must precede a member name when there is a previous node.
fn name_start(ctx: &mut TokenParserContext, prev: Option<&ExpressionNode>) -> Option<usize> {
    let p = ctx.skip_whitespace();
    if prev.is_none() {
        return Some(p);
    }
    if ctx.char_at(p) != Some('.') {
        return None;
    }
    Some(ctx.skip_whitespace_at(p + 1))
}

fn parse_member(
    ctx: &mut TokenParserContext,
    prev: Option<&ExpressionNode>,
) -> Option<ExpressionNode> {
    let p = name_start(ctx, prev)?;
    let (name, end) = ctx.read_identifier_at(p)?;
    ctx.set_position(end);
    if prev.is_none() && ctx.is_lambda_parameter(&name) {
        return Some(ExpressionNode::parameter(&name));
    }
    Some(ExpressionNode::member(prev.cloned(), &name))
}

fn parse_method_call(
    ctx: &mut TokenParserContext,
    prev: Option<&ExpressionNode>,
) -> Option<ExpressionNode> {
    let p = name_start(ctx, prev)?;
    let (name, end) = ctx.read_identifier_at(p)?;
    let mut p = ctx.skip_whitespace_at(end);
    let mut type_args = Vec::new();
    if ctx.char_at(p) == Some('<') {
        let (args, after) = parse_type_arguments(ctx, p + 1)?;
        type_args = args;
        p = ctx.skip_whitespace_at(after);
    }
    if ctx.char_at(p) != Some('(') {
        return None;
    }
    ctx.set_position(p + 1);
    let args = parse_arguments(ctx, ')')?;
    Some(ExpressionNode::generic_method_call(
        prev.cloned(),
        &name,
        type_args,
        args,
    ))
}

/// Dotted type names separated by commas, closed by `>`.
fn parse_type_arguments(ctx: &TokenParserContext, mut p: usize) -> Option<(Vec<Arc<str>>, usize)> {
    let mut args = Vec::new();
    loop {
        p = ctx.skip_whitespace_at(p);
        let (mut name, mut end) = ctx.read_identifier_at(p)?;
        while ctx.char_at(end) == Some('.') {
            let (part, next) = ctx.read_identifier_at(end + 1)?;
            name.push('.');
            name.push_str(&part);
            end = next;
        }
        args.push(Arc::from(name));
        p = ctx.skip_whitespace_at(end);
        match ctx.char_at(p)? {
            ',' => p += 1,
            '>' => return Some((args, p + 1)),
            _ => return None,
        }
    }
}

fn parse_indexer(
    ctx: &mut TokenParserContext,
    prev: Option<&ExpressionNode>,
) -> Option<ExpressionNode> {
    let p = ctx.skip_whitespace();
    if ctx.char_at(p) != Some('[') {
        return None;
    }
    ctx.set_position(p + 1);
    let args = parse_arguments(ctx, ']')?;
    if args.is_empty() {
        return None;
    }
    Some(ExpressionNode::index(prev.cloned(), args))
}

#[cfg(test)]
#[path = "../../../tests/unit/expression/parsers/member.rs"]
mod tests;
