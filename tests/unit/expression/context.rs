use super::*;
use crate::expression::parsers::default_parsers;

fn context(text: &str) -> TokenParserContext {
    let mut ctx = TokenParserContext::new(default_parsers(false).into());
    ctx.initialize(text, None);
    ctx
}

#[test]
fn cursor_moves_and_clamps() {
    let mut ctx = context("  ab c");
    assert_eq!(ctx.len(), 6);
    assert_eq!(ctx.skip_whitespace(), 2);
    assert_eq!(ctx.try_peek_char(1), Some('b'));
    ctx.seek(-10);
    assert_eq!(ctx.position(), 0);
    ctx.set_position(100);
    assert!(ctx.is_eof());
    assert_eq!(ctx.position(), 6);
}

#[test]
fn identifiers_and_prefix_checks() {
    let ctx = context("_abc1.d");
    assert_eq!(ctx.read_identifier_at(0), Some(("_abc1".to_string(), 5)));
    assert_eq!(ctx.read_identifier_at(5), None);
    assert!(ctx.starts_with_at(5, ".d"));
    assert!(!ctx.starts_with_at(5, ".de"));
    assert_eq!(ctx.slice(1, 3), "ab");
    assert!(ctx.starts_with("_ab"));

    let digits = context("1abc");
    assert_eq!(digits.read_identifier_at(0), None);
}

#[test]
fn declined_rules_rewind_the_cursor() {
    let mut ctx = context("(1 + 2");
    assert_eq!(ctx.try_parse(None), None);
    assert_eq!(ctx.position(), 0);
}

#[test]
fn parse_expression_stops_at_unknown_input() {
    let mut ctx = context("a.b ]");
    let node = ctx.parse_expression();
    assert_eq!(
        node,
        Some(ExpressionNode::member(
            Some(ExpressionNode::member(None, "a")),
            "b"
        ))
    );
    assert_eq!(ctx.skip_whitespace(), 4);
}

#[test]
fn lambda_scope_is_a_stack() {
    let mut ctx = context("x");
    ctx.push_lambda_parameters(&[Arc::from("x"), Arc::from("y")]);
    assert!(ctx.is_lambda_parameter("x"));
    assert_eq!(ctx.parse_expression(), Some(ExpressionNode::parameter("x")));
    ctx.pop_lambda_parameters(2);
    assert!(!ctx.is_lambda_parameter("x"));
}

#[test]
fn nested_parse_shares_scope_and_requires_full_input() {
    let mut ctx = context("");
    ctx.push_lambda_parameters(&[Arc::from("p")]);
    assert_eq!(
        ctx.parse_nested("p + 1"),
        Some(ExpressionNode::binary(
            crate::expression::operators::BinaryOp::Add,
            ExpressionNode::parameter("p"),
            ExpressionNode::constant(1)
        ))
    );
    assert_eq!(ctx.parse_nested("p +"), None);
    assert_eq!(ctx.parse_nested("p q"), None);
}

#[test]
fn initialize_resets_state() {
    let mut ctx = context("abc");
    ctx.set_position(2);
    ctx.push_lambda_parameters(&[Arc::from("z")]);
    ctx.initialize("q", Some(&Metadata::new()));
    assert_eq!(ctx.position(), 0);
    assert!(!ctx.is_lambda_parameter("z"));
    assert!(ctx.metadata().is_some());
}
