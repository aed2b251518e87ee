use super::*;
use crate::expression::operators::BinaryOp;
use crate::expression::parsers::test_support::{parse, parse_with};

#[test]
fn single_parameter_lambda_binds_references() {
    assert_eq!(
        parse("x => x.Name"),
        Some(ExpressionNode::lambda(
            &["x"],
            ExpressionNode::member(Some(ExpressionNode::parameter("x")), "Name"),
        ))
    );
}

#[test]
fn parenthesized_parameter_lists() {
    assert_eq!(
        parse("(a, b) => a + b"),
        Some(ExpressionNode::lambda(
            &["a", "b"],
            ExpressionNode::binary(
                BinaryOp::Add,
                ExpressionNode::parameter("a"),
                ExpressionNode::parameter("b")
            ),
        ))
    );
    assert_eq!(
        parse("() => 1"),
        Some(ExpressionNode::lambda(&[], ExpressionNode::constant(1)))
    );
    assert_eq!(parse("(a, a) => a"), None);
}

#[test]
fn parameters_go_out_of_scope_after_the_body() {
    assert_eq!(
        parse("Where(x => x, x)"),
        Some(ExpressionNode::method_call(
            None,
            "Where",
            vec![
                ExpressionNode::lambda(&["x"], ExpressionNode::parameter("x")),
                ExpressionNode::member(None, "x"),
            ],
        ))
    );
}

#[test]
fn parentheses_group_and_must_balance() {
    assert_eq!(
        parse("(1 + 2) * 3"),
        Some(ExpressionNode::binary(
            BinaryOp::Multiply,
            ExpressionNode::binary(
                BinaryOp::Add,
                ExpressionNode::constant(1),
                ExpressionNode::constant(2)
            ),
            ExpressionNode::constant(3),
        ))
    );
    assert_eq!(parse("(1 + 2"), None);
    assert_eq!(parse("((a)"), None);
    assert_eq!(parse("a)"), None);
}

#[test]
fn paren_declines_after_previous_node() {
    let prev = ExpressionNode::member(None, "a");
    assert_eq!(parse_with(&ParenTokenParser, "(1)", Some(&prev)), None);
    assert_eq!(parse_with(&LambdaTokenParser, "x => 1", Some(&prev)), None);
}
