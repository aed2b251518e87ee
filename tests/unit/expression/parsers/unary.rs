use super::*;
use crate::expression::operators::{UnaryOp, default_unary_tokens};
use crate::expression::parsers::default_parsers;
use crate::expression::parsers::test_support::{parse_rules, parse_with};

fn m(target: Option<ExpressionNode>, name: &str) -> ExpressionNode {
    ExpressionNode::member(target, name)
}

#[test]
fn operand_takes_whole_postfix_chain_by_default() {
    assert_eq!(
        parse_rules(default_parsers(false), "-test.test"),
        Some(ExpressionNode::unary(
            UnaryOp::Minus,
            m(Some(m(None, "test")), "test")
        ))
    );
}

#[test]
fn single_expression_operand_binds_first_node_only() {
    assert_eq!(
        parse_rules(default_parsers(true), "-test.test"),
        Some(m(
            Some(ExpressionNode::unary(UnaryOp::Minus, m(None, "test"))),
            "test"
        ))
    );
}

#[test]
fn candidates_sharing_a_first_char_are_tried_in_order() {
    let parser = UnaryTokenParser::new(vec![
        UnaryToken {
            op: UnaryOp::BitwiseNegation,
            sign: "!!".into(),
            is_single_expression: false,
        },
        UnaryToken::new(UnaryOp::LogicalNegation),
    ]);
    assert_eq!(
        parse_with(&parser, "!!a", None),
        Some(ExpressionNode::unary(UnaryOp::BitwiseNegation, m(None, "a")))
    );
    assert_eq!(
        parse_with(&parser, "!a", None),
        Some(ExpressionNode::unary(UnaryOp::LogicalNegation, m(None, "a")))
    );
}

#[test]
fn declines_after_previous_node_or_without_operand() {
    let parser = UnaryTokenParser::new(default_unary_tokens(false));
    let prev = m(None, "a");
    assert_eq!(parse_with(&parser, "-b", Some(&prev)), None);
    assert_eq!(parse_with(&parser, "-", None), None);
    assert_eq!(parse_with(&parser, "*a", None), None);
}

#[test]
fn unary_binds_tighter_than_binary() {
    assert_eq!(
        parse_rules(default_parsers(false), "!a && -b.c > 1"),
        Some(ExpressionNode::binary(
            crate::expression::operators::BinaryOp::ConditionalAnd,
            ExpressionNode::unary(UnaryOp::LogicalNegation, m(None, "a")),
            ExpressionNode::binary(
                crate::expression::operators::BinaryOp::GreaterThan,
                ExpressionNode::unary(UnaryOp::Minus, m(Some(m(None, "b")), "c")),
                ExpressionNode::constant(1),
            ),
        ))
    );
}
