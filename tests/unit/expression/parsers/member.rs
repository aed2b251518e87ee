use super::*;
use crate::expression::parsers::test_support::{parse, parse_with};

fn m(target: Option<ExpressionNode>, name: &str) -> ExpressionNode {
    ExpressionNode::member(target, name)
}

#[test]
fn member_chains_fold_left() {
    assert_eq!(
        parse("A.B . C"),
        Some(m(Some(m(Some(m(None, "A")), "B")), "C"))
    );
}

#[test]
fn member_requires_dot_after_previous_node() {
    let prev = m(None, "A");
    assert_eq!(parse_with(&MemberTokenParser, "B", Some(&prev)), None);
    assert_eq!(
        parse_with(&MemberTokenParser, ".B", Some(&prev)),
        Some(m(Some(prev.clone()), "B"))
    );
}

#[test]
fn method_calls_with_and_without_type_arguments() {
    assert_eq!(
        parse("Load()"),
        Some(ExpressionNode::method_call(None, "Load", vec![]))
    );
    assert_eq!(
        parse("x.Get<System.String, int>(1, 'a')"),
        Some(ExpressionNode::generic_method_call(
            Some(m(None, "x")),
            "Get",
            vec![Arc::from("System.String"), Arc::from("int")],
            vec![ExpressionNode::constant(1), ExpressionNode::constant("a")],
        ))
    );
}

#[test]
fn trailing_comma_fails_argument_list() {
    assert_eq!(parse("Load(1,)"), None);
    assert_eq!(parse("Items[1,]"), None);
    assert_eq!(parse("Load(1"), None);
}

#[test]
fn indexers_chain_after_members() {
    assert_eq!(
        parse("Items[0]['key'].Name"),
        Some(m(
            Some(ExpressionNode::index(
                Some(ExpressionNode::index(
                    Some(m(None, "Items")),
                    vec![ExpressionNode::constant(0)]
                )),
                vec![ExpressionNode::constant("key")]
            )),
            "Name"
        ))
    );
    assert_eq!(parse("Items[]"), None);
}

#[test]
fn null_conditional_wraps_previous_node() {
    let null = ExpressionNode::null();
    assert_eq!(
        parse_with(&NullConditionalMemberTokenParser, "?.Test", Some(&null)),
        Some(m(Some(ExpressionNode::null_conditional(null.clone())), "Test"))
    );
    assert_eq!(
        parse_with(&NullConditionalMemberTokenParser, "? .Test", Some(&null)),
        Some(m(Some(ExpressionNode::null_conditional(null.clone())), "Test"))
    );
    assert_eq!(
        parse_with(&NullConditionalMemberTokenParser, "?[1]", Some(&null)),
        Some(ExpressionNode::index(
            Some(ExpressionNode::null_conditional(null)),
            vec![ExpressionNode::constant(1)]
        ))
    );
}

#[test]
fn null_conditional_declines_without_guard() {
    let prev = m(None, "A");
    assert_eq!(
        parse_with(&NullConditionalMemberTokenParser, "Test", Some(&prev)),
        None
    );
    assert_eq!(
        parse_with(&NullConditionalMemberTokenParser, "?? B", Some(&prev)),
        None
    );
    assert_eq!(parse_with(&NullConditionalMemberTokenParser, "?.Test", None), None);
}

#[test]
fn null_conditional_method_call() {
    assert_eq!(
        parse("A?.Load(1)"),
        Some(ExpressionNode::method_call(
            Some(ExpressionNode::null_conditional(m(None, "A"))),
            "Load",
            vec![ExpressionNode::constant(1)]
        ))
    );
}
