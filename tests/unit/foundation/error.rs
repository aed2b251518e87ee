use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(BindError::parse("x").to_string().contains("parse error:"));
    assert!(
        BindError::evaluation("x")
            .to_string()
            .contains("evaluation error:")
    );
    assert!(
        BindError::null_reference("x")
            .to_string()
            .contains("null reference:")
    );
    assert!(
        BindError::observation("x")
            .to_string()
            .contains("observation error:")
    );
    assert_eq!(
        BindError::member_not_found("Person", "Age").to_string(),
        "member not found: Person.Age"
    );
}

#[test]
fn compile_error_carries_node() {
    let node = ExpressionNode::member(None, "Missing");
    let err = BindError::compile("unresolved", &node);
    assert!(err.to_string().starts_with("compile error:"));
    assert_eq!(err.node(), Some(&node));
    assert!(BindError::parse("x").node().is_none());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = BindError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
