use super::*;
use crate::expression::operators::BinaryOp;

fn m(target: Option<ExpressionNode>, name: &str) -> ExpressionNode {
    ExpressionNode::member(target, name)
}

#[test]
fn parses_whole_text_only() {
    let parser = ExpressionParser::default();
    assert_eq!(
        parser.try_parse("Items[SelectedIndex].Name", None),
        Some(m(
            Some(ExpressionNode::index(
                Some(m(None, "Items")),
                vec![m(None, "SelectedIndex")]
            )),
            "Name"
        ))
    );
    assert_eq!(parser.try_parse("a b", None), None);
    assert_eq!(parser.try_parse("   ", None), None);
}

#[test]
fn parse_error_reports_stop_position() {
    let parser = ExpressionParser::default();
    let err = parser.parse("a + b )", None).unwrap_err();
    assert!(matches!(err, BindError::Parse(_)));
    assert!(err.to_string().contains("at 6"), "{err}");
    let err = parser.parse("", None).unwrap_err();
    assert!(err.to_string().contains("empty expression"));
}

#[test]
fn contexts_return_to_a_bounded_pool() {
    let parser = ExpressionParser::with_parsers(default_parsers(false), 1);
    assert_eq!(parser.pooled(), 0);
    parser.try_parse("a", None);
    parser.try_parse("b", None);
    assert_eq!(parser.pooled(), 1);

    let unpooled = ExpressionParser::with_parsers(default_parsers(false), 0);
    unpooled.try_parse("a", None);
    assert_eq!(unpooled.pooled(), 0);
}

#[test]
fn single_expression_option_changes_unary_operands() {
    let opts = EngineOpts {
        unary_single_expression: true,
        ..EngineOpts::default()
    };
    let parser = ExpressionParser::new(&opts);
    assert_eq!(
        parser.try_parse("!a.b", None),
        Some(m(
            Some(ExpressionNode::unary(
                crate::expression::operators::UnaryOp::LogicalNegation,
                m(None, "a")
            )),
            "b"
        ))
    );
}

#[test]
fn binding_declarations_split_into_target_source_and_parameters() {
    let parser = ExpressionParser::default();
    let bindings = parser
        .try_parse_bindings("Text Name, Mode=TwoWay; Visible IsVisible", None)
        .unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!(&*bindings[0].target, "Text");
    assert_eq!(bindings[0].source, Some(m(None, "Name")));
    assert_eq!(bindings[0].parameter("Mode"), Some(&m(None, "TwoWay")));
    assert_eq!(&*bindings[1].target, "Visible");
    assert_eq!(bindings[1].source, Some(m(None, "IsVisible")));
    assert!(bindings[1].parameters.is_empty());
}

#[test]
fn binding_sources_may_contain_separators_inside_nesting() {
    let parser = ExpressionParser::default();
    let bindings = parser
        .try_parse_bindings("Text Format('a;b', x), Fallback='-,-'; Total Total = Price * Qty", None)
        .unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!(
        bindings[0].source,
        Some(ExpressionNode::method_call(
            None,
            "Format",
            vec![ExpressionNode::constant("a;b"), m(None, "x")]
        ))
    );
    assert_eq!(
        bindings[0].parameter("Fallback"),
        Some(&ExpressionNode::constant("-,-"))
    );
    assert_eq!(
        bindings[1].source,
        Some(ExpressionNode::assignment(
            m(None, "Total"),
            ExpressionNode::binary(BinaryOp::Multiply, m(None, "Price"), m(None, "Qty"))
        ))
    );
}

#[test]
fn target_only_declaration_binds_to_source_object() {
    let parser = ExpressionParser::default();
    let bindings = parser.try_parse_bindings("DataContext;", None).unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].source, None);
}

#[test]
fn malformed_declarations_fail() {
    let parser = ExpressionParser::default();
    assert!(parser.try_parse_bindings("1abc Name", None).is_err());
    assert!(parser.try_parse_bindings("Text Name, TwoWay", None).is_err());
    assert!(parser.try_parse_bindings("Text Name +", None).is_err());
}
