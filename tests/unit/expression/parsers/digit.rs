use super::*;
use crate::expression::parsers::test_support::parse_with;

fn digit(text: &str) -> Option<Value> {
    match parse_with(&DigitTokenParser::default(), text, None)? {
        ExpressionNode::Constant(v) => Some(v),
        other => panic!("unexpected node {other:?}"),
    }
}

#[test]
fn integers_pick_the_smallest_fitting_kind() {
    assert_eq!(digit("42"), Some(Value::Int(42)));
    assert_eq!(digit("3000000000"), Some(Value::UInt(3_000_000_000)));
    assert_eq!(digit("5000000000"), Some(Value::Long(5_000_000_000)));
    assert_eq!(
        digit("18446744073709551615"),
        Some(Value::ULong(u64::MAX))
    );
}

#[test]
fn reals_default_to_double() {
    assert_eq!(digit("1.5"), Some(Value::Double(1.5)));
    assert_eq!(digit("1e3"), Some(Value::Double(1000.0)));
    assert_eq!(digit("2.5E-1"), Some(Value::Double(0.25)));
    assert_eq!(digit("1e+2"), Some(Value::Double(100.0)));
}

#[test]
fn suffixes_are_case_insensitive() {
    assert_eq!(digit("1.5f"), Some(Value::Float(1.5)));
    assert_eq!(digit("1.5F"), Some(Value::Float(1.5)));
    assert_eq!(digit("2d"), Some(Value::Double(2.0)));
    assert_eq!(digit("2D"), Some(Value::Double(2.0)));
    assert_eq!(digit("1.25m"), Some(Value::Decimal("1.25".parse().unwrap())));
    assert_eq!(digit("1.25M"), Some(Value::Decimal("1.25".parse().unwrap())));
    assert_eq!(digit("7u"), Some(Value::UInt(7)));
    assert_eq!(digit("7U"), Some(Value::UInt(7)));
    assert_eq!(digit("7l"), Some(Value::Long(7)));
    assert_eq!(digit("7L"), Some(Value::Long(7)));
    for text in ["7ul", "7UL", "7uL", "7Ul", "7lu", "7LU"] {
        assert_eq!(digit(text), Some(Value::ULong(7)), "{text}");
    }
}

#[test]
fn scientific_decimal() {
    assert_eq!(digit("1e2m"), Some(Value::Decimal(Decimal::from(100))));
}

#[test]
fn malformed_literals_are_rejected() {
    for text in ["1e-", "1e+", "1e", "1.1UL", "1.5u", "1.5L", "1x", "12abc", "1_"] {
        assert_eq!(digit(text), None, "{text}");
    }
}

#[test]
fn dot_without_digit_stays_for_member_access() {
    let mut ctx = TokenParserContext::new(crate::expression::parsers::default_parsers(false).into());
    ctx.initialize("1.ToString()", None);
    let node = DigitTokenParser::default().try_parse(&mut ctx, None);
    assert_eq!(node, Some(ExpressionNode::constant(1)));
    assert_eq!(ctx.position(), 1);
}

#[test]
fn declines_with_previous_node() {
    let prev = ExpressionNode::constant(1);
    assert_eq!(parse_with(&DigitTokenParser::default(), "2", Some(&prev)), None);
}
