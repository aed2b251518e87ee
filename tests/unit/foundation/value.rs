use super::*;

#[test]
fn equality_is_strict_on_kind() {
    assert_eq!(Value::Int(1), Value::Int(1));
    assert_ne!(Value::Int(1), Value::Long(1));
    assert_ne!(Value::Null, Value::from(""));
    assert_eq!(Value::from("a"), Value::from(String::from("a")));
}

#[test]
fn implicit_conversion_widens_only() {
    assert_eq!(
        Value::Int(3).convert_implicit(ValueKind::Long),
        Some(Value::Long(3))
    );
    assert_eq!(
        Value::Float(1.5).convert_implicit(ValueKind::Double),
        Some(Value::Double(1.5))
    );
    assert_eq!(Value::Long(3).convert_implicit(ValueKind::Int), None);
    assert_eq!(Value::Double(1.0).convert_implicit(ValueKind::Float), None);
    assert_eq!(Value::Null.convert_implicit(ValueKind::String), Some(Value::Null));
    assert_eq!(Value::Null.convert_implicit(ValueKind::Int), None);
    assert_eq!(
        Value::Int(7).convert_implicit(ValueKind::Object),
        Some(Value::Int(7))
    );
}

#[test]
fn numeric_conversion_rejects_out_of_range() {
    assert_eq!(Value::Long(i64::MAX).convert_numeric(ValueKind::Int), None);
    assert_eq!(Value::Int(-1).convert_numeric(ValueKind::UInt), None);
    assert_eq!(Value::Double(2.5).convert_numeric(ValueKind::Int), None);
    assert_eq!(
        Value::Double(2.0).convert_numeric(ValueKind::Int),
        Some(Value::Int(2))
    );
    assert_eq!(
        Value::Int(2).convert_numeric(ValueKind::Decimal),
        Some(Value::Decimal(Decimal::from(2)))
    );
}

#[test]
fn display_uses_plain_text() {
    assert_eq!(Value::Null.to_string(), "");
    assert_eq!(Value::Double(1.0).to_string(), "1");
    assert_eq!(Value::list([Value::Int(1), Value::from("x")]).to_string(), "[1, x]");
}

#[test]
fn functions_are_callable_and_compared_by_identity() {
    let f = Value::function(|args| Ok(Value::Int(args.len() as i32)));
    let out = f.as_function().unwrap().call(&[Value::Null, Value::Null]).unwrap();
    assert_eq!(out, Value::Int(2));
    assert_eq!(f, f.clone());
    assert_ne!(f, Value::function(|_| Ok(Value::Null)));
}
