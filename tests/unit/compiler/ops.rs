use super::*;

fn bin(op: BinaryOp, a: impl Into<Value>, b: impl Into<Value>) -> Value {
    binary(op, &a.into(), &b.into()).unwrap()
}

#[test]
fn arithmetic_promotes_to_the_wider_kind() {
    assert_eq!(bin(BinaryOp::Add, 1, 2), Value::Int(3));
    assert_eq!(bin(BinaryOp::Add, 1, 2u32), Value::Long(3));
    assert_eq!(bin(BinaryOp::Add, 1u32, 2u32), Value::UInt(3));
    assert_eq!(bin(BinaryOp::Multiply, 2, 1.5), Value::Double(3.0));
    assert_eq!(bin(BinaryOp::Add, 1.5f32, 1), Value::Float(2.5));
    assert_eq!(
        bin(BinaryOp::Add, Decimal::new(15, 1), 1.0),
        Value::Decimal(Decimal::new(25, 1))
    );
    assert_eq!(bin(BinaryOp::Add, 'a', 1), Value::Int(98));
}

#[test]
fn integral_arithmetic_wraps_and_rejects_zero_divisors() {
    assert_eq!(bin(BinaryOp::Add, i32::MAX, 1), Value::Int(i32::MIN));
    assert_eq!(bin(BinaryOp::Divide, 7, 2), Value::Int(3));
    assert_eq!(bin(BinaryOp::Remainder, -7, 3), Value::Int(-1));
    assert!(binary(BinaryOp::Divide, &Value::Int(1), &Value::Int(0)).is_err());
    assert!(binary(BinaryOp::Remainder, &Value::Long(1), &Value::Long(0)).is_err());
    assert!(
        binary(
            BinaryOp::Divide,
            &Value::Decimal(Decimal::ONE),
            &Value::Decimal(Decimal::ZERO)
        )
        .is_err()
    );
    let Value::Double(inf) = bin(BinaryOp::Divide, 1.0, 0.0) else {
        panic!("expected double");
    };
    assert!(inf.is_infinite());
}

#[test]
fn string_addition_concatenates_display_forms() {
    assert_eq!(bin(BinaryOp::Add, "a", 1), Value::from("a1"));
    assert_eq!(bin(BinaryOp::Add, 1.5, "x"), Value::from("1.5x"));
    assert_eq!(bin(BinaryOp::Add, Value::Null, "x"), Value::from("x"));
    assert_eq!(bin(BinaryOp::Add, true, "!"), Value::from("true!"));
}

#[test]
fn null_operands_propagate_through_arithmetic() {
    assert_eq!(bin(BinaryOp::Add, Value::Null, 1), Value::Null);
    assert_eq!(bin(BinaryOp::Multiply, 2.0, Value::Null), Value::Null);
    assert_eq!(bin(BinaryOp::LeftShift, Value::Null, 1), Value::Null);
    assert_eq!(unary(UnaryOp::Minus, &Value::Null).unwrap(), Value::Null);
}

#[test]
fn comparisons_with_null_are_false() {
    assert_eq!(bin(BinaryOp::LessThan, Value::Null, 1), Value::Bool(false));
    assert_eq!(bin(BinaryOp::GreaterThanOrEqual, 1, Value::Null), Value::Bool(false));
    assert_eq!(bin(BinaryOp::Equality, Value::Null, Value::Null), Value::Bool(true));
    assert_eq!(bin(BinaryOp::NotEquality, Value::Null, 1), Value::Bool(true));
}

#[test]
fn comparisons_cross_numeric_kinds() {
    assert_eq!(bin(BinaryOp::LessThan, 1, 1.5), Value::Bool(true));
    assert_eq!(bin(BinaryOp::Equality, 2, 2.0), Value::Bool(true));
    assert_eq!(bin(BinaryOp::GreaterThan, 3u64, -1), Value::Bool(false));
    assert_eq!(bin(BinaryOp::LessThanOrEqual, "a", "b"), Value::Bool(true));
    assert!(binary(BinaryOp::LessThan, &Value::from("a"), &Value::Int(1)).is_err());
}

#[test]
fn shifts_take_an_int_count() {
    assert_eq!(bin(BinaryOp::LeftShift, 1, 4), Value::Int(16));
    assert_eq!(bin(BinaryOp::RightShift, -16i64, 2), Value::Long(-4));
    assert_eq!(bin(BinaryOp::LeftShift, 1u32, 31), Value::UInt(1 << 31));
    assert!(binary(BinaryOp::LeftShift, &Value::Int(1), &Value::Long(1)).is_err());
    assert!(binary(BinaryOp::LeftShift, &Value::Double(1.0), &Value::Int(1)).is_err());
}

#[test]
fn logical_operators_cover_bools_and_bits() {
    assert_eq!(bin(BinaryOp::ConditionalAnd, true, false), Value::Bool(false));
    assert_eq!(bin(BinaryOp::ConditionalOr, false, true), Value::Bool(true));
    assert_eq!(bin(BinaryOp::ExclusiveOr, true, true), Value::Bool(false));
    assert_eq!(bin(BinaryOp::LogicalAnd, 6, 3), Value::Int(2));
    assert_eq!(bin(BinaryOp::LogicalOr, 4u64, 1), Value::ULong(5));
    assert!(binary(BinaryOp::ConditionalAnd, &Value::Int(1), &Value::Int(1)).is_err());
    assert!(binary(BinaryOp::LogicalAnd, &Value::Double(1.0), &Value::Int(1)).is_err());
}

#[test]
fn null_coalescing_picks_the_first_non_null() {
    assert_eq!(bin(BinaryOp::NullCoalescing, Value::Null, 2), Value::Int(2));
    assert_eq!(bin(BinaryOp::NullCoalescing, 1, 2), Value::Int(1));
}

#[test]
fn unary_operators() {
    assert_eq!(unary(UnaryOp::Minus, &Value::Int(3)).unwrap(), Value::Int(-3));
    assert_eq!(unary(UnaryOp::Minus, &Value::UInt(3)).unwrap(), Value::Long(-3));
    assert_eq!(unary(UnaryOp::Plus, &Value::Char('a')).unwrap(), Value::Int(97));
    assert_eq!(unary(UnaryOp::LogicalNegation, &Value::Bool(true)).unwrap(), Value::Bool(false));
    assert_eq!(unary(UnaryOp::BitwiseNegation, &Value::Int(0)).unwrap(), Value::Int(-1));
    assert!(unary(UnaryOp::LogicalNegation, &Value::Int(1)).is_err());
    assert!(unary(UnaryOp::Minus, &Value::from("x")).is_err());
}

#[test]
fn truthy_requires_bool() {
    assert!(truthy(&Value::Bool(true)).unwrap());
    assert!(truthy(&Value::Null).is_err());
    assert!(truthy(&Value::Int(1)).is_err());
}

#[test]
fn equality_is_numeric_across_kinds_but_strict_otherwise() {
    assert!(equals(&Value::Int(1), &Value::Long(1)));
    assert!(equals(&Value::Char('a'), &Value::Int(97)));
    assert!(!equals(&Value::from("1"), &Value::Int(1)));
    assert_eq!(compare(&Value::Null, &Value::Int(1)).unwrap(), None);
}
