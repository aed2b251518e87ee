//! Operator semantics over [`Value`]s.
//!
//! Numeric operands are promoted to a common kind first: decimal beats double beats float beats
//! the integral kinds, and integral pairs widen the way `int + uint → long` does. Integral
//! arithmetic wraps; integral division by zero is an error. Arithmetic on `null` yields `null`.

use std::cmp::Ordering;

use rust_decimal::Decimal;

use crate::expression::operators::{BinaryOp, UnaryOp};
use crate::foundation::error::{BindError, BindResult};
use crate::foundation::value::{Value, ValueKind};

pub fn binary(op: BinaryOp, left: &Value, right: &Value) -> BindResult<Value> {
    use BinaryOp::*;
    match op {
        Add if left.kind() == ValueKind::String || right.kind() == ValueKind::String => {
            Ok(Value::from(format!("{left}{right}")))
        }
        Add | Subtract | Multiply | Divide | Remainder => arithmetic(op, left, right),
        LeftShift | RightShift => shift(op, left, right),
        LessThan | GreaterThan | LessThanOrEqual | GreaterThanOrEqual => {
            let Some(ordering) = compare(left, right)? else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match op {
                LessThan => ordering == Ordering::Less,
                GreaterThan => ordering == Ordering::Greater,
                LessThanOrEqual => ordering != Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }
        Equality => Ok(Value::Bool(equals(left, right))),
        NotEquality => Ok(Value::Bool(!equals(left, right))),
        LogicalAnd | LogicalOr | ExclusiveOr | ConditionalAnd | ConditionalOr => {
            logical(op, left, right)
        }
        NullCoalescing => Ok(if left.is_null() {
            right.clone()
        } else {
            left.clone()
        }),
    }
}

pub fn unary(op: UnaryOp, operand: &Value) -> BindResult<Value> {
    if operand.is_null() {
        return Ok(Value::Null);
    }
    let unsupported = || {
        BindError::evaluation(format!(
            "operator '{}' cannot be applied to {}",
            op.sign(),
            operand.type_name()
        ))
    };
    Ok(match (op, operand) {
        (UnaryOp::LogicalNegation, Value::Bool(b)) => Value::Bool(!b),
        (UnaryOp::Plus, v) if v.kind().is_numeric() => match v {
            Value::Char(c) => Value::Int(u32::from(*c) as i32),
            v => v.clone(),
        },
        (UnaryOp::Minus, Value::Char(c)) => Value::Int(-(u32::from(*c) as i32)),
        (UnaryOp::Minus, Value::Int(v)) => Value::Int(v.wrapping_neg()),
        (UnaryOp::Minus, Value::UInt(v)) => Value::Long(-i64::from(*v)),
        (UnaryOp::Minus, Value::Long(v)) => Value::Long(v.wrapping_neg()),
        (UnaryOp::Minus, Value::Float(v)) => Value::Float(-v),
        (UnaryOp::Minus, Value::Double(v)) => Value::Double(-v),
        (UnaryOp::Minus, Value::Decimal(v)) => Value::Decimal(-*v),
        (UnaryOp::BitwiseNegation, Value::Char(c)) => Value::Int(!(u32::from(*c) as i32)),
        (UnaryOp::BitwiseNegation, Value::Int(v)) => Value::Int(!v),
        (UnaryOp::BitwiseNegation, Value::UInt(v)) => Value::UInt(!v),
        (UnaryOp::BitwiseNegation, Value::Long(v)) => Value::Long(!v),
        (UnaryOp::BitwiseNegation, Value::ULong(v)) => Value::ULong(!v),
        _ => return Err(unsupported()),
    })
}

/// Condition operand; anything but a bool is an error.
pub fn truthy(value: &Value) -> BindResult<bool> {
    value.as_bool().ok_or_else(|| {
        BindError::evaluation(format!("expected bool, got {}", value.type_name()))
    })
}

/// Common kind two numeric operands are evaluated in.
fn promote(a: ValueKind, b: ValueKind) -> Option<ValueKind> {
    use ValueKind as K;
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }
    let either = |k: K| a == k || b == k;
    Some(if either(K::Decimal) {
        K::Decimal
    } else if either(K::Double) {
        K::Double
    } else if either(K::Float) {
        K::Float
    } else if either(K::ULong) {
        K::ULong
    } else if either(K::Long) {
        K::Long
    } else if either(K::UInt) {
        if matches!((a, b), (K::UInt | K::Char, K::UInt | K::Char)) {
            K::UInt
        } else {
            K::Long
        }
    } else {
        K::Int
    })
}

pub(crate) fn promoted(left: &Value, right: &Value) -> Option<(Value, Value)> {
    let kind = promote(left.kind(), right.kind())?;
    let cast = |v: &Value| -> Option<Value> {
        if kind.is_integral() {
            // Wrapping reinterpretation: `-1 + 1UL` follows two's complement.
            let raw = v.as_i128()?;
            return Some(match kind {
                ValueKind::Int => Value::Int(raw as i32),
                ValueKind::UInt => Value::UInt(raw as u32),
                ValueKind::Long => Value::Long(raw as i64),
                _ => Value::ULong(raw as u64),
            });
        }
        v.convert_numeric(kind)
    };
    Some((cast(left)?, cast(right)?))
}

fn type_error(op: BinaryOp, left: &Value, right: &Value) -> BindError {
    BindError::evaluation(format!(
        "operator '{}' cannot be applied to {} and {}",
        op.sign(),
        left.type_name(),
        right.type_name()
    ))
}

fn divide_by_zero() -> BindError {
    BindError::evaluation("attempted to divide by zero")
}

macro_rules! integral_arith {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {{
        let (a, b) = ($a, $b);
        Value::$variant(match $op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Subtract => a.wrapping_sub(b),
            BinaryOp::Multiply => a.wrapping_mul(b),
            _ if b == 0 => return Err(divide_by_zero()),
            BinaryOp::Divide => a.wrapping_div(b),
            _ => a.wrapping_rem(b),
        })
    }};
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> BindResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let (l, r) = promoted(left, right).ok_or_else(|| type_error(op, left, right))?;
    Ok(match (l, r) {
        (Value::Int(a), Value::Int(b)) => integral_arith!(op, a, b, Int),
        (Value::UInt(a), Value::UInt(b)) => integral_arith!(op, a, b, UInt),
        (Value::Long(a), Value::Long(b)) => integral_arith!(op, a, b, Long),
        (Value::ULong(a), Value::ULong(b)) => integral_arith!(op, a, b, ULong),
        (Value::Float(a), Value::Float(b)) => Value::Float(float_op(op, a, b)),
        (Value::Double(a), Value::Double(b)) => Value::Double(float_op(op, a, b)),
        (Value::Decimal(a), Value::Decimal(b)) => Value::Decimal(decimal_op(op, a, b)?),
        _ => return Err(type_error(op, left, right)),
    })
}

fn float_op<T>(op: BinaryOp, a: T, b: T) -> T
where
    T: std::ops::Add<Output = T>
        + std::ops::Sub<Output = T>
        + std::ops::Mul<Output = T>
        + std::ops::Div<Output = T>
        + std::ops::Rem<Output = T>,
{
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Subtract => a - b,
        BinaryOp::Multiply => a * b,
        BinaryOp::Divide => a / b,
        _ => a % b,
    }
}

fn decimal_op(op: BinaryOp, a: Decimal, b: Decimal) -> BindResult<Decimal> {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Subtract => a.checked_sub(b),
        BinaryOp::Multiply => a.checked_mul(b),
        BinaryOp::Divide if b.is_zero() => return Err(divide_by_zero()),
        BinaryOp::Divide => a.checked_div(b),
        _ if b.is_zero() => return Err(divide_by_zero()),
        _ => a.checked_rem(b),
    };
    result.ok_or_else(|| BindError::evaluation("decimal overflow"))
}

fn shift(op: BinaryOp, left: &Value, right: &Value) -> BindResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    let count = match right {
        Value::Char(_) | Value::Int(_) | Value::UInt(_) => right.as_i128().unwrap_or(0) as u32,
        _ => return Err(type_error(op, left, right)),
    };
    let left_shift = op == BinaryOp::LeftShift;
    Ok(match left {
        Value::Char(_) | Value::Int(_) => {
            let v = left.as_i128().unwrap_or(0) as i32;
            Value::Int(if left_shift { v.wrapping_shl(count) } else { v.wrapping_shr(count) })
        }
        Value::UInt(v) => {
            Value::UInt(if left_shift { v.wrapping_shl(count) } else { v.wrapping_shr(count) })
        }
        Value::Long(v) => {
            Value::Long(if left_shift { v.wrapping_shl(count) } else { v.wrapping_shr(count) })
        }
        Value::ULong(v) => {
            Value::ULong(if left_shift { v.wrapping_shl(count) } else { v.wrapping_shr(count) })
        }
        _ => return Err(type_error(op, left, right)),
    })
}

fn logical(op: BinaryOp, left: &Value, right: &Value) -> BindResult<Value> {
    if let (Value::Bool(a), Value::Bool(b)) = (left, right) {
        let (a, b) = (*a, *b);
        return Ok(Value::Bool(match op {
            BinaryOp::LogicalAnd | BinaryOp::ConditionalAnd => a && b,
            BinaryOp::LogicalOr | BinaryOp::ConditionalOr => a || b,
            _ => a ^ b,
        }));
    }
    if matches!(op, BinaryOp::ConditionalAnd | BinaryOp::ConditionalOr) {
        return Err(type_error(op, left, right));
    }
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }
    if !left.kind().is_integral() || !right.kind().is_integral() {
        return Err(type_error(op, left, right));
    }
    let (l, r) = promoted(left, right).ok_or_else(|| type_error(op, left, right))?;
    macro_rules! bits {
        ($a:expr, $b:expr, $variant:ident) => {
            Value::$variant(match op {
                BinaryOp::LogicalAnd => $a & $b,
                BinaryOp::LogicalOr => $a | $b,
                _ => $a ^ $b,
            })
        };
    }
    Ok(match (l, r) {
        (Value::Int(a), Value::Int(b)) => bits!(a, b, Int),
        (Value::UInt(a), Value::UInt(b)) => bits!(a, b, UInt),
        (Value::Long(a), Value::Long(b)) => bits!(a, b, Long),
        (Value::ULong(a), Value::ULong(b)) => bits!(a, b, ULong),
        _ => return Err(type_error(op, left, right)),
    })
}

/// Ordering of two values; `None` when either is null.
pub fn compare(left: &Value, right: &Value) -> BindResult<Option<Ordering>> {
    if left.is_null() || right.is_null() {
        return Ok(None);
    }
    match (left, right) {
        (Value::String(a), Value::String(b)) => return Ok(Some(a.cmp(b))),
        (Value::Bool(a), Value::Bool(b)) => return Ok(Some(a.cmp(b))),
        _ => {}
    }
    let (l, r) = promoted(left, right).ok_or_else(|| {
        BindError::evaluation(format!(
            "cannot compare {} with {}",
            left.type_name(),
            right.type_name()
        ))
    })?;
    Ok(match (&l, &r) {
        (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
        (Value::Float(_) | Value::Double(_), _) => {
            l.to_f64().zip(r.to_f64()).and_then(|(a, b)| a.partial_cmp(&b))
        }
        _ => l.as_i128().zip(r.as_i128()).map(|(a, b)| a.cmp(&b)),
    })
}

/// Equality with numeric promotion; everything else compares as [`Value`]'s `PartialEq`.
pub fn equals(left: &Value, right: &Value) -> bool {
    if left.kind().is_numeric() && right.kind().is_numeric() {
        return matches!(compare(left, right), Ok(Some(Ordering::Equal)));
    }
    left == right
}

#[cfg(test)]
#[path = "../../tests/unit/compiler/ops.rs"]
mod tests;
