use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::expression::ast::ExpressionNode;
use crate::expression::context::{TokenParserContext, is_identifier_char};
use crate::expression::parsers::TokenParser;
use crate::foundation::value::Value;

/// Builds a literal from its numeric text (suffix stripped) and whether it has a fraction or
/// exponent.
pub type DigitConverter = fn(text: &str, is_real: bool) -> Option<Value>;

/// Numeric literals with optional fraction, exponent, and type suffix.
pub struct DigitTokenParser {
    postfixes: HashMap<String, DigitConverter>,
    default: DigitConverter,
}

impl DigitTokenParser {
    pub fn new(default: DigitConverter) -> Self {
        Self {
            postfixes: HashMap::new(),
            default,
        }
    }

    /// Registers a suffix; matching is case-insensitive.
    pub fn with_postfix(mut self, postfix: &str, converter: DigitConverter) -> Self {
        self.postfixes.insert(postfix.to_ascii_lowercase(), converter);
        self
    }
}

impl Default for DigitTokenParser {
    fn default() -> Self {
        Self::new(convert_default)
            .with_postfix("f", convert_float)
            .with_postfix("d", convert_double)
            .with_postfix("m", convert_decimal)
            .with_postfix("u", convert_unsigned)
            .with_postfix("l", convert_long)
            .with_postfix("ul", convert_unsigned_long)
            .with_postfix("lu", convert_unsigned_long)
    }
}

impl TokenParser for DigitTokenParser {
    fn try_parse(
        &self,
        ctx: &mut TokenParserContext,
        prev: Option<&ExpressionNode>,
    ) -> Option<ExpressionNode> {
        if prev.is_some() {
            return None;
        }
        let start = ctx.skip_whitespace();
        let is_digit = |p: usize| ctx.char_at(p).is_some_and(|c| c.is_ascii_digit());

        let mut p = start;
        while is_digit(p) {
            p += 1;
        }
        let mut is_real = false;
        if ctx.char_at(p) == Some('.') && is_digit(p + 1) {
            is_real = true;
            p += 1;
            while is_digit(p) {
                p += 1;
            }
        }
        if p == start {
            return None;
        }
        if matches!(ctx.char_at(p), Some('e' | 'E')) {
            let mut e = p + 1;
            if matches!(ctx.char_at(e), Some('+' | '-')) {
                e += 1;
            }
            if !is_digit(e) {
                return None;
            }
            while is_digit(e) {
                e += 1;
            }
            is_real = true;
            p = e;
        }
        let text = ctx.slice(start, p);

        let suffix_start = p;
        while ctx.char_at(p).is_some_and(|c| c.is_ascii_alphabetic()) {
            p += 1;
        }
        if ctx.char_at(p).is_some_and(is_identifier_char) {
            return None;
        }
        let value = if p == suffix_start {
            (self.default)(&text, is_real)?
        } else {
            let suffix = ctx.slice(suffix_start, p).to_ascii_lowercase();
            let convert = self.postfixes.get(&suffix)?;
            convert(&text, is_real)?
        };
        ctx.set_position(p);
        Some(ExpressionNode::Constant(value))
    }
}

fn convert_default(text: &str, is_real: bool) -> Option<Value> {
    if is_real {
        return convert_double(text, is_real);
    }
    let v: u64 = text.parse().ok()?;
    Some(if let Ok(i) = i32::try_from(v) {
        Value::Int(i)
    } else if let Ok(u) = u32::try_from(v) {
        Value::UInt(u)
    } else if let Ok(l) = i64::try_from(v) {
        Value::Long(l)
    } else {
        Value::ULong(v)
    })
}

fn convert_float(text: &str, _is_real: bool) -> Option<Value> {
    text.parse::<f32>().ok().map(Value::Float)
}

fn convert_double(text: &str, _is_real: bool) -> Option<Value> {
    text.parse::<f64>().ok().map(Value::Double)
}

fn convert_decimal(text: &str, _is_real: bool) -> Option<Value> {
    let d = if text.contains(['e', 'E']) {
        Decimal::from_scientific(text).ok()?
    } else {
        text.parse::<Decimal>().ok()?
    };
    Some(Value::Decimal(d))
}

fn convert_unsigned(text: &str, is_real: bool) -> Option<Value> {
    if is_real {
        return None;
    }
    let v: u64 = text.parse().ok()?;
    Some(match u32::try_from(v) {
        Ok(u) => Value::UInt(u),
        Err(_) => Value::ULong(v),
    })
}

fn convert_long(text: &str, is_real: bool) -> Option<Value> {
    if is_real {
        return None;
    }
    let v: u64 = text.parse().ok()?;
    Some(match i64::try_from(v) {
        Ok(l) => Value::Long(l),
        Err(_) => Value::ULong(v),
    })
}

fn convert_unsigned_long(text: &str, is_real: bool) -> Option<Value> {
    if is_real {
        return None;
    }
    text.parse::<u64>().ok().map(Value::ULong)
}

#[cfg(test)]
#[path = "../../../tests/unit/expression/parsers/digit.rs"]
mod tests;
