//! Composite format strings: `{index[,alignment][:format]}` with `{{`/`}}` escapes.
//!
//! Numeric format specifiers are the common fixed-point subset: `F`, `N`, `D` and `X`, each with
//! an optional precision. Anything else falls back to the value's display form.

use std::fmt::Write as _;

use rust_decimal::RoundingStrategy;

use crate::foundation::error::{BindError, BindResult};
use crate::foundation::value::Value;

pub fn format(template: &str, args: &[Value]) -> BindResult<String> {
    let chars: Vec<char> = template.chars().collect();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '{' if chars.get(i + 1) == Some(&'{') => {
                out.push('{');
                i += 2;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                out.push('}');
                i += 2;
            }
            '{' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '}')
                    .map(|p| p + i + 1)
                    .ok_or_else(|| BindError::evaluation(format!("unclosed '{{' in '{template}'")))?;
                let hole: String = chars[i + 1..close].iter().collect();
                write_hole(&mut out, &hole, args)?;
                i = close + 1;
            }
            '}' => {
                return Err(BindError::evaluation(format!(
                    "unexpected '}}' in '{template}'"
                )));
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

fn write_hole(out: &mut String, hole: &str, args: &[Value]) -> BindResult<()> {
    let (head, spec) = match hole.split_once(':') {
        Some((head, spec)) => (head, Some(spec)),
        None => (hole, None),
    };
    let (index, alignment) = match head.split_once(',') {
        Some((index, alignment)) => (index, Some(alignment)),
        None => (head, None),
    };
    let index: usize = index
        .trim()
        .parse()
        .map_err(|_| BindError::evaluation(format!("invalid format item '{{{hole}}}'")))?;
    let value = args.get(index).ok_or_else(|| {
        BindError::evaluation(format!(
            "format index {index} out of range for {} argument(s)",
            args.len()
        ))
    })?;
    let alignment: i64 = match alignment {
        Some(a) => a
            .trim()
            .parse()
            .map_err(|_| BindError::evaluation(format!("invalid alignment in '{{{hole}}}'")))?,
        None => 0,
    };

    let text = match spec {
        Some(spec) => format_value(value, spec)?,
        None => value.to_string(),
    };
    let width = usize::try_from(alignment.unsigned_abs()).unwrap_or(usize::MAX);
    let pad = width.saturating_sub(text.chars().count());
    if alignment < 0 {
        out.push_str(&text);
        out.extend(std::iter::repeat_n(' ', pad));
    } else {
        out.extend(std::iter::repeat_n(' ', pad));
        out.push_str(&text);
    }
    Ok(())
}

/// Formats one value with a specifier such as `F2`, `N0`, `D5` or `x`.
pub fn format_value(value: &Value, spec: &str) -> BindResult<String> {
    let mut chars = spec.chars();
    let Some(kind) = chars.next() else {
        return Ok(value.to_string());
    };
    let digits = chars.as_str();
    let precision = if digits.is_empty() {
        None
    } else {
        match digits.parse::<usize>() {
            Ok(p) if p <= 28 => Some(p),
            _ => return Ok(value.to_string()),
        }
    };
    if !value.kind().is_numeric() {
        return Ok(value.to_string());
    }
    match kind {
        'F' | 'f' => Ok(fixed(value, precision.unwrap_or(2))),
        'N' | 'n' => Ok(group_thousands(&fixed(value, precision.unwrap_or(2)))),
        'D' | 'd' => {
            let v = value.as_i128().ok_or_else(|| {
                BindError::evaluation(format!("'{spec}' needs an integral value, got {value:?}"))
            })?;
            let width = precision.unwrap_or(0);
            let mut s = String::new();
            if v < 0 {
                s.push('-');
            }
            let _ = write!(s, "{:0width$}", v.unsigned_abs());
            Ok(s)
        }
        'X' | 'x' => {
            let bits = match value {
                Value::Char(c) => u64::from(u32::from(*c)),
                Value::Int(v) => u64::from(*v as u32),
                Value::UInt(v) => u64::from(*v),
                Value::Long(v) => *v as u64,
                Value::ULong(v) => *v,
                _ => {
                    return Err(BindError::evaluation(format!(
                        "'{spec}' needs an integral value, got {value:?}"
                    )));
                }
            };
            let width = precision.unwrap_or(0);
            Ok(if kind == 'X' {
                format!("{bits:0width$X}")
            } else {
                format!("{bits:0width$x}")
            })
        }
        _ => Ok(value.to_string()),
    }
}

fn fixed(value: &Value, precision: usize) -> String {
    match value {
        Value::Decimal(d) => {
            let scale = u32::try_from(precision).unwrap_or(28);
            let mut rounded =
                d.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
            rounded.rescale(scale);
            rounded.to_string()
        }
        other => match other.as_i128() {
            Some(v) if precision == 0 => v.to_string(),
            Some(v) => format!("{v}.{}", "0".repeat(precision)),
            None => format!("{:.precision$}", other.to_f64().unwrap_or(f64::NAN)),
        },
    }
}

fn group_thousands(fixed: &str) -> String {
    let (sign, rest) = match fixed.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", fixed),
    };
    let (int, frac) = match rest.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (rest, None),
    };
    let mut grouped = String::with_capacity(int.len() + int.len() / 3);
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let mut out = format!("{sign}{grouped}");
    if let Some(frac) = frac {
        out.push('.');
        out.push_str(frac);
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/expression/format.rs"]
mod tests;
