//! Members every engine knows: strings, lists, `Math`, the `string` statics, the observable
//! runtime types, and `ToString()` on everything.

use std::cmp::Ordering;
use std::sync::Arc;

use rust_decimal::RoundingStrategy;

use crate::compiler::ops;
use crate::expression::format;
use crate::expression::operators::BinaryOp;
use crate::foundation::error::{BindError, BindResult};
use crate::foundation::value::{Value, ValueKind};
use crate::members::descriptor::{
    ChangeSignal, MemberFlags, MemberInfo, MemberKind, MemberKinds, Parameters, TypeDescriptor,
    downcast,
};
use crate::members::dynamic::{DynamicResource, ObservableList};
use crate::members::manager::{MemberProvider, TypeKey, TypeRegistry};

const STRING: &str = "string";
const LIST: &str = "List";
const MATH: &str = "Math";

pub(crate) fn register(registry: &TypeRegistry) {
    registry.register(string_type());
    registry.register(string_statics());
    registry.register(math_type());
    registry.register(sequence_type(
        LIST,
        |target| {
            target
                .as_list()
                .cloned()
                .ok_or_else(|| BindError::null_reference("List member on null"))
        },
        ChangeSignal::None,
    ));
    registry.register(observable_list_type());
    registry.register(resource_type());
}

/// `ToString()` for any receiver.
pub struct UniversalMembers;

impl MemberProvider for UniversalMembers {
    fn try_get_members(
        &self,
        key: &TypeKey,
        name: &str,
        kinds: MemberKinds,
        flags: MemberFlags,
    ) -> Vec<Arc<MemberInfo>> {
        if name != "ToString" || !kinds.contains(MemberKind::Method) || !flags.accepts(false) {
            return Vec::new();
        }
        vec![Arc::new(MemberInfo::method(
            &key.name,
            "ToString",
            Parameters::none(),
            |target, _| Ok(Value::from(target.to_string())),
        ))]
    }
}

fn fixed(kinds: &[Option<ValueKind>]) -> Parameters {
    Parameters::Fixed(kinds.to_vec())
}

fn this_str(target: &Value) -> BindResult<&str> {
    target
        .as_str()
        .ok_or_else(|| BindError::null_reference("string member on null"))
}

fn arg_str(args: &[Value], i: usize) -> BindResult<&str> {
    args.get(i)
        .and_then(Value::as_str)
        .ok_or_else(|| BindError::null_reference(format!("string argument {i} is null")))
}

fn arg_index(args: &[Value], i: usize) -> BindResult<usize> {
    let arg = args.get(i).unwrap_or(&Value::Null);
    arg.to_index().ok_or_else(|| {
        BindError::evaluation(format!("index {arg:?} is out of range"))
    })
}

fn char_index(haystack: &str, byte: Option<usize>) -> Value {
    match byte {
        Some(b) => Value::Int(haystack[..b].chars().count() as i32),
        None => Value::Int(-1),
    }
}

/// String instance members. Strings are immutable, so nothing here notifies.
fn string_type() -> TypeDescriptor {
    let text = Some(ValueKind::String);
    let int = Some(ValueKind::Int);
    let method = |name: &str, params: Parameters, f: fn(&str, &[Value]) -> BindResult<Value>| {
        MemberInfo::method(STRING, name, params, move |target, args| f(this_str(target)?, args))
    };
    TypeDescriptor::new(STRING)
        .member(
            MemberInfo::property(STRING, "Length", |t| {
                Ok(Value::Int(this_str(t)?.chars().count() as i32))
            })
            .value_kind(ValueKind::Int)
            .notifies(ChangeSignal::None),
        )
        .member(
            MemberInfo::indexer(STRING, fixed(&[int]), |t, args| {
                let i = arg_index(args, 0)?;
                this_str(t)?
                    .chars()
                    .nth(i)
                    .map(Value::Char)
                    .ok_or_else(|| BindError::evaluation(format!("index {i} is out of range")))
            })
            .notifies(ChangeSignal::None),
        )
        .member(method("ToUpper", Parameters::none(), |s, _| {
            Ok(Value::from(s.to_uppercase()))
        }))
        .member(method("ToLower", Parameters::none(), |s, _| {
            Ok(Value::from(s.to_lowercase()))
        }))
        .member(method("Trim", Parameters::none(), |s, _| Ok(Value::from(s.trim()))))
        .member(method("Contains", fixed(&[text]), |s, a| {
            Ok(Value::Bool(s.contains(arg_str(a, 0)?)))
        }))
        .member(method("StartsWith", fixed(&[text]), |s, a| {
            Ok(Value::Bool(s.starts_with(arg_str(a, 0)?)))
        }))
        .member(method("EndsWith", fixed(&[text]), |s, a| {
            Ok(Value::Bool(s.ends_with(arg_str(a, 0)?)))
        }))
        .member(method("IndexOf", fixed(&[text]), |s, a| {
            Ok(char_index(s, s.find(arg_str(a, 0)?)))
        }))
        .member(method("Replace", fixed(&[text, text]), |s, a| {
            let from = arg_str(a, 0)?;
            if from.is_empty() {
                return Err(BindError::evaluation("Replace: pattern is empty"));
            }
            let to = a.get(1).and_then(Value::as_str).unwrap_or("");
            Ok(Value::from(s.replace(from, to)))
        }))
        .member(method("Substring", fixed(&[int]), |s, a| {
            let start = arg_index(a, 0)?;
            if start > s.chars().count() {
                return Err(BindError::evaluation(format!("Substring: {start} is out of range")));
            }
            Ok(Value::from(s.chars().skip(start).collect::<String>()))
        }))
        .member(method("Substring", fixed(&[int, int]), |s, a| {
            let (start, len) = (arg_index(a, 0)?, arg_index(a, 1)?);
            if start + len > s.chars().count() {
                return Err(BindError::evaluation(format!(
                    "Substring: {start}+{len} is out of range"
                )));
            }
            Ok(Value::from(s.chars().skip(start).take(len).collect::<String>()))
        }))
}

fn string_statics() -> TypeDescriptor {
    let stat = |name: &str, params: Parameters, f: fn(&[Value]) -> BindResult<Value>| {
        MemberInfo::method(STRING, name, params, move |_, args| f(args)).static_member()
    };
    TypeDescriptor::new(STRING)
        .member(stat("Format", Parameters::Variadic { min: 1 }, |args| {
            let template = arg_str(args, 0)?;
            Ok(Value::from(format::format(template, &args[1..])?))
        }))
        .member(stat("IsNullOrEmpty", fixed(&[Some(ValueKind::String)]), |args| {
            Ok(Value::Bool(args[0].as_str().is_none_or(str::is_empty)))
        }))
        .member(stat("Concat", Parameters::Variadic { min: 0 }, |args| {
            Ok(Value::from(args.iter().map(Value::to_string).collect::<String>()))
        }))
        .member(stat("Join", Parameters::Variadic { min: 1 }, |args| {
            let separator = args[0].as_str().unwrap_or("");
            let parts: Vec<String> = match &args[1..] {
                [Value::List(items)] => items.iter().map(Value::to_string).collect(),
                rest => rest.iter().map(Value::to_string).collect(),
            };
            Ok(Value::from(parts.join(separator)))
        }))
}

fn numeric_arg(args: &[Value], i: usize) -> BindResult<&Value> {
    match args.get(i) {
        Some(v) if v.kind().is_numeric() => Ok(v),
        Some(v) => Err(BindError::evaluation(format!(
            "expected a number, got {}",
            v.type_name()
        ))),
        None => Err(BindError::evaluation("missing numeric argument")),
    }
}

fn pick(args: &[Value], want: Ordering) -> BindResult<Value> {
    let (a, b) = (numeric_arg(args, 0)?, numeric_arg(args, 1)?);
    let (a, b) = ops::promoted(a, b).ok_or_else(|| {
        BindError::evaluation(format!("cannot compare {} with {}", a.type_name(), b.type_name()))
    })?;
    Ok(match ops::compare(&a, &b)? {
        Some(o) if o == want || o == Ordering::Equal => a,
        _ => b,
    })
}

fn double(args: &[Value], i: usize) -> BindResult<f64> {
    Ok(numeric_arg(args, i)?.to_f64().unwrap_or(f64::NAN))
}

fn round_to(value: &Value, digits: u32, strategy: RoundingStrategy) -> BindResult<Value> {
    Ok(match value {
        Value::Decimal(d) => Value::Decimal(d.round_dp_with_strategy(digits, strategy)),
        v if v.kind().is_integral() => v.clone(),
        v => {
            let x = v.to_f64().unwrap_or(f64::NAN);
            let scale = 10f64.powi(digits as i32);
            let scaled = x * scale;
            let rounded = match strategy {
                RoundingStrategy::ToNegativeInfinity => scaled.floor(),
                RoundingStrategy::ToPositiveInfinity => scaled.ceil(),
                _ => scaled.round_ties_even(),
            };
            Value::Double(rounded / scale)
        }
    })
}

fn math_type() -> TypeDescriptor {
    let any = None;
    let stat = |name: &str, params: Parameters, f: fn(&[Value]) -> BindResult<Value>| {
        MemberInfo::method(MATH, name, params, move |_, args| f(args)).static_member()
    };
    TypeDescriptor::new(MATH)
        .member(
            MemberInfo::property(MATH, "PI", |_| Ok(Value::Double(std::f64::consts::PI)))
                .static_member()
                .notifies(ChangeSignal::None),
        )
        .member(
            MemberInfo::property(MATH, "E", |_| Ok(Value::Double(std::f64::consts::E)))
                .static_member()
                .notifies(ChangeSignal::None),
        )
        .member(stat("Max", fixed(&[any, any]), |a| pick(a, Ordering::Greater)))
        .member(stat("Min", fixed(&[any, any]), |a| pick(a, Ordering::Less)))
        .member(stat("Abs", fixed(&[any]), |a| {
            Ok(match numeric_arg(a, 0)? {
                Value::Int(v) => Value::Int(v.wrapping_abs()),
                Value::Long(v) => Value::Long(v.wrapping_abs()),
                Value::Float(v) => Value::Float(v.abs()),
                Value::Double(v) => Value::Double(v.abs()),
                Value::Decimal(v) => Value::Decimal(v.abs()),
                other => other.clone(),
            })
        }))
        .member(stat("Round", fixed(&[any]), |a| {
            round_to(numeric_arg(a, 0)?, 0, RoundingStrategy::MidpointNearestEven)
        }))
        .member(stat("Round", fixed(&[any, Some(ValueKind::Int)]), |a| {
            let digits = u32::try_from(arg_index(a, 1)?).unwrap_or(u32::MAX).min(15);
            round_to(numeric_arg(a, 0)?, digits, RoundingStrategy::MidpointNearestEven)
        }))
        .member(stat("Floor", fixed(&[any]), |a| {
            round_to(numeric_arg(a, 0)?, 0, RoundingStrategy::ToNegativeInfinity)
        }))
        .member(stat("Ceiling", fixed(&[any]), |a| {
            round_to(numeric_arg(a, 0)?, 0, RoundingStrategy::ToPositiveInfinity)
        }))
        .member(stat("Pow", fixed(&[any, any]), |a| {
            Ok(Value::Double(double(a, 0)?.powf(double(a, 1)?)))
        }))
        .member(stat("Sqrt", fixed(&[any]), |a| {
            Ok(Value::Double(double(a, 0)?.sqrt()))
        }))
}

type Items = fn(&Value) -> BindResult<Arc<Vec<Value>>>;

fn call(f: &Value, item: &Value) -> BindResult<Value> {
    let f = f
        .as_function()
        .ok_or_else(|| BindError::evaluation(format!("expected a lambda, got {}", f.type_name())))?;
    f.call(std::slice::from_ref(item))
}

fn test(f: &Value, item: &Value) -> BindResult<bool> {
    ops::truthy(&call(f, item)?)
}

/// Read-only sequence members shared by lists and observable lists.
fn sequence_type(type_name: &str, items: Items, change: ChangeSignal) -> TypeDescriptor {
    let f = Some(ValueKind::Function);
    let any = None;
    let method = |name: &str, params: Parameters, body: fn(&[Value], &[Value]) -> BindResult<Value>| {
        MemberInfo::method(type_name, name, params, move |target, args| {
            body(&items(target)?, args)
        })
    };
    TypeDescriptor::new(type_name)
        .member(
            MemberInfo::property(type_name, "Count", move |t| Ok(Value::Int(items(t)?.len() as i32)))
                .value_kind(ValueKind::Int)
                .notifies(change.clone()),
        )
        .member(
            MemberInfo::indexer(type_name, fixed(&[Some(ValueKind::Int)]), move |t, args| {
                let i = arg_index(args, 0)?;
                items(t)?
                    .get(i)
                    .cloned()
                    .ok_or_else(|| BindError::evaluation(format!("index {i} is out of range")))
            })
            .notifies(change),
        )
        .member(method("Contains", fixed(&[any]), |xs, a| {
            Ok(Value::Bool(xs.iter().any(|x| ops::equals(x, &a[0]))))
        }))
        .member(method("IndexOf", fixed(&[any]), |xs, a| {
            Ok(Value::Int(
                xs.iter()
                    .position(|x| ops::equals(x, &a[0]))
                    .map_or(-1, |i| i as i32),
            ))
        }))
        // `OfType<T>()`: the compiler passes `T` as a leading string.
        .member(method("OfType", fixed(&[Some(ValueKind::String)]), |xs, a| {
            let type_name = a[0].as_str().unwrap_or_default();
            Ok(Value::from(
                xs.iter()
                    .filter(|x| x.type_name() == type_name)
                    .cloned()
                    .collect::<Vec<_>>(),
            ))
        }))
        .member(method("Where", fixed(&[f]), |xs, a| {
            let mut out = Vec::new();
            for x in xs {
                if test(&a[0], x)? {
                    out.push(x.clone());
                }
            }
            Ok(Value::from(out))
        }))
        .member(method("Select", fixed(&[f]), |xs, a| {
            xs.iter()
                .map(|x| call(&a[0], x))
                .collect::<BindResult<Vec<_>>>()
                .map(Value::from)
        }))
        .member(method("Any", Parameters::none(), |xs, _| Ok(Value::Bool(!xs.is_empty()))))
        .member(method("Any", fixed(&[f]), |xs, a| {
            for x in xs {
                if test(&a[0], x)? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }))
        .member(method("All", fixed(&[f]), |xs, a| {
            for x in xs {
                if !test(&a[0], x)? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }))
        .member(method("FirstOrDefault", Parameters::none(), |xs, _| {
            Ok(xs.first().cloned().unwrap_or_default())
        }))
        .member(method("FirstOrDefault", fixed(&[f]), |xs, a| {
            for x in xs {
                if test(&a[0], x)? {
                    return Ok(x.clone());
                }
            }
            Ok(Value::Null)
        }))
        .member(method("Sum", Parameters::none(), |xs, _| {
            xs.iter()
                .try_fold(Value::Int(0), |acc, x| ops::binary(BinaryOp::Add, &acc, x))
        }))
        .member(method("Sum", fixed(&[f]), |xs, a| {
            xs.iter().try_fold(Value::Int(0), |acc, x| {
                ops::binary(BinaryOp::Add, &acc, &call(&a[0], x)?)
            })
        }))
}

fn observable(target: &Value) -> BindResult<&ObservableList> {
    downcast::<ObservableList>(target, ObservableList::TYPE_NAME, "member")
}

fn observable_list_type() -> TypeDescriptor {
    let name = ObservableList::TYPE_NAME;
    let mut descriptor = sequence_type(
        name,
        |t| observable(t).map(|l| Arc::new(l.snapshot())),
        ChangeSignal::PropertyChanged,
    );
    // Replaced by a writable indexer below.
    descriptor.members.retain(|m| m.kind != MemberKind::Indexer);
    let any = None;
    let int = Some(ValueKind::Int);
    descriptor
        .member(
            MemberInfo::indexer(name, fixed(&[int]), |t, args| {
                let i = arg_index(args, 0)?;
                observable(t)?
                    .get(i)
                    .ok_or_else(|| BindError::evaluation(format!("index {i} is out of range")))
            })
            .with_setter(|t, args, value| observable(t)?.set(arg_index(args, 0)?, value)),
        )
        .member(MemberInfo::method(name, "Add", fixed(&[any]), |t, a| {
            observable(t)?.push(a[0].clone());
            Ok(Value::Null)
        }))
        .member(MemberInfo::method(name, "Insert", fixed(&[int, any]), |t, a| {
            observable(t)?.insert(arg_index(a, 0)?, a[1].clone())?;
            Ok(Value::Null)
        }))
        .member(MemberInfo::method(name, "RemoveAt", fixed(&[int]), |t, a| {
            observable(t)?.remove_at(arg_index(a, 0)?)
        }))
        .member(MemberInfo::method(name, "Clear", Parameters::none(), |t, _| {
            observable(t)?.clear();
            Ok(Value::Null)
        }))
}

fn resource_type() -> TypeDescriptor {
    let name = DynamicResource::TYPE_NAME;
    TypeDescriptor::new(name)
        .member(
            MemberInfo::typed_property::<DynamicResource, _>(name, "Name", |r| {
                Value::String(Arc::clone(r.name()))
            })
            .notifies(ChangeSignal::None),
        )
        .member(
            MemberInfo::typed_property::<DynamicResource, _>(name, "Value", |r| r.value())
                .with_setter(|t, _, value| {
                    downcast::<DynamicResource>(t, DynamicResource::TYPE_NAME, "Value")?
                        .set_value(value);
                    Ok(())
                }),
        )
}

#[cfg(test)]
#[path = "../../tests/unit/members/builtins.rs"]
mod tests;
