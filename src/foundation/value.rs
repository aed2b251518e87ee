use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

use crate::foundation::error::{BindError, BindResult};
use crate::observation::registry::ListenerRegistry;

/// An object that participates in binding.
///
/// Members are not reflected from the object itself: the [`MemberManager`] resolves them by
/// [`type_name`](Self::type_name). The remaining methods are capabilities the observation layer
/// queries to find a change-notification channel.
///
/// [`MemberManager`]: crate::members::manager::MemberManager
pub trait BindObject: Any + Send + Sync {
    fn type_name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;

    /// Registry raised with the member name whenever a member value changes.
    fn property_changed(&self) -> Option<&Arc<ListenerRegistry>> {
        None
    }

    /// Named event registries, used by members declaring [`ChangeSignal::Event`].
    ///
    /// [`ChangeSignal::Event`]: crate::members::descriptor::ChangeSignal::Event
    fn event(&self, _name: &str) -> Option<&Arc<ListenerRegistry>> {
        None
    }

    /// Dynamic objects answer any member name at run time through
    /// [`get_dynamic`](Self::get_dynamic) and [`set_dynamic`](Self::set_dynamic).
    fn is_dynamic(&self) -> bool {
        false
    }

    fn get_dynamic(&self, _name: &str) -> Option<Value> {
        None
    }

    fn set_dynamic(&self, name: &str, _value: Value) -> BindResult<()> {
        Err(BindError::member_not_found(self.type_name(), name))
    }
}

pub type ObjectRef = Arc<dyn BindObject>;

pub trait Callable: Send + Sync {
    fn call(&self, args: &[Value]) -> BindResult<Value>;
}

struct NativeFunction<F>(F);

impl<F> Callable for NativeFunction<F>
where
    F: Fn(&[Value]) -> BindResult<Value> + Send + Sync,
{
    fn call(&self, args: &[Value]) -> BindResult<Value> {
        (self.0)(args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Null,
    Bool,
    Char,
    Int,
    UInt,
    Long,
    ULong,
    Float,
    Double,
    Decimal,
    String,
    List,
    Object,
    Function,
}

impl ValueKind {
    pub fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Char | Self::Int | Self::UInt | Self::Long | Self::ULong
        )
    }

    pub fn is_numeric(self) -> bool {
        self.is_integral() || matches!(self, Self::Float | Self::Double | Self::Decimal)
    }

    /// Kinds that accept `null`.
    pub fn is_nullable(self) -> bool {
        matches!(
            self,
            Self::Null | Self::String | Self::List | Self::Object | Self::Function
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Char => "char",
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Long => "long",
            Self::ULong => "ulong",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::List => "List",
            Self::Object => "object",
            Self::Function => "Function",
        }
    }

    /// The kind spelled `name`, as written in generic type arguments.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => Self::Null,
            "bool" => Self::Bool,
            "char" => Self::Char,
            "int" => Self::Int,
            "uint" => Self::UInt,
            "long" => Self::Long,
            "ulong" => Self::ULong,
            "float" => Self::Float,
            "double" => Self::Double,
            "decimal" => Self::Decimal,
            "string" => Self::String,
            "List" => Self::List,
            "object" => Self::Object,
            "Function" => Self::Function,
            _ => return None,
        })
    }

    fn widens_to(self, to: Self) -> bool {
        use ValueKind::*;
        matches!(
            (self, to),
            (Char, Int | UInt | Long | ULong | Float | Double | Decimal)
                | (Int, Long | Float | Double | Decimal)
                | (UInt, Long | ULong | Float | Double | Decimal)
                | (Long, Float | Double | Decimal)
                | (ULong, Float | Double | Decimal)
                | (Float, Double)
        )
    }
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Char(char),
    Int(i32),
    UInt(u32),
    Long(i64),
    ULong(u64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    String(Arc<str>),
    List(Arc<Vec<Value>>),
    Object(ObjectRef),
    Function(Arc<dyn Callable>),
}

impl Value {
    pub fn object<T: BindObject>(obj: Arc<T>) -> Self {
        Self::Object(obj)
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> BindResult<Value> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(NativeFunction(f)))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(Arc::new(items.into_iter().collect()))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Char(_) => ValueKind::Char,
            Self::Int(_) => ValueKind::Int,
            Self::UInt(_) => ValueKind::UInt,
            Self::Long(_) => ValueKind::Long,
            Self::ULong(_) => ValueKind::ULong,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::Decimal(_) => ValueKind::Decimal,
            Self::String(_) => ValueKind::String,
            Self::List(_) => ValueKind::List,
            Self::Object(_) => ValueKind::Object,
            Self::Function(_) => ValueKind::Function,
        }
    }

    pub fn type_name(&self) -> &str {
        match self {
            Self::Object(o) => o.type_name(),
            other => other.kind().name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Arc<Vec<Value>>> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Arc<dyn Callable>> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn downcast_ref<T: BindObject>(&self) -> Option<&T> {
        self.as_object()?.as_any().downcast_ref::<T>()
    }

    /// Identity of the referenced object; `None` for values without identity.
    pub fn object_id(&self) -> Option<usize> {
        self.as_object()
            .map(|o| Arc::as_ptr(o) as *const () as usize)
    }

    pub(crate) fn as_i128(&self) -> Option<i128> {
        Some(match self {
            Self::Char(c) => i128::from(u32::from(*c)),
            Self::Int(v) => i128::from(*v),
            Self::UInt(v) => i128::from(*v),
            Self::Long(v) => i128::from(*v),
            Self::ULong(v) => i128::from(*v),
            _ => return None,
        })
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::Decimal(d) => d.to_f64(),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    pub fn to_index(&self) -> Option<usize> {
        self.as_i128().and_then(|v| usize::try_from(v).ok())
    }

    /// Converts between numeric kinds, possibly losing precision. Integral targets reject
    /// out-of-range and fractional sources.
    pub fn convert_numeric(&self, to: ValueKind) -> Option<Value> {
        if !self.kind().is_numeric() || !to.is_numeric() {
            return None;
        }
        if self.kind() == to {
            return Some(self.clone());
        }
        if to.is_integral() {
            let v = match self.as_i128() {
                Some(v) => v,
                None => {
                    let f = self.to_f64()?;
                    if f.fract() != 0.0 || !f.is_finite() {
                        return None;
                    }
                    f as i128
                }
            };
            return Some(match to {
                ValueKind::Char => Value::Char(char::from_u32(u32::try_from(v).ok()?)?),
                ValueKind::Int => Value::Int(i32::try_from(v).ok()?),
                ValueKind::UInt => Value::UInt(u32::try_from(v).ok()?),
                ValueKind::Long => Value::Long(i64::try_from(v).ok()?),
                ValueKind::ULong => Value::ULong(u64::try_from(v).ok()?),
                _ => return None,
            });
        }
        Some(match to {
            ValueKind::Float => Value::Float(self.to_f64()? as f32),
            ValueKind::Double => Value::Double(self.to_f64()?),
            ValueKind::Decimal => Value::Decimal(match self {
                Self::Float(f) => Decimal::from_f32(*f)?,
                Self::Double(f) => Decimal::from_f64(*f)?,
                other => Decimal::from_i128(other.as_i128()?)?,
            }),
            _ => return None,
        })
    }

    /// Implicit (widening) conversion. `null` converts to any nullable kind.
    pub fn convert_implicit(&self, to: ValueKind) -> Option<Value> {
        let from = self.kind();
        if from == to || (to == ValueKind::Object && from != ValueKind::Null) {
            return Some(self.clone());
        }
        if from == ValueKind::Null {
            return to.is_nullable().then_some(Value::Null);
        }
        if !from.widens_to(to) {
            return None;
        }
        self.convert_numeric(to)
    }

    pub fn from_json(json: &serde_json::Value) -> Self {
        crate::members::dynamic::value_from_json(json)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Char(a), Self::Char(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt(a), Self::UInt(b)) => a == b,
            (Self::Long(a), Self::Long(b)) => a == b,
            (Self::ULong(a), Self::ULong(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Double(a), Self::Double(b)) => a == b,
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::List(a), Self::List(b)) => Arc::ptr_eq(a, b) || a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v:?}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}u"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::ULong(v) => write!(f, "{v}UL"),
            Self::Float(v) => write!(f, "{v}f"),
            Self::Double(v) => write!(f, "{v}d"),
            Self::Decimal(v) => write!(f, "{v}m"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::List(items) => f.debug_list().entries(items.iter()).finish(),
            Self::Object(o) => write!(f, "<{}>", o.type_name()),
            Self::Function(_) => f.write_str("<function>"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}"),
            Self::ULong(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Object(o) => f.write_str(o.type_name()),
            Self::Function(_) => f.write_str("<function>"),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    char => Char,
    i32 => Int,
    u32 => UInt,
    i64 => Long,
    u64 => ULong,
    f32 => Float,
    f64 => Double,
    Decimal => Decimal,
    Arc<str> => String,
    ObjectRef => Object,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(Arc::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(Arc::from(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(Arc::new(v))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/value.rs"]
mod tests;
