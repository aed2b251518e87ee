use std::fmt;
use std::ops::BitOr;
use std::sync::Arc;

use crate::foundation::error::{BindError, BindResult};
use crate::foundation::value::{BindObject, Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Property,
    Method,
    Event,
    Indexer,
}

impl MemberKind {
    fn bit(self) -> u8 {
        match self {
            Self::Field => 1,
            Self::Property => 1 << 1,
            Self::Method => 1 << 2,
            Self::Event => 1 << 3,
            Self::Indexer => 1 << 4,
        }
    }
}

/// Set of [`MemberKind`]s a lookup accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberKinds(u8);

impl MemberKinds {
    pub const FIELD: Self = Self(1);
    pub const PROPERTY: Self = Self(1 << 1);
    pub const METHOD: Self = Self(1 << 2);
    pub const EVENT: Self = Self(1 << 3);
    pub const INDEXER: Self = Self(1 << 4);
    pub const VALUE: Self = Self(Self::FIELD.0 | Self::PROPERTY.0);
    pub const ALL: Self = Self(0x1f);

    pub fn contains(self, kind: MemberKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

impl BitOr for MemberKinds {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Instance/static filter of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberFlags(u8);

impl MemberFlags {
    pub const INSTANCE: Self = Self(1);
    pub const STATIC: Self = Self(1 << 1);
    pub const ALL: Self = Self(0b11);

    pub fn accepts(self, is_static: bool) -> bool {
        let bit = if is_static { Self::STATIC } else { Self::INSTANCE };
        self.0 & bit.0 != 0
    }
}

impl BitOr for MemberFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Accepted argument shapes of a method or indexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    /// One entry per parameter; `None` accepts any value.
    Fixed(Vec<Option<ValueKind>>),
    Variadic { min: usize },
}

impl Parameters {
    pub fn none() -> Self {
        Self::Fixed(Vec::new())
    }

    /// Conversion cost of binding `args`, with the converted arguments. `None` when they do not
    /// fit.
    pub fn bind(&self, args: &[Value]) -> Option<(u32, Vec<Value>)> {
        match self {
            Self::Variadic { min } => (args.len() >= *min).then(|| (0, args.to_vec())),
            Self::Fixed(kinds) => {
                if kinds.len() != args.len() {
                    return None;
                }
                let mut cost = 0;
                let mut out = Vec::with_capacity(args.len());
                for (arg, kind) in args.iter().zip(kinds) {
                    match kind {
                        None => out.push(arg.clone()),
                        Some(k) if arg.kind() == *k => out.push(arg.clone()),
                        Some(k) => {
                            out.push(arg.convert_implicit(*k)?);
                            cost += 1;
                        }
                    }
                }
                Some((cost, out))
            }
        }
    }
}

/// How changes to a member are announced.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeSignal {
    /// Raised by name on [`BindObject::property_changed`].
    PropertyChanged,
    /// Raised on the named [`BindObject::event`] registry.
    Event(Arc<str>),
    None,
}

pub type Getter = Arc<dyn Fn(&Value, &[Value]) -> BindResult<Value> + Send + Sync>;
pub type Setter = Arc<dyn Fn(&Value, &[Value], Value) -> BindResult<()> + Send + Sync>;

/// A resolved member.
///
/// Properties and fields read with no arguments, indexers read with their index arguments, and
/// methods are invoked through the same read accessor with their call arguments.
pub struct MemberInfo {
    pub name: Arc<str>,
    pub kind: MemberKind,
    pub declaring_type: Arc<str>,
    pub is_static: bool,
    pub value_kind: Option<ValueKind>,
    pub parameters: Parameters,
    pub change: ChangeSignal,
    read: Option<Getter>,
    write: Option<Setter>,
}

impl MemberInfo {
    fn new(declaring_type: &str, name: &str, kind: MemberKind, read: Getter) -> Self {
        Self {
            name: Arc::from(name),
            kind,
            declaring_type: Arc::from(declaring_type),
            is_static: false,
            value_kind: None,
            parameters: Parameters::none(),
            change: if kind == MemberKind::Method {
                ChangeSignal::None
            } else {
                ChangeSignal::PropertyChanged
            },
            read: Some(read),
            write: None,
        }
    }

    pub fn property<F>(declaring_type: &str, name: &str, get: F) -> Self
    where
        F: Fn(&Value) -> BindResult<Value> + Send + Sync + 'static,
    {
        Self::new(
            declaring_type,
            name,
            MemberKind::Property,
            Arc::new(move |target, _| get(target)),
        )
    }

    pub fn field<F>(declaring_type: &str, name: &str, get: F) -> Self
    where
        F: Fn(&Value) -> BindResult<Value> + Send + Sync + 'static,
    {
        let mut info = Self::property(declaring_type, name, get);
        info.kind = MemberKind::Field;
        info
    }

    /// A property reading a concrete [`BindObject`] type.
    pub fn typed_property<T, F>(declaring_type: &str, name: &str, get: F) -> Self
    where
        T: BindObject,
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        let type_name: Arc<str> = Arc::from(declaring_type);
        let member: Arc<str> = Arc::from(name);
        Self::property(declaring_type, name, move |target| {
            downcast::<T>(target, &type_name, &member).map(&get)
        })
    }

    pub fn method<F>(declaring_type: &str, name: &str, parameters: Parameters, call: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> BindResult<Value> + Send + Sync + 'static,
    {
        let mut info = Self::new(declaring_type, name, MemberKind::Method, Arc::new(call));
        info.parameters = parameters;
        info
    }

    /// An indexer. Indexers are named `Item`.
    pub fn indexer<F>(declaring_type: &str, parameters: Parameters, get: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> BindResult<Value> + Send + Sync + 'static,
    {
        let mut info = Self::new(declaring_type, INDEXER_NAME, MemberKind::Indexer, Arc::new(get));
        info.parameters = parameters;
        info
    }

    pub fn event(declaring_type: &str, name: &str) -> Self {
        let mut info = Self::new(
            declaring_type,
            name,
            MemberKind::Event,
            Arc::new(|_, _| Ok(Value::Null)),
        );
        info.read = None;
        info.change = ChangeSignal::Event(Arc::from(name));
        info
    }

    pub fn with_setter<F>(mut self, set: F) -> Self
    where
        F: Fn(&Value, &[Value], Value) -> BindResult<()> + Send + Sync + 'static,
    {
        self.write = Some(Arc::new(set));
        self
    }

    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn value_kind(mut self, kind: ValueKind) -> Self {
        self.value_kind = Some(kind);
        self
    }

    pub fn notifies(mut self, change: ChangeSignal) -> Self {
        self.change = change;
        self
    }

    pub fn can_read(&self) -> bool {
        self.read.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.write.is_some()
    }

    /// Reads a property/field, an indexer slot, or invokes a method.
    pub fn get_value(&self, target: &Value, args: &[Value]) -> BindResult<Value> {
        let read = self.read.as_ref().ok_or_else(|| {
            BindError::evaluation(format!("{}.{} cannot be read", self.declaring_type, self.name))
        })?;
        read(target, args)
    }

    pub fn set_value(&self, target: &Value, args: &[Value], value: Value) -> BindResult<()> {
        let write = self.write.as_ref().ok_or_else(|| {
            BindError::evaluation(format!(
                "{}.{} is read-only",
                self.declaring_type, self.name
            ))
        })?;
        let value = match self.value_kind {
            Some(kind) => value.convert_implicit(kind).ok_or_else(|| {
                BindError::evaluation(format!(
                    "cannot assign {} to {}.{} of type {}",
                    value.type_name(),
                    self.declaring_type,
                    self.name,
                    kind.name()
                ))
            })?,
            None => value,
        };
        write(target, args, value)
    }

    /// Member name used for change notification. Indexers notify as `Item[]`.
    pub fn notification_name(&self) -> &str {
        if self.kind == MemberKind::Indexer {
            INDEXER_CHANGED
        } else {
            &self.name
        }
    }
}

impl fmt::Debug for MemberInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("declaring_type", &self.declaring_type)
            .field("is_static", &self.is_static)
            .field("parameters", &self.parameters)
            .field("change", &self.change)
            .field("writable", &self.can_write())
            .finish()
    }
}

pub const INDEXER_NAME: &str = "Item";
pub const INDEXER_CHANGED: &str = "Item[]";

/// Downcasts a member target, reporting a null or mistyped receiver.
pub fn downcast<'a, T: BindObject>(
    target: &'a Value,
    type_name: &str,
    member: &str,
) -> BindResult<&'a T> {
    if target.is_null() {
        return Err(BindError::null_reference(format!(
            "{type_name}.{member} on null"
        )));
    }
    target.downcast_ref::<T>().ok_or_else(|| {
        BindError::evaluation(format!(
            "{type_name}.{member} applied to {}",
            target.type_name()
        ))
    })
}

/// Members of one named type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: Arc<str>,
    pub members: Vec<Arc<MemberInfo>>,
}

impl TypeDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            members: Vec::new(),
        }
    }

    pub fn member(mut self, info: MemberInfo) -> Self {
        self.members.push(Arc::new(info));
        self
    }

    pub fn has_static_members(&self) -> bool {
        self.members.iter().any(|m| m.is_static)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/members/descriptor.rs"]
mod tests;
