//! Observable runtime objects: a property bag, a list and a named resource.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, RwLock, Weak};

use crate::foundation::error::{BindError, BindResult};
use crate::foundation::sync::{read, write};
use crate::foundation::value::{BindObject, Value, ValueKind};
use crate::members::descriptor::{
    INDEXER_CHANGED, INDEXER_NAME, MemberFlags, MemberInfo, MemberKind, MemberKinds, Parameters,
};
use crate::members::manager::{MemberProvider, TypeKey};
use crate::observation::dispatch::{DispatchingRegistry, ThreadDispatcher, ThreadExecutionMode};
use crate::observation::registry::ListenerRegistry;

/// Lazily created change registry shared by the types below.
#[derive(Default)]
struct Notifier {
    registry: OnceLock<Arc<ListenerRegistry>>,
    dispatch: Option<(Arc<dyn ThreadDispatcher>, ThreadExecutionMode)>,
}

impl Notifier {
    fn registry(&self) -> &Arc<ListenerRegistry> {
        self.registry.get_or_init(|| Arc::new(ListenerRegistry::new()))
    }

    fn raise(&self, sender: Option<Value>, member: &str) {
        // Nobody can be listening before the registry exists.
        let (Some(registry), Some(sender)) = (self.registry.get(), sender) else {
            return;
        };
        match &self.dispatch {
            Some((dispatcher, mode)) => {
                DispatchingRegistry::new(Arc::clone(registry), Arc::clone(dispatcher), *mode)
                    .raise(&sender, &Value::Null, Some(member), None);
            }
            None => registry.raise(&sender, &Value::Null, Some(member), None),
        }
    }
}

/// A property bag that raises property-changed on every effective write.
pub struct DynamicObject {
    type_name: Arc<str>,
    values: RwLock<BTreeMap<Arc<str>, Value>>,
    notifier: Notifier,
    this: Weak<DynamicObject>,
}

impl DynamicObject {
    pub fn new(type_name: &str) -> Arc<Self> {
        Self::build(type_name, BTreeMap::new(), None)
    }

    pub fn from_pairs<K, V>(type_name: &str, pairs: impl IntoIterator<Item = (K, V)>) -> Arc<Self>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        let values = pairs
            .into_iter()
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into()))
            .collect();
        Self::build(type_name, values, None)
    }

    /// An object whose notifications are delivered through `dispatcher` in `mode`.
    pub fn with_dispatcher(
        type_name: &str,
        dispatcher: Arc<dyn ThreadDispatcher>,
        mode: ThreadExecutionMode,
    ) -> Arc<Self> {
        Self::build(type_name, BTreeMap::new(), Some((dispatcher, mode)))
    }

    fn build(
        type_name: &str,
        values: BTreeMap<Arc<str>, Value>,
        dispatch: Option<(Arc<dyn ThreadDispatcher>, ThreadExecutionMode)>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            type_name: Arc::from(type_name),
            values: RwLock::new(values),
            notifier: Notifier {
                registry: OnceLock::new(),
                dispatch,
            },
            this: this.clone(),
        })
    }

    fn sender(&self) -> Option<Value> {
        self.this.upgrade().map(Value::object)
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        read(&self.values).get(name).cloned()
    }

    /// Stores `value`; raises `name` and returns `true` when it differs from the old value.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        {
            let mut values = write(&self.values);
            if values.get(name) == Some(&value) {
                return false;
            }
            values.insert(Arc::from(name), value);
        }
        self.notifier.raise(self.sender(), name);
        true
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        let removed = write(&self.values).remove(name);
        if removed.is_some() {
            self.notifier.raise(self.sender(), name);
        }
        removed
    }

    pub fn keys(&self) -> Vec<Arc<str>> {
        read(&self.values).keys().cloned().collect()
    }

    pub fn raise_changed(&self, member: &str) {
        self.notifier.raise(self.sender(), member);
    }
}

impl BindObject for DynamicObject {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn property_changed(&self) -> Option<&Arc<ListenerRegistry>> {
        Some(self.notifier.registry())
    }

    fn is_dynamic(&self) -> bool {
        true
    }

    fn get_dynamic(&self, name: &str) -> Option<Value> {
        self.get(name)
    }

    fn set_dynamic(&self, name: &str, value: Value) -> BindResult<()> {
        self.set(name, value);
        Ok(())
    }
}

/// A mutable list raising `Count` and `Item[]`.
pub struct ObservableList {
    items: RwLock<Vec<Value>>,
    notifier: Notifier,
    this: Weak<ObservableList>,
}

impl ObservableList {
    pub const TYPE_NAME: &'static str = "ObservableList";

    pub fn new(items: impl IntoIterator<Item = Value>) -> Arc<Self> {
        let items = items.into_iter().collect();
        Arc::new_cyclic(|this| Self {
            items: RwLock::new(items),
            notifier: Notifier::default(),
            this: this.clone(),
        })
    }

    fn changed(&self, count_changed: bool) {
        let sender = self.this.upgrade().map(Value::object);
        if count_changed {
            self.notifier.raise(sender.clone(), "Count");
        }
        self.notifier.raise(sender, INDEXER_CHANGED);
    }

    fn out_of_range(index: usize, len: usize) -> BindError {
        BindError::evaluation(format!("index {index} out of range for list of {len}"))
    }

    pub fn len(&self) -> usize {
        read(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        read(&self.items).get(index).cloned()
    }

    pub fn snapshot(&self) -> Vec<Value> {
        read(&self.items).clone()
    }

    pub fn push(&self, value: impl Into<Value>) {
        write(&self.items).push(value.into());
        self.changed(true);
    }

    pub fn insert(&self, index: usize, value: impl Into<Value>) -> BindResult<()> {
        {
            let mut items = write(&self.items);
            if index > items.len() {
                return Err(Self::out_of_range(index, items.len()));
            }
            items.insert(index, value.into());
        }
        self.changed(true);
        Ok(())
    }

    pub fn set(&self, index: usize, value: impl Into<Value>) -> BindResult<()> {
        {
            let mut items = write(&self.items);
            let len = items.len();
            let slot = items
                .get_mut(index)
                .ok_or_else(|| Self::out_of_range(index, len))?;
            *slot = value.into();
        }
        self.changed(false);
        Ok(())
    }

    pub fn remove_at(&self, index: usize) -> BindResult<Value> {
        let removed = {
            let mut items = write(&self.items);
            if index >= items.len() {
                return Err(Self::out_of_range(index, items.len()));
            }
            items.remove(index)
        };
        self.changed(true);
        Ok(removed)
    }

    pub fn clear(&self) {
        let had_items = !std::mem::take(&mut *write(&self.items)).is_empty();
        if had_items {
            self.changed(true);
        }
    }
}

impl BindObject for ObservableList {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn property_changed(&self) -> Option<&Arc<ListenerRegistry>> {
        Some(self.notifier.registry())
    }
}

/// A named, replaceable value such as a theme resource.
pub struct DynamicResource {
    name: Arc<str>,
    value: RwLock<Value>,
    notifier: Notifier,
    this: Weak<DynamicResource>,
}

impl DynamicResource {
    pub const TYPE_NAME: &'static str = "DynamicResource";

    pub fn new(name: &str, value: impl Into<Value>) -> Arc<Self> {
        let value = value.into();
        Arc::new_cyclic(|this| Self {
            name: Arc::from(name),
            value: RwLock::new(value),
            notifier: Notifier::default(),
            this: this.clone(),
        })
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn value(&self) -> Value {
        read(&self.value).clone()
    }

    pub fn set_value(&self, value: impl Into<Value>) -> bool {
        let value = value.into();
        {
            let mut slot = write(&self.value);
            if *slot == value {
                return false;
            }
            *slot = value;
        }
        self.notifier
            .raise(self.this.upgrade().map(Value::object), "Value");
        true
    }
}

impl BindObject for DynamicResource {
    fn type_name(&self) -> &str {
        Self::TYPE_NAME
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn property_changed(&self) -> Option<&Arc<ListenerRegistry>> {
        Some(self.notifier.registry())
    }
}

/// Answers any property name, and string indexers, on dynamic objects.
pub struct DynamicMembers;

impl DynamicMembers {
    fn property(type_name: &str, name: &str) -> MemberInfo {
        let member: Arc<str> = Arc::from(name);
        let get_member = Arc::clone(&member);
        MemberInfo::property(type_name, name, move |target| {
            let obj = target
                .as_object()
                .ok_or_else(|| BindError::null_reference(format!("'{get_member}' on null")))?;
            obj.get_dynamic(&get_member)
                .ok_or_else(|| BindError::member_not_found(obj.type_name(), get_member.as_ref()))
        })
        .with_setter(move |target, _, value| match target.as_object() {
            Some(obj) => obj.set_dynamic(&member, value),
            None => Err(BindError::null_reference(format!("'{member}' on null"))),
        })
    }

    fn indexer(type_name: &str) -> MemberInfo {
        let by_key = Parameters::Fixed(vec![Some(ValueKind::String)]);
        MemberInfo::indexer(type_name, by_key, |target, args| {
            let key = args.first().and_then(Value::as_str);
            let (Some(obj), Some(key)) = (target.as_object(), key) else {
                return Err(BindError::null_reference("indexer on null"));
            };
            obj.get_dynamic(key)
                .ok_or_else(|| BindError::member_not_found(obj.type_name(), key))
        })
        .with_setter(|target, args, value| {
            let key = args.first().and_then(Value::as_str);
            let (Some(obj), Some(key)) = (target.as_object(), key) else {
                return Err(BindError::null_reference("indexer on null"));
            };
            obj.set_dynamic(key, value)
        })
    }
}

impl MemberProvider for DynamicMembers {
    fn try_get_members(
        &self,
        key: &TypeKey,
        name: &str,
        kinds: MemberKinds,
        flags: MemberFlags,
    ) -> Vec<Arc<MemberInfo>> {
        if !key.dynamic || !flags.accepts(false) {
            return Vec::new();
        }
        if kinds.contains(MemberKind::Indexer) && name == INDEXER_NAME {
            return vec![Arc::new(Self::indexer(&key.name))];
        }
        if kinds.contains(MemberKind::Property) {
            return vec![Arc::new(Self::property(&key.name, name))];
        }
        Vec::new()
    }
}

/// Converts JSON into values: objects become [`DynamicObject`]s, arrays become lists.
pub fn value_from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i32::try_from(i).map_or(Value::Long(i), Value::Int)
            } else if let Some(u) = n.as_u64() {
                Value::ULong(u)
            } else {
                Value::Double(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => Value::from(s.as_str()),
        serde_json::Value::Array(items) => Value::list(items.iter().map(value_from_json)),
        serde_json::Value::Object(map) => Value::object(DynamicObject::from_pairs(
            "DynamicObject",
            map.iter().map(|(k, v)| (k, value_from_json(v))),
        )),
    }
}

/// Converts a value back to JSON for display. Opaque objects render as their type name.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Char(c) => Json::String(c.to_string()),
        Value::Int(v) => Json::from(*v),
        Value::UInt(v) => Json::from(*v),
        Value::Long(v) => Json::from(*v),
        Value::ULong(v) => Json::from(*v),
        Value::Float(v) => Json::from(f64::from(*v)),
        Value::Double(v) => Json::from(*v),
        Value::Decimal(d) => Json::String(d.to_string()),
        Value::String(s) => Json::String(s.to_string()),
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Object(_) => {
            if let Some(obj) = value.downcast_ref::<DynamicObject>() {
                let map = read(&obj.values)
                    .iter()
                    .map(|(k, v)| (k.to_string(), value_to_json(v)))
                    .collect();
                Json::Object(map)
            } else if let Some(list) = value.downcast_ref::<ObservableList>() {
                Json::Array(list.snapshot().iter().map(value_to_json).collect())
            } else {
                Json::String(value.type_name().to_string())
            }
        }
        Value::Function(_) => Json::String("<function>".to_string()),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/members/dynamic.rs"]
mod tests;
