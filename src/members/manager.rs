use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::foundation::error::{BindError, BindResult};
use crate::foundation::metadata::Metadata;
use crate::foundation::sync::{read, write};
use crate::foundation::value::{Value, ValueKind};
use crate::members::builtins::{self, UniversalMembers};
use crate::members::descriptor::{INDEXER_NAME, MemberFlags, MemberInfo, MemberKinds, TypeDescriptor};
use crate::members::dynamic::DynamicMembers;

/// Identity of a member-bearing type as the resolver sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeKey {
    pub name: Arc<str>,
    /// Members are answered at run time by the object itself.
    pub dynamic: bool,
    /// The object exposes a property-changed registry.
    pub notifies: bool,
    /// Instances are [`BindObject`](crate::foundation::value::BindObject)s rather than plain values.
    pub object: bool,
}

impl TypeKey {
    pub fn of(value: &Value) -> Self {
        match value.as_object() {
            Some(obj) => Self {
                name: Arc::from(obj.type_name()),
                dynamic: obj.is_dynamic(),
                notifies: obj.property_changed().is_some(),
                object: true,
            },
            None => Self::named(value.type_name()),
        }
    }

    /// A static type or a non-object value kind.
    pub fn named(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            dynamic: false,
            notifies: false,
            object: false,
        }
    }
}

pub trait MemberProvider: Send + Sync {
    fn try_get_members(
        &self,
        key: &TypeKey,
        name: &str,
        kinds: MemberKinds,
        flags: MemberFlags,
    ) -> Vec<Arc<MemberInfo>>;

    /// Whether `name` is a type with static members.
    fn has_static_type(&self, _name: &str) -> bool {
        false
    }
}

/// Provider over explicitly registered [`TypeDescriptor`]s.
#[derive(Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<Arc<str>, TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type, merging its members into any earlier registration of the same name.
    pub fn register(&self, descriptor: TypeDescriptor) {
        let mut types = write(&self.types);
        match types.get_mut(&descriptor.name) {
            Some(existing) => existing.members.extend(descriptor.members),
            None => {
                types.insert(Arc::clone(&descriptor.name), descriptor);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        read(&self.types).contains_key(name)
    }
}

impl MemberProvider for TypeRegistry {
    fn try_get_members(
        &self,
        key: &TypeKey,
        name: &str,
        kinds: MemberKinds,
        flags: MemberFlags,
    ) -> Vec<Arc<MemberInfo>> {
        let types = read(&self.types);
        let Some(descriptor) = types.get(&key.name) else {
            return Vec::new();
        };
        descriptor
            .members
            .iter()
            .filter(|m| &*m.name == name && kinds.contains(m.kind) && flags.accepts(m.is_static))
            .cloned()
            .collect()
    }

    fn has_static_type(&self, name: &str) -> bool {
        read(&self.types)
            .get(name)
            .is_some_and(TypeDescriptor::has_static_members)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    key: TypeKey,
    name: Arc<str>,
    kinds: MemberKinds,
    flags: MemberFlags,
}

/// Member resolution service.
///
/// Providers are asked in order and the first non-empty answer wins. Answers are cached per
/// (type, name, kinds, flags); registering a type or provider clears the cache.
pub struct MemberManager {
    registry: Arc<TypeRegistry>,
    providers: RwLock<Vec<Arc<dyn MemberProvider>>>,
    cache: RwLock<HashMap<CacheKey, Arc<[Arc<MemberInfo>]>>>,
}

impl Default for MemberManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemberManager {
    /// A manager with the registry (pre-loaded with the built-in types), the universal members
    /// and the dynamic-object provider.
    pub fn new() -> Self {
        let registry = Arc::new(TypeRegistry::new());
        builtins::register(&registry);
        Self {
            providers: RwLock::new(vec![
                Arc::clone(&registry) as Arc<dyn MemberProvider>,
                Arc::new(DynamicMembers),
                Arc::new(UniversalMembers),
            ]),
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn register_type(&self, descriptor: TypeDescriptor) {
        self.registry.register(descriptor);
        write(&self.cache).clear();
    }

    /// Inserts `provider` ahead of the built-in ones.
    pub fn add_provider(&self, provider: Arc<dyn MemberProvider>) {
        write(&self.providers).insert(0, provider);
        write(&self.cache).clear();
    }

    pub fn has_static_type(&self, name: &str) -> bool {
        read(&self.providers)
            .iter()
            .any(|p| p.has_static_type(name))
    }

    /// Whether `name` names a value kind or a registered type.
    pub fn knows_type(&self, name: &str) -> bool {
        ValueKind::from_name(name).is_some() || self.registry.contains(name)
    }

    /// Every member matching the lookup. Resolution does not depend on `metadata`, so answers are
    /// shared across callers.
    pub fn try_get_members(
        &self,
        key: &TypeKey,
        name: &str,
        kinds: MemberKinds,
        flags: MemberFlags,
        _metadata: Option<&Metadata>,
    ) -> Arc<[Arc<MemberInfo>]> {
        let cache_key = CacheKey {
            key: key.clone(),
            name: Arc::from(name),
            kinds,
            flags,
        };
        if let Some(hit) = read(&self.cache).get(&cache_key) {
            return Arc::clone(hit);
        }
        let found: Arc<[Arc<MemberInfo>]> = read(&self.providers)
            .iter()
            .map(|p| p.try_get_members(key, name, kinds, flags))
            .find(|members| !members.is_empty())
            .unwrap_or_default()
            .into();
        write(&self.cache).insert(cache_key, Arc::clone(&found));
        found
    }

    pub fn try_get_member(
        &self,
        key: &TypeKey,
        name: &str,
        kinds: MemberKinds,
        flags: MemberFlags,
        metadata: Option<&Metadata>,
    ) -> Option<Arc<MemberInfo>> {
        self.try_get_members(key, name, kinds, flags, metadata)
            .first()
            .cloned()
    }

    /// Picks the overload with the cheapest implicit conversions; ties go to the first.
    pub fn resolve_overload(
        members: &[Arc<MemberInfo>],
        args: &[Value],
    ) -> Option<(Arc<MemberInfo>, Vec<Value>)> {
        let mut best: Option<(u32, &Arc<MemberInfo>, Vec<Value>)> = None;
        for member in members {
            if let Some((cost, converted)) = member.parameters.bind(args) {
                if best.as_ref().is_none_or(|(c, _, _)| cost < *c) {
                    best = Some((cost, member, converted));
                }
            }
        }
        best.map(|(_, m, args)| (Arc::clone(m), args))
    }

    fn receiver<'a>(target: &'a Value, member: &str) -> BindResult<&'a Value> {
        if target.is_null() {
            return Err(BindError::null_reference(format!(
                "cannot access '{member}' on null"
            )));
        }
        Ok(target)
    }

    /// The property or field `name` on `target`'s type.
    pub fn value_member(&self, target: &Value, name: &str) -> BindResult<Arc<MemberInfo>> {
        let key = TypeKey::of(target);
        self.try_get_member(&key, name, MemberKinds::VALUE, MemberFlags::INSTANCE, None)
            .ok_or_else(|| BindError::member_not_found(key.name.as_ref(), name))
    }

    /// Reads a property or field.
    pub fn get_value(&self, target: &Value, name: &str) -> BindResult<Value> {
        let target = Self::receiver(target, name)?;
        self.value_member(target, name)?.get_value(target, &[])
    }

    pub fn set_value(&self, target: &Value, name: &str, value: Value) -> BindResult<()> {
        let target = Self::receiver(target, name)?;
        self.value_member(target, name)?.set_value(target, &[], value)
    }

    /// The indexer overload accepting `args`, with the arguments converted.
    pub(crate) fn indexer(
        &self,
        target: &Value,
        args: &[Value],
    ) -> BindResult<(Arc<MemberInfo>, Vec<Value>)> {
        let target = Self::receiver(target, INDEXER_NAME)?;
        let key = TypeKey::of(target);
        let members = self.try_get_members(
            &key,
            INDEXER_NAME,
            MemberKinds::INDEXER,
            MemberFlags::INSTANCE,
            None,
        );
        if members.is_empty() {
            return Err(BindError::member_not_found(key.name.as_ref(), "[]"));
        }
        Self::resolve_overload(&members, args).ok_or_else(|| {
            BindError::evaluation(format!(
                "no indexer on {} accepts ({})",
                key.name,
                describe_args(args)
            ))
        })
    }

    pub fn get_index(&self, target: &Value, args: &[Value]) -> BindResult<Value> {
        let (member, args) = self.indexer(target, args)?;
        member.get_value(target, &args)
    }

    pub fn set_index(&self, target: &Value, args: &[Value], value: Value) -> BindResult<()> {
        let (member, args) = self.indexer(target, args)?;
        member.set_value(target, &args, value)
    }

    /// Invokes an instance method, picking the overload that accepts `args`.
    pub fn invoke(&self, target: &Value, name: &str, args: &[Value]) -> BindResult<Value> {
        let target = Self::receiver(target, name)?;
        let key = TypeKey::of(target);
        let members = self.try_get_members(&key, name, MemberKinds::METHOD, MemberFlags::INSTANCE, None);
        if members.is_empty() {
            return Err(BindError::member_not_found(key.name.as_ref(), name));
        }
        let (member, args) = Self::resolve_overload(&members, args).ok_or_else(|| {
            BindError::evaluation(format!(
                "no overload of {}.{name} accepts ({})",
                key.name,
                describe_args(args)
            ))
        })?;
        member.get_value(target, &args)
    }
}

fn describe_args(args: &[Value]) -> String {
    args.iter()
        .map(Value::type_name)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[path = "../../tests/unit/members/manager.rs"]
mod tests;
