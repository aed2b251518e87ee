//! Change-notification lookup for one member of one type.
//!
//! A [`MemberObserver`] is resolved once per (type, member) and reused for every instance:
//! its handler receives the concrete target when a path observer subscribes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, Weak};

use crate::foundation::metadata::Metadata;
use crate::foundation::sync::{lock, read, write};
use crate::foundation::value::{BindObject, Value};
use crate::members::descriptor::{
    ChangeSignal, INDEXER_CHANGED, INDEXER_NAME, MemberFlags, MemberInfo, MemberKinds,
};
use crate::members::manager::{MemberManager, TypeKey};
use crate::observation::registry::{ActionToken, ListenerRef, ListenerRegistry};

/// Subscribes a listener on a concrete target.
pub trait ObserveHandler: Send + Sync {
    /// `state` is the key the provider resolved, such as the member or event name. Returns
    /// `None` when this target offers nothing to subscribe to.
    fn observe(
        &self,
        target: &Value,
        state: &str,
        listener: ListenerRef,
        metadata: Option<&Metadata>,
    ) -> Option<ActionToken>;
}

/// A handler and its state. Empty means the member cannot be observed, which is not an error.
#[derive(Clone)]
pub struct MemberObserver {
    handler: Option<Arc<dyn ObserveHandler>>,
    state: Arc<str>,
}

impl MemberObserver {
    pub fn new(handler: Arc<dyn ObserveHandler>, state: &str) -> Self {
        Self {
            handler: Some(handler),
            state: Arc::from(state),
        }
    }

    pub fn empty() -> Self {
        Self {
            handler: None,
            state: Arc::from(""),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.handler.is_none()
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn try_observe(
        &self,
        target: &Value,
        listener: ListenerRef,
        metadata: Option<&Metadata>,
    ) -> Option<ActionToken> {
        self.handler
            .as_ref()?
            .observe(target, &self.state, listener, metadata)
    }
}

impl fmt::Debug for MemberObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberObserver")
            .field("empty", &self.is_empty())
            .field("state", &self.state)
            .finish()
    }
}

pub trait MemberObserverProvider: Send + Sync {
    /// `member` is a notification name: a member name, or `Item[]` for indexers.
    fn try_get_member_observer(
        &self,
        key: &TypeKey,
        member: &str,
        metadata: Option<&Metadata>,
    ) -> MemberObserver;
}

/// The member a notification name refers to.
fn notifying_member(
    members: &MemberManager,
    key: &TypeKey,
    member: &str,
    metadata: Option<&Metadata>,
) -> Option<Arc<MemberInfo>> {
    let (name, kinds) = if member == INDEXER_CHANGED {
        (INDEXER_NAME, MemberKinds::INDEXER)
    } else {
        (
            member,
            MemberKinds::VALUE | MemberKinds::METHOD | MemberKinds::EVENT,
        )
    };
    members.try_get_member(key, name, kinds, MemberFlags::INSTANCE, metadata)
}

struct PropertyChangedHandler;

impl ObserveHandler for PropertyChangedHandler {
    fn observe(
        &self,
        target: &Value,
        state: &str,
        listener: ListenerRef,
        _metadata: Option<&Metadata>,
    ) -> Option<ActionToken> {
        let registry = target.as_object()?.property_changed()?;
        Some(registry.add(listener, Some(state)))
    }
}

/// Members raised by name on the object's property-changed registry.
pub struct PropertyChangedObserverProvider {
    members: Arc<MemberManager>,
    handler: Arc<dyn ObserveHandler>,
}

impl PropertyChangedObserverProvider {
    pub fn new(members: Arc<MemberManager>) -> Self {
        Self {
            members,
            handler: Arc::new(PropertyChangedHandler),
        }
    }
}

impl MemberObserverProvider for PropertyChangedObserverProvider {
    fn try_get_member_observer(
        &self,
        key: &TypeKey,
        member: &str,
        metadata: Option<&Metadata>,
    ) -> MemberObserver {
        if !key.notifies {
            return MemberObserver::empty();
        }
        match notifying_member(&self.members, key, member, metadata) {
            Some(info) if info.change == ChangeSignal::PropertyChanged => {
                MemberObserver::new(Arc::clone(&self.handler), info.notification_name())
            }
            _ => MemberObserver::empty(),
        }
    }
}

struct EventHandler;

impl ObserveHandler for EventHandler {
    fn observe(
        &self,
        target: &Value,
        state: &str,
        listener: ListenerRef,
        _metadata: Option<&Metadata>,
    ) -> Option<ActionToken> {
        let registry = target.as_object()?.event(state)?;
        Some(registry.add(listener, None))
    }
}

/// Members whose changes are signalled by a named event.
pub struct EventObserverProvider {
    members: Arc<MemberManager>,
    handler: Arc<dyn ObserveHandler>,
}

impl EventObserverProvider {
    pub fn new(members: Arc<MemberManager>) -> Self {
        Self {
            members,
            handler: Arc::new(EventHandler),
        }
    }
}

impl MemberObserverProvider for EventObserverProvider {
    fn try_get_member_observer(
        &self,
        key: &TypeKey,
        member: &str,
        metadata: Option<&Metadata>,
    ) -> MemberObserver {
        if !key.object {
            return MemberObserver::empty();
        }
        match notifying_member(&self.members, key, member, metadata) {
            Some(info) => match &info.change {
                ChangeSignal::Event(event) => MemberObserver::new(Arc::clone(&self.handler), event),
                _ => MemberObserver::empty(),
            },
            None => MemberObserver::empty(),
        }
    }
}

struct Attached {
    owner: Weak<dyn BindObject>,
    registry: Arc<ListenerRegistry>,
}

impl Attached {
    fn is_owned_by(&self, obj: &Arc<dyn BindObject>) -> bool {
        self.owner.strong_count() > 0 && Weak::ptr_eq(&self.owner, &Arc::downgrade(obj))
    }
}

/// Out-of-band listener lists for objects that raise nothing themselves.
///
/// Entries are keyed by object identity and hold the object weakly; entries of dropped objects
/// are swept whenever a new one is created, or by [`prune`](Self::prune).
#[derive(Default)]
pub struct AttachedListenerStore {
    entries: Mutex<HashMap<usize, Attached>>,
}

impl AttachedListenerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self, target: &Value, create: bool) -> Option<Arc<ListenerRegistry>> {
        let obj = target.as_object()?;
        let id = target.object_id()?;
        let mut entries = lock(&self.entries);
        if let Some(entry) = entries.get(&id).filter(|e| e.is_owned_by(obj)) {
            return Some(Arc::clone(&entry.registry));
        }
        if !create {
            return None;
        }
        entries.retain(|_, e| e.owner.strong_count() > 0);
        let registry = Arc::new(ListenerRegistry::new());
        entries.insert(
            id,
            Attached {
                owner: Arc::downgrade(obj),
                registry: Arc::clone(&registry),
            },
        );
        Some(registry)
    }

    pub fn add(&self, target: &Value, member: &str, listener: ListenerRef) -> Option<ActionToken> {
        let registry = self.registry(target, true)?;
        Some(registry.add(listener, Some(member)))
    }

    /// The registry attached to `target`, if anything was ever attached.
    pub fn existing(&self, target: &Value) -> Option<Arc<ListenerRegistry>> {
        self.registry(target, false)
    }

    /// Raises `member` (`None` for every member) to listeners attached to `target`.
    pub fn raise(&self, target: &Value, member: Option<&str>, metadata: Option<&Metadata>) -> bool {
        match self.existing(target) {
            Some(registry) => {
                registry.raise(target, &Value::Null, member, metadata);
                true
            }
            None => false,
        }
    }

    /// Drops entries of dead objects; returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|_, e| e.owner.strong_count() > 0);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct AttachedHandler {
    store: Weak<AttachedListenerStore>,
}

impl ObserveHandler for AttachedHandler {
    fn observe(
        &self,
        target: &Value,
        state: &str,
        listener: ListenerRef,
        _metadata: Option<&Metadata>,
    ) -> Option<ActionToken> {
        self.store.upgrade()?.add(target, state, listener)
    }
}

/// Fallback for any object member: listeners wait on [`AttachedListenerStore`] raises.
pub struct AttachedObserverProvider {
    handler: Arc<dyn ObserveHandler>,
}

impl AttachedObserverProvider {
    pub fn new(store: &Arc<AttachedListenerStore>) -> Self {
        Self {
            handler: Arc::new(AttachedHandler {
                store: Arc::downgrade(store),
            }),
        }
    }
}

impl MemberObserverProvider for AttachedObserverProvider {
    fn try_get_member_observer(
        &self,
        key: &TypeKey,
        member: &str,
        _metadata: Option<&Metadata>,
    ) -> MemberObserver {
        if !key.object {
            return MemberObserver::empty();
        }
        MemberObserver::new(Arc::clone(&self.handler), member)
    }
}

/// Asks providers in order and caches the first non-empty answer per (type, member).
pub struct MemberObserverResolver {
    providers: RwLock<Vec<Arc<dyn MemberObserverProvider>>>,
    cache: Mutex<HashMap<(TypeKey, Arc<str>), MemberObserver>>,
}

impl MemberObserverResolver {
    /// Event, property-changed, then attached.
    pub fn new(members: &Arc<MemberManager>, attached: &Arc<AttachedListenerStore>) -> Self {
        Self::with_providers(vec![
            Arc::new(EventObserverProvider::new(Arc::clone(members))),
            Arc::new(PropertyChangedObserverProvider::new(Arc::clone(members))),
            Arc::new(AttachedObserverProvider::new(attached)),
        ])
    }

    pub fn with_providers(providers: Vec<Arc<dyn MemberObserverProvider>>) -> Self {
        Self {
            providers: RwLock::new(providers),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts `provider` ahead of the others.
    pub fn add_provider(&self, provider: Arc<dyn MemberObserverProvider>) {
        write(&self.providers).insert(0, provider);
        lock(&self.cache).clear();
    }

    pub fn try_get_member_observer(
        &self,
        key: &TypeKey,
        member: &str,
        metadata: Option<&Metadata>,
    ) -> MemberObserver {
        let cache_key = (key.clone(), Arc::from(member));
        if let Some(hit) = lock(&self.cache).get(&cache_key) {
            return hit.clone();
        }
        let observer = read(&self.providers)
            .iter()
            .map(|p| p.try_get_member_observer(key, member, metadata))
            .find(|o| !o.is_empty())
            .unwrap_or_else(MemberObserver::empty);
        lock(&self.cache).insert(cache_key, observer.clone());
        observer
    }
}

#[cfg(test)]
#[path = "../../tests/unit/observation/member_observer.rs"]
mod tests;
