use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use crate::foundation::metadata::Metadata;
use crate::foundation::sync::lock;
use crate::foundation::value::Value;

/// Receives "member changed" raises.
pub trait MemberListener: Send + Sync {
    /// Returns `false` to be removed from the registry.
    fn try_handle(
        &self,
        sender: &Value,
        member: Option<&str>,
        message: &Value,
        metadata: Option<&Metadata>,
    ) -> bool;
}

struct FnListener<F>(F);

impl<F> MemberListener for FnListener<F>
where
    F: Fn(&Value, Option<&str>) + Send + Sync,
{
    fn try_handle(
        &self,
        sender: &Value,
        member: Option<&str>,
        _message: &Value,
        _metadata: Option<&Metadata>,
    ) -> bool {
        (self.0)(sender, member);
        true
    }
}

/// Closure listener receiving the sender and member name.
pub fn listener_fn<F>(f: F) -> Arc<dyn MemberListener>
where
    F: Fn(&Value, Option<&str>) + Send + Sync + 'static,
{
    Arc::new(FnListener(f))
}

#[derive(Clone)]
pub enum ListenerRef {
    Strong(Arc<dyn MemberListener>),
    /// Does not keep the listener alive; the entry dies with it.
    Weak(Weak<dyn MemberListener>),
}

impl ListenerRef {
    pub fn weak(listener: &Arc<dyn MemberListener>) -> Self {
        Self::Weak(Arc::downgrade(listener))
    }

    pub fn upgrade(&self) -> Option<Arc<dyn MemberListener>> {
        match self {
            Self::Strong(l) => Some(Arc::clone(l)),
            Self::Weak(w) => w.upgrade(),
        }
    }

    pub fn is_alive(&self) -> bool {
        match self {
            Self::Strong(_) => true,
            Self::Weak(w) => w.strong_count() > 0,
        }
    }
}

impl fmt::Debug for ListenerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strong(_) => f.write_str("Strong"),
            Self::Weak(w) => write!(f, "Weak(alive: {})", w.strong_count() > 0),
        }
    }
}

/// Runs its action once, on [`dispose`](Self::dispose) or on drop.
#[must_use = "dropping an ActionToken runs its action immediately"]
pub struct ActionToken(Option<Box<dyn FnOnce() + Send>>);

impl ActionToken {
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(action)))
    }

    pub fn noop() -> Self {
        Self(None)
    }

    pub fn dispose(mut self) {
        self.run();
    }

    /// Drops the token without running its action.
    pub fn forget(mut self) {
        self.0 = None;
    }

    fn run(&mut self) {
        if let Some(action) = self.0.take() {
            action();
        }
    }
}

impl Drop for ActionToken {
    fn drop(&mut self) {
        self.run();
    }
}

impl fmt::Debug for ActionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionToken")
            .field(&self.0.is_some())
            .finish()
    }
}

struct Entry {
    id: u64,
    listener: ListenerRef,
    filter: Option<Arc<str>>,
}

impl Entry {
    fn matches(&self, member: Option<&str>) -> bool {
        match (&self.filter, member) {
            (None, _) | (_, None) => true,
            (Some(filter), Some(member)) => &**filter == member,
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    next_id: u64,
}

/// Ordered listener list with weak entries.
///
/// Entries are kept sorted by id, so removal is a binary search. Raises snapshot the matching
/// entries under the lock and deliver outside it, so a listener may add or remove entries
/// (including itself) while being notified. An entry removed mid-raise is skipped.
#[derive(Default)]
pub struct ListenerRegistry {
    inner: Mutex<Inner>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `listener`, optionally filtered to one member name. The returned token removes it.
    pub fn add(self: &Arc<Self>, listener: ListenerRef, filter: Option<&str>) -> ActionToken {
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.entries.push(Entry {
                id,
                listener,
                filter: filter.map(Arc::from),
            });
            id
        };
        let registry = Arc::downgrade(self);
        ActionToken::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        })
    }

    fn contains(&self, id: u64) -> bool {
        lock(&self.inner)
            .entries
            .binary_search_by_key(&id, |e| e.id)
            .is_ok()
    }

    fn remove(&self, id: u64) -> bool {
        let mut inner = lock(&self.inner);
        match inner.entries.binary_search_by_key(&id, |e| e.id) {
            Ok(index) => {
                inner.entries.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    /// Delivers a change of `member` (`None` for "all members") to live matching entries.
    pub fn raise(
        &self,
        sender: &Value,
        message: &Value,
        member: Option<&str>,
        metadata: Option<&Metadata>,
    ) {
        let targets: Vec<(u64, Arc<dyn MemberListener>)> = {
            let mut inner = lock(&self.inner);
            inner.entries.retain(|e| e.listener.is_alive());
            inner
                .entries
                .iter()
                .filter(|e| e.matches(member))
                .filter_map(|e| e.listener.upgrade().map(|l| (e.id, l)))
                .collect()
        };
        let mut rejected = Vec::new();
        for (id, listener) in targets {
            // An earlier listener may have removed this entry during the same raise.
            if !self.contains(id) {
                continue;
            }
            if !listener.try_handle(sender, member, message, metadata) {
                rejected.push(id);
            }
        }
        for id in rejected {
            self.remove(id);
        }
    }

    /// Drops dead weak entries; returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut inner = lock(&self.inner);
        let before = inner.entries.len();
        inner.entries.retain(|e| e.listener.is_alive());
        before - inner.entries.len()
    }

    /// Entry count, dead weak entries included until the next raise or prune.
    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/observation/registry.rs"]
mod tests;
