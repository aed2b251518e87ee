//! Path observers: live subscriptions along a member path that heal when an intermediate value
//! changes.
//!
//! Each observed segment gets its own listener, registered weakly on the source object's
//! registry and kept alive by the observer next to the segment's token. Dropping both ends the
//! subscription, so no object in the graph is ever kept alive by an observer.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::foundation::error::{BindError, BindResult};
use crate::foundation::metadata::Metadata;
use crate::foundation::sync::lock;
use crate::foundation::value::{BindObject, Value};
use crate::members::descriptor::MemberInfo;
use crate::members::manager::{MemberManager, TypeKey};
use crate::observation::chain::{self, ChainState, SourceId};
use crate::observation::member_observer::MemberObserverResolver;
use crate::observation::path::{MemberPath, PathSegment};
use crate::observation::registry::{ActionToken, ListenerRef, MemberListener};

/// Callbacks from a [`PathObserver`]. Every method defaults to doing nothing.
pub trait PathObserverListener: Send + Sync {
    /// An intermediate value changed and the chain was rebuilt.
    fn on_path_members_changed(&self, _observer: &PathObserver) {}

    /// The value at the end of the path may have changed.
    fn on_last_member_changed(&self, _observer: &PathObserver) {}

    fn on_error(&self, _observer: &PathObserver, _error: &BindError) {}
}

/// What to observe. Built by [`new`](Self::new) and the chaining setters.
#[derive(Debug, Clone, PartialEq)]
pub struct PathObserverRequest {
    pub path: String,
    /// Null intermediates are "no value" instead of errors.
    pub optional: bool,
    /// Hold the target weakly.
    pub weak: bool,
    /// A method on the last value whose change signal also counts as a last-member change.
    pub observable_method: Option<String>,
}

impl PathObserverRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            optional: false,
            weak: false,
            observable_method: None,
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn weak(mut self, weak: bool) -> Self {
        self.weak = weak;
        self
    }

    pub fn observable_method(mut self, name: impl Into<String>) -> Self {
        self.observable_method = Some(name.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathObserverKind {
    Empty,
    Single,
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unattached,
    Attached,
    Disposed,
}

/// The member at the end of a path, bound to the object it is read from.
#[derive(Debug, Clone)]
pub enum LastMember {
    /// The path is empty: the value is the target itself.
    Target(Value),
    Available {
        source: Value,
        member: Arc<MemberInfo>,
        /// Indexer arguments, already converted.
        args: Vec<Value>,
    },
    /// An intermediate value is null or the target is gone.
    Unavailable,
}

impl LastMember {
    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }

    /// Null when unavailable.
    pub fn get_value(&self) -> BindResult<Value> {
        match self {
            Self::Target(value) => Ok(value.clone()),
            Self::Available {
                source,
                member,
                args,
            } => member.get_value(source, args),
            Self::Unavailable => Ok(Value::Null),
        }
    }

    /// Returns `false` when unavailable.
    pub fn set_value(&self, value: Value) -> BindResult<bool> {
        match self {
            Self::Target(_) => Err(BindError::evaluation("an empty path cannot be assigned")),
            Self::Available {
                source,
                member,
                args,
            } => member.set_value(source, args, value).map(|()| true),
            Self::Unavailable => Ok(false),
        }
    }
}

/// Target held strongly, or weakly when it is an object and weak mode is on.
#[derive(Clone)]
pub(crate) enum TargetRef {
    Strong(Value),
    Weak(Weak<dyn BindObject>),
}

impl TargetRef {
    pub(crate) fn new(target: &Value, weak: bool) -> Self {
        match target.as_object() {
            Some(obj) if weak => Self::Weak(Arc::downgrade(obj)),
            _ => Self::Strong(target.clone()),
        }
    }

    pub(crate) fn get(&self) -> Option<Value> {
        match self {
            Self::Strong(value) => Some(value.clone()),
            Self::Weak(obj) => obj.upgrade().map(Value::Object),
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        match self {
            Self::Strong(_) => true,
            Self::Weak(obj) => obj.strong_count() > 0,
        }
    }
}

/// Listener registered on one segment's source, or on the last value for the method hook.
struct SegmentListener {
    observer: Weak<Inner>,
    slot: Slot,
    serial: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Segment(usize),
    Method,
}

impl MemberListener for SegmentListener {
    fn try_handle(
        &self,
        _sender: &Value,
        _member: Option<&str>,
        _message: &Value,
        _metadata: Option<&Metadata>,
    ) -> bool {
        let Some(inner) = self.observer.upgrade() else {
            return false;
        };
        PathObserver(inner).on_changed(self.slot, self.serial);
        true
    }
}

/// A subscription kept alive by the observer.
struct Subscription {
    serial: u64,
    _listener: Arc<dyn MemberListener>,
    _token: Option<ActionToken>,
}

struct State {
    lifecycle: Lifecycle,
    chain: ChainState,
    segments: Vec<Option<Subscription>>,
    method: Option<Subscription>,
    next_serial: u64,
    listeners: Vec<Arc<dyn PathObserverListener>>,
}

struct Inner {
    target: TargetRef,
    path: Arc<MemberPath>,
    optional: bool,
    observable_method: Option<Arc<str>>,
    members: Arc<MemberManager>,
    resolver: Arc<MemberObserverResolver>,
    disposable: AtomicBool,
    state: Mutex<State>,
}

/// Values read along the path; `sources[k]` feeds segment `k`.
struct Walk {
    sources: Vec<Value>,
    error: Option<BindError>,
}

/// Observes a member path on a target. Cloning yields another handle to the same observer.
///
/// Adding the first listener subscribes along the path; removing the last one releases every
/// subscription. [`dispose`](Self::dispose) is terminal unless the observer is held by a cache
/// that marked it non-disposable.
#[derive(Clone)]
pub struct PathObserver(Arc<Inner>);

impl PathObserver {
    pub(crate) fn new(
        target: &Value,
        path: Arc<MemberPath>,
        request: &PathObserverRequest,
        observable_method: Option<Arc<str>>,
        members: Arc<MemberManager>,
        resolver: Arc<MemberObserverResolver>,
    ) -> Self {
        let len = path.len();
        Self(Arc::new(Inner {
            target: TargetRef::new(target, request.weak),
            path,
            optional: request.optional,
            observable_method,
            members,
            resolver,
            disposable: AtomicBool::new(true),
            state: Mutex::new(State {
                lifecycle: Lifecycle::Unattached,
                chain: ChainState::new(len),
                segments: (0..len).map(|_| None).collect(),
                method: None,
                next_serial: 0,
                listeners: Vec::new(),
            }),
        }))
    }

    pub fn kind(&self) -> PathObserverKind {
        match self.0.path.len() {
            0 => PathObserverKind::Empty,
            1 => PathObserverKind::Single,
            _ => PathObserverKind::Multi,
        }
    }

    pub fn path(&self) -> &Arc<MemberPath> {
        &self.0.path
    }

    /// The target, unless it was weakly held and has been dropped.
    pub fn target(&self) -> Option<Value> {
        self.0.target.get()
    }

    pub fn is_alive(&self) -> bool {
        self.0.target.is_alive() && self.lifecycle() != Lifecycle::Disposed
    }

    pub fn is_optional(&self) -> bool {
        self.0.optional
    }

    pub fn observable_method(&self) -> Option<&str> {
        self.0.observable_method.as_deref()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        lock(&self.0.state).lifecycle
    }

    pub fn is_disposable(&self) -> bool {
        self.0.disposable.load(Ordering::Acquire)
    }

    pub(crate) fn set_disposable(&self, disposable: bool) {
        self.0.disposable.store(disposable, Ordering::Release);
    }

    /// Both handles refer to the same observer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of segments currently holding a subscription.
    pub fn subscribed_segments(&self) -> usize {
        lock(&self.0.state).chain.subscribed()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.0.state).listeners.len()
    }

    /// Registers `listener`; the first one attaches the observer. Returns `false` once disposed.
    pub fn add_listener(&self, listener: Arc<dyn PathObserverListener>) -> bool {
        let attach = {
            let mut state = lock(&self.0.state);
            if state.lifecycle == Lifecycle::Disposed {
                return false;
            }
            state.listeners.push(listener);
            state.lifecycle == Lifecycle::Unattached
        };
        if attach {
            self.attach();
        }
        true
    }

    /// Removes `listener`; removing the last one detaches the observer.
    pub fn remove_listener(&self, listener: &Arc<dyn PathObserverListener>) -> bool {
        let released = {
            let mut state = lock(&self.0.state);
            let Some(index) = state.listeners.iter().position(|l| Arc::ptr_eq(l, listener)) else {
                return false;
            };
            state.listeners.remove(index);
            if state.listeners.is_empty() && state.lifecycle == Lifecycle::Attached {
                state.lifecycle = Lifecycle::Unattached;
                Some(Self::release_all(&mut state))
            } else {
                None
            }
        };
        // Tokens run their unsubscribe outside the lock.
        drop(released);
        true
    }

    /// Releases every subscription and listener. Ignored while non-disposable.
    pub fn dispose(&self) -> bool {
        if !self.is_disposable() {
            return false;
        }
        let released = {
            let mut state = lock(&self.0.state);
            if state.lifecycle == Lifecycle::Disposed {
                return false;
            }
            state.lifecycle = Lifecycle::Disposed;
            let listeners = std::mem::take(&mut state.listeners);
            (Self::release_all(&mut state), listeners)
        };
        drop(released);
        true
    }

    fn release_all(state: &mut State) -> (Vec<Subscription>, Option<Subscription>) {
        state.chain = ChainState::new(state.segments.len());
        let segments = state.segments.iter_mut().filter_map(Option::take).collect();
        (segments, state.method.take())
    }

    /// Members resolved along the path, stopping at the first unavailable value.
    pub fn get_members(&self) -> BindResult<Vec<Arc<MemberInfo>>> {
        let Some(target) = self.target() else {
            return Ok(Vec::new());
        };
        let walk = self.walk(&target);
        if let Some(error) = walk.error {
            return Err(error);
        }
        let segments = self.0.path.segments();
        walk.sources
            .iter()
            .zip(segments)
            .map(|(source, segment)| self.resolve(source, segment).map(|(member, _)| member))
            .collect()
    }

    pub fn get_last_member(&self) -> BindResult<LastMember> {
        let Some(target) = self.target() else {
            return Ok(LastMember::Unavailable);
        };
        let Some(last) = self.0.path.last() else {
            return Ok(LastMember::Target(target));
        };
        let walk = self.walk(&target);
        if let Some(error) = walk.error {
            return Err(error);
        }
        if walk.sources.len() < self.0.path.len() {
            return Ok(LastMember::Unavailable);
        }
        let Some(source) = walk.sources.last() else {
            return Ok(LastMember::Unavailable);
        };
        let (member, args) = self.resolve(source, last)?;
        Ok(LastMember::Available {
            source: source.clone(),
            member,
            args,
        })
    }

    /// Current value at the end of the path; null when unavailable.
    pub fn get_value(&self) -> BindResult<Value> {
        self.get_last_member()?.get_value()
    }

    fn resolve(
        &self,
        source: &Value,
        segment: &PathSegment,
    ) -> BindResult<(Arc<MemberInfo>, Vec<Value>)> {
        match segment {
            PathSegment::Member(name) => self
                .0
                .members
                .value_member(source, name)
                .map(|member| (member, Vec::new())),
            PathSegment::Index(args) => self.0.members.indexer(source, args),
        }
    }

    fn read(&self, source: &Value, segment: &PathSegment) -> BindResult<Value> {
        match segment {
            PathSegment::Member(name) => self.0.members.get_value(source, name),
            PathSegment::Index(args) => self.0.members.get_index(source, args),
        }
    }

    /// Reads every intermediate value, stopping at the first null or failure.
    fn walk(&self, target: &Value) -> Walk {
        let segments = self.0.path.segments();
        let mut sources = Vec::with_capacity(segments.len());
        if target.is_null() {
            return Walk {
                sources,
                error: None,
            };
        }
        sources.push(target.clone());
        for (index, segment) in segments.iter().enumerate().take(segments.len().saturating_sub(1)) {
            let value = match self.read(&sources[index], segment) {
                Ok(value) => value,
                Err(error) => {
                    return Walk {
                        sources,
                        error: Some(error),
                    };
                }
            };
            if value.is_null() {
                let error = (!self.0.optional).then(|| {
                    BindError::null_reference(format!(
                        "'{segment}' is null in path '{}'",
                        self.0.path
                    ))
                });
                return Walk { sources, error };
            }
            sources.push(value);
        }
        Walk {
            sources,
            error: None,
        }
    }

    /// The value the observable method hangs off: the target itself for an empty path.
    fn last_value(&self, walk: &Walk) -> Option<Value> {
        match self.0.path.last() {
            None => walk.sources.first().cloned(),
            Some(last) if walk.sources.len() == self.0.path.len() => {
                let source = walk.sources.last()?;
                self.read(source, last).ok().filter(|v| !v.is_null())
            }
            Some(_) => None,
        }
    }

    fn subscribe(&self, state: &mut State, slot: Slot, source: &Value, member: &str) -> Subscription {
        state.next_serial += 1;
        let serial = state.next_serial;
        let listener: Arc<dyn MemberListener> = Arc::new(SegmentListener {
            observer: Arc::downgrade(&self.0),
            slot,
            serial,
        });
        let observer = self
            .0
            .resolver
            .try_get_member_observer(&TypeKey::of(source), member, None);
        let token = observer.try_observe(source, ListenerRef::weak(&listener), None);
        Subscription {
            serial,
            _listener: listener,
            _token: token,
        }
    }

    /// Re-roots the chain at segment `from` and refreshes the method hook. Returns what was
    /// released so the caller can drop it outside the lock.
    fn rebuild(&self, state: &mut State, from: usize, walk: &Walk) -> Vec<Subscription> {
        let ids: Vec<Option<SourceId>> = walk
            .sources
            .iter()
            .skip(from)
            .map(SourceId::of)
            .collect();
        let (next, diff) = chain::rebuild(&state.chain, from, &ids);
        tracing::trace!(
            path = %self.0.path,
            from,
            released = diff.release.len(),
            subscribed = diff.subscribe.len(),
            "path chain rebuilt"
        );
        let mut released: Vec<Subscription> = diff
            .release
            .iter()
            .filter_map(|&i| state.segments[i].take())
            .collect();
        let segments = self.0.path.segments();
        for &i in &diff.subscribe {
            let subscription =
                self.subscribe(state, Slot::Segment(i), &walk.sources[i], segments[i].notification_name());
            state.segments[i] = Some(subscription);
        }
        state.chain = next;

        if let Some(method) = self.0.observable_method.clone() {
            released.extend(state.method.take());
            if let Some(value) = self.last_value(walk) {
                let subscription = self.subscribe(state, Slot::Method, &value, &method);
                state.method = Some(subscription);
            }
        }
        released
    }

    fn attach(&self) {
        let target = self.target();
        let (released, error, listeners) = {
            let mut state = lock(&self.0.state);
            if state.lifecycle != Lifecycle::Unattached {
                return;
            }
            state.lifecycle = Lifecycle::Attached;
            let walk = match &target {
                Some(target) => self.walk(target),
                None => Walk {
                    sources: Vec::new(),
                    error: None,
                },
            };
            let released = self.rebuild(&mut state, 0, &walk);
            (released, walk.error, state.listeners.clone())
        };
        drop(released);
        if let Some(error) = error {
            for listener in &listeners {
                listener.on_error(self, &error);
            }
        }
    }

    fn on_changed(&self, slot: Slot, serial: u64) {
        if !self.0.target.is_alive() {
            return;
        }
        let terminal = match slot {
            Slot::Method => true,
            Slot::Segment(i) => i + 1 == self.0.path.len(),
        };
        let (released, rebuilt, listeners) = {
            let mut state = lock(&self.0.state);
            if state.lifecycle != Lifecycle::Attached {
                return;
            }
            let current = match slot {
                Slot::Segment(i) => state.segments.get(i).and_then(Option::as_ref),
                Slot::Method => state.method.as_ref(),
            };
            // A raise already in flight when the subscription was replaced.
            if current.is_none_or(|s| s.serial != serial) {
                return;
            }
            let listeners = state.listeners.clone();
            let from = match slot {
                Slot::Segment(i) if !terminal => Some(i + 1),
                // The last value may be another object now, so the method hook moves with it.
                Slot::Segment(_) if self.0.observable_method.is_some() => Some(self.0.path.len()),
                _ => None,
            };
            match (from, self.target()) {
                (Some(from), Some(target)) => {
                    let walk = self.walk(&target);
                    let released = self.rebuild(&mut state, from, &walk);
                    let rebuilt = (!terminal).then_some(walk.error);
                    (released, rebuilt, listeners)
                }
                (Some(_), None) => return,
                (None, _) => (Vec::new(), None, listeners),
            }
        };
        drop(released);
        match rebuilt {
            Some(Some(error)) => {
                for listener in &listeners {
                    listener.on_path_members_changed(self);
                }
                for listener in &listeners {
                    listener.on_error(self, &error);
                }
            }
            Some(None) => {
                for listener in &listeners {
                    listener.on_path_members_changed(self);
                }
                for listener in &listeners {
                    listener.on_last_member_changed(self);
                }
            }
            None => {
                for listener in &listeners {
                    listener.on_last_member_changed(self);
                }
            }
        }
    }
}

impl fmt::Debug for PathObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathObserver")
            .field("path", &self.0.path.text())
            .field("kind", &self.kind())
            .field("lifecycle", &self.lifecycle())
            .field("alive", &self.0.target.is_alive())
            .field("disposable", &self.is_disposable())
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/observation/path_observer.rs"]
mod tests;
