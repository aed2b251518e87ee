use std::sync::Arc;

use crate::foundation::error::BindResult;
use crate::foundation::metadata::Metadata;
use crate::foundation::opts::EngineOpts;
use crate::foundation::value::Value;
use crate::members::manager::{MemberManager, TypeKey};
use crate::observation::dispatch::{DispatchingRegistry, InlineDispatcher, ThreadDispatcher};
use crate::observation::member_observer::{
    AttachedListenerStore, MemberObserver, MemberObserverProvider, MemberObserverResolver,
};
use crate::observation::path::{MemberPath, MemberPathCache};
use crate::observation::path_observer::{PathObserver, PathObserverRequest};
use crate::observation::resource::ResourceObserverCache;

/// Builds path observers and owns the caches they share.
pub struct ObservationManager {
    opts: EngineOpts,
    members: Arc<MemberManager>,
    attached: Arc<AttachedListenerStore>,
    resolver: Arc<MemberObserverResolver>,
    dispatcher: Arc<dyn ThreadDispatcher>,
    paths: MemberPathCache,
    resources: ResourceObserverCache,
}

impl ObservationManager {
    pub fn new(members: Arc<MemberManager>, opts: EngineOpts) -> Self {
        let attached = Arc::new(AttachedListenerStore::new());
        let resolver = Arc::new(MemberObserverResolver::new(&members, &attached));
        Self {
            opts,
            members,
            attached,
            resolver,
            dispatcher: Arc::new(InlineDispatcher),
            paths: MemberPathCache::new(),
            resources: ResourceObserverCache::new(),
        }
    }

    /// Delivers [`raise_member_changed`](Self::raise_member_changed) through `dispatcher`.
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn ThreadDispatcher>) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn opts(&self) -> &EngineOpts {
        &self.opts
    }

    pub fn members(&self) -> &Arc<MemberManager> {
        &self.members
    }

    pub fn attached(&self) -> &Arc<AttachedListenerStore> {
        &self.attached
    }

    pub fn paths(&self) -> &MemberPathCache {
        &self.paths
    }

    pub fn resources(&self) -> &ResourceObserverCache {
        &self.resources
    }

    /// Inserts `provider` ahead of the built-in observer providers.
    pub fn add_provider(&self, provider: Arc<dyn MemberObserverProvider>) {
        self.resolver.add_provider(provider);
    }

    pub fn try_get_member_path(&self, text: &str) -> BindResult<Arc<MemberPath>> {
        self.paths.get(text)
    }

    /// How changes of `member` on `target`'s type are observed. Empty for plain values.
    pub fn try_get_member_observer(
        &self,
        target: &Value,
        member: &str,
        metadata: Option<&Metadata>,
    ) -> MemberObserver {
        self.resolver
            .try_get_member_observer(&TypeKey::of(target), member, metadata)
    }

    /// An observer for `request.path` on `target`. Observers of a resource's `Value` are shared.
    pub fn try_get_member_path_observer(
        &self,
        target: &Value,
        request: &PathObserverRequest,
        _metadata: Option<&Metadata>,
    ) -> BindResult<PathObserver> {
        let path = self.paths.get(&request.path)?;
        let method: Option<Arc<str>> = match request.observable_method.as_deref() {
            Some(name) if self.opts.is_observable_method(name) => Some(Arc::from(name)),
            Some(name) => {
                tracing::debug!(method = name, path = %path, "observable method not allowed, ignoring");
                None
            }
            None => None,
        };
        let create = || {
            PathObserver::new(
                target,
                Arc::clone(&path),
                request,
                method.clone(),
                Arc::clone(&self.members),
                Arc::clone(&self.resolver),
            )
        };
        match ResourceObserverCache::key(target, &request.path) {
            Some(name) => Ok(self.resources.get_or_insert_with(&name, target, create)),
            None => Ok(create()),
        }
    }

    /// Notifies listeners attached to `target` out of band, for objects that raise nothing
    /// themselves. `None` raises every member.
    pub fn raise_member_changed(
        &self,
        target: &Value,
        member: Option<&str>,
        metadata: Option<&Metadata>,
    ) {
        let Some(registry) = self.attached.existing(target) else {
            return;
        };
        DispatchingRegistry::new(registry, Arc::clone(&self.dispatcher), self.opts.dispatch_mode)
            .raise(target, &Value::Null, member, metadata);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/observation/manager.rs"]
mod tests;
