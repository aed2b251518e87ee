use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::foundation::sync::lock;
use crate::foundation::value::Value;
use crate::members::dynamic::DynamicResource;
use crate::observation::path_observer::PathObserver;

/// Shares one `Value` observer per named [`DynamicResource`].
///
/// Cached observers are non-disposable so one binding cannot tear down another's observer;
/// invalidating an entry makes its observer disposable again and evicts it.
#[derive(Debug, Default)]
pub struct ResourceObserverCache {
    observers: Mutex<HashMap<Arc<str>, PathObserver>>,
}

impl ResourceObserverCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The resource name when `target` is a resource and `path` reads its value.
    pub fn key(target: &Value, path: &str) -> Option<Arc<str>> {
        if path.trim() != "Value" {
            return None;
        }
        target
            .downcast_ref::<DynamicResource>()
            .map(|r| Arc::clone(r.name()))
    }

    /// The cached observer for `name`, or the one `create` builds. An entry observing a
    /// different or dropped resource of the same name is replaced.
    pub fn get_or_insert_with(
        &self,
        name: &Arc<str>,
        target: &Value,
        create: impl FnOnce() -> PathObserver,
    ) -> PathObserver {
        let mut observers = lock(&self.observers);
        if let Some(cached) = observers.get(name) {
            let same = cached.target().is_some_and(|t| t.object_id() == target.object_id());
            if same && cached.is_alive() {
                return cached.clone();
            }
            tracing::debug!(resource = %name, "replacing stale resource observer");
            cached.set_disposable(true);
        }
        let observer = create();
        observer.set_disposable(false);
        observers.insert(Arc::clone(name), observer.clone());
        observer
    }

    /// Evicts `name`, making its observer disposable again.
    pub fn invalidate(&self, name: &str) -> bool {
        let removed = lock(&self.observers).remove(name);
        match removed {
            Some(observer) => {
                observer.set_disposable(true);
                tracing::debug!(resource = name, "resource observer invalidated");
                true
            }
            None => false,
        }
    }

    /// Evicts every entry; returns how many there were.
    pub fn invalidate_all(&self) -> usize {
        let drained: Vec<PathObserver> = lock(&self.observers).drain().map(|(_, o)| o).collect();
        for observer in &drained {
            observer.set_disposable(true);
        }
        tracing::debug!(count = drained.len(), "resource observers invalidated");
        drained.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.observers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/observation/resource.rs"]
mod tests;
