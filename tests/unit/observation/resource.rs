use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::foundation::opts::EngineOpts;
use crate::members::dynamic::DynamicObject;
use crate::members::manager::MemberManager;
use crate::observation::manager::ObservationManager;
use crate::observation::path_observer::{PathObserverListener, PathObserverRequest};

#[derive(Default)]
struct Counter(AtomicUsize);

impl PathObserverListener for Counter {
    fn on_last_member_changed(&self, _observer: &PathObserver) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn manager() -> ObservationManager {
    ObservationManager::new(Arc::new(MemberManager::new()), EngineOpts::default())
}

fn value_observer(m: &ObservationManager, target: &Value) -> PathObserver {
    m.try_get_member_path_observer(target, &PathObserverRequest::new("Value"), None)
        .unwrap()
}

#[test]
fn keys_only_resource_values() {
    let resource = Value::object(DynamicResource::new("Accent", "red"));
    assert_eq!(ResourceObserverCache::key(&resource, "Value").as_deref(), Some("Accent"));
    assert_eq!(ResourceObserverCache::key(&resource, " Value ").as_deref(), Some("Accent"));
    assert!(ResourceObserverCache::key(&resource, "Value.Length").is_none());
    let plain = Value::object(DynamicObject::new("Resource"));
    assert!(ResourceObserverCache::key(&plain, "Value").is_none());
}

#[test]
fn one_observer_per_resource() {
    let m = manager();
    let resource = DynamicResource::new("Accent", "red");
    let target = Value::object(Arc::clone(&resource));
    let first = value_observer(&m, &target);
    let second = value_observer(&m, &target);
    assert!(first.ptr_eq(&second));
    assert!(!first.is_disposable());
    assert_eq!(m.resources().len(), 1);

    let a = Arc::new(Counter::default());
    let b = Arc::new(Counter::default());
    first.add_listener(Arc::clone(&a) as Arc<dyn PathObserverListener>);
    second.add_listener(Arc::clone(&b) as Arc<dyn PathObserverListener>);
    resource.set_value("blue");
    assert_eq!(a.0.load(Ordering::SeqCst), 1);
    assert_eq!(b.0.load(Ordering::SeqCst), 1);
}

#[test]
fn cached_observers_survive_dispose() {
    let m = manager();
    let resource = DynamicResource::new("Accent", "red");
    let target = Value::object(Arc::clone(&resource));
    let observer = value_observer(&m, &target);
    let counter = Arc::new(Counter::default());
    observer.add_listener(Arc::clone(&counter) as Arc<dyn PathObserverListener>);

    assert!(!observer.dispose());
    resource.set_value("blue");
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
}

#[test]
fn invalidate_makes_observers_disposable() {
    let m = manager();
    let target = Value::object(DynamicResource::new("Accent", "red"));
    let observer = value_observer(&m, &target);
    assert!(m.resources().invalidate("Accent"));
    assert!(!m.resources().invalidate("Accent"));
    assert!(m.resources().is_empty());
    assert!(observer.is_disposable());
    assert!(observer.dispose());

    let fresh = value_observer(&m, &target);
    assert!(!fresh.ptr_eq(&observer));
}

#[test]
fn same_name_on_another_resource_replaces_the_entry() {
    let m = manager();
    let old = Value::object(DynamicResource::new("Accent", "red"));
    let old_observer = value_observer(&m, &old);
    let new = Value::object(DynamicResource::new("Accent", "green"));
    let new_observer = value_observer(&m, &new);
    assert!(!new_observer.ptr_eq(&old_observer));
    assert!(old_observer.is_disposable());
    assert_eq!(new_observer.get_value().unwrap(), Value::from("green"));
    assert_eq!(m.resources().len(), 1);
}

#[test]
fn invalidate_all_drains() {
    let m = manager();
    let a = Value::object(DynamicResource::new("A", 1));
    let b = Value::object(DynamicResource::new("B", 2));
    let observers = [value_observer(&m, &a), value_observer(&m, &b)];
    assert_eq!(m.resources().invalidate_all(), 2);
    assert!(observers.iter().all(PathObserver::is_disposable));
}
