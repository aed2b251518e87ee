use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn counter() -> (Arc<AtomicUsize>, Arc<dyn MemberListener>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&hits);
    let listener = listener_fn(move |_, _| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    (hits, listener)
}

fn raise(registry: &ListenerRegistry, member: Option<&str>) {
    registry.raise(&Value::Null, &Value::Null, member, None);
}

#[test]
fn filters_match_member_names() {
    let registry = Arc::new(ListenerRegistry::new());
    let (hits, listener) = counter();
    let _token = registry.add(ListenerRef::Strong(listener), Some("Name"));
    raise(&registry, Some("Name"));
    raise(&registry, Some("Other"));
    raise(&registry, None);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn tokens_remove_their_entry() {
    let registry = Arc::new(ListenerRegistry::new());
    let (hits, listener) = counter();
    let first = registry.add(ListenerRef::Strong(Arc::clone(&listener)), None);
    let _second = registry.add(ListenerRef::Strong(listener), None);
    assert_eq!(registry.len(), 2);
    first.dispose();
    assert_eq!(registry.len(), 1);
    raise(&registry, Some("X"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn forgotten_tokens_leave_the_entry() {
    let registry = Arc::new(ListenerRegistry::new());
    let (_, listener) = counter();
    registry.add(ListenerRef::Strong(listener), None).forget();
    assert_eq!(registry.len(), 1);
}

#[test]
fn tokens_outliving_the_registry_are_harmless() {
    let registry = Arc::new(ListenerRegistry::new());
    let (_, listener) = counter();
    let token = registry.add(ListenerRef::Strong(listener), None);
    drop(registry);
    token.dispose();
}

#[test]
fn weak_entries_die_with_their_listener() {
    let registry = Arc::new(ListenerRegistry::new());
    let (hits, listener) = counter();
    let _token = registry.add(ListenerRef::weak(&listener), None);
    raise(&registry, Some("X"));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    drop(listener);
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.prune(), 1);
    assert!(registry.is_empty());
}

#[test]
fn raise_drops_dead_entries() {
    let registry = Arc::new(ListenerRegistry::new());
    let (_, listener) = counter();
    let _token = registry.add(ListenerRef::weak(&listener), None);
    drop(listener);
    raise(&registry, None);
    assert!(registry.is_empty());
}

struct Once;

impl MemberListener for Once {
    fn try_handle(
        &self,
        _sender: &Value,
        _member: Option<&str>,
        _message: &Value,
        _metadata: Option<&Metadata>,
    ) -> bool {
        false
    }
}

#[test]
fn rejecting_listeners_are_removed() {
    let registry = Arc::new(ListenerRegistry::new());
    let _token = registry.add(ListenerRef::Strong(Arc::new(Once)), None);
    raise(&registry, None);
    assert!(registry.is_empty());
}

#[test]
fn listeners_may_unsubscribe_while_notified() {
    let registry = Arc::new(ListenerRegistry::new());
    let slot: Arc<Mutex<Option<ActionToken>>> = Arc::new(Mutex::new(None));
    let hits = Arc::new(AtomicUsize::new(0));
    let (inner_slot, inner_hits) = (Arc::clone(&slot), Arc::clone(&hits));
    let token = registry.add(
        ListenerRef::Strong(listener_fn(move |_, _| {
            inner_hits.fetch_add(1, Ordering::SeqCst);
            if let Some(token) = inner_slot.lock().unwrap().take() {
                token.dispose();
            }
        })),
        None,
    );
    *slot.lock().unwrap() = Some(token);
    raise(&registry, None);
    raise(&registry, None);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
}

#[test]
fn entries_removed_mid_raise_are_skipped() {
    let registry = Arc::new(ListenerRegistry::new());
    let slot: Arc<Mutex<Option<ActionToken>>> = Arc::new(Mutex::new(None));
    let inner_slot = Arc::clone(&slot);
    let _first = registry.add(
        ListenerRef::Strong(listener_fn(move |_, _| {
            if let Some(token) = inner_slot.lock().unwrap().take() {
                token.dispose();
            }
        })),
        None,
    );
    let (hits, second) = counter();
    let token = registry.add(ListenerRef::Strong(second), None);
    *slot.lock().unwrap() = Some(token);

    raise(&registry, None);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(registry.len(), 1);
}

#[test]
fn listener_refs_report_liveness() {
    let (_, listener) = counter();
    let weak = ListenerRef::weak(&listener);
    assert!(weak.is_alive());
    assert_eq!(format!("{weak:?}"), "Weak(alive: true)");
    drop(listener);
    assert!(!weak.is_alive());
    assert!(weak.upgrade().is_none());
}
