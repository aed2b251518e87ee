use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::members::descriptor::TypeDescriptor;
use crate::members::dynamic::{DynamicObject, ObservableList};
use crate::observation::registry::{MemberListener, listener_fn};

struct Button {
    click: Arc<ListenerRegistry>,
}

impl BindObject for Button {
    fn type_name(&self) -> &str {
        "Button"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn event(&self, name: &str) -> Option<&Arc<ListenerRegistry>> {
        (name == "Click").then_some(&self.click)
    }
}

struct Plain;

impl BindObject for Plain {
    fn type_name(&self) -> &str {
        "Plain"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn setup() -> (Arc<MemberManager>, Arc<AttachedListenerStore>, MemberObserverResolver) {
    let members = Arc::new(MemberManager::new());
    members.register_type(
        TypeDescriptor::new("Button")
            .member(MemberInfo::event("Button", "Click"))
            .member(
                MemberInfo::property("Button", "Pressed", |_| Ok(Value::Bool(false)))
                    .notifies(ChangeSignal::Event(Arc::from("Click"))),
            ),
    );
    let attached = Arc::new(AttachedListenerStore::new());
    let resolver = MemberObserverResolver::new(&members, &attached);
    (members, attached, resolver)
}

fn counter() -> (Arc<AtomicUsize>, Arc<dyn MemberListener>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&hits);
    let listener = listener_fn(move |_, _| {
        sink.fetch_add(1, Ordering::SeqCst);
    });
    (hits, listener)
}

#[test]
fn property_changed_filters_on_the_member() {
    let (_, _, resolver) = setup();
    let obj = DynamicObject::new("Person");
    let target = Value::object(Arc::clone(&obj));
    let observer = resolver.try_get_member_observer(&TypeKey::of(&target), "Name", None);
    assert!(!observer.is_empty());
    assert_eq!(observer.state(), "Name");

    let (hits, listener) = counter();
    let token = observer
        .try_observe(&target, ListenerRef::Strong(listener), None)
        .unwrap();
    obj.set("Name", "a");
    obj.set("Age", 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    drop(token);
    obj.set("Name", "b");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn indexers_notify_as_item_brackets() {
    let (_, _, resolver) = setup();
    let list = ObservableList::new([Value::Int(1)]);
    let target = Value::object(Arc::clone(&list));
    let observer = resolver.try_get_member_observer(&TypeKey::of(&target), "Item[]", None);
    assert_eq!(observer.state(), "Item[]");

    let (hits, listener) = counter();
    let _token = observer.try_observe(&target, ListenerRef::Strong(listener), None);
    list.set(0, 5).unwrap();
    list.push(6);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn event_signals_subscribe_to_the_named_event() {
    let (_, _, resolver) = setup();
    let button = Arc::new(Button {
        click: Arc::new(ListenerRegistry::new()),
    });
    let target = Value::object(Arc::clone(&button));
    let observer = resolver.try_get_member_observer(&TypeKey::of(&target), "Pressed", None);
    assert_eq!(observer.state(), "Click");

    let (hits, listener) = counter();
    let _token = observer.try_observe(&target, ListenerRef::Strong(listener), None);
    button.click.raise(&target, &Value::Null, None, None);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn silent_objects_fall_back_to_attached_listeners() {
    let (_, attached, resolver) = setup();
    let target = Value::object(Arc::new(Plain));
    let observer = resolver.try_get_member_observer(&TypeKey::of(&target), "Anything", None);
    assert!(!observer.is_empty());

    let (hits, listener) = counter();
    let _token = observer.try_observe(&target, ListenerRef::Strong(listener), None);
    assert!(attached.raise(&target, Some("Anything"), None));
    assert!(attached.raise(&target, Some("Other"), None));
    attached.raise(&target, None, None);
    assert_eq!(hits.load(Ordering::SeqCst), 2);

    assert!(!attached.raise(&Value::object(Arc::new(Plain)), None, None));
}

#[test]
fn plain_values_cannot_be_observed() {
    let (_, _, resolver) = setup();
    let observer = resolver.try_get_member_observer(&TypeKey::of(&Value::from("x")), "Length", None);
    assert!(observer.is_empty());
    let (_, listener) = counter();
    assert!(observer
        .try_observe(&Value::from("x"), ListenerRef::Strong(listener), None)
        .is_none());
}

#[test]
fn attached_entries_die_with_their_object() {
    let store = AttachedListenerStore::new();
    let (_, listener) = counter();
    let target = Value::object(Arc::new(Plain));
    let token = store.add(&target, "A", ListenerRef::Strong(listener));
    assert!(token.is_some());
    assert_eq!(store.len(), 1);
    drop(target);
    assert_eq!(store.prune(), 1);
    assert!(store.is_empty());
}

struct Fixed;

impl MemberObserverProvider for Fixed {
    fn try_get_member_observer(
        &self,
        _key: &TypeKey,
        member: &str,
        _metadata: Option<&Metadata>,
    ) -> MemberObserver {
        if member != "Custom" {
            return MemberObserver::empty();
        }
        MemberObserver::new(Arc::new(PropertyChangedHandler), "Renamed")
    }
}

#[test]
fn added_providers_take_priority_and_reset_the_cache() {
    let (_, _, resolver) = setup();
    let key = TypeKey::of(&Value::object(DynamicObject::new("T")));
    assert_eq!(resolver.try_get_member_observer(&key, "Custom", None).state(), "Custom");
    resolver.add_provider(Arc::new(Fixed));
    assert_eq!(resolver.try_get_member_observer(&key, "Custom", None).state(), "Renamed");
}
