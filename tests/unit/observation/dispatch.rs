use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use super::*;
use crate::observation::registry::{ListenerRef, listener_fn};

#[test]
fn inline_dispatcher_runs_immediately() {
    let ran = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&ran);
    InlineDispatcher.execute(
        ThreadExecutionMode::Background,
        Box::new(move || {
            sink.fetch_add(1, Ordering::SeqCst);
        }),
        None,
    );
    assert_eq!(ran.load(Ordering::SeqCst), 1);
}

#[test]
fn main_mode_is_inline_only_on_the_owning_thread() {
    let dispatcher = Arc::new(MainThreadDispatcher::new());
    assert!(dispatcher.can_execute_inline(ThreadExecutionMode::Main, None));
    assert!(!dispatcher.can_execute_inline(ThreadExecutionMode::Background, None));
    let remote = Arc::clone(&dispatcher);
    let off_main = std::thread::spawn(move || {
        (
            remote.can_execute_inline(ThreadExecutionMode::Main, None),
            remote.can_execute_inline(ThreadExecutionMode::Current, None),
            remote.pump(),
        )
    })
    .join()
    .unwrap();
    assert_eq!(off_main, (false, true, 0));
}

#[test]
fn queued_actions_run_in_order_on_pump() {
    let dispatcher = MainThreadDispatcher::new();
    let order = Arc::new(Mutex::new(Vec::new()));
    for i in 0..3 {
        let sink = Arc::clone(&order);
        dispatcher.execute(
            ThreadExecutionMode::Main,
            Box::new(move || sink.lock().unwrap().push(i)),
            None,
        );
    }
    assert!(order.lock().unwrap().is_empty());
    assert_eq!(dispatcher.pump(), 3);
    assert_eq!(*order.lock().unwrap(), [0, 1, 2]);
    assert_eq!(dispatcher.pump(), 0);
}

#[test]
fn background_actions_run_on_a_worker() {
    let dispatcher = MainThreadDispatcher::new();
    let (tx, rx) = mpsc::channel();
    dispatcher.execute(
        ThreadExecutionMode::Background,
        Box::new(move || {
            let _ = tx.send(thread::current().id());
        }),
        None,
    );
    let worker = rx.recv().unwrap();
    assert_ne!(worker, thread::current().id());
}

#[test]
fn dispatching_registry_defers_off_thread_raises() {
    let dispatcher = Arc::new(MainThreadDispatcher::new());
    let registry = Arc::new(ListenerRegistry::new());
    let hits = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&hits);
    let _token = registry.add(
        ListenerRef::Strong(listener_fn(move |_, member| {
            assert_eq!(member, Some("Name"));
            sink.fetch_add(1, Ordering::SeqCst);
        })),
        None,
    );
    let raising = DispatchingRegistry::new(
        Arc::clone(&registry),
        Arc::clone(&dispatcher) as Arc<dyn ThreadDispatcher>,
        ThreadExecutionMode::Main,
    );

    raising.raise(&Value::Null, &Value::Null, Some("Name"), None);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let remote = raising.clone();
    std::thread::spawn(move || remote.raise(&Value::Null, &Value::Null, Some("Name"), None))
        .join()
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(dispatcher.pump(), 1);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(Arc::ptr_eq(raising.registry(), &registry));
}

#[test]
fn modes_serialize_in_snake_case() {
    assert_eq!(
        serde_json::to_string(&ThreadExecutionMode::Background).unwrap(),
        "\"background\""
    );
    let mode: ThreadExecutionMode = serde_json::from_str("\"main\"").unwrap();
    assert_eq!(mode, ThreadExecutionMode::Main);
    assert_eq!(ThreadExecutionMode::default(), ThreadExecutionMode::Current);
}
