use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use patchstate::{EventBus, Op, Store, StoreEvent, Value, NO_SEGMENTS};
use serde_json::json;
use tokio::sync::broadcast;

fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let c = hits.clone();
    (hits, move || {
        c.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn callback_on_two_changed_paths_fires_once() {
    let mut store = Store::new(json!({"a": {"x": 1}, "b": {"y": 2}}));
    let (hits, cb) = counter();
    let _sub = store.on_change(["/a", "/b"], cb);

    store.apply(&[Op::replace("/a/x", 10), Op::replace("/b/y", 20)], true);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn aliased_paths_fire_each_subscriber_once() {
    let mut store = Store::new(json!({"list": [{"v": 1}]}));
    let list = store.path("/list", NO_SEGMENTS);
    let item = store.at(&list, 0);
    let (outer, outer_cb) = counter();
    let (inner, inner_cb) = counter();
    let _outer = store.on_change([&list, &item], outer_cb);
    let _inner = store.on_change([&item], inner_cb);

    store.apply(&[Op::replace("/list/0/v", 2)], true);
    assert_eq!(outer.load(Ordering::SeqCst), 1);
    assert_eq!(inner.load(Ordering::SeqCst), 1);
    assert_eq!(store.watched(), 2);
}

#[test]
fn removed_subscription_never_fires() {
    let mut store = Store::new(json!({"a": 1}));
    let (hits, cb) = counter();
    let sub = store.on_change(["/a"], cb);
    assert!(sub.remove());
    assert!(!sub.remove());

    store.apply(&[Op::replace("/a", 2)], true);
    store.apply(&[Op::replace("/a", 3)], true);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(store.watched(), 0);
}

#[test]
fn removal_keeps_other_subscribers_on_shared_path() {
    let mut store = Store::new(json!({"a": 1}));
    let (kept, kept_cb) = counter();
    let (dropped, dropped_cb) = counter();
    let _kept = store.on_change(["/a"], kept_cb);
    let gone = store.on_change(["/a"], dropped_cb);
    gone.remove();

    store.apply(&[Op::replace("/a", 2)], true);
    assert_eq!(kept.load(Ordering::SeqCst), 1);
    assert_eq!(dropped.load(Ordering::SeqCst), 0);
}

#[test]
fn appearing_and_disappearing_values_are_changes() {
    let mut store = Store::new(json!({}));
    let (hits, cb) = counter();
    let _sub = store.on_change(["/later"], cb);

    store.apply(&[Op::add("/later", 1)], true);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    store.apply(&[Op::remove("/later")], true);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    // Replacing a scalar with an equal scalar is not a change.
    store.apply(&[Op::add("/later", 1)], true);
    store.apply(&[Op::replace("/later", 1)], true);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[test]
fn noop_batch_fires_nothing_but_still_emits() {
    let bus = EventBus::new();
    let (events, on_event) = counter();
    let _listener = bus.on("invalidate", move |_| on_event());
    let mut store = Store::with_emitter(json!({"a": {"b": 1}}), Arc::new(bus));
    let (hits, cb) = counter();
    let _sub = store.on_change(["/a"], cb);

    let undo = store.apply(&[Op::replace("/missing", 1), Op::remove("/a/zzz")], true);
    assert!(undo.is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert_eq!(events.load(Ordering::SeqCst), 1);
}

#[test]
fn callbacks_run_before_the_invalidate_event() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let bus = EventBus::new();
    let log = order.clone();
    let _listener = bus.on("invalidate", move |event| {
        log.lock().unwrap().push(event.event_type().to_string());
    });
    let mut store = Store::with_emitter(json!({"a": 1}), Arc::new(bus));
    let log = order.clone();
    let _sub = store.on_change(["/a"], move || log.lock().unwrap().push("change".into()));

    store.apply(&[Op::replace("/a", 2)], true);
    assert_eq!(*order.lock().unwrap(), vec!["change", "invalidate"]);
}

#[tokio::test]
async fn broadcast_receivers_see_invalidation() {
    let (tx, mut rx) = broadcast::channel::<StoreEvent>(8);
    let mut store = Store::with_emitter(json!({}), Arc::new(tx));
    store.apply(&[Op::add("/k", "v")], true);
    assert_eq!(rx.recv().await.unwrap(), StoreEvent::Invalidate);
    assert_eq!(store.root(), &Value::from(json!({"k": "v"})));
}
