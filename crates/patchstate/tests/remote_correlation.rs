use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use patchstate::remote::{worker, Inbound, Request, RequestBody, Response};
use patchstate::{
    Correlator, Op, Path, Pointer, RemoteConfig, RemoteError, RemoteStore, Store, Value,
    NO_SEGMENTS,
};
use serde_json::json;
use tokio::sync::mpsc;

type Remote = RemoteStore<mpsc::UnboundedSender<Request>>;

fn manual(config: RemoteConfig) -> (Remote, Arc<Correlator>, mpsc::UnboundedReceiver<Request>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let correlator = Arc::new(Correlator::new());
    (RemoteStore::new(tx, correlator.clone(), &config), correlator, rx)
}

fn respond(correlator: &Correlator, id: u64, result: Option<Value>) -> bool {
    correlator.dispatch(Inbound::Response(Response { id, result }))
}

#[tokio::test]
async fn out_of_order_responses_reach_their_own_waiters() {
    let (remote, correlator, mut requests) = manual(RemoteConfig::default());

    let apply = tokio::spawn({
        let remote = remote.clone();
        async move { remote.apply(&[Op::add("/a", 1)], false).await }
    });
    let first = requests.recv().await.unwrap();
    let get = tokio::spawn({
        let remote = remote.clone();
        async move {
            let path: Path = Path::new(Pointer::parse("/b"), None);
            remote.get(&path).await
        }
    });
    let second = requests.recv().await.unwrap();

    assert_eq!((first.id, second.id), (1, 2));
    assert_eq!(first.body, RequestBody::Apply(vec![Op::add("/a", 1)]));
    assert_eq!(second.body, RequestBody::Get(Pointer::parse("/b")));

    assert!(respond(&correlator, 2, Some(Value::from("b"))));
    assert_eq!(get.await.unwrap().unwrap(), Some(Value::from("b")));
    assert!(!apply.is_finished());
    assert_eq!(correlator.pending_len(), 1);

    let undo = patchstate::patch::to_value(&[Op::remove("/a")]);
    assert!(respond(&correlator, 1, Some(undo)));
    assert_eq!(apply.await.unwrap().unwrap(), vec![Op::remove("/a")]);
    assert_eq!(correlator.pending_len(), 0);
}

#[tokio::test]
async fn unmatched_response_is_dropped() {
    let (remote, correlator, mut requests) = manual(RemoteConfig::default());
    let call = tokio::spawn({
        let remote = remote.clone();
        async move { remote.invalidate().await }
    });
    let request = requests.recv().await.unwrap();

    assert!(!respond(&correlator, request.id + 100, None));
    assert!(respond(&correlator, request.id, Some(Value::Null)));
    assert!(!respond(&correlator, request.id, Some(Value::Null)));
    call.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn timeout_removes_pending_entry() {
    let config = RemoteConfig::default().with_request_timeout(Duration::from_millis(250));
    let (remote, correlator, _requests) = manual(config);
    let path: Path = Path::new(Pointer::parse("/a"), None);

    let err = remote.get(&path).await.unwrap_err();
    assert!(matches!(
        err,
        RemoteError::Timeout { id: 1, after } if after == Duration::from_millis(250)
    ));
    assert_eq!(correlator.pending_len(), 0);
    // A late response finds nothing to resolve.
    assert!(!respond(&correlator, 1, Some(Value::Null)));
}

#[tokio::test(start_paused = true)]
async fn dropping_the_call_cancels_it() {
    let (remote, correlator, _requests) = manual(RemoteConfig::default());
    let path: Path = Path::new(Pointer::parse("/a"), None);

    let abandoned = tokio::time::timeout(Duration::from_millis(10), remote.get(&path)).await;
    assert!(abandoned.is_err());
    assert_eq!(correlator.pending_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn abandoned_subscribe_leaves_no_listener() {
    let (remote, correlator, mut requests) = manual(RemoteConfig::default());

    let abandoned =
        tokio::time::timeout(Duration::from_millis(10), remote.on_change(["/a"], || {})).await;
    assert!(abandoned.is_err());
    assert_eq!(correlator.listener_len(), 0);
    assert_eq!(correlator.pending_len(), 0);

    // The host may still register the subscription, so it is told to drop it.
    let subscribe = requests.recv().await.unwrap();
    assert_eq!(subscribe.body, RequestBody::Subscribe(vec![Pointer::parse("/a")]));
    let cleanup = requests.recv().await.unwrap();
    assert_eq!(cleanup.body, RequestBody::Unsubscribe(subscribe.id));

    assert!(!respond(&correlator, subscribe.id, Some(Value::Null)));
    assert!(respond(&correlator, cleanup.id, Some(Value::from(true))));
    assert!(!respond(&correlator, cleanup.id, Some(Value::from(true))));
}

#[tokio::test(start_paused = true)]
async fn failed_remove_can_be_retried() {
    let config = RemoteConfig::default().with_request_timeout(Duration::from_millis(50));
    let (remote, correlator, mut requests) = manual(config);
    let (sub, subscribe) = tokio::join!(remote.on_change(["/a"], || {}), async {
        let request = requests.recv().await.unwrap();
        respond(&correlator, request.id, Some(Value::Null));
        request
    });
    let sub = sub.unwrap();
    assert_eq!(sub.id(), subscribe.id);

    let err = sub.remove().await.unwrap_err();
    assert!(matches!(err, RemoteError::Timeout { .. }));
    let lost = requests.recv().await.unwrap();
    assert_eq!(lost.body, RequestBody::Unsubscribe(sub.id()));

    let (retry, resent) = tokio::join!(sub.remove(), async {
        let request = requests.recv().await.unwrap();
        respond(&correlator, request.id, Some(Value::from(true)));
        request
    });
    assert!(retry.unwrap());
    assert_eq!(resent.body, RequestBody::Unsubscribe(sub.id()));

    assert!(!sub.remove().await.unwrap());
    assert!(requests.try_recv().is_err());
}

#[tokio::test]
async fn invalidate_is_sent_only_after_apply_is_acknowledged() {
    let (remote, correlator, mut requests) = manual(RemoteConfig::default());
    let call = tokio::spawn({
        let remote = remote.clone();
        async move { remote.apply(&[Op::add("/a", 1)], true).await }
    });

    let apply = requests.recv().await.unwrap();
    assert_eq!(apply.body, RequestBody::Apply(vec![Op::add("/a", 1)]));
    tokio::task::yield_now().await;
    assert!(requests.try_recv().is_err());

    let undo = patchstate::patch::to_value(&[Op::remove("/a")]);
    assert!(respond(&correlator, apply.id, Some(undo)));
    let invalidate = requests.recv().await.unwrap();
    assert_eq!(invalidate.body, RequestBody::Invalidate);
    assert!(!call.is_finished());

    assert!(respond(&correlator, invalidate.id, Some(Value::Null)));
    assert_eq!(call.await.unwrap().unwrap(), vec![Op::remove("/a")]);
}

#[tokio::test]
async fn closing_fails_pending_calls() {
    let (remote, correlator, mut requests) = manual(RemoteConfig::default());
    let call = tokio::spawn({
        let remote = remote.clone();
        async move { remote.invalidate().await }
    });
    requests.recv().await.unwrap();
    correlator.close();
    assert!(matches!(call.await.unwrap(), Err(RemoteError::Disconnected)));
    assert!(matches!(remote.invalidate().await, Err(RemoteError::Disconnected)));
}

#[tokio::test]
async fn worker_proxies_the_full_surface() {
    let (remote, worker) = worker::spawn(
        Store::new(json!({"todos": [{"title": "a"}]})),
        &RemoteConfig::default(),
    );

    let todos = remote.path("/todos", NO_SEGMENTS).await.unwrap();
    assert_eq!(todos.value(), Some(&Value::from(json!([{"title": "a"}]))));
    let first = remote.at(&todos, 0).await.unwrap();
    assert_eq!(first.pointer().as_str(), "/todos/0");
    assert_eq!(remote.at(&todos, 5).await.unwrap().value(), None);

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let sub = remote
        .on_change([&first], move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    let undo = remote
        .apply(&[Op::replace("/todos/0/title", "b")], true)
        .await
        .unwrap();
    assert_eq!(undo, vec![Op::replace("/todos/0/title", "a")]);
    // The notification is dispatched before the invalidate response.
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(remote.get(&first).await.unwrap(), Some(Value::from(json!({"title": "b"}))));
    // The path itself is still the old snapshot.
    assert_eq!(first.value(), Some(&Value::from(json!({"title": "a"}))));

    assert!(sub.remove().await.unwrap());
    assert!(!sub.remove().await.unwrap());
    remote.apply(&undo, true).await.unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    drop(sub);
    drop(remote);
    let store = worker.join().await.unwrap();
    assert_eq!(store.root(), &Value::from(json!({"todos": [{"title": "a"}]})));
    assert_eq!(store.watched(), 0);
}
