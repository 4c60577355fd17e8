use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use patchstate::remote::transport::{connect, serve_io};
use patchstate::{Op, RemoteConfig, RemoteError, Store, Value, NO_SEGMENTS};
use serde_json::json;
use tokio::io::{duplex, split, AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::test]
async fn json_lines_round_trip() {
    let (client_io, host_io) = duplex(4096);
    let (client_read, client_write) = split(client_io);
    let (host_read, host_write) = split(host_io);

    let host = tokio::spawn(serve_io(Store::new(json!({"n": 1})), host_read, host_write));
    let (remote, connection) = connect(client_read, client_write, &RemoteConfig::default());

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let sub = remote
        .on_change(["/n"], move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();

    let undo = remote.apply(&[Op::replace("/n", 2)], true).await.unwrap();
    assert_eq!(undo, vec![Op::replace("/n", 1)]);
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    let n = remote.path("/n", NO_SEGMENTS).await.unwrap();
    assert_eq!(n.value(), Some(&Value::from(2)));
    let missing = remote.path("/gone", NO_SEGMENTS).await.unwrap();
    assert_eq!(missing.value(), None);

    drop(sub);
    drop(remote);
    let store = host.await.unwrap();
    assert_eq!(store.root(), &Value::from(json!({"n": 2})));
    assert_eq!(store.watched(), 0);
    connection.join().await.unwrap();
}

#[tokio::test]
async fn host_skips_garbage_lines() {
    let (client_io, host_io) = duplex(4096);
    let (host_read, host_write) = split(host_io);
    let host = tokio::spawn(serve_io(Store::new(json!({"a": [1]})), host_read, host_write));

    let (client_read, mut client_write) = split(client_io);
    client_write.write_all(b"not json\n\n").await.unwrap();
    client_write
        .write_all(b"{\"id\":7,\"type\":\"get\",\"payload\":\"/a/0\"}\n")
        .await
        .unwrap();
    client_write.shutdown().await.unwrap();

    let mut lines = BufReader::new(client_read).lines();
    let line = lines.next_line().await.unwrap().unwrap();
    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&line).unwrap(),
        json!({"id": 7, "result": 1})
    );
    assert_eq!(lines.next_line().await.unwrap(), None);
    host.await.unwrap();
}

#[tokio::test]
async fn client_sees_disconnect_when_host_closes() {
    let (client_io, host_io) = duplex(4096);
    let (client_read, client_write) = split(client_io);
    let (remote, connection) = connect(client_read, client_write, &RemoteConfig::default());

    drop(host_io);
    assert!(matches!(
        remote.invalidate().await,
        Err(RemoteError::Disconnected)
    ));
    drop(remote);
    let _ = connection.join().await;
}
