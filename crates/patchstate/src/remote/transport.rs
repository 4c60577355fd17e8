//! Newline-delimited JSON framing over any byte stream, e.g. a child
//! process's stdin/stdout.

use std::io;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use super::{host, Correlator, Inbound, RemoteStore, Request};
use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::store::Store;

pub type LineStore = RemoteStore<mpsc::UnboundedSender<Request>>;

async fn write_line<W, T>(writer: &mut W, message: &T) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let raw = serde_json::to_string(message)?;
    writer.write_all(raw.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Drain `rx` onto `writer`, one message per line, then shut the writer
/// down so the peer sees end of stream.
async fn write_loop<W, T>(mut writer: W, mut rx: mpsc::UnboundedReceiver<T>) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    while let Some(message) = rx.recv().await {
        write_line(&mut writer, &message).await?;
    }
    writer.shutdown().await
}

/// Decode lines from `reader` and hand each message to `sink` until end of
/// stream or until `sink` returns false. Undecodable lines are skipped.
async fn read_loop<R, T, F>(reader: R, mut sink: F) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
    F: FnMut(T) -> bool,
{
    let mut reader = BufReader::new(reader);
    let mut buffer = String::new();
    loop {
        buffer.clear();
        if reader.read_line(&mut buffer).await? == 0 {
            return Ok(());
        }
        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(message) => {
                if !sink(message) {
                    return Ok(());
                }
            }
            Err(err) => warn!(error = %err, "skipping undecodable line"),
        }
    }
}

/// Client-side I/O tasks started by [`connect`].
#[derive(Debug)]
pub struct Connection {
    reader: JoinHandle<io::Result<()>>,
    writer: JoinHandle<io::Result<()>>,
}

impl Connection {
    /// Wait for both directions to finish. The writer finishes once every
    /// store clone is dropped; the reader once the host closes its output.
    pub async fn join(self) -> Result<(), RemoteError> {
        self.writer.await.map_err(|_| RemoteError::Disconnected)??;
        self.reader.await.map_err(|_| RemoteError::Disconnected)??;
        Ok(())
    }
}

/// Speak to a host on the other end of `reader`/`writer`. Must be called
/// inside a tokio runtime.
pub fn connect<R, W>(reader: R, writer: W, config: &RemoteConfig) -> (LineStore, Connection)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (request_tx, request_rx) = mpsc::unbounded_channel::<Request>();
    let correlator = Arc::new(Correlator::new());
    let inbound = correlator.clone();
    let reader = tokio::spawn(async move {
        let result = read_loop(reader, |message: Inbound| {
            inbound.dispatch(message);
            true
        })
        .await;
        if let Err(err) = &result {
            warn!(error = %err, "host read loop failed");
        }
        inbound.close();
        result
    });
    let writer = tokio::spawn(write_loop(writer, request_rx));
    (
        RemoteStore::new(request_tx, correlator, config),
        Connection { reader, writer },
    )
}

/// Serve `store` to a client on the other end of `reader`/`writer` until
/// the client closes its side, then return the store.
///
/// Read and write failures are logged and end the session like end of
/// stream does.
pub async fn serve_io<R, W>(store: Store, reader: R, writer: W) -> Store
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (request_tx, request_rx) = mpsc::unbounded_channel::<Request>();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Inbound>();
    let read = async move {
        let forward = |request: Request| request_tx.send(request).is_ok();
        if let Err(err) = read_loop(reader, forward).await {
            warn!(error = %err, "client read loop failed");
        }
    };
    let write = async move {
        if let Err(err) = write_loop(writer, outbound_rx).await {
            warn!(error = %err, "client write loop failed");
        }
    };
    let (store, (), ()) = tokio::join!(host::serve(store, request_rx, outbound_tx), read, write);
    store
}
