//! A store proxied across an asynchronous boundary.
//!
//! [`RemoteStore`] mirrors [`Store`](crate::Store): every call becomes a
//! [`Request`] sent over a [`Channel`], and resolves when the host's
//! response with the same id is dispatched to the shared [`Correlator`].
//! Whatever owns the inbound side of the channel feeds it with [`pump`].

pub mod correlator;
pub mod host;
pub mod protocol;
pub mod transport;
pub mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use patchstate_pointer::{Pointer, Segment};
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::patch::{codec, Op, PatchError};
use crate::path::{Indexed, Path};
use crate::value::Value;

pub use correlator::Correlator;
use correlator::{PendingGuard, Waiter};
pub use protocol::{Inbound, Notification, Request, RequestBody, Response};

/// Outbound half of the duplex channel.
pub trait Channel: Send + Sync {
    fn send(&self, request: Request) -> Result<(), RemoteError>;
}

impl Channel for mpsc::UnboundedSender<Request> {
    fn send(&self, request: Request) -> Result<(), RemoteError> {
        mpsc::UnboundedSender::send(self, request).map_err(|_| RemoteError::Disconnected)
    }
}

/// Dispatch inbound messages until the stream ends, then close the
/// correlator so outstanding and future requests fail with `Disconnected`.
pub async fn pump(correlator: Arc<Correlator>, mut inbound: mpsc::UnboundedReceiver<Inbound>) {
    while let Some(message) = inbound.recv().await {
        correlator.dispatch(message);
    }
    correlator.close();
}

pub struct RemoteStore<C> {
    channel: C,
    correlator: Arc<Correlator>,
    timeout: Option<Duration>,
}

impl<C: Clone> Clone for RemoteStore<C> {
    fn clone(&self) -> Self {
        RemoteStore {
            channel: self.channel.clone(),
            correlator: self.correlator.clone(),
            timeout: self.timeout,
        }
    }
}

impl<C: Channel> RemoteStore<C> {
    pub fn new(channel: C, correlator: Arc<Correlator>, config: &RemoteConfig) -> Self {
        RemoteStore {
            channel,
            correlator,
            timeout: config.request_timeout(),
        }
    }

    pub fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    async fn request(&self, body: RequestBody) -> Result<Option<Value>, RemoteError> {
        let (id, waiter) = self.correlator.register()?;
        self.round_trip(id, waiter, body).await
    }

    async fn round_trip(
        &self,
        id: u64,
        waiter: Waiter,
        body: RequestBody,
    ) -> Result<Option<Value>, RemoteError> {
        let _guard = PendingGuard::new(self.correlator.clone(), id);
        debug!(id, kind = body.kind(), "sending request");
        self.channel.send(Request { id, body })?;
        let received = match self.timeout {
            Some(after) => tokio::time::timeout(after, waiter)
                .await
                .map_err(|_| RemoteError::Timeout { id, after })?,
            None => waiter.await,
        };
        received.map_err(|_| RemoteError::Disconnected)
    }

    /// Live value at `path` on the host.
    pub async fn get<T>(&self, path: &Path<T>) -> Result<Option<Value>, RemoteError> {
        self.request(RequestBody::Get(path.pointer().clone())).await
    }

    /// Build the pointer locally and fetch its snapshot from the host.
    pub async fn path<I, S>(&self, base: impl Into<Pointer>, segments: I) -> Result<Path, RemoteError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        self.path_as(base, segments).await
    }

    pub async fn path_as<T, I, S>(
        &self,
        base: impl Into<Pointer>,
        segments: I,
    ) -> Result<Path<T>, RemoteError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        let pointer = base.into().extend(segments);
        let value = self.request(RequestBody::Path(pointer.clone())).await?;
        Ok(Path::new(pointer, value))
    }

    /// Element `index` of the array currently at `array` on the host.
    pub async fn at<A: Indexed>(
        &self,
        array: &Path<A>,
        index: usize,
    ) -> Result<Path<A::Item>, RemoteError> {
        let pointer = array.pointer().clone();
        let value = self
            .request(RequestBody::At {
                path: pointer.clone(),
                index,
            })
            .await?;
        Ok(Path::new(pointer.child(index), value))
    }

    /// Apply on the host and return the undo list. With `invalidate` set,
    /// the invalidate round-trip starts only after the apply is acknowledged.
    pub async fn apply(&self, ops: &[Op], invalidate: bool) -> Result<Vec<Op>, RemoteError> {
        let result = self.request(RequestBody::Apply(ops.to_vec())).await?;
        let undo = match result {
            Some(value) => codec::from_value(&value)?,
            None => return Err(PatchError::InvalidOp("apply response has no result".into()).into()),
        };
        if invalidate {
            self.invalidate().await?;
        }
        Ok(undo)
    }

    /// Resolves once the host has run its pass, after any notifications the
    /// pass produced.
    pub async fn invalidate(&self) -> Result<(), RemoteError> {
        self.request(RequestBody::Invalidate).await.map(|_| ())
    }

    /// Subscribe on the host. `callback` runs on whichever task pumps the
    /// inbound stream.
    pub async fn on_change<I, P, F>(
        &self,
        paths: I,
        callback: F,
    ) -> Result<RemoteSubscription<C>, RemoteError>
    where
        C: Clone,
        I: IntoIterator<Item = P>,
        P: Into<Pointer>,
        F: Fn() + Send + Sync + 'static,
    {
        let pointers: Vec<Pointer> = paths.into_iter().map(Into::into).collect();
        let (id, waiter) = self.correlator.register()?;
        self.correlator.listen(id, Arc::new(callback));
        let guard = SubscribeGuard {
            store: self,
            id,
            armed: true,
        };
        self.round_trip(id, waiter, RequestBody::Subscribe(pointers)).await?;
        guard.disarm();
        Ok(RemoteSubscription {
            id,
            store: self.clone(),
            removed: AtomicBool::new(false),
        })
    }
}

/// Undoes a subscribe that did not complete: the local callback goes away
/// and the host is told to drop whatever it may have registered.
struct SubscribeGuard<'a, C: Channel> {
    store: &'a RemoteStore<C>,
    id: u64,
    armed: bool,
}

impl<C: Channel> SubscribeGuard<'_, C> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<C: Channel> Drop for SubscribeGuard<'_, C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.store.correlator.unlisten(self.id);
        let Ok(id) = self.store.correlator.detach() else {
            return;
        };
        let request = Request {
            id,
            body: RequestBody::Unsubscribe(self.id),
        };
        if self.store.channel.send(request).is_err() {
            self.store.correlator.cancel_detached(id);
        }
        debug!(id = self.id, "subscribe abandoned");
    }
}

/// Handle returned by [`RemoteStore::on_change`].
pub struct RemoteSubscription<C> {
    id: u64,
    store: RemoteStore<C>,
    removed: AtomicBool,
}

impl<C: Channel> RemoteSubscription<C> {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stop local delivery at once, then drop the host-side subscription.
    /// Once the host has acknowledged, later calls return `Ok(false)`
    /// without a round-trip; a failed call may be retried.
    pub async fn remove(&self) -> Result<bool, RemoteError> {
        if self.removed.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.store.correlator.unlisten(self.id);
        let removed = self
            .store
            .request(RequestBody::Unsubscribe(self.id))
            .await?;
        let first = !self.removed.swap(true, Ordering::SeqCst);
        Ok(first && removed.and_then(|v| v.as_bool()).unwrap_or(false))
    }
}
