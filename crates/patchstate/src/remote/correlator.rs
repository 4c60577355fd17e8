//! Pairs outbound requests with inbound responses by message id.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::protocol::{Inbound, Notification, Response};
use crate::error::RemoteError;
use crate::util::{lock, Callback};
use crate::value::Value;

pub(crate) type Waiter = oneshot::Receiver<Option<Value>>;

struct State {
    next_id: u64,
    pending: HashMap<u64, oneshot::Sender<Option<Value>>>,
    listeners: HashMap<u64, Callback>,
    /// Ids of fire-and-forget requests; their responses are consumed quietly.
    detached: HashSet<u64>,
    closed: bool,
}

/// The id counter, the pending-request table, and the callbacks for
/// host-side subscriptions. Every pending entry is removed exactly once: by
/// its response, by cancellation, or by [`Correlator::close`].
pub struct Correlator {
    state: Mutex<State>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    pub fn new() -> Self {
        Correlator {
            state: Mutex::new(State {
                next_id: 1,
                pending: HashMap::new(),
                listeners: HashMap::new(),
                detached: HashSet::new(),
                closed: false,
            }),
        }
    }

    /// Allocate the next id and its waiter.
    pub(crate) fn register(&self) -> Result<(u64, Waiter), RemoteError> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(RemoteError::Disconnected);
        }
        let id = state.next_id;
        state.next_id = state.next_id.saturating_add(1);
        let (tx, rx) = oneshot::channel();
        state.pending.insert(id, tx);
        Ok((id, rx))
    }

    /// Allocate an id for a request whose response nobody awaits.
    pub(crate) fn detach(&self) -> Result<u64, RemoteError> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(RemoteError::Disconnected);
        }
        let id = state.next_id;
        state.next_id = state.next_id.saturating_add(1);
        state.detached.insert(id);
        Ok(id)
    }

    pub(crate) fn cancel_detached(&self, id: u64) -> bool {
        lock(&self.state).detached.remove(&id)
    }

    /// Drop the waiter for `id`. Returns whether it was still pending.
    pub fn cancel(&self, id: u64) -> bool {
        lock(&self.state).pending.remove(&id).is_some()
    }

    pub(crate) fn listen(&self, id: u64, callback: Callback) {
        lock(&self.state).listeners.insert(id, callback);
    }

    pub(crate) fn unlisten(&self, id: u64) -> bool {
        lock(&self.state).listeners.remove(&id).is_some()
    }

    /// Route one inbound message. Returns false when nothing was waiting for
    /// it; such messages are logged and dropped.
    pub fn dispatch(&self, message: Inbound) -> bool {
        match message {
            Inbound::Response(response) => self.resolve(response),
            Inbound::Notification(notification) => self.notify(notification),
        }
    }

    fn resolve(&self, response: Response) -> bool {
        let mut state = lock(&self.state);
        if state.detached.remove(&response.id) {
            return true;
        }
        let Some(tx) = state.pending.remove(&response.id) else {
            drop(state);
            warn!(id = response.id, "response for unknown request id");
            return false;
        };
        drop(state);
        if tx.send(response.result).is_err() {
            debug!(id = response.id, "waiter gone before response");
        }
        true
    }

    fn notify(&self, notification: Notification) -> bool {
        let callback = lock(&self.state)
            .listeners
            .get(&notification.notify)
            .cloned();
        match callback {
            Some(callback) => {
                callback();
                true
            }
            None => {
                debug!(id = notification.notify, "notification for removed subscription");
                false
            }
        }
    }

    /// Fail every pending waiter with `Disconnected` and refuse new
    /// requests.
    pub fn close(&self) {
        let mut state = lock(&self.state);
        state.closed = true;
        let dropped = state.pending.len();
        state.pending.clear();
        state.listeners.clear();
        state.detached.clear();
        debug!(dropped, "correlator closed");
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Number of registered subscription callbacks.
    pub fn listener_len(&self) -> usize {
        lock(&self.state).listeners.len()
    }
}

/// Removes its pending entry when dropped, so a caller that stops awaiting
/// never leaves a stale entry behind.
pub(crate) struct PendingGuard {
    correlator: Arc<Correlator>,
    id: u64,
}

impl PendingGuard {
    pub fn new(correlator: Arc<Correlator>, id: u64) -> Self {
        PendingGuard { correlator, id }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.correlator.cancel(self.id) {
            debug!(id = self.id, "request abandoned");
        }
    }
}
