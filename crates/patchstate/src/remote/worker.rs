//! In-process host: a [`Store`] on its own task, driven through a
//! [`RemoteStore`] over tokio channels.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{host, pump, Correlator, Request, RemoteStore};
use crate::config::RemoteConfig;
use crate::error::RemoteError;
use crate::store::Store;

pub type WorkerStore = RemoteStore<mpsc::UnboundedSender<Request>>;

/// Owns the host and pump tasks started by [`spawn`].
#[derive(Debug)]
pub struct Worker {
    host: JoinHandle<Store>,
    pump: JoinHandle<()>,
}

/// Move `store` onto a host task. Must be called inside a tokio runtime.
pub fn spawn(store: Store, config: &RemoteConfig) -> (WorkerStore, Worker) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let correlator = Arc::new(Correlator::new());
    let host = tokio::spawn(host::serve(store, request_rx, inbound_tx));
    let pump = tokio::spawn(pump(correlator.clone(), inbound_rx));
    (RemoteStore::new(request_tx, correlator, config), Worker { host, pump })
}

impl Worker {
    /// Wait for the host to stop and take the store back. The host stops
    /// once every [`WorkerStore`] clone and subscription handle is dropped.
    pub async fn join(self) -> Result<Store, RemoteError> {
        let store = self.host.await.map_err(|_| RemoteError::Disconnected)?;
        self.pump.await.map_err(|_| RemoteError::Disconnected)?;
        Ok(store)
    }
}
