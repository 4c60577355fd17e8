//! The publish/subscribe primitive a store broadcasts on.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::util::lock;

/// Serialized as `{"type": "invalidate"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreEvent {
    /// One invalidation pass finished. Emitted even when nothing changed.
    Invalidate,
}

impl StoreEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            StoreEvent::Invalidate => "invalidate",
        }
    }
}

pub trait Emitter: Send + Sync {
    fn emit(&self, event: &StoreEvent);
}

/// Drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmitter;

impl Emitter for NullEmitter {
    fn emit(&self, _event: &StoreEvent) {}
}

impl Emitter for broadcast::Sender<StoreEvent> {
    fn emit(&self, event: &StoreEvent) {
        // No receivers is not an error for a broadcast.
        let _ = self.send(*event);
    }
}

type Handler = Arc<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    by_id: BTreeMap<u64, (&'static str, Handler)>,
}

/// In-process listener registry keyed by event type.
///
/// Clones share the same listeners. Handlers run in registration order with
/// the registry unlocked, so a handler may register or remove listeners.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<Listeners>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, event_type: &'static str, handler: F) -> Listener
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let mut listeners = lock(&self.inner);
        listeners.next_id = listeners.next_id.saturating_add(1);
        let id = listeners.next_id;
        listeners.by_id.insert(id, (event_type, Arc::new(handler)));
        Listener {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).by_id.len()
    }
}

impl Emitter for EventBus {
    fn emit(&self, event: &StoreEvent) {
        let handlers: Vec<Handler> = lock(&self.inner)
            .by_id
            .values()
            .filter(|(ty, _)| *ty == event.event_type())
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(event);
        }
    }
}

/// Handle returned by [`EventBus::on`].
#[derive(Debug)]
pub struct Listener {
    id: u64,
    bus: Weak<Mutex<Listeners>>,
}

impl Listener {
    /// Stop receiving events. Returns whether the listener was still
    /// registered; calling it again is a no-op.
    pub fn off(&self) -> bool {
        match self.bus.upgrade() {
            Some(bus) => lock(&bus).by_id.remove(&self.id).is_some(),
            None => false,
        }
    }
}
