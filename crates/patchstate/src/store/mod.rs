//! Local store: owns the root, applies patches, and notifies subscribers
//! whose addresses changed.
//!
//! Change detection is identity based. `apply` never mutates a node that a
//! snapshot or a subscription baseline still references, so an unchanged
//! subtree keeps its allocation and a touched one always gets a new one.

pub mod events;
mod registry;

use std::sync::{Arc, Mutex, Weak};

use patchstate_pointer::{resolve, Pointer, Segment};
use tracing::{debug, trace};

use crate::patch::{apply_patch, Op};
use crate::path::{Indexed, Path};
use crate::util::lock;
use crate::value::Value;

pub use events::{Emitter, EventBus, Listener, NullEmitter, StoreEvent};
use registry::Registry;

pub struct Store {
    root: Value,
    registry: Arc<Mutex<Registry>>,
    emitter: Arc<dyn Emitter>,
}

impl Store {
    /// A store that emits into the void.
    pub fn new(root: impl Into<Value>) -> Self {
        Self::with_emitter(root, Arc::new(NullEmitter))
    }

    pub fn with_emitter(root: impl Into<Value>, emitter: Arc<dyn Emitter>) -> Self {
        Store {
            root: root.into(),
            registry: Arc::new(Mutex::new(Registry::new())),
            emitter,
        }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Live lookup against the current root.
    pub fn resolve(&self, pointer: &Pointer) -> Option<Value> {
        resolve(pointer, &self.root).cloned()
    }

    /// The snapshot captured when `path` was built.
    pub fn get<T>(&self, path: &Path<T>) -> Option<Value> {
        path.value().cloned()
    }

    /// Build a path from `base` (a pointer string, a [`Pointer`], or an
    /// existing [`Path`]) plus `segments`, resolved against the current root.
    pub fn path<I, S>(&self, base: impl Into<Pointer>, segments: I) -> Path
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        self.path_as(base, segments)
    }

    /// Like [`Store::path`], typed as `T`.
    pub fn path_as<T, I, S>(&self, base: impl Into<Pointer>, segments: I) -> Path<T>
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        let pointer = base.into().extend(segments);
        let value = resolve(&pointer, &self.root).cloned();
        Path::new(pointer, value)
    }

    /// Child path for element `index` of the array snapshot in `array`.
    /// The value is absent when the snapshot is not an array or too short.
    pub fn at<A: Indexed>(&self, array: &Path<A>, index: usize) -> Path<A::Item> {
        let value = array
            .value()
            .and_then(Value::as_array)
            .and_then(|items| items.get(index))
            .cloned();
        Path::new(array.pointer().child(index), value)
    }

    /// Apply `ops` to the root and return the undo list. With `invalidate`
    /// set, subscribers are checked before returning.
    pub fn apply(&mut self, ops: &[Op], invalidate: bool) -> Vec<Op> {
        let result = apply_patch(&self.root, ops);
        trace!(ops = ops.len(), undo = result.undo.len(), "applied patch");
        self.root = result.root;
        if invalidate {
            self.invalidate();
        }
        result.undo
    }

    /// Register `callback` on every address in `paths` under one subscriber
    /// id, with each address's current value as its baseline.
    pub fn on_change<I, P, F>(&self, paths: I, callback: F) -> Subscription
    where
        I: IntoIterator<Item = P>,
        P: Into<Pointer>,
        F: Fn() + Send + Sync + 'static,
    {
        let pointers: Vec<Pointer> = paths.into_iter().map(Into::into).collect();
        let id = lock(&self.registry).subscribe(&pointers, &self.root, Arc::new(callback));
        debug!(id, paths = pointers.len(), "subscribed");
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Fire each subscriber whose addresses changed since the last pass,
    /// once, then emit a single [`StoreEvent::Invalidate`].
    pub fn invalidate(&self) {
        let scan = lock(&self.registry).scan(&self.root);
        debug!(
            changed = scan.changed.len(),
            fired = scan.fire.len(),
            "invalidation pass"
        );
        for callback in scan.fire {
            callback();
        }
        self.emitter.emit(&StoreEvent::Invalidate);
    }

    /// Number of distinct addresses being watched.
    pub fn watched(&self) -> usize {
        lock(&self.registry).watched()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("root", &self.root)
            .field("subscribers", &lock(&self.registry).subscribers())
            .finish_non_exhaustive()
    }
}

/// Handle returned by [`Store::on_change`].
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Deregister from every address. Idempotent; returns whether this call
    /// removed anything.
    pub fn remove(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => lock(&registry).unsubscribe(self.id),
            None => false,
        }
    }
}
