use std::collections::{BTreeMap, HashSet};

use indexmap::IndexMap;
use patchstate_pointer::{resolve, Pointer};

use crate::util::Callback;
use crate::value::{same, Value};

struct Watch {
    pointer: Pointer,
    baseline: Option<Value>,
    subscribers: Vec<u64>,
}

/// Watched addresses in first-subscription order, each with the value it
/// held at the last scan and the subscriber ids interested in it.
pub(crate) struct Registry {
    watches: IndexMap<String, Watch>,
    callbacks: BTreeMap<u64, Callback>,
    next_id: u64,
}

/// Outcome of one scan: callbacks to run, in first-fired order.
pub(crate) struct Scan {
    pub changed: Vec<Pointer>,
    pub fire: Vec<Callback>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            watches: IndexMap::new(),
            callbacks: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Register `callback` under a fresh id on every pointer. An address
    /// that is already watched keeps its existing baseline.
    pub fn subscribe(&mut self, pointers: &[Pointer], root: &Value, callback: Callback) -> u64 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.callbacks.insert(id, callback);
        for pointer in pointers {
            let watch = self
                .watches
                .entry(pointer.as_str().to_owned())
                .or_insert_with(|| Watch {
                    pointer: pointer.clone(),
                    baseline: resolve(pointer, root).cloned(),
                    subscribers: Vec::new(),
                });
            if !watch.subscribers.contains(&id) {
                watch.subscribers.push(id);
            }
        }
        id
    }

    /// Returns false when the id was not registered.
    pub fn unsubscribe(&mut self, id: u64) -> bool {
        if self.callbacks.remove(&id).is_none() {
            return false;
        }
        self.watches.retain(|_, watch| {
            watch.subscribers.retain(|s| *s != id);
            !watch.subscribers.is_empty()
        });
        true
    }

    /// Compare every watched address against `root`, moving changed
    /// baselines forward. Each subscriber appears at most once in `fire`.
    pub fn scan(&mut self, root: &Value) -> Scan {
        let mut changed = Vec::new();
        let mut fired = HashSet::new();
        let mut fire = Vec::new();
        for watch in self.watches.values_mut() {
            let current = resolve(&watch.pointer, root);
            if same(current, watch.baseline.as_ref()) {
                continue;
            }
            watch.baseline = current.cloned();
            changed.push(watch.pointer.clone());
            for id in &watch.subscribers {
                if !fired.insert(*id) {
                    continue;
                }
                if let Some(callback) = self.callbacks.get(id) {
                    fire.push(callback.clone());
                }
            }
        }
        Scan { changed, fire }
    }

    pub fn watched(&self) -> usize {
        self.watches.len()
    }

    pub fn subscribers(&self) -> usize {
        self.callbacks.len()
    }
}
