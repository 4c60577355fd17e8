//! Core types for the patch engine.

use patchstate_pointer::Pointer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::value::Value;

// ── Error ─────────────────────────────────────────────────────────────────

/// Raised only when decoding operations from their wire form; applying a
/// patch never fails.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    #[error("INVALID_OP: {0}")]
    InvalidOp(String),
}

// ── Op enum ───────────────────────────────────────────────────────────────

/// One structural edit. On the wire the pointer is its plain string form:
/// `{"op": "replace", "path": "/a/b", "value": 9}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Op {
    /// Insert into an array (shifting later elements) or put an object key,
    /// overwriting an existing one.
    Add { path: Pointer, value: Value },
    /// Overwrite an existing slot; a no-op when the slot is absent.
    Replace { path: Pointer, value: Value },
    /// Delete an existing slot; a no-op when the slot is absent.
    Remove { path: Pointer },
}

impl Op {
    pub fn add(path: impl Into<Pointer>, value: impl Into<Value>) -> Self {
        Op::Add {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn replace(path: impl Into<Pointer>, value: impl Into<Value>) -> Self {
        Op::Replace {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn remove(path: impl Into<Pointer>) -> Self {
        Op::Remove { path: path.into() }
    }

    /// Returns the operation name as it appears on the wire.
    pub fn op_name(&self) -> &'static str {
        match self {
            Op::Add { .. } => "add",
            Op::Replace { .. } => "replace",
            Op::Remove { .. } => "remove",
        }
    }

    /// Returns the target address of the operation.
    pub fn path(&self) -> &Pointer {
        match self {
            Op::Add { path, .. } | Op::Replace { path, .. } | Op::Remove { path } => path,
        }
    }

    /// Returns the payload for `add`/`replace`.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Op::Add { value, .. } | Op::Replace { value, .. } => Some(value),
            Op::Remove { .. } => None,
        }
    }
}

// ── Result types ──────────────────────────────────────────────────────────

/// Result of applying a batch.
#[derive(Debug, Clone)]
pub struct PatchResult {
    /// The new root. Shares every subtree the batch did not touch.
    pub root: Value,
    /// Applied in order to `root`, restores the pre-batch root.
    pub undo: Vec<Op>,
}
