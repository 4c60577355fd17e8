//! Copy-on-write patch application.
//!
//! Every container on the path from the root to an edited slot is shallow
//! copied (`Arc::make_mut`) unless the batch already owns it exclusively, so
//! the input root stays valid and untouched subtrees are shared by
//! reference. Each applied op yields its inverse; ops that do not apply
//! (absent slot, wrong container kind, bad index) leave the tree alone and
//! yield nothing.

use std::sync::Arc;

use patchstate_pointer::{parse_index, resolve, Pointer, Traverse};

use super::types::{Op, PatchResult};
use crate::value::Value;

// ── Path navigation ───────────────────────────────────────────────────────

/// Mutable navigation that un-shares every container it passes through.
///
/// Callers check existence first so a failed lookup never copies anything.
fn node_mut<'a>(node: &'a mut Value, steps: &[String]) -> Option<&'a mut Value> {
    let mut cur = node;
    for step in steps {
        cur = match cur {
            Value::Object(map) => Arc::make_mut(map).get_mut(step.as_str())?,
            Value::Array(arr) => {
                let idx = parse_index(step)?;
                Arc::make_mut(arr).get_mut(idx)?
            }
            _ => return None,
        };
    }
    Some(cur)
}

/// How an `add` lands, decided before anything is copied.
enum AddPlan {
    /// Put a key into the existing parent object.
    Put,
    /// Insert into the existing parent array at `index`.
    Insert { index: usize },
    /// `steps[depth]` is the first missing ancestor, a key in an existing
    /// object; the remaining ancestors are created as objects.
    Create { depth: usize },
}

fn plan_add(doc: &Value, parent_steps: &[String], leaf: &str) -> Option<AddPlan> {
    let mut cur = doc;
    for (depth, step) in parent_steps.iter().enumerate() {
        match cur.step(step) {
            Some(next) => cur = next,
            None => {
                return matches!(cur, Value::Object(_)).then_some(AddPlan::Create { depth });
            }
        }
    }
    match cur {
        Value::Object(_) => Some(AddPlan::Put),
        Value::Array(arr) => {
            let index = if leaf == "-" {
                arr.len()
            } else {
                parse_index(leaf).filter(|&i| i <= arr.len())?
            };
            Some(AddPlan::Insert { index })
        }
        _ => None,
    }
}

// ── Individual operation applicators ─────────────────────────────────────

fn apply_add(doc: &mut Value, path: &Pointer, value: &Value) -> Option<Op> {
    let steps = path.segments();
    let Some((leaf, parent_steps)) = steps.split_last() else {
        let prev = std::mem::replace(doc, value.clone());
        return Some(Op::Replace {
            path: Pointer::root(),
            value: prev,
        });
    };
    match plan_add(doc, parent_steps, leaf)? {
        AddPlan::Put => {
            let Value::Object(map) = node_mut(doc, parent_steps)? else {
                return None;
            };
            let prev = Arc::make_mut(map).insert(leaf.clone(), value.clone());
            Some(match prev {
                Some(prev) => Op::Replace {
                    path: path.clone(),
                    value: prev,
                },
                None => Op::Remove { path: path.clone() },
            })
        }
        AddPlan::Insert { index } => {
            let Value::Array(arr) = node_mut(doc, parent_steps)? else {
                return None;
            };
            Arc::make_mut(arr).insert(index, value.clone());
            // `-` is recorded as the concrete index it landed on.
            Some(Op::Remove {
                path: Pointer::of(parent_steps).child(index),
            })
        }
        AddPlan::Create { depth } => {
            let nested = steps[depth + 1..]
                .iter()
                .rev()
                .fold(value.clone(), |inner, step| {
                    Value::object([(step.clone(), inner)])
                });
            let Value::Object(map) = node_mut(doc, &parent_steps[..depth])? else {
                return None;
            };
            Arc::make_mut(map).insert(parent_steps[depth].clone(), nested);
            Some(Op::Remove {
                path: Pointer::of(&steps[..=depth]),
            })
        }
    }
}

fn apply_replace(doc: &mut Value, path: &Pointer, value: &Value) -> Option<Op> {
    resolve(path, &*doc)?;
    let slot = node_mut(doc, path.segments())?;
    let prev = std::mem::replace(slot, value.clone());
    Some(Op::Replace {
        path: path.clone(),
        value: prev,
    })
}

fn apply_remove(doc: &mut Value, path: &Pointer) -> Option<Op> {
    let Some((leaf, parent_steps)) = path.segments().split_last() else {
        // The root slot always exists; removing it leaves `null` behind.
        let prev = std::mem::take(doc);
        return Some(Op::Add {
            path: Pointer::root(),
            value: prev,
        });
    };
    resolve(path, &*doc)?;
    let prev = match node_mut(doc, parent_steps)? {
        Value::Object(map) => Arc::make_mut(map).shift_remove(leaf.as_str())?,
        Value::Array(arr) => {
            let idx = parse_index(leaf).filter(|&i| i < arr.len())?;
            Arc::make_mut(arr).remove(idx)
        }
        _ => return None,
    };
    Some(Op::Add {
        path: path.clone(),
        value: prev,
    })
}

// ── Main apply functions ──────────────────────────────────────────────────

/// Apply a single operation in place, returning its inverse, or `None` when
/// the operation was a no-op.
pub fn apply_op(doc: &mut Value, op: &Op) -> Option<Op> {
    match op {
        Op::Add { path, value } => apply_add(doc, path, value),
        Op::Replace { path, value } => apply_replace(doc, path, value),
        Op::Remove { path } => apply_remove(doc, path),
    }
}

/// Apply a batch to `root` without disturbing it.
///
/// The returned undo list holds the inverse of every applied op, last op
/// first, so applying it in order to the new root restores `root`.
pub fn apply_patch(root: &Value, ops: &[Op]) -> PatchResult {
    let mut doc = root.clone();
    let mut undo = Vec::with_capacity(ops.len());
    for op in ops {
        if let Some(inverse) = apply_op(&mut doc, op) {
            undo.push(inverse);
        }
    }
    undo.reverse();
    PatchResult { root: doc, undo }
}

// ── Tests ─────────────────────────────────────────────────────────────────
