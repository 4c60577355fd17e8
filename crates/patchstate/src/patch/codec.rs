//! Value codec for operation lists.
//!
//! Converts operations to/from a [`Value`] array in the RFC 6902 object
//! form, so an undo list can travel inside a response envelope whose result
//! is a plain value.

use patchstate_pointer::Pointer;

use super::types::{Op, PatchError};
use crate::value::Value;

// ── Serialization ─────────────────────────────────────────────────────────

/// Encode one operation as `{"op", "path", "value"?}`.
pub fn op_to_value(op: &Op) -> Value {
    let mut entries = vec![
        ("op", Value::from(op.op_name())),
        ("path", Value::from(op.path().as_str())),
    ];
    if let Some(value) = op.value() {
        entries.push(("value", value.clone()));
    }
    Value::object(entries)
}

/// Encode an operation list as a value array.
pub fn to_value(ops: &[Op]) -> Value {
    Value::array(ops.iter().map(op_to_value))
}

// ── Deserialization ───────────────────────────────────────────────────────

fn field<'a>(obj: &'a Value, key: &str) -> Option<&'a Value> {
    obj.as_object().and_then(|map| map.get(key))
}

/// Decode one operation.
///
/// # Errors
///
/// Returns [`PatchError::InvalidOp`] when the value is not an object, the op
/// name is unknown, `path` is not a string, or `value` is missing.
pub fn op_from_value(v: &Value) -> Result<Op, PatchError> {
    if v.as_object().is_none() {
        return Err(PatchError::InvalidOp("op must be an object".into()));
    }
    let name = field(v, "op")
        .and_then(Value::as_str)
        .ok_or_else(|| PatchError::InvalidOp("op must be a string".into()))?;
    let path = field(v, "path")
        .and_then(Value::as_str)
        .map(Pointer::parse)
        .ok_or_else(|| PatchError::InvalidOp("path must be a string".into()))?;
    let value = || {
        field(v, "value")
            .cloned()
            .ok_or_else(|| PatchError::InvalidOp(format!("{name} requires a value")))
    };
    match name {
        "add" => Ok(Op::Add {
            path,
            value: value()?,
        }),
        "replace" => Ok(Op::Replace {
            path,
            value: value()?,
        }),
        "remove" => Ok(Op::Remove { path }),
        other => Err(PatchError::InvalidOp(format!("unknown op: {other}"))),
    }
}

/// Decode a value array into an operation list.
pub fn from_value(v: &Value) -> Result<Vec<Op>, PatchError> {
    let items = v
        .as_array()
        .ok_or_else(|| PatchError::InvalidOp("ops must be array".into()))?;
    items.iter().map(op_from_value).collect()
}
