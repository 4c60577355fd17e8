//! Typed paths: a pointer plus the value it resolved to when built.

use std::fmt;
use std::marker::PhantomData;

use patchstate_pointer::Pointer;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::value::Value;

/// Use with `Store::path` when no extra segments are needed.
pub const NO_SEGMENTS: [&str; 0] = [];

/// An address paired with the snapshot it resolved to at construction time.
///
/// `T` only records what the caller expects to find there; nothing checks it
/// until [`Path::decode`]. Paths are snapshots: building a fresh one after an
/// `apply` observes the new root, an existing one does not.
pub struct Path<T = Value> {
    pointer: Pointer,
    value: Option<Value>,
    _type: PhantomData<fn() -> T>,
}

impl<T> Path<T> {
    pub fn new(pointer: Pointer, value: Option<Value>) -> Self {
        Path {
            pointer,
            value,
            _type: PhantomData,
        }
    }

    pub fn pointer(&self) -> &Pointer {
        &self.pointer
    }

    /// The snapshot, or `None` if nothing lived at the address.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    pub fn segments(&self) -> &[String] {
        self.pointer.segments()
    }

    /// Re-type the path. The pointer and snapshot are untouched.
    pub fn cast<U>(self) -> Path<U> {
        Path::new(self.pointer, self.value)
    }
}

impl<T: DeserializeOwned> Path<T> {
    /// Deserialize the snapshot as `T`. An absent value decodes to `None`.
    pub fn decode(&self) -> Result<Option<T>, StoreError> {
        let Some(value) = &self.value else {
            return Ok(None);
        };
        serde_json::from_value(serde_json::Value::from(value))
            .map(Some)
            .map_err(|source| StoreError::Decode {
                pointer: self.pointer.clone(),
                source,
            })
    }
}

impl<T> Clone for Path<T> {
    fn clone(&self) -> Self {
        Path::new(self.pointer.clone(), self.value.clone())
    }
}

impl<T> fmt::Debug for Path<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Path")
            .field("pointer", &self.pointer)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> PartialEq for Path<T> {
    fn eq(&self, other: &Self) -> bool {
        self.pointer == other.pointer && self.value == other.value
    }
}

impl<T> From<&Path<T>> for Pointer {
    fn from(path: &Path<T>) -> Self {
        path.pointer.clone()
    }
}

impl<T> From<Path<T>> for Pointer {
    fn from(path: Path<T>) -> Self {
        path.pointer
    }
}

/// Element type of an indexable path target.
pub trait Indexed {
    type Item;
}

impl Indexed for Value {
    type Item = Value;
}

impl<T> Indexed for Vec<T> {
    type Item = T;
}
