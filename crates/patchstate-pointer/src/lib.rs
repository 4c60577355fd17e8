//! JSON Pointer (RFC 6901) addressing for nested state trees.
//!
//! This crate provides the escape/parse/format helpers for
//! [JSON Pointer (RFC 6901)](https://tools.ietf.org/html/rfc6901), the
//! normalized [`Pointer`] address type, and [`resolve`], which walks any tree
//! implementing [`Traverse`].
//!
//! # Example
//!
//! ```
//! use patchstate_pointer::{resolve, Pointer};
//! use serde_json::json;
//!
//! let pointer = Pointer::of(["foo", "bar"]);
//! assert_eq!(pointer.as_str(), "/foo/bar");
//! assert_eq!(pointer.segments(), ["foo", "bar"]);
//!
//! let doc = json!({"foo": {"bar": [10, 20]}});
//! let item = pointer.extend([1usize]);
//! assert_eq!(resolve(&item, &doc), Some(&json!(20)));
//! assert_eq!(resolve(&Pointer::parse("/missing/key"), &doc), None);
//! ```

use serde_json::Value;
use thiserror::Error;

pub mod pointer;
pub use pointer::{Pointer, Segment};

pub mod validate;
pub use validate::{validate_json_pointer, validate_path, ValidationError};

/// Unescapes a JSON Pointer path component.
///
/// Per RFC 6901, `~1` is replaced with `/` and `~0` is replaced with `~`.
///
/// # Example
///
/// ```
/// use patchstate_pointer::unescape_component;
///
/// assert_eq!(unescape_component("a~0b"), "a~b");
/// assert_eq!(unescape_component("c~1d"), "c/d");
/// assert_eq!(unescape_component("no-escapes"), "no-escapes");
/// ```
pub fn unescape_component(component: &str) -> String {
    if !component.contains('~') {
        return component.to_string();
    }
    // Order matters: ~1 must be replaced before ~0
    component.replace("~1", "/").replace("~0", "~")
}

/// Escapes a JSON Pointer path component.
///
/// Per RFC 6901, `/` is replaced with `~1` and `~` is replaced with `~0`.
///
/// # Example
///
/// ```
/// use patchstate_pointer::escape_component;
///
/// assert_eq!(escape_component("a~b"), "a~0b");
/// assert_eq!(escape_component("c/d"), "c~1d");
/// ```
pub fn escape_component(component: &str) -> String {
    if !component.contains('/') && !component.contains('~') {
        return component.to_string();
    }
    // Order matters: ~ must be escaped before /
    component.replace('~', "~0").replace('/', "~1")
}

/// Parse a JSON Pointer string into path components.
///
/// - Empty string returns an empty vec (the root)
/// - The leading `/` is stripped; a pointer without one is read as if it had it
/// - Each component is unescaped
///
/// # Example
///
/// ```
/// use patchstate_pointer::parse_json_pointer;
///
/// assert_eq!(parse_json_pointer(""), Vec::<String>::new());
/// assert_eq!(parse_json_pointer("/"), vec![""]);
/// assert_eq!(parse_json_pointer("/foo/bar"), vec!["foo", "bar"]);
/// assert_eq!(parse_json_pointer("foo/bar"), vec!["foo", "bar"]);
/// assert_eq!(parse_json_pointer("/a~0b/c~1d"), vec!["a~b", "c/d"]);
/// ```
pub fn parse_json_pointer(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    let body = pointer.strip_prefix('/').unwrap_or(pointer);
    body.split('/').map(unescape_component).collect()
}

/// Format path components into a JSON Pointer string.
///
/// Returns an empty string for the root path (empty components).
///
/// # Example
///
/// ```
/// use patchstate_pointer::format_json_pointer;
///
/// assert_eq!(format_json_pointer::<String>(&[]), "");
/// assert_eq!(format_json_pointer(&["foo", "bar"]), "/foo/bar");
/// assert_eq!(format_json_pointer(&[""]), "/");
/// ```
pub fn format_json_pointer<S: AsRef<str>>(path: &[S]) -> String {
    let mut out = String::with_capacity(path.len() * 8);
    for component in path {
        out.push('/');
        out.push_str(&escape_component(component.as_ref()));
    }
    out
}

/// Check if a string represents a valid non-negative integer array index.
///
/// Leading zeros are rejected, so every index has exactly one spelling.
///
/// # Example
///
/// ```
/// use patchstate_pointer::is_valid_index;
///
/// assert!(is_valid_index("0"));
/// assert!(is_valid_index("123"));
/// assert!(!is_valid_index("-1"));
/// assert!(!is_valid_index("01"));
/// assert!(!is_valid_index("abc"));
/// ```
pub fn is_valid_index(index: &str) -> bool {
    if index.is_empty() {
        return false;
    }
    let bytes = index.as_bytes();
    // First char can't be leading zero unless it's just "0"
    if bytes.len() > 1 && bytes[0] == b'0' {
        return false;
    }
    bytes.iter().all(|&b| b.is_ascii_digit())
}

/// Parse an array index step, `None` for anything that is not a canonical
/// non-negative integer (including the `-` append marker).
pub fn parse_index(step: &str) -> Option<usize> {
    if !is_valid_index(step) {
        return None;
    }
    step.parse().ok()
}

/// A tree that can be walked one pointer segment at a time.
pub trait Traverse {
    /// Returns the child addressed by `key`, or `None` when it is absent.
    fn step(&self, key: &str) -> Option<&Self>;
}

impl Traverse for Value {
    fn step(&self, key: &str) -> Option<&Self> {
        match self {
            Value::Object(map) => map.get(key),
            Value::Array(arr) => arr.get(parse_index(key)?),
            _ => None,
        }
    }
}

/// Resolve `pointer` against `root`.
///
/// Missing keys, out-of-range indices and steps into scalars all resolve to
/// `None`; resolution never fails.
pub fn resolve<'a, V: Traverse>(pointer: &Pointer, root: &'a V) -> Option<&'a V> {
    pointer
        .segments()
        .iter()
        .try_fold(root, |node, key| node.step(key))
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PointerError {
    #[error("NO_PARENT")]
    NoParent,
    #[error("POINTER_INVALID: {0}")]
    Invalid(#[from] ValidationError),
}
