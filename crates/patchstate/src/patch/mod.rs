//! Patch engine: ordered `add`/`replace`/`remove` batches over a shared
//! [`Value`](crate::value::Value) tree, with undo generation.
//!
//! # Semantics
//!
//! - `add` inserts into arrays (RFC 6902 style, `-` appends) and puts object
//!   keys, overwriting an existing key. Missing ancestors are created as
//!   objects when the deepest existing one is an object.
//! - `replace` and `remove` only act on existing slots; anything else is a
//!   silent no-op that contributes no undo op.
//! - Nothing here returns an error; malformed addresses resolve as absent.

pub mod types;
pub mod apply;
pub mod codec;

pub use types::{Op, PatchError, PatchResult};
pub use apply::{apply_op, apply_patch};
pub use codec::{from_value, to_value};
