//! Reactive state container.
//!
//! A [`Store`] owns one root [`Value`] and changes it only through ordered
//! batches of [`Op`]s. Every batch yields the operations that undo it, and
//! subscribers are notified per address rather than per tree.
//! [`RemoteStore`] offers the same surface over an asynchronous channel.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! use patchstate::{Op, Store, Value, NO_SEGMENTS};
//! use serde_json::json;
//!
//! let mut store = Store::new(json!({"todos": [{"title": "write", "done": false}]}));
//!
//! let fired = Arc::new(AtomicUsize::new(0));
//! let counter = fired.clone();
//! let todos = store.path("/todos", NO_SEGMENTS);
//! let first = store.at(&todos, 0);
//! let _sub = store.on_change([&first], move || {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! let undo = store.apply(&[Op::replace("/todos/0/done", true)], true);
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! assert_eq!(undo, vec![Op::replace("/todos/0/done", false)]);
//!
//! store.apply(&undo, true);
//! let original = Value::from(json!({"todos": [{"title": "write", "done": false}]}));
//! assert_eq!(store.root(), &original);
//! ```

pub mod config;
pub mod error;
pub mod patch;
pub mod path;
pub mod remote;
pub mod store;
pub mod value;

mod util;

pub use config::RemoteConfig;
pub use error::{ConfigError, RemoteError, StoreError};
pub use patch::{apply_op, apply_patch, Op, PatchError, PatchResult};
pub use path::{Indexed, Path, NO_SEGMENTS};
pub use patchstate_pointer::{Pointer, PointerError, Segment};
pub use remote::{Channel, Correlator, RemoteStore, RemoteSubscription};
pub use store::{Emitter, EventBus, Listener, Store, StoreEvent, Subscription};
pub use value::{Map, Value};
