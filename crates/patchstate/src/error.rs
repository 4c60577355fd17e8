//! Error types for the store, the remote proxy, and configuration.

use std::time::Duration;

use patchstate_pointer::Pointer;
use thiserror::Error;

use crate::patch::PatchError;

/// Typed access to a path snapshot failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("value at {pointer:?} does not decode: {source}")]
    Decode {
        pointer: Pointer,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request {id} timed out after {after:?}")]
    Timeout { id: u64, after: Duration },
    #[error("remote channel disconnected")]
    Disconnected,
    #[error("malformed response: {0}")]
    Codec(#[from] PatchError),
    #[error("transport failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
