//! Message envelopes exchanged between a [`RemoteStore`](super::RemoteStore)
//! and its host.
//!
//! ```json
//! {"id": 3, "type": "apply", "payload": [{"op": "add", "path": "/a", "value": 1}]}
//! {"id": 3, "result": [{"op": "remove", "path": "/a"}]}
//! {"notify": 2}
//! ```

use patchstate_pointer::Pointer;
use serde::{Deserialize, Deserializer, Serialize};

use crate::patch::Op;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    #[serde(flatten)]
    pub body: RequestBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RequestBody {
    /// Live value at the pointer.
    Get(Pointer),
    /// Snapshot for a new path.
    Path(Pointer),
    /// Element `index` of the array at `path`.
    At { path: Pointer, index: usize },
    /// Apply without invalidating; the result is the undo list.
    Apply(Vec<Op>),
    Invalidate,
    /// Watch the pointers under this request's id.
    Subscribe(Vec<Pointer>),
    /// Drop the subscription created by the request with this id.
    Unsubscribe(u64),
}

impl RequestBody {
    pub fn kind(&self) -> &'static str {
        match self {
            RequestBody::Get(_) => "get",
            RequestBody::Path(_) => "path",
            RequestBody::At { .. } => "at",
            RequestBody::Apply(_) => "apply",
            RequestBody::Invalidate => "invalidate",
            RequestBody::Subscribe(_) => "subscribe",
            RequestBody::Unsubscribe(_) => "unsubscribe",
        }
    }
}

/// `result` is `None` when the key is missing, which is how an absent value
/// travels; an explicit `null` is `Some(Value::Null)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub result: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// A host-side subscription fired. `notify` is the id of the subscribe
/// request that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub notify: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    Response(Response),
    Notification(Notification),
}
