//! Host side: run a local [`Store`] behind a request stream.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::protocol::{Inbound, Notification, Request, RequestBody, Response};
use crate::patch::codec;
use crate::path::NO_SEGMENTS;
use crate::store::{Store, Subscription};
use crate::value::Value;

/// Handle requests strictly in arrival order until `requests` closes, then
/// drop every subscription this host created and hand the store back.
///
/// Subscription callbacks push notifications onto `outbound` synchronously
/// during an invalidation pass, so they always precede the response to the
/// `invalidate` request that caused them.
pub async fn serve(
    mut store: Store,
    mut requests: mpsc::UnboundedReceiver<Request>,
    outbound: mpsc::UnboundedSender<Inbound>,
) -> Store {
    let mut subscriptions: HashMap<u64, Subscription> = HashMap::new();
    while let Some(Request { id, body }) = requests.recv().await {
        debug!(id, kind = body.kind(), "handling request");
        let result = match body {
            RequestBody::Get(pointer) => store.resolve(&pointer),
            RequestBody::Path(pointer) => store.path(pointer, NO_SEGMENTS).into_value(),
            RequestBody::At { path, index } => {
                let array = store.path(path, NO_SEGMENTS);
                store.at(&array, index).into_value()
            }
            RequestBody::Apply(ops) => Some(codec::to_value(&store.apply(&ops, false))),
            RequestBody::Invalidate => {
                store.invalidate();
                Some(Value::Null)
            }
            RequestBody::Subscribe(pointers) => {
                let tx = outbound.clone();
                let subscription = store.on_change(pointers, move || {
                    let _ = tx.send(Inbound::Notification(Notification { notify: id }));
                });
                subscriptions.insert(id, subscription);
                Some(Value::Null)
            }
            RequestBody::Unsubscribe(target) => {
                let removed = subscriptions
                    .remove(&target)
                    .is_some_and(|subscription| subscription.remove());
                Some(Value::from(removed))
            }
        };
        if outbound.send(Inbound::Response(Response { id, result })).is_err() {
            warn!(id, "client went away; stopping host");
            break;
        }
    }
    for subscription in subscriptions.into_values() {
        subscription.remove();
    }
    store
}
