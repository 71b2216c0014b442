use std::collections::HashMap;

use serde_json::Value;

use crate::infrastructure::ClientStateStore;
use crate::subscriber::builder::SubscriberConfig;
use crate::subscriber::subscriptions::SubscriptionSet;
use crate::transport::{Operation, TransportRequest};

/// Builds the parameter bundle for the next subscribe long poll.
///
/// Caller-supplied per-object state is merged into the store over everything
/// currently subscribed, so the announced state both reaches this request
/// and persists for the following cycles.
pub(crate) async fn build_subscribe_request(
    subscriptions: &SubscriptionSet,
    timetoken: u64,
    caller_state: Option<&HashMap<String, Value>>,
    config: &SubscriberConfig,
    store: &ClientStateStore,
) -> TransportRequest {
    let channels = subscriptions.subscribe_names();
    let channel_groups = subscriptions.channel_groups();

    let mut scope = channels.clone();
    scope.extend(channel_groups.iter().cloned());
    let merged = store.merged_state(caller_state, &scope).await;

    TransportRequest {
        operation: Operation::Subscribe,
        channels,
        channel_groups,
        timetoken,
        heartbeat: (config.presence_heartbeat_value > 0).then_some(config.presence_heartbeat_value),
        state: (!merged.is_empty())
            .then(|| Value::Object(merged.into_iter().collect::<serde_json::Map<_, _>>())),
    }
}
