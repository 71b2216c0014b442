use super::core::Subscriber;
use crate::subscriber::subscriptions::{base_name, is_presence_name};
use crate::types::envelope::{MessageEvent, PresenceAction, PresenceEvent};
use crate::types::status::{StatusCategory, SubscribeStatus};

impl Subscriber {
    /// Splits the batch carried by `status` into message and presence events
    /// and forwards them to the listener registry.
    ///
    /// Presence naming is normalized on the outbound copies only; the
    /// subscription set keeps the suffixed names. Once dispatched, the batch
    /// is drained from `status` so the enclosing status cannot re-deliver it.
    pub(crate) async fn dispatch_events(&self, status: &mut SubscribeStatus) {
        let Some(envelope) = status.response.take() else {
            return;
        };
        let universe = { self.inner.read().await.subscriptions.all() };

        for event in &envelope.events {
            let subscribed = match &event.subscribed_channel {
                Some(name) => name.clone(),
                // Some server responses omit the match; fall back to the only
                // thing the event can belong to, or drop it when membership
                // was cleared mid-flight.
                None => match universe.first() {
                    Some(name) => name.clone(),
                    None => {
                        tracing::warn!("dropping event with no resolvable channel");
                        continue;
                    }
                },
            };
            let actual = event
                .actual_channel
                .clone()
                .unwrap_or_else(|| subscribed.clone());

            let from_presence = is_presence_name(&subscribed) || is_presence_name(&actual);
            let channel = if from_presence {
                base_name(&actual).to_string()
            } else {
                actual
            };
            let subscription = if from_presence {
                base_name(&subscribed).to_string()
            } else {
                subscribed
            };

            if let Some(presence) = &event.presence {
                if presence.event == PresenceAction::StateChange
                    && presence.uuid == self.config.uuid
                    && let Some(state) = &presence.state
                {
                    // Our own announced state; keep the store in sync so the
                    // next subscribe re-announces it.
                    self.state_store.set(&channel, state.clone()).await;
                }

                self.listeners
                    .notify_presence(PresenceEvent {
                        channel,
                        subscription,
                        action: presence.event,
                        uuid: presence.uuid.clone(),
                        state: presence.state.clone(),
                        timestamp: presence.timestamp,
                        occupancy: presence.occupancy,
                    })
                    .await;
            } else {
                if event.decrypt_error {
                    let mut decrypt_status = status.clone();
                    decrypt_status.category = StatusCategory::DecryptionError;
                    decrypt_status.error = true;
                    decrypt_status.response = None;
                    self.listeners.notify_status(decrypt_status).await;
                }

                self.listeners
                    .notify_message(MessageEvent {
                        channel,
                        subscription,
                        payload: event.payload.clone(),
                        timetoken: envelope.timetoken,
                    })
                    .await;
            }
        }

        status.response = Some(envelope.drained());
    }
}
