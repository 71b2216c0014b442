use tokio::sync::{RwLock, mpsc};

use crate::types::constants::LISTENER_BUFFER_SIZE;
use crate::types::envelope::{MessageEvent, PresenceEvent};
use crate::types::status::SubscribeStatus;

/// Fan-out point between the subscribe loop and user code.
///
/// Listeners receive through buffered channels and consume on their own
/// tasks, so posting never runs user code while the subscriber holds its
/// lock and callbacks are free to call back into the subscriber.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    status_senders: RwLock<Vec<mpsc::Sender<SubscribeStatus>>>,
    message_senders: RwLock<Vec<mpsc::Sender<MessageEvent>>>,
    presence_senders: RwLock<Vec<mpsc::Sender<PresenceEvent>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener for connection lifecycle and completion statuses.
    pub async fn statuses(&self) -> mpsc::Receiver<SubscribeStatus> {
        let (tx, rx) = mpsc::channel(LISTENER_BUFFER_SIZE);
        self.status_senders.write().await.push(tx);
        rx
    }

    /// Registers a listener for message events.
    pub async fn messages(&self) -> mpsc::Receiver<MessageEvent> {
        let (tx, rx) = mpsc::channel(LISTENER_BUFFER_SIZE);
        self.message_senders.write().await.push(tx);
        rx
    }

    /// Registers a listener for presence events.
    pub async fn presence(&self) -> mpsc::Receiver<PresenceEvent> {
        let (tx, rx) = mpsc::channel(LISTENER_BUFFER_SIZE);
        self.presence_senders.write().await.push(tx);
        rx
    }

    pub async fn notify_status(&self, status: SubscribeStatus) {
        let senders = self.status_senders.read().await;
        for sender in senders.iter() {
            if let Err(error) = sender.send(status.clone()).await {
                tracing::warn!("status listener dropped: {error}");
            }
        }
    }

    pub async fn notify_message(&self, event: MessageEvent) {
        let senders = self.message_senders.read().await;
        for sender in senders.iter() {
            if let Err(error) = sender.send(event.clone()).await {
                tracing::warn!("message listener dropped: {error}");
            }
        }
    }

    pub async fn notify_presence(&self, event: PresenceEvent) {
        let senders = self.presence_senders.read().await;
        for sender in senders.iter() {
            if let Err(error) = sender.send(event.clone()).await {
                tracing::warn!("presence listener dropped: {error}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::status::StatusCategory;
    use serde_json::json;

    #[tokio::test]
    async fn test_statuses_fan_out_to_every_listener() {
        let registry = ListenerRegistry::new();
        let mut first = registry.statuses().await;
        let mut second = registry.statuses().await;

        registry
            .notify_status(SubscribeStatus::new(StatusCategory::Connected, false))
            .await;

        assert_eq!(
            first.recv().await.unwrap().category,
            StatusCategory::Connected
        );
        assert_eq!(
            second.recv().await.unwrap().category,
            StatusCategory::Connected
        );
    }

    #[tokio::test]
    async fn test_messages_preserve_order() {
        let registry = ListenerRegistry::new();
        let mut messages = registry.messages().await;

        for n in 0..3 {
            registry
                .notify_message(MessageEvent {
                    channel: "a".to_string(),
                    subscription: "a".to_string(),
                    payload: json!(n),
                    timetoken: 100 + n,
                })
                .await;
        }

        for n in 0..3 {
            assert_eq!(messages.recv().await.unwrap().payload, json!(n));
        }
    }

    #[tokio::test]
    async fn test_notify_with_dropped_listener_does_not_block() {
        let registry = ListenerRegistry::new();
        let presence = registry.presence().await;
        drop(presence);

        registry
            .notify_presence(PresenceEvent {
                channel: "a".to_string(),
                subscription: "a".to_string(),
                action: crate::types::envelope::PresenceAction::Join,
                uuid: "u-1".to_string(),
                state: None,
                timestamp: None,
                occupancy: None,
            })
            .await;
    }
}
