use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use super::core::Subscriber;
use super::state::SubscriberInner;
use crate::infrastructure::{ClientStateStore, Heartbeat, HeartbeatManager};
use crate::listener::ListenerRegistry;
use crate::transport::{LongPollTransport, Transport};
use crate::types::{RealtimeError, Result};

/// Configuration of the subscribe loop, read per cycle and never mutated.
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    /// Key identifying the subscription scope on the service.
    pub subscribe_key: String,
    /// Base URL of the service, e.g. `https://realtime.pulsegrid.example`.
    pub endpoint: String,
    /// Client identity; generated when left empty. Used to recognize our own
    /// presence state changes.
    pub uuid: String,
    /// Reconnect instead of forgetting the membership on network loss.
    pub restore_subscription: bool,
    /// On restore, park the cursor so delivery resumes where it stopped.
    pub try_catch_up_on_subscription_restore: bool,
    /// On an initial subscribe after a membership change, reuse the previous
    /// cursor instead of the fresh server-issued one.
    pub keep_timetoken_on_list_change: bool,
    /// Presence heartbeat value in seconds; zero disables announcing.
    pub presence_heartbeat_value: u64,
    /// Delay before re-issuing a failed subscribe; defaults to one second.
    pub retry_delay: Option<Duration>,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            subscribe_key: String::new(),
            endpoint: String::new(),
            uuid: String::new(),
            restore_subscription: true,
            try_catch_up_on_subscription_restore: true,
            keep_timetoken_on_list_change: true,
            presence_heartbeat_value: 0,
            retry_delay: None,
        }
    }
}

/// Builder wiring the subscriber to its transport and heartbeat service.
pub struct SubscriberBuilder {
    config: SubscriberConfig,
    transport: Option<Arc<dyn Transport>>,
    heartbeat: Option<Arc<dyn Heartbeat>>,
}

impl SubscriberBuilder {
    pub fn new(config: SubscriberConfig) -> Self {
        Self {
            config,
            transport: None,
            heartbeat: None,
        }
    }

    /// Replaces the default HTTP transport, e.g. with a
    /// [`MockTransport`](crate::transport::MockTransport) in tests.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Arc<dyn Heartbeat>) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn build(mut self) -> Result<Subscriber> {
        if self.config.uuid.is_empty() {
            self.config.uuid = uuid::Uuid::new_v4().to_string();
        }

        let transport: Arc<dyn Transport> = match self.transport.take() {
            Some(transport) => transport,
            None => {
                if self.config.subscribe_key.is_empty() {
                    return Err(RealtimeError::Configuration(
                        "subscribe key is required".to_string(),
                    ));
                }
                Arc::new(LongPollTransport::new(
                    &self.config.endpoint,
                    &self.config.subscribe_key,
                    &self.config.uuid,
                )?)
            }
        };

        let inner = Arc::new(RwLock::new(SubscriberInner::new()));
        let heartbeat: Arc<dyn Heartbeat> = match self.heartbeat.take() {
            Some(heartbeat) => heartbeat,
            None => Arc::new(HeartbeatManager::new(
                Arc::downgrade(&transport),
                Arc::downgrade(&inner),
                self.config.presence_heartbeat_value,
            )),
        };

        Ok(Subscriber {
            config: Arc::new(self.config),
            inner,
            transport,
            heartbeat,
            listeners: Arc::new(ListenerRegistry::new()),
            state_store: Arc::new(ClientStateStore::new()),
        })
    }
}
