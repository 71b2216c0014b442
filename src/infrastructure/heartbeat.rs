use std::sync::{Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time;

use crate::subscriber::SubscriberInner;
use crate::transport::{Operation, Transport, TransportRequest};

/// Presence-announce companion of the subscribe loop.
///
/// The subscriber only marks transition points; starting and stopping are
/// idempotent and owned here.
#[async_trait]
pub trait Heartbeat: Send + Sync {
    async fn start_if_required(&self);
    async fn stop_if_possible(&self);
}

/// Periodic presence announce over the subscriber's transport.
///
/// Disabled while the configured heartbeat value is zero. The task holds
/// only weak references, so a dropped subscriber ends the loop on its next
/// tick.
pub struct HeartbeatManager {
    heartbeat_value: u64,
    interval: Duration,
    transport: Weak<dyn Transport>,
    inner: Weak<RwLock<SubscriberInner>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatManager {
    pub(crate) fn new(
        transport: Weak<dyn Transport>,
        inner: Weak<RwLock<SubscriberInner>>,
        heartbeat_value: u64,
    ) -> Self {
        Self {
            heartbeat_value,
            interval: announce_interval(heartbeat_value),
            transport,
            inner,
            task: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().unwrap().is_some()
    }
}

#[async_trait]
impl Heartbeat for HeartbeatManager {
    async fn start_if_required(&self) {
        if self.heartbeat_value == 0 {
            return;
        }

        let mut task = self.task.lock().unwrap();
        if task.is_some() {
            return;
        }

        let interval = self.interval;
        let heartbeat_value = self.heartbeat_value;
        let transport = self.transport.clone();
        let inner = self.inner.clone();

        *task = Some(tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            // The first tick completes immediately; announcing is the
            // subscribe request's job at that point.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(transport) = transport.upgrade() else {
                    break;
                };
                let Some(inner) = inner.upgrade() else {
                    break;
                };

                let (channels, channel_groups) = {
                    let guard = inner.read().await;
                    (
                        guard.subscriptions.subscribe_names(),
                        guard.subscriptions.channel_groups(),
                    )
                };
                if channels.is_empty() && channel_groups.is_empty() {
                    continue;
                }

                let request = TransportRequest {
                    operation: Operation::Heartbeat,
                    channels,
                    channel_groups,
                    timetoken: 0,
                    heartbeat: Some(heartbeat_value),
                    state: None,
                };
                let completion = transport.send(request).await;
                if completion.error {
                    tracing::warn!(category = ?completion.category, "presence heartbeat failed");
                } else {
                    tracing::debug!("presence heartbeat sent");
                }
            }
        }));
        tracing::debug!(interval = ?self.interval, "heartbeat loop started");
    }

    async fn stop_if_possible(&self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
            tracing::debug!("heartbeat loop stopped");
        }
    }
}

impl Drop for HeartbeatManager {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().unwrap().take() {
            task.abort();
        }
    }
}

fn announce_interval(heartbeat_value: u64) -> Duration {
    Duration::from_secs((heartbeat_value / 2).saturating_sub(1).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use std::sync::Arc;

    fn manager(heartbeat_value: u64) -> (HeartbeatManager, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let inner = Arc::new(RwLock::new(SubscriberInner::new()));
        let dyn_transport: Arc<dyn Transport> = transport.clone();
        let weak_transport: Weak<dyn Transport> = Arc::downgrade(&dyn_transport);
        (
            HeartbeatManager::new(weak_transport, Arc::downgrade(&inner), heartbeat_value),
            transport,
        )
    }

    #[tokio::test]
    async fn test_disabled_when_value_is_zero() {
        let (manager, _transport) = manager(0);
        manager.start_if_required().await;
        assert!(!manager.is_running());
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let (manager, _transport) = manager(300);
        manager.start_if_required().await;
        manager.start_if_required().await;
        assert!(manager.is_running());
        manager.stop_if_possible().await;
        assert!(!manager.is_running());
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let (manager, _transport) = manager(300);
        manager.stop_if_possible().await;
        assert!(!manager.is_running());
    }

    #[test]
    fn test_announce_interval_derivation() {
        assert_eq!(announce_interval(300), Duration::from_secs(149));
        assert_eq!(announce_interval(2), Duration::from_secs(1));
    }
}
