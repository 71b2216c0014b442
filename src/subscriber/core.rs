use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;

use super::builder::{SubscriberBuilder, SubscriberConfig};
use super::request::build_subscribe_request;
use super::state::{SubscriberInner, SubscriberState};
use super::subscriptions::is_presence_name;
use crate::infrastructure::{ClientStateStore, Heartbeat};
use crate::listener::ListenerRegistry;
use crate::transport::{Operation, Transport, TransportRequest};
use crate::types::Result;
use crate::types::constants::RETRY_INTERVAL;
use crate::types::status::{CursorSnapshot, StatusCategory, SubscribeStatus};

/// Long-poll subscriber for the PulseGrid real-time network.
///
/// The subscriber keeps the membership of channels, channel groups and
/// presence channels, drives the subscribe loop against the transport, and
/// fans completions, messages and presence events out to the listener
/// registry. Handles are cheap to clone and share one loop.
///
/// # Example
///
/// ```no_run
/// use pulsegrid_realtime_rs::{Subscriber, SubscriberConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let subscriber = Subscriber::new(SubscriberConfig {
///     subscribe_key: "demo".to_string(),
///     endpoint: "https://realtime.pulsegrid.example".to_string(),
///     ..Default::default()
/// })?;
///
/// let mut messages = subscriber.listeners().messages().await;
/// subscriber.add_channels(["news"]).await;
/// subscriber.subscribe(true, None).await;
///
/// while let Some(message) = messages.recv().await {
///     println!("{} -> {}", message.channel, message.payload);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Subscriber {
    pub(crate) config: Arc<SubscriberConfig>,
    pub(crate) inner: Arc<RwLock<SubscriberInner>>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) heartbeat: Arc<dyn Heartbeat>,
    pub(crate) listeners: Arc<ListenerRegistry>,
    pub(crate) state_store: Arc<ClientStateStore>,
}

impl Subscriber {
    /// Creates a subscriber with the default HTTP transport.
    ///
    /// # Errors
    ///
    /// Returns [`RealtimeError::Configuration`](crate::types::RealtimeError)
    /// when the subscribe key is missing, or a URL error for an unusable
    /// endpoint.
    pub fn new(config: SubscriberConfig) -> Result<Self> {
        SubscriberBuilder::new(config).build()
    }

    /// Builder entry point for injecting a custom transport or heartbeat.
    pub fn builder(config: SubscriberConfig) -> SubscriberBuilder {
        SubscriberBuilder::new(config)
    }

    /// Registry handing out listener streams for statuses, messages and
    /// presence events.
    pub fn listeners(&self) -> Arc<ListenerRegistry> {
        Arc::clone(&self.listeners)
    }

    /// Per-object presence state announced on each subscribe.
    pub fn client_state(&self) -> Arc<ClientStateStore> {
        Arc::clone(&self.state_store)
    }

    pub fn config(&self) -> &SubscriberConfig {
        &self.config
    }

    /// Adds channels to the membership; presence-suffixed names are routed
    /// to the presence set. Takes effect on the next subscribe.
    pub async fn add_channels<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.write().await.subscriptions.add_channels(names);
    }

    /// Removes the given names from both the channel and presence sets.
    pub async fn remove_channels<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner.write().await.subscriptions.remove_channels(names);
    }

    pub async fn add_channel_groups<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .write()
            .await
            .subscriptions
            .add_channel_groups(names);
    }

    pub async fn remove_channel_groups<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner
            .write()
            .await
            .subscriptions
            .remove_channel_groups(names);
    }

    pub async fn add_presence_channels<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner
            .write()
            .await
            .subscriptions
            .add_presence_channels(names);
    }

    pub async fn remove_presence_channels<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.inner
            .write()
            .await
            .subscriptions
            .remove_presence_channels(names);
    }

    pub async fn channels(&self) -> Vec<String> {
        self.inner.read().await.subscriptions.channels()
    }

    pub async fn channel_groups(&self) -> Vec<String> {
        self.inner.read().await.subscriptions.channel_groups()
    }

    pub async fn presence_channels(&self) -> Vec<String> {
        self.inner.read().await.subscriptions.presence_channels()
    }

    /// Every subscribed object: channels, presence companions and groups.
    pub async fn subscribed_objects(&self) -> Vec<String> {
        self.inner.read().await.subscriptions.all()
    }

    pub async fn state(&self) -> SubscriberState {
        self.inner.read().await.state
    }

    pub async fn cursor(&self) -> CursorSnapshot {
        self.inner.read().await.cursor.snapshot()
    }

    /// Whether a retry wake-up is currently scheduled.
    pub async fn retry_pending(&self) -> bool {
        self.inner.read().await.retry.is_armed()
    }

    /// Starts or continues the subscribe loop.
    ///
    /// `initial` marks a user-driven (re)start: the cursor is parked for
    /// catch-up, and any in-flight long poll is superseded. The loop itself
    /// re-enters with `initial = false` after each completion. With nothing
    /// subscribed, the call completes as a disconnect instead of polling.
    ///
    /// `state` carries per-object presence state to announce with this
    /// cycle; it is merged into [`client_state`](Self::client_state) and
    /// re-announced on every following cycle.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use pulsegrid_realtime_rs::{Subscriber, SubscriberConfig};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let subscriber = Subscriber::new(SubscriberConfig {
    /// #     subscribe_key: "demo".to_string(),
    /// #     endpoint: "https://realtime.pulsegrid.example".to_string(),
    /// #     ..Default::default()
    /// # })?;
    /// subscriber.add_channels(["news", "alerts"]).await;
    /// subscriber.subscribe(true, None).await;
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe(
        &self,
        initial: bool,
        state: Option<HashMap<String, Value>>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let mut inner = self.inner.write().await;
            inner.retry.stop();

            if inner.subscriptions.is_empty() {
                let mut status = SubscribeStatus::new(StatusCategory::Disconnected, false);
                inner.apply_transition(SubscriberState::Disconnected, &mut status);
                inner.fill_snapshot(&mut status);
                drop(inner);

                tracing::info!("nothing subscribed, completing as disconnected");
                self.transport.cancel_outstanding();
                self.listeners.notify_status(status).await;
                return;
            }

            if initial {
                inner.cursor.promote_to_last();
            }

            let request = build_subscribe_request(
                &inner.subscriptions,
                inner.cursor.current(),
                state.as_ref(),
                &self.config,
                &self.state_store,
            )
            .await;
            drop(inner);

            if initial {
                // A user-driven subscribe supersedes whatever poll is in flight.
                self.transport.cancel_outstanding();
            }

            tracing::debug!(
                timetoken = request.timetoken,
                channels = ?request.channels,
                "submitting subscribe request"
            );
            let subscriber = self.clone();
            tokio::spawn(async move {
                let completion = subscriber.transport.send(request).await;
                subscriber.handle_response(completion).await;
            });
        })
    }

    pub(crate) async fn continue_subscription_cycle(&self) {
        self.subscribe(false, None).await;
    }

    /// Stops listening on the given channels.
    ///
    /// The names must already be removed from the membership (see
    /// [`remove_channels`](Self::remove_channels)); this call announces the
    /// leave, completes as disconnected, and restarts the loop on whatever
    /// membership remains. Presence-only names need no leave announcement.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use pulsegrid_realtime_rs::{Subscriber, SubscriberConfig};
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// # let subscriber = Subscriber::new(SubscriberConfig {
    /// #     subscribe_key: "demo".to_string(),
    /// #     endpoint: "https://realtime.pulsegrid.example".to_string(),
    /// #     ..Default::default()
    /// # })?;
    /// subscriber.remove_channels(["news"]).await;
    /// subscriber.unsubscribe_channels(["news"]).await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn unsubscribe_channels<I, S>(&self, objects: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unsubscribe(true, objects.into_iter().map(Into::into).collect())
            .await;
    }

    /// Stops listening on the given channel groups. See
    /// [`unsubscribe_channels`](Self::unsubscribe_channels).
    pub async fn unsubscribe_channel_groups<I, S>(&self, objects: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unsubscribe(false, objects.into_iter().map(Into::into).collect())
            .await;
    }

    async fn unsubscribe(&self, channels: bool, objects: Vec<String>) {
        self.state_store.remove(&objects).await;

        let leave: Vec<String> = objects
            .iter()
            .filter(|name| !is_presence_name(name))
            .cloned()
            .collect();

        if leave.is_empty() {
            // Presence-only removal needs no leave announcement.
            if let Some(status) = self.transition_status(SubscriberState::Disconnected).await {
                self.listeners.notify_status(status).await;
            }
            self.subscribe(true, None).await;
            self.acknowledge().await;
            return;
        }

        let request = TransportRequest {
            operation: Operation::Unsubscribe,
            channels: if channels { leave.clone() } else { Vec::new() },
            channel_groups: if channels { Vec::new() } else { leave },
            timetoken: 0,
            heartbeat: None,
            state: None,
        };
        tracing::debug!(
            channels = ?request.channels,
            groups = ?request.channel_groups,
            "announcing leave"
        );
        // Local teardown proceeds whatever the announcement's outcome.
        let _ = self.transport.send(request).await;

        if let Some(status) = self.transition_status(SubscriberState::Disconnected).await {
            self.listeners.notify_status(status).await;
        }
        self.acknowledge().await;
        self.subscribe(true, None).await;
    }

    /// Restarts the loop after an unexpected disconnect, when a catch-up
    /// position and a non-empty membership are still available.
    pub async fn restore_if_required(&self) {
        let should_restore = {
            let inner = self.inner.read().await;
            inner.state == SubscriberState::DisconnectedUnexpectedly
                && inner.cursor.current() > 0
                && inner.cursor.last() > 0
                && !inner.subscriptions.is_empty()
        };

        if should_restore {
            tracing::info!("restoring interrupted subscription");
            self.subscribe(true, None).await;
        }
    }

    async fn transition_status(&self, to: SubscriberState) -> Option<SubscribeStatus> {
        let mut inner = self.inner.write().await;
        let mut status = SubscribeStatus::new(StatusCategory::Acknowledgment, false);
        inner.apply_transition(to, &mut status).then_some(status)
    }

    async fn acknowledge(&self) {
        let mut status = SubscribeStatus::new(StatusCategory::Acknowledgment, false);
        self.inner.read().await.fill_snapshot(&mut status);
        self.listeners.notify_status(status).await;
    }

    pub(crate) fn retry_delay(&self) -> Duration {
        self.config.retry_delay.unwrap_or(RETRY_INTERVAL)
    }
}
