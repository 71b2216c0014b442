//! # PulseGrid Realtime Rust
//!
//! A Rust subscriber core for the PulseGrid real-time messaging network.
//!
//! The subscriber drives a long-poll subscribe loop against the service: it
//! keeps the set of channels, channel groups and presence channels the client
//! listens on, advances a time-token cursor across cycles with catch-up
//! semantics, dispatches inbound messages and presence events to registered
//! listeners, and manages reconnection and access-control failures.
//!
//! ## Example
//!
//! ```no_run
//! use pulsegrid_realtime_rs::{Subscriber, SubscriberConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subscriber = Subscriber::new(SubscriberConfig {
//!         subscribe_key: "demo".to_string(),
//!         endpoint: "https://realtime.pulsegrid.example".to_string(),
//!         ..Default::default()
//!     })?;
//!
//!     let mut messages = subscriber.listeners().messages().await;
//!     subscriber.add_channels(["news"]).await;
//!     subscriber.subscribe(true, None).await;
//!
//!     while let Some(message) = messages.recv().await {
//!         println!("{} -> {}", message.channel, message.payload);
//!     }
//!     Ok(())
//! }
//! ```

pub mod infrastructure;
pub mod listener;
pub mod subscriber;
pub mod transport;
pub mod types;

pub use infrastructure::{ClientStateStore, Heartbeat, HeartbeatManager, RetryCancel, RetryTimer};
pub use listener::ListenerRegistry;
pub use subscriber::{
    Cursor, Subscriber, SubscriberBuilder, SubscriberConfig, SubscriberState, SubscriptionSet,
};
pub use transport::{
    LongPollTransport, MockTransport, Operation, Transport, TransportRequest, TransportStatus,
};
pub use types::{
    CursorSnapshot, MessageEvent, PresenceAction, PresenceEvent, PresencePayload, RawEvent,
    RealtimeError, Result, StatusCategory, SubscribeEnvelope, SubscribeStatus,
};
