// Transport seam - the subscriber core treats the network as a request
// executor with cancellable operations.
pub mod http;
pub mod mock;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::constants::EMPTY_CHANNEL_SEGMENT;
use crate::types::envelope::SubscribeEnvelope;
use crate::types::status::StatusCategory;

pub use http::LongPollTransport;
pub use mock::{MockCompletion, MockTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Subscribe,
    Unsubscribe,
    Heartbeat,
}

/// Parameter bundle for one request, produced by the request builder.
///
/// Serialization into a concrete URL is the transport's job; the bundle only
/// fixes the path substitutions and query values.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub operation: Operation,
    /// Channel names for the path, presence companions included.
    pub channels: Vec<String>,
    /// Channel-group names for the `channel-group` query parameter.
    pub channel_groups: Vec<String>,
    pub timetoken: u64,
    /// `heartbeat` query parameter, omitted when not configured.
    pub heartbeat: Option<u64>,
    /// Merged per-object presence state, omitted when empty.
    pub state: Option<Value>,
}

impl TransportRequest {
    /// Comma-joined channel list for the path, or the `","` placeholder when
    /// only channel groups are subscribed.
    pub fn channels_path_component(&self) -> String {
        if self.channels.is_empty() {
            EMPTY_CHANNEL_SEGMENT.to_string()
        } else {
            self.channels.join(",")
        }
    }

    pub fn timetoken_path_component(&self) -> String {
        self.timetoken.to_string()
    }
}

/// Completion reported by the transport for every issued request.
#[derive(Debug, Clone)]
pub struct TransportStatus {
    pub category: StatusCategory,
    pub error: bool,
    /// Decoded body for successful subscribe completions.
    pub envelope: Option<SubscribeEnvelope>,
    /// The originating request, threading its time token back to the core.
    pub request: TransportRequest,
}

impl TransportStatus {
    pub fn success(request: TransportRequest, envelope: SubscribeEnvelope) -> Self {
        Self {
            category: StatusCategory::Acknowledgment,
            error: false,
            envelope: Some(envelope),
            request,
        }
    }

    pub fn acknowledged(request: TransportRequest) -> Self {
        Self {
            category: StatusCategory::Acknowledgment,
            error: false,
            envelope: None,
            request,
        }
    }

    pub fn failure(request: TransportRequest, category: StatusCategory) -> Self {
        Self {
            category,
            error: true,
            envelope: None,
            request,
        }
    }

    pub fn cancelled(request: TransportRequest) -> Self {
        Self {
            category: StatusCategory::Cancelled,
            error: false,
            envelope: None,
            request,
        }
    }
}

/// Request executor the subscribe loop runs against.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues the request and resolves with its completion, including
    /// cancellation and failures; `send` itself never panics or errors.
    async fn send(&self, request: TransportRequest) -> TransportStatus;

    /// Cancels in-flight requests; pending `send` calls resolve with a
    /// `Cancelled` completion.
    fn cancel_outstanding(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(channels: &[&str]) -> TransportRequest {
        TransportRequest {
            operation: Operation::Subscribe,
            channels: channels.iter().map(|s| s.to_string()).collect(),
            channel_groups: Vec::new(),
            timetoken: 0,
            heartbeat: None,
            state: None,
        }
    }

    #[test]
    fn test_channels_path_component_joins_names() {
        assert_eq!(
            request(&["a", "b-pnpres"]).channels_path_component(),
            "a,b-pnpres"
        );
    }

    #[test]
    fn test_channels_path_component_placeholder_when_empty() {
        assert_eq!(request(&[]).channels_path_component(), ",");
    }
}
