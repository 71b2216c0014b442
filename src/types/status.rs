use crate::infrastructure::RetryCancel;
use crate::types::envelope::SubscribeEnvelope;

/// Category attached to every status the subscriber produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCategory {
    Connected,
    Reconnected,
    Disconnected,
    UnexpectedDisconnect,
    AccessDenied,
    Cancelled,
    Timeout,
    MalformedResponse,
    TlsConnectionFailed,
    DecryptionError,
    Acknowledgment,
    Unknown,
}

impl StatusCategory {
    /// Failure categories that schedule an automatic re-subscribe.
    pub fn is_retriable(self) -> bool {
        matches!(
            self,
            Self::AccessDenied | Self::Timeout | Self::MalformedResponse | Self::TlsConnectionFailed
        )
    }
}

/// Cursor position captured when a status was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CursorSnapshot {
    pub timetoken: u64,
    pub last_timetoken: u64,
}

/// Status handed to listeners on every completion and lifecycle transition.
///
/// Once delivered, a status is read-only; the subscriber never mutates an
/// instance it has already posted.
#[derive(Debug, Clone)]
pub struct SubscribeStatus {
    pub category: StatusCategory,
    pub error: bool,
    /// Cursor of the subscriber at the time the status was produced.
    pub cursor: CursorSnapshot,
    /// Regular channels subscribed when the status was produced.
    pub channels: Vec<String>,
    /// Channel groups subscribed when the status was produced.
    pub channel_groups: Vec<String>,
    /// Whether the subscriber scheduled an automatic retry for this failure.
    pub auto_retry: bool,
    /// Hook to cancel a scheduled retry, present on user-cancellable retries.
    pub retry_cancel: Option<RetryCancel>,
    /// Response body for successful completions; events are drained out of it
    /// once dispatched, leaving only the time token.
    pub response: Option<SubscribeEnvelope>,
}

impl SubscribeStatus {
    pub(crate) fn new(category: StatusCategory, error: bool) -> Self {
        Self {
            category,
            error,
            cursor: CursorSnapshot::default(),
            channels: Vec::new(),
            channel_groups: Vec::new(),
            auto_retry: false,
            retry_cancel: None,
            response: None,
        }
    }
}
