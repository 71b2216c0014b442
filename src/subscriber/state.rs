use crate::infrastructure::RetryTimer;
use crate::subscriber::cursor::Cursor;
use crate::subscriber::subscriptions::SubscriptionSet;
use crate::types::status::{StatusCategory, SubscribeStatus};

/// Lifecycle of the subscribe loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    /// Never connected since creation.
    Initialized,
    /// An initial subscribe completed successfully.
    Connected,
    /// Stopped by the user (full unsubscribe).
    Disconnected,
    /// Interrupted by a network, TLS, timeout or protocol failure.
    DisconnectedUnexpectedly,
    /// The service denied access to the subscribed objects.
    AccessRightsError,
}

impl SubscriberState {
    /// Category emitted when moving to `to`, or `None` when the transition
    /// relation disallows the move.
    pub fn transition_category(self, to: SubscriberState) -> Option<StatusCategory> {
        use SubscriberState::*;

        match (self, to) {
            (Initialized | Disconnected | AccessRightsError, Connected) => {
                Some(StatusCategory::Connected)
            }
            (DisconnectedUnexpectedly, Connected) => Some(StatusCategory::Reconnected),
            (Initialized | Connected, Disconnected) => Some(StatusCategory::Disconnected),
            (Initialized | Connected, DisconnectedUnexpectedly) => {
                Some(StatusCategory::UnexpectedDisconnect)
            }
            (_, AccessRightsError) => Some(StatusCategory::AccessDenied),
            _ => None,
        }
    }
}

/// Consolidated mutable state of the subscriber.
///
/// All writers go through one lock, so membership, cursor, lifecycle state
/// and the retry slot always change together.
#[derive(Debug)]
pub(crate) struct SubscriberInner {
    pub(crate) subscriptions: SubscriptionSet,
    pub(crate) cursor: Cursor,
    pub(crate) state: SubscriberState,
    pub(crate) retry: RetryTimer,
}

impl SubscriberInner {
    pub(crate) fn new() -> Self {
        Self {
            subscriptions: SubscriptionSet::new(),
            cursor: Cursor::default(),
            state: SubscriberState::Initialized,
            retry: RetryTimer::new(),
        }
    }

    /// Moves to `to` if the transition relation allows it, annotating
    /// `status` with the emitted category and the subscriber snapshot.
    /// Disallowed transitions leave both state and status untouched.
    pub(crate) fn apply_transition(
        &mut self,
        to: SubscriberState,
        status: &mut SubscribeStatus,
    ) -> bool {
        let Some(category) = self.state.transition_category(to) else {
            return false;
        };

        // Completing with an empty set before ever connecting is not a
        // disconnect; the stored state stays Initialized.
        if !(to == SubscriberState::Disconnected && self.state == SubscriberState::Initialized) {
            tracing::debug!(from = ?self.state, ?to, "subscriber state changed");
            self.state = to;
        }

        status.category = category;
        self.fill_snapshot(status);
        true
    }

    /// Stamps `status` with the current cursor and membership.
    pub(crate) fn fill_snapshot(&self, status: &mut SubscribeStatus) {
        status.cursor = self.cursor.snapshot();
        status.channels = self.subscriptions.channels();
        status.channel_groups = self.subscriptions.channel_groups();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_paths_emit_connected() {
        for from in [
            SubscriberState::Initialized,
            SubscriberState::Disconnected,
            SubscriberState::AccessRightsError,
        ] {
            assert_eq!(
                from.transition_category(SubscriberState::Connected),
                Some(StatusCategory::Connected)
            );
        }
    }

    #[test]
    fn test_reconnect_only_after_unexpected_disconnect() {
        assert_eq!(
            SubscriberState::DisconnectedUnexpectedly
                .transition_category(SubscriberState::Connected),
            Some(StatusCategory::Reconnected)
        );
        assert_ne!(
            SubscriberState::Disconnected.transition_category(SubscriberState::Connected),
            Some(StatusCategory::Reconnected)
        );
    }

    #[test]
    fn test_access_denied_reachable_from_every_state() {
        for from in [
            SubscriberState::Initialized,
            SubscriberState::Connected,
            SubscriberState::Disconnected,
            SubscriberState::DisconnectedUnexpectedly,
            SubscriberState::AccessRightsError,
        ] {
            assert_eq!(
                from.transition_category(SubscriberState::AccessRightsError),
                Some(StatusCategory::AccessDenied)
            );
        }
    }

    #[test]
    fn test_disallowed_transitions_yield_none() {
        assert_eq!(
            SubscriberState::Disconnected.transition_category(SubscriberState::Disconnected),
            None
        );
        assert_eq!(
            SubscriberState::DisconnectedUnexpectedly
                .transition_category(SubscriberState::Disconnected),
            None
        );
        assert_eq!(
            SubscriberState::AccessRightsError
                .transition_category(SubscriberState::DisconnectedUnexpectedly),
            None
        );
    }

    #[test]
    fn test_never_connected_disconnect_keeps_initialized() {
        let mut inner = SubscriberInner::new();
        let mut status = SubscribeStatus::new(StatusCategory::Unknown, false);

        assert!(inner.apply_transition(SubscriberState::Disconnected, &mut status));
        assert_eq!(status.category, StatusCategory::Disconnected);
        assert_eq!(inner.state, SubscriberState::Initialized);

        // Still emits on repetition, because the stored state never moved.
        let mut repeat = SubscribeStatus::new(StatusCategory::Unknown, false);
        assert!(inner.apply_transition(SubscriberState::Disconnected, &mut repeat));
        assert_eq!(repeat.category, StatusCategory::Disconnected);
    }

    #[test]
    fn test_rejected_transition_leaves_status_untouched() {
        let mut inner = SubscriberInner::new();
        inner.state = SubscriberState::Disconnected;

        let mut status = SubscribeStatus::new(StatusCategory::Unknown, false);
        assert!(!inner.apply_transition(SubscriberState::Disconnected, &mut status));
        assert_eq!(status.category, StatusCategory::Unknown);
        assert_eq!(inner.state, SubscriberState::Disconnected);
    }

    #[test]
    fn test_snapshot_carries_cursor_and_membership() {
        let mut inner = SubscriberInner::new();
        inner.subscriptions.add_channels(["a", "b-pnpres"]);
        inner.subscriptions.add_channel_groups(["g"]);
        inner.cursor.advance(100);

        let mut status = SubscribeStatus::new(StatusCategory::Unknown, false);
        assert!(inner.apply_transition(SubscriberState::Connected, &mut status));

        assert_eq!(inner.state, SubscriberState::Connected);
        assert_eq!(status.cursor.timetoken, 100);
        assert_eq!(status.channels, vec!["a"]);
        assert_eq!(status.channel_groups, vec!["g"]);
    }
}
