use super::core::Subscriber;
use crate::subscriber::state::SubscriberState;
use crate::transport::TransportStatus;
use crate::types::envelope::SubscribeEnvelope;
use crate::types::status::{StatusCategory, SubscribeStatus};

enum Classification {
    Success(SubscribeEnvelope),
    Cancelled,
    Retriable(StatusCategory),
    Interrupted(StatusCategory),
}

fn classify(completion: &TransportStatus) -> Classification {
    if completion.category == StatusCategory::Cancelled {
        return Classification::Cancelled;
    }

    if !completion.error {
        return match &completion.envelope {
            Some(envelope) => Classification::Success(envelope.clone()),
            // A body-less success cannot advance the cursor; retry as a
            // protocol failure.
            None => Classification::Retriable(StatusCategory::MalformedResponse),
        };
    }

    if completion.category.is_retriable() {
        Classification::Retriable(completion.category)
    } else {
        Classification::Interrupted(completion.category)
    }
}

impl Subscriber {
    /// Entry point for every subscribe completion reported by the transport.
    ///
    /// Each completion first disarms any scheduled retry: the request it
    /// would have re-issued has returned.
    pub(crate) async fn handle_response(&self, completion: TransportStatus) {
        match classify(&completion) {
            Classification::Success(envelope) => self.handle_success(&completion, envelope).await,
            Classification::Cancelled => self.handle_cancelled().await,
            Classification::Retriable(category) => self.handle_retriable(category).await,
            Classification::Interrupted(category) => self.handle_interruption(category).await,
        }
    }

    async fn handle_success(&self, completion: &TransportStatus, envelope: SubscribeEnvelope) {
        let initial = completion.request.timetoken == 0;
        let mut status = SubscribeStatus::new(StatusCategory::Acknowledgment, false);

        {
            let mut inner = self.inner.write().await;
            inner.retry.stop();

            if initial && self.config.keep_timetoken_on_list_change && inner.cursor.last() > 0 {
                // Resume from the pre-change position; the fresh token the
                // server issued for this initial subscribe is discarded.
                inner.cursor.restore_from_last();
            } else {
                inner.cursor.advance(envelope.timetoken);
            }

            if initial {
                inner.apply_transition(SubscriberState::Connected, &mut status);
            }
            inner.fill_snapshot(&mut status);
        }

        status.response = Some(envelope);
        self.dispatch_events(&mut status).await;

        match status.category {
            StatusCategory::Connected => {
                tracing::info!(channels = ?status.channels, "subscribe loop connected");
            }
            StatusCategory::Reconnected => {
                tracing::info!(channels = ?status.channels, "subscribe loop reconnected");
            }
            _ => {
                tracing::debug!(timetoken = status.cursor.timetoken, "subscribe cycle completed");
            }
        }
        self.listeners.notify_status(status).await;

        self.heartbeat.start_if_required().await;
        self.continue_subscription_cycle().await;
    }

    async fn handle_cancelled(&self) {
        let mut status = SubscribeStatus::new(StatusCategory::Cancelled, false);
        {
            let inner = self.inner.write().await;
            inner.retry.stop();
            inner.fill_snapshot(&mut status);
        }

        // The superseding user action drives the loop from here.
        self.heartbeat.stop_if_possible().await;
        tracing::debug!("subscribe request superseded");
        self.listeners.notify_status(status).await;
    }

    async fn handle_retriable(&self, category: StatusCategory) {
        let mut status = SubscribeStatus::new(category, true);

        {
            let mut inner = self.inner.write().await;
            inner.retry.stop();

            status.auto_retry = true;
            status.retry_cancel = Some(inner.retry.cancel_handle());
            let cycle = {
                let subscriber = self.clone();
                async move { subscriber.continue_subscription_cycle().await }
            };
            inner.retry.start(self.retry_delay(), cycle);

            if category == StatusCategory::AccessDenied {
                inner.apply_transition(SubscriberState::AccessRightsError, &mut status);
            } else {
                status.category = StatusCategory::UnexpectedDisconnect;
                inner.apply_transition(SubscriberState::DisconnectedUnexpectedly, &mut status);
            }
            inner.fill_snapshot(&mut status);
        }

        tracing::warn!(?category, "subscribe failed, retry scheduled");
        self.listeners.notify_status(status).await;
    }

    async fn handle_interruption(&self, category: StatusCategory) {
        let mut status = SubscribeStatus::new(StatusCategory::UnexpectedDisconnect, true);

        let forgotten = {
            let mut inner = self.inner.write().await;
            inner.retry.stop();

            let mut forgotten = None;
            if self.config.restore_subscription {
                status.auto_retry = true;
                if self.config.try_catch_up_on_subscription_restore {
                    inner.cursor.promote_to_last();
                } else {
                    inner.cursor.reset();
                }
            } else {
                // A non-restorable loss forgets the membership entirely.
                forgotten = Some(inner.subscriptions.all());
                inner.subscriptions.clear();
            }

            inner.apply_transition(SubscriberState::DisconnectedUnexpectedly, &mut status);
            inner.fill_snapshot(&mut status);
            forgotten
        };

        if let Some(objects) = forgotten {
            self.state_store.remove(&objects).await;
        }
        self.heartbeat.stop_if_possible().await;

        tracing::warn!(
            ?category,
            restore = self.config.restore_subscription,
            "subscribe loop interrupted"
        );
        self.listeners.notify_status(status).await;
    }
}
