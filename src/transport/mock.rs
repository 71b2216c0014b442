//! Scripted transport for driving the subscribe loop without a network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::time::sleep;

use super::{Transport, TransportRequest, TransportStatus};
use crate::types::envelope::SubscribeEnvelope;
use crate::types::status::StatusCategory;

/// Behavior of the mock for one `send` call, consumed in FIFO order.
#[derive(Debug)]
pub enum MockCompletion {
    /// Resolve immediately with a successful subscribe body.
    Success(SubscribeEnvelope),
    /// Resolve immediately with a failure of the given category.
    Failure(StatusCategory),
    /// Resolve immediately with an empty acknowledgment.
    Acknowledge,
    /// Stay in flight until `cancel_outstanding` resolves it as cancelled.
    Pend,
}

#[derive(Default)]
struct MockInner {
    requests: Vec<TransportRequest>,
    script: VecDeque<MockCompletion>,
    pending: Vec<(TransportRequest, oneshot::Sender<TransportStatus>)>,
}

/// Transport double that records every submitted request and completes them
/// from a script. With the script exhausted, requests stay in flight until
/// cancelled, which is what a quiet long poll looks like to the core.
#[derive(Default)]
pub struct MockTransport {
    inner: Mutex<MockInner>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, completion: MockCompletion) {
        self.inner.lock().unwrap().script.push_back(completion);
    }

    pub fn script_success(&self, envelope: SubscribeEnvelope) {
        self.script(MockCompletion::Success(envelope));
    }

    pub fn script_failure(&self, category: StatusCategory) {
        self.script(MockCompletion::Failure(category));
    }

    /// Snapshot of every request submitted so far.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    /// Polls until at least `count` requests were submitted.
    pub async fn wait_for_requests(&self, count: usize) -> Vec<TransportRequest> {
        for _ in 0..200 {
            let requests = self.requests();
            if requests.len() >= count {
                return requests;
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!(
            "expected {count} requests, saw {}",
            self.inner.lock().unwrap().requests.len()
        );
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> TransportStatus {
        let pending = {
            let mut inner = self.inner.lock().unwrap();
            inner.requests.push(request.clone());

            match inner.script.pop_front() {
                Some(MockCompletion::Success(envelope)) => {
                    return TransportStatus::success(request, envelope);
                }
                Some(MockCompletion::Failure(category)) => {
                    return TransportStatus::failure(request, category);
                }
                Some(MockCompletion::Acknowledge) => {
                    return TransportStatus::acknowledged(request);
                }
                Some(MockCompletion::Pend) | None => {
                    let (tx, rx) = oneshot::channel();
                    inner.pending.push((request.clone(), tx));
                    rx
                }
            }
        };

        pending
            .await
            .unwrap_or_else(|_| TransportStatus::cancelled(request))
    }

    fn cancel_outstanding(&self) {
        let pending = std::mem::take(&mut self.inner.lock().unwrap().pending);
        for (request, tx) in pending {
            let _ = tx.send(TransportStatus::cancelled(request));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Operation;

    fn request() -> TransportRequest {
        TransportRequest {
            operation: Operation::Subscribe,
            channels: vec!["a".to_string()],
            channel_groups: Vec::new(),
            timetoken: 0,
            heartbeat: None,
            state: None,
        }
    }

    #[tokio::test]
    async fn test_scripted_success_resolves_immediately() {
        let transport = MockTransport::new();
        transport.script_success(SubscribeEnvelope::new(42, Vec::new()));

        let status = transport.send(request()).await;
        assert!(!status.error);
        assert_eq!(status.envelope.unwrap().timetoken, 42);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unscripted_send_resolves_cancelled_on_cancel() {
        let transport = std::sync::Arc::new(MockTransport::new());

        let pending = {
            let transport = std::sync::Arc::clone(&transport);
            tokio::spawn(async move { transport.send(request()).await })
        };

        transport.wait_for_requests(1).await;
        assert_eq!(transport.pending_count(), 1);
        transport.cancel_outstanding();

        let status = pending.await.unwrap();
        assert_eq!(status.category, StatusCategory::Cancelled);
        assert!(!status.error);
        assert_eq!(transport.pending_count(), 0);
    }
}
