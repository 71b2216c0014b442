use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::watch;
use url::Url;

use super::{Operation, Transport, TransportRequest, TransportStatus};
use crate::types::constants::LONG_POLL_TIMEOUT;
use crate::types::envelope::SubscribeEnvelope;
use crate::types::error::{RealtimeError, Result};
use crate::types::status::StatusCategory;

/// HTTP long-poll executor for the subscribe loop.
///
/// Classifies request outcomes into status categories instead of surfacing
/// errors: the subscribe loop treats every completion as data.
pub struct LongPollTransport {
    base: Url,
    subscribe_key: String,
    uuid: String,
    client: reqwest::Client,
    generation: watch::Sender<u64>,
}

impl LongPollTransport {
    pub fn new(
        endpoint: &str,
        subscribe_key: impl Into<String>,
        uuid: impl Into<String>,
    ) -> Result<Self> {
        let base = Url::parse(endpoint)?;
        if base.cannot_be_a_base() {
            return Err(RealtimeError::Configuration(format!(
                "endpoint '{endpoint}' cannot carry request paths"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(LONG_POLL_TIMEOUT))
            .build()?;
        let (generation, _) = watch::channel(0u64);

        Ok(Self {
            base,
            subscribe_key: subscribe_key.into(),
            uuid: uuid.into(),
            client,
            generation,
        })
    }

    fn request_url(&self, request: &TransportRequest) -> Url {
        let mut url = self.base.clone();
        let channels = request.channels_path_component();
        let timetoken = request.timetoken_path_component();
        let key = self.subscribe_key.as_str();

        {
            // `new` rejects cannot-be-a-base endpoints, so segments are available.
            let mut path = url.path_segments_mut().expect("base URL");
            match request.operation {
                Operation::Subscribe => {
                    path.extend([
                        "v2",
                        "subscribe",
                        key,
                        channels.as_str(),
                        "0",
                        timetoken.as_str(),
                    ]);
                }
                Operation::Unsubscribe => {
                    path.extend([
                        "v2",
                        "presence",
                        "sub-key",
                        key,
                        "channel",
                        channels.as_str(),
                        "leave",
                    ]);
                }
                Operation::Heartbeat => {
                    path.extend([
                        "v2",
                        "presence",
                        "sub-key",
                        key,
                        "channel",
                        channels.as_str(),
                        "heartbeat",
                    ]);
                }
            }
        }

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("uuid", &self.uuid);
            if !request.channel_groups.is_empty() {
                query.append_pair("channel-group", &request.channel_groups.join(","));
            }
            if let Some(heartbeat) = request.heartbeat {
                query.append_pair("heartbeat", &heartbeat.to_string());
            }
            if let Some(state) = &request.state {
                query.append_pair("state", &state.to_string());
            }
        }

        url
    }

    async fn perform(&self, request: TransportRequest) -> TransportStatus {
        let url = self.request_url(&request);
        tracing::debug!(%url, "issuing {:?} request", request.operation);

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(error) if error.is_timeout() => {
                return TransportStatus::failure(request, StatusCategory::Timeout);
            }
            Err(error) => {
                tracing::warn!("request failed: {error}");
                return TransportStatus::failure(request, StatusCategory::Unknown);
            }
        };

        match response.status() {
            StatusCode::FORBIDDEN => {
                return TransportStatus::failure(request, StatusCategory::AccessDenied);
            }
            status if !status.is_success() => {
                tracing::warn!(%status, "request rejected");
                return TransportStatus::failure(request, StatusCategory::Unknown);
            }
            _ => {}
        }

        if request.operation != Operation::Subscribe {
            return TransportStatus::acknowledged(request);
        }

        match response.json::<SubscribeEnvelope>().await {
            Ok(envelope) => TransportStatus::success(request, envelope),
            Err(error) => {
                tracing::warn!("undecodable subscribe body: {error}");
                TransportStatus::failure(request, StatusCategory::MalformedResponse)
            }
        }
    }
}

#[async_trait]
impl Transport for LongPollTransport {
    async fn send(&self, request: TransportRequest) -> TransportStatus {
        let mut cancelled = self.generation.subscribe();
        let baseline = *cancelled.borrow_and_update();

        tokio::select! {
            status = self.perform(request.clone()) => status,
            _ = async { let _ = cancelled.wait_for(|generation| *generation > baseline).await; } => {
                tracing::debug!("long poll cancelled");
                TransportStatus::cancelled(request)
            }
        }
    }

    fn cancel_outstanding(&self) {
        self.generation.send_modify(|generation| *generation += 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transport() -> LongPollTransport {
        LongPollTransport::new("https://realtime.pulsegrid.example", "sub-key-1", "u-1").unwrap()
    }

    #[test]
    fn test_rejects_base_less_endpoint() {
        assert!(LongPollTransport::new("mailto:ops@example.com", "k", "u").is_err());
    }

    #[test]
    fn test_subscribe_url_path_and_query() {
        let request = TransportRequest {
            operation: Operation::Subscribe,
            channels: vec!["a".to_string(), "b-pnpres".to_string()],
            channel_groups: vec!["g1".to_string(), "g2".to_string()],
            timetoken: 100,
            heartbeat: Some(300),
            state: Some(json!({"a": {"mood": "ok"}})),
        };

        let url = transport().request_url(&request);
        assert_eq!(url.path(), "/v2/subscribe/sub-key-1/a,b-pnpres/0/100");

        let query = url.query().unwrap();
        assert!(query.contains("uuid=u-1"));
        assert!(query.contains("channel-group=g1%2Cg2") || query.contains("channel-group=g1,g2"));
        assert!(query.contains("heartbeat=300"));
        assert!(query.contains("state=%7B%22a%22"));
    }

    #[test]
    fn test_subscribe_url_placeholder_for_group_only_subscription() {
        let request = TransportRequest {
            operation: Operation::Subscribe,
            channels: Vec::new(),
            channel_groups: vec!["g1".to_string()],
            timetoken: 0,
            heartbeat: None,
            state: None,
        };

        let url = transport().request_url(&request);
        assert_eq!(url.path(), "/v2/subscribe/sub-key-1/,/0/0");
        assert!(!url.query().unwrap().contains("heartbeat"));
        assert!(!url.query().unwrap().contains("state"));
    }

    #[test]
    fn test_leave_url_path() {
        let request = TransportRequest {
            operation: Operation::Unsubscribe,
            channels: vec!["a".to_string()],
            channel_groups: Vec::new(),
            timetoken: 0,
            heartbeat: None,
            state: None,
        };

        let url = transport().request_url(&request);
        assert_eq!(url.path(), "/v2/presence/sub-key/sub-key-1/channel/a/leave");
    }
}
