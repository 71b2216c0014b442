use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Decoded body of a subscribe long poll.
///
/// The server returns the next cursor position together with the batch of
/// events accumulated since the request's time token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribeEnvelope {
    #[serde(rename = "tt", deserialize_with = "timetoken_from_any")]
    pub timetoken: u64,
    #[serde(default)]
    pub events: Vec<RawEvent>,
}

impl SubscribeEnvelope {
    pub fn new(timetoken: u64, events: Vec<RawEvent>) -> Self {
        Self { timetoken, events }
    }

    /// Copy of this envelope with the event batch consumed.
    pub(crate) fn drained(&self) -> Self {
        Self {
            timetoken: self.timetoken,
            events: Vec::new(),
        }
    }
}

/// Single entry of a subscribe response batch, as decoded from the wire.
///
/// An entry is either a message (`payload`) or a presence notification
/// (`presence`). `subscribed_channel` names the subscription the event was
/// matched against (a channel group for group traffic), `actual_channel` the
/// channel the event was published on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribed_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_channel: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresencePayload>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub decrypt_error: bool,
}

/// Presence descriptor carried by presence-channel events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresencePayload {
    #[serde(rename = "presence_event")]
    pub event: PresenceAction,
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occupancy: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceAction {
    Join,
    Leave,
    Timeout,
    StateChange,
}

/// Message delivered to listeners, presence naming already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub channel: String,
    pub subscription: String,
    pub payload: Value,
    pub timetoken: u64,
}

/// Presence notification delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct PresenceEvent {
    pub channel: String,
    pub subscription: String,
    pub action: PresenceAction,
    pub uuid: String,
    pub state: Option<Value>,
    pub timestamp: Option<u64>,
    pub occupancy: Option<u64>,
}

/// The service encodes time tokens as either a JSON number or a string.
fn timetoken_from_any<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
    }
}
