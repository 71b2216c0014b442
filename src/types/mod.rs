pub mod constants;
pub mod envelope;
pub mod error;
pub mod status;

pub use constants::*;
pub use envelope::{
    MessageEvent, PresenceAction, PresenceEvent, PresencePayload, RawEvent, SubscribeEnvelope,
};
pub use error::{RealtimeError, Result};
pub use status::{CursorSnapshot, StatusCategory, SubscribeStatus};
