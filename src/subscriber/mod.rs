// Module declarations
mod builder;
mod core;
mod cursor;
mod dispatch;
mod request;
mod response;
mod state;
mod subscriptions;

// Public API exports
pub use builder::{SubscriberBuilder, SubscriberConfig};
pub use core::Subscriber;
pub use cursor::Cursor;
pub use state::SubscriberState;
pub use subscriptions::{SubscriptionSet, base_name, is_presence_name, presence_name};

pub(crate) use state::SubscriberInner;
