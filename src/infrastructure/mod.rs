// Infrastructure module - background services shared by the subscribe loop
pub mod heartbeat;
pub mod retry;
pub mod state_store;

pub use heartbeat::{Heartbeat, HeartbeatManager};
pub use retry::{RetryCancel, RetryTimer};
pub use state_store::ClientStateStore;
