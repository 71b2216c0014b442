use std::time::Duration;

/// Suffix the service appends to a channel name for its presence companion.
pub const PRESENCE_SUFFIX: &str = "-pnpres";

/// Delay before a failed subscribe request is re-issued.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Buffer size for listener event streams.
pub const LISTENER_BUFFER_SIZE: usize = 100;

/// Transport-level timeout for a single long poll (seconds).
pub const LONG_POLL_TIMEOUT: u64 = 310;

/// Placeholder path segment when no channel is subscribed.
pub const EMPTY_CHANNEL_SEGMENT: &str = ",";
