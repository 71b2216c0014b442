use crate::types::status::CursorSnapshot;

/// Time-token cursor driving the long-poll replay protocol.
///
/// `current` is the token the next subscribe request carries; zero asks the
/// server for a fresh position. `last` is a one-slot history used for
/// catch-up across membership changes and reconnects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    current: u64,
    last: u64,
}

impl Cursor {
    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn last(&self) -> u64 {
        self.last
    }

    pub fn reset(&mut self) {
        self.current = 0;
        self.last = 0;
    }

    /// Parks the current token in the history slot ahead of an initial
    /// subscribe, so the position survives the `tt=0` round trip.
    pub fn promote_to_last(&mut self) {
        if self.current > 0 {
            self.last = self.current;
            self.current = 0;
        }
    }

    /// Accepts a server-issued token, keeping the previous one as history.
    pub fn advance(&mut self, timetoken: u64) {
        if self.current != 0 && self.current != timetoken {
            self.last = self.current;
        }
        self.current = timetoken;
    }

    /// Resumes from the parked token, discarding the server's fresh position.
    pub(crate) fn restore_from_last(&mut self) {
        self.current = self.last;
        self.last = 0;
    }

    pub fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            timetoken: self.current,
            last_timetoken: self.last,
        }
    }
}
