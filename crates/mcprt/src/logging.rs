//! Minimal `logging/setLevel` support (spec §4.6 capability record,
//! supplemented): a server that advertises `logging{}` tracks the level a
//! peer last requested. This core doesn't own a global `tracing` subscriber
//! (it's a library, not a binary), so it only records the requested level
//! and emits a `tracing` event at the transition; an embedding application
//! that wants the level to actually gate output wires its own
//! `tracing_subscriber::reload::Handle` against [`LogLevelState::get`].

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// RFC 5424 syslog severity levels, as used by `logging/setLevel` and
/// `notifications/message`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Detailed debugging information
    Debug,
    /// Informational messages
    #[default]
    Info,
    /// Normal but significant events
    Notice,
    /// Warning conditions
    Warning,
    /// Error conditions
    Error,
    /// Critical conditions
    Critical,
    /// Action must be taken immediately
    Alert,
    /// System is unusable
    Emergency,
}

/// Holds the level last requested via `logging/setLevel`.
#[derive(Debug, Default)]
pub struct LogLevelState {
    level: Mutex<LogLevel>,
}

impl LogLevelState {
    /// Start at the default level ([`LogLevel::Info`]).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently effective level.
    #[must_use]
    pub fn get(&self) -> LogLevel {
        *self.level.lock()
    }

    /// Record a newly requested level.
    pub fn set(&self, level: LogLevel) {
        tracing::debug!(?level, "logging/setLevel");
        *self.level.lock() = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_info() {
        assert_eq!(LogLevelState::new().get(), LogLevel::Info);
    }

    #[test]
    fn set_updates_level() {
        let state = LogLevelState::new();
        state.set(LogLevel::Debug);
        assert_eq!(state.get(), LogLevel::Debug);
    }

    #[test]
    fn orders_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Emergency);
    }
}
