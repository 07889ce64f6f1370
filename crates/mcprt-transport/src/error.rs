//! Transport-level errors (spec §4.2, §4.3, §7).

/// Details attached to a transport closure, surfaced to the session so it
/// can report a meaningful completion to pending calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloseDetails {
    /// Human-readable closure reason, if known
    pub reason: Option<String>,
    /// Child process exit code, for process-backed transports
    pub exit_code: Option<i32>,
    /// Last N lines of the child's stderr, for process-backed transports
    pub stderr_tail: Vec<String>,
}

/// A transport-level failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport is closed or closing; carries whatever completion
    /// details are known.
    #[error("transport closed: {0:?}")]
    Closed(CloseDetails),
    /// An I/O failure occurred.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A message failed to encode or decode.
    #[error("transport codec error: {0}")]
    Codec(#[from] mcprt_protocol::jsonrpc::ParseError),
}

/// Convenience alias for transport operation results.
pub type TransportResult<T> = Result<T, TransportError>;
