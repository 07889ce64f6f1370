//! Facade-level errors: server construction and handler registration.

/// Result type for facade-level operations.
pub type McpResult<T> = Result<T, McpError>;

/// Errors raised while assembling an [`crate::server::McpServer`], as
/// opposed to [`mcprt_protocol::ProtocolError`], which covers wire-level
/// and in-session failures.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// A tool, prompt, or resource with this name was already registered.
    #[error("{kind} named {name:?} is already registered")]
    DuplicateName {
        /// Which registry rejected the registration.
        kind: &'static str,
        /// The colliding name.
        name: String,
    },
}
