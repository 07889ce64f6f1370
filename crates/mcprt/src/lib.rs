//! # mcprt
//!
//! Facade crate wiring [`mcprt_session`]'s multiplexer, [`mcprt_registry`]'s
//! primitive catalogs, and [`mcprt_streamable_http`]'s transport into a
//! ready-to-use [`server::McpServer`] and [`client::McpClient`].
//!
//! Application code supplies tool/prompt/resource definitions and handlers
//! through [`server::ServerBuilder`]; this crate answers `tools/*`,
//! `prompts/*`, `resources/*`, `completion/complete`, and `logging/setLevel`
//! on every session it attaches to, and keeps registries mutable at runtime
//! so publishing or retracting a primitive fires the matching
//! `notifications/*/list_changed`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod handler;
pub mod logging;
pub mod server;

pub use client::McpClient;
pub use error::{McpError, McpResult};
pub use handler::{PromptHandler, ResourceHandler, ResourceTemplateHandler, ToolHandler};
pub use logging::{LogLevel, LogLevelState};
pub use server::{McpServer, ServerBuilder};
