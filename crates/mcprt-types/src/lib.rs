//! # mcprt-types
//!
//! Shared value types for the MCP runtime core.
//!
//! This crate is the single source of truth for the wire-adjacent types that
//! the rest of the workspace builds on: content blocks exchanged in tool and
//! prompt results, the primitive definition types (`Tool`, `Resource`,
//! `ResourceTemplate`, `Prompt`), and the small result carriers each
//! primitive kind returns.
//!
//! Input and output schemas are accepted as opaque `serde_json::Value`
//! documents; this crate does not interpret JSON Schema beyond the narrow
//! `enum` read used by the default completion provider in `mcprt-registry`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod content;
pub mod definitions;
pub mod results;

pub use content::*;
pub use definitions::*;
pub use results::*;

/// MCP protocol version this workspace targets by default.
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-06-18";

/// Protocol versions this workspace understands, newest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-06-18", "2024-11-05"];
