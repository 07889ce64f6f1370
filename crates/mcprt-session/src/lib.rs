//! # mcprt-session
//!
//! The session multiplexer (spec §4.5), the initialization engine layered
//! on top of it (spec §4.6), the request-scoped execution context (spec
//! §4.8), and the filter pipeline (spec §4.9).
//!
//! This crate owns the one reader loop and one writer loop per transport;
//! everything else in the workspace talks to a session through
//! [`Session::send_request`], [`Session::send_notification`], and the
//! handler/filter registration methods.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod context;
pub mod handler;
pub mod session;
pub mod types;

pub use context::{PeerHandle, RequestContext};
pub use handler::{Filter, FilterChain, HandlerResult, NotificationHandler, RequestHandler};
pub use session::Session;
pub use types::{Role, ServerInitConfig, SessionState};
