//! Transport lifecycle and capability types (spec §4.2).

/// A transport's lifecycle. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Constructed but not yet connected
    Opening,
    /// Connected and able to send/receive
    Open,
    /// Close has been requested; draining in-flight messages
    Closing,
    /// Fully closed; `receive` will return `Ok(None)`
    Closed,
}

/// Static capabilities a transport instance advertises.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportCapabilities {
    /// Whether this transport can replay missed events after a reconnect
    pub resumable: bool,
    /// Whether this transport can carry server-initiated messages outside
    /// of a response to a client request (e.g. the standing GET of
    /// streamable HTTP; always true for stdio)
    pub server_initiated: bool,
}
