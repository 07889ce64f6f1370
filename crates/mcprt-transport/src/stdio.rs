//! Stdio transport (spec §4.3): newline-framed JSON over a pair of byte
//! streams, with a bounded stderr tail buffer when hosting a subprocess.
//!
//! Follows the hybrid interior-mutability pattern: transport state sits
//! behind a `std::sync::Mutex` that is never held across an `.await`; the
//! reader/writer and the child handle sit behind `tokio::sync::Mutex`
//! because I/O crosses await points.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::Mutex as TokioMutex;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, trace, warn};

use mcprt_protocol::JsonRpcMessage;

use crate::error::{CloseDetails, TransportError, TransportResult};
use crate::types::{TransportCapabilities, TransportState};
use crate::Transport;

/// Number of trailing stderr lines retained from a hosted child process.
const STDERR_TAIL_CAPACITY: usize = 16;

type BoxedAsyncRead = Pin<Box<dyn AsyncRead + Send + 'static>>;
type BoxedAsyncWrite = Pin<Box<dyn AsyncWrite + Send + 'static>>;

/// Newline-delimited JSON transport over a pair of byte streams, optionally
/// fronting a spawned child process.
pub struct StdioTransport {
    state: StdMutex<TransportState>,
    reader: TokioMutex<Option<FramedRead<BufReader<BoxedAsyncRead>, LinesCodec>>>,
    writer: TokioMutex<BoxedAsyncWrite>,
    child: Option<TokioMutex<Child>>,
    stderr_tail: std::sync::Arc<StdMutex<VecDeque<String>>>,
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("state", &*self.state.lock().unwrap())
            .field("hosts_child", &self.child.is_some())
            .finish()
    }
}

impl StdioTransport {
    /// Wrap the current process's stdin/stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::from_raw(Box::pin(tokio::io::stdin()), Box::pin(tokio::io::stdout()))
    }

    /// Wrap an arbitrary pair of byte streams, e.g. for in-memory tests.
    pub fn from_raw(reader: BoxedAsyncRead, writer: BoxedAsyncWrite) -> Self {
        Self {
            state: StdMutex::new(TransportState::Open),
            reader: TokioMutex::new(Some(FramedRead::new(
                BufReader::new(reader),
                LinesCodec::new(),
            ))),
            writer: TokioMutex::new(writer),
            child: None,
            stderr_tail: std::sync::Arc::new(StdMutex::new(VecDeque::with_capacity(
                STDERR_TAIL_CAPACITY,
            ))),
        }
    }

    /// Host a spawned child process, capturing its stdin/stdout for the
    /// transport and tailing its stderr into a bounded buffer surfaced on
    /// abnormal exit.
    pub fn from_child(mut child: Child) -> std::io::Result<Self> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("child has no captured stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("child has no captured stdout"))?;
        let stderr_tail = std::sync::Arc::new(StdMutex::new(VecDeque::with_capacity(
            STDERR_TAIL_CAPACITY,
        )));

        if let Some(stderr) = child.stderr.take() {
            let tail = stderr_tail.clone();
            tokio::spawn(async move {
                let mut lines = FramedRead::new(BufReader::new(stderr), LinesCodec::new());
                while let Some(Ok(line)) = lines.next().await {
                    trace!(target: "mcprt_transport::stdio", %line, "child stderr");
                    let mut buf = tail.lock().unwrap();
                    if buf.len() == STDERR_TAIL_CAPACITY {
                        buf.pop_front();
                    }
                    buf.push_back(line);
                }
            });
        }

        Ok(Self {
            state: StdMutex::new(TransportState::Open),
            reader: TokioMutex::new(Some(FramedRead::new(
                BufReader::new(Box::pin(stdout) as BoxedAsyncRead),
                LinesCodec::new(),
            ))),
            writer: TokioMutex::new(Box::pin(stdin) as BoxedAsyncWrite),
            child: Some(TokioMutex::new(child)),
            stderr_tail,
        })
    }

    fn set_state(&self, state: TransportState) {
        *self.state.lock().unwrap() = state;
    }

    fn tail_snapshot(&self) -> Vec<String> {
        self.stderr_tail.lock().unwrap().iter().cloned().collect()
    }

    async fn abnormal_close_details(&self) -> Option<CloseDetails> {
        let child_lock = self.child.as_ref()?;
        let mut child = child_lock.lock().await;
        let status = child.try_wait().ok().flatten()?;
        if status.success() {
            return None;
        }
        Some(CloseDetails {
            reason: Some("child process exited abnormally".to_string()),
            exit_code: status.code(),
            stderr_tail: self.tail_snapshot(),
        })
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StdioTransport {
    fn state(&self) -> TransportState {
        *self.state.lock().unwrap()
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities {
            resumable: false,
            server_initiated: true,
        }
    }

    async fn send(&self, message: JsonRpcMessage) -> TransportResult<()> {
        if self.state() == TransportState::Closed {
            return Err(TransportError::Closed(CloseDetails::default()));
        }
        let line = message.to_line().map_err(|e| {
            TransportError::Codec(mcprt_protocol::jsonrpc::ParseError::Json(e))
        })?;
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<JsonRpcMessage>> {
        let mut guard = self.reader.lock().await;
        let Some(reader) = guard.as_mut() else {
            return Ok(None);
        };
        match reader.next().await {
            Some(Ok(line)) => {
                drop(guard);
                let msg = JsonRpcMessage::from_str(&line)?;
                Ok(Some(msg))
            }
            Some(Err(err)) => {
                warn!(target: "mcprt_transport::stdio", %err, "stdio line decode error");
                Err(TransportError::Io(std::io::Error::other(err)))
            }
            None => {
                *guard = None;
                drop(guard);
                self.set_state(TransportState::Closed);
                debug!(target: "mcprt_transport::stdio", "stdio reader drained");
                if let Some(details) = self.abnormal_close_details().await {
                    return Err(TransportError::Closed(details));
                }
                Ok(None)
            }
        }
    }

    async fn close(&self) -> TransportResult<()> {
        self.set_state(TransportState::Closing);
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
        drop(writer);
        self.set_state(TransportState::Closed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcprt_protocol::request_id::RequestId;
    use mcprt_protocol::JsonRpcRequest;

    fn duplex_pair() -> (StdioTransport, StdioTransport) {
        let (a_read, b_write) = tokio::io::duplex(4096);
        let (b_read, a_write) = tokio::io::duplex(4096);
        let a = StdioTransport::from_raw(Box::pin(a_read), Box::pin(a_write));
        let b = StdioTransport::from_raw(Box::pin(b_read), Box::pin(b_write));
        (a, b)
    }

    #[tokio::test]
    async fn round_trips_one_message() {
        let (a, b) = duplex_pair();
        let req = JsonRpcMessage::Request(JsonRpcRequest::new(
            RequestId::Number(1),
            "ping",
            None,
        ));
        a.send(req.clone()).await.unwrap();
        let received = b.receive().await.unwrap().unwrap();
        assert_eq!(received, req);
    }

    #[tokio::test]
    async fn close_then_receive_yields_none() {
        let (a, b) = duplex_pair();
        a.close().await.unwrap();
        let received = b.receive().await.unwrap();
        assert!(received.is_none());
        assert_eq!(b.state(), TransportState::Closed);
    }
}
