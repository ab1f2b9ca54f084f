//! WebSocket transport built on `tokio-tungstenite`.
//!
//! # Architecture
//!
//! ```text
//!            ┌─────────────────┐  try_send   ┌───────────────┐  read_frame
//!  socket ──►│  reader task    │────────────►│ bounded queue │────────────► session
//!            └─────────────────┘  (drop+warn │  (mpsc)       │
//!                                  if full)  └───────────────┘
//!  session ──► write_frame ──► Mutex<sink> ──► socket   (bounded by write timeout)
//! ```
//!
//! The reader task forwards text and binary frames, ignores ping/pong, and
//! ends the stream with a classified [`TransportError`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type Inbound = Result<Vec<u8>, TransportError>;

/// Time allowed for the close handshake before the socket is dropped.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// WebSocket [`Transport`] with a background reader and a bounded inbound queue.
pub struct WsTransport {
    url: String,
    name: String,
    queue_capacity: usize,
    write_timeout: Duration,
    sink: Mutex<Option<WsSink>>,
    inbound: Mutex<Option<mpsc::Receiver<Inbound>>>,
    reader: parking_lot::Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl WsTransport {
    /// Create a transport for `url`. Nothing is opened until `connect`.
    ///
    /// `name` is used as the log prefix (e.g. `"spot"`).
    pub fn new(
        url: impl Into<String>,
        name: impl Into<String>,
        queue_capacity: usize,
        write_timeout: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            queue_capacity: queue_capacity.max(1),
            write_timeout,
            sink: Mutex::new(None),
            inbound: Mutex::new(None),
            reader: parking_lot::Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }
        let mut sink = self.sink.lock().await;
        if sink.is_some() {
            return Err(TransportError::Internal("already connected".into()));
        }

        let parsed = url::Url::parse(&self.url)
            .map_err(|e| TransportError::Internal(format!("invalid url {}: {e}", self.url)))?;
        let request = self.url.as_str().into_client_request().map_err(|e| classify(&e))?;

        info!("[{}] connecting to {}", self.name, parsed.host_str().unwrap_or(&self.url));
        let (stream, _response) =
            tokio_tungstenite::connect_async(request).await.map_err(|e| classify(&e))?;
        let (write, read) = stream.split();

        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let name = self.name.clone();
        let task = tokio::spawn(async move {
            reader_loop(name, read, tx).await;
        });

        *sink = Some(write);
        *self.inbound.lock().await = Some(rx);
        *self.reader.lock() = Some(task);
        info!("[{}] connected", self.name);
        Ok(())
    }

    async fn read_frame(&self) -> Result<Vec<u8>, TransportError> {
        let mut guard = self.inbound.lock().await;
        let Some(rx) = guard.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        match rx.recv().await {
            Some(item) => item,
            None if self.closed.load(Ordering::Acquire) => Err(TransportError::ReadInterrupted),
            None => Err(TransportError::UnexpectedEof),
        }
    }

    async fn write_frame(&self, frame: &[u8]) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::NotConnected);
        }
        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Err(TransportError::NotConnected);
        };

        let msg = match std::str::from_utf8(frame) {
            Ok(text) => Message::Text(text.to_owned().into()),
            Err(_) => Message::Binary(frame.to_vec().into()),
        };
        match tokio::time::timeout(self.write_timeout, sink.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransportError::WriteFailed(e.to_string())),
            Err(_) => Err(TransportError::WriteTimeout),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(task) = self.reader.lock().take() {
            task.abort();
        }

        let Some(mut sink) = self.sink.lock().await.take() else {
            return Ok(());
        };
        info!("[{}] closing", self.name);
        match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) => {
                Ok(())
            }
            Ok(Err(e)) => Err(classify(&e)),
            Err(_) => {
                warn!("[{}] close handshake timed out", self.name);
                Ok(())
            }
        }
    }
}

/// Forward inbound frames into the queue until the socket ends.
async fn reader_loop(name: String, mut read: SplitStream<WsStream>, tx: mpsc::Sender<Inbound>) {
    let terminal = loop {
        let frame = match read.next().await {
            Some(Ok(Message::Text(text))) => text.as_str().as_bytes().to_vec(),
            Some(Ok(Message::Binary(data))) => data.to_vec(),
            Some(Ok(Message::Close(frame))) => {
                break match frame {
                    None => TransportError::NormalClosure,
                    Some(f) if f.code == CloseCode::Normal => TransportError::NormalClosure,
                    Some(f) => TransportError::AbnormalClosure(format!(
                        "code {} {}",
                        u16::from(f.code),
                        f.reason.as_str()
                    )),
                };
            }
            Some(Ok(_)) => continue, // Ping, Pong, raw Frame
            Some(Err(e)) => break classify(&e),
            None => break TransportError::UnexpectedEof,
        };

        match tx.try_send(Ok(frame)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("[{name}] inbound queue full, dropping frame");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("[{name}] inbound queue closed, reader exiting");
                return;
            }
        }
    };

    debug!("[{name}] reader ended: {terminal}");
    let _ = tx.send(Err(terminal)).await;
}

/// Classify a tungstenite error into a [`TransportError`].
pub fn classify(err: &tungstenite::Error) -> TransportError {
    use tungstenite::error::ProtocolError;
    use tungstenite::Error;

    match err {
        Error::ConnectionClosed => TransportError::NormalClosure,
        Error::AlreadyClosed => TransportError::NotConnected,
        Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            TransportError::UnexpectedEof
        }
        Error::Io(e) => TransportError::NetworkIssue(e.to_string()),
        Error::Capacity(e) => TransportError::PayloadCorrupted(e.to_string()),
        Error::Protocol(ProtocolError::ResetWithoutClosingHandshake) => {
            TransportError::AbnormalClosure("reset without closing handshake".into())
        }
        Error::Protocol(e) => TransportError::PayloadCorrupted(e.to_string()),
        Error::Url(e) => TransportError::NetworkIssue(e.to_string()),
        other => TransportError::Internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tungstenite::error::{CapacityError, ProtocolError};

    #[test]
    fn classify_closure_errors() {
        assert_eq!(classify(&tungstenite::Error::ConnectionClosed), TransportError::NormalClosure);
        assert!(matches!(
            classify(&tungstenite::Error::Protocol(ProtocolError::ResetWithoutClosingHandshake)),
            TransportError::AbnormalClosure(_)
        ));
    }

    #[test]
    fn classify_io_errors() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert_eq!(classify(&tungstenite::Error::Io(eof)), TransportError::UnexpectedEof);

        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(matches!(
            classify(&tungstenite::Error::Io(refused)),
            TransportError::NetworkIssue(_)
        ));
    }

    #[test]
    fn classify_oversized_payload() {
        let err = tungstenite::Error::Capacity(CapacityError::MessageTooLong { size: 10, max_size: 1 });
        assert!(matches!(classify(&err), TransportError::PayloadCorrupted(_)));
    }

    #[tokio::test]
    async fn write_before_connect_is_rejected() {
        let ws = WsTransport::new("wss://example.invalid/ws", "test", 8, Duration::from_millis(10));
        assert_eq!(ws.write_frame(b"{}").await, Err(TransportError::NotConnected));
        assert_eq!(ws.read_frame().await, Err(TransportError::NotConnected));
    }

    #[tokio::test]
    async fn close_is_idempotent_without_connection() {
        let ws = WsTransport::new("wss://example.invalid/ws", "test", 8, Duration::from_millis(10));
        assert_eq!(ws.close().await, Ok(()));
        assert_eq!(ws.close().await, Ok(()));
        assert_eq!(ws.connect().await, Err(TransportError::NotConnected));
    }
}
