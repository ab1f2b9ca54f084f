//! Byte-frame transport underneath a session.
//!
//! A [`Transport`] moves opaque frames. It knows nothing about requests,
//! replies, or subscriptions; the session decodes and correlates on top.
//!
//! - [`ws::WsTransport`]: WebSocket transport over `tokio-tungstenite`
//! - `mock::MockTransport`: in-memory transport for tests (feature `mock`)

#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ws;

use async_trait::async_trait;

pub use crate::error::TransportError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;
pub use ws::WsTransport;

/// Duplex frame transport shared by a session's read loop and its callers.
///
/// `read_frame` is only ever called from one task at a time. `write_frame`
/// may be called concurrently; implementations serialize writes internally.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open the underlying connection.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Wait for the next inbound frame.
    async fn read_frame(&self) -> Result<Vec<u8>, TransportError>;

    /// Send one frame.
    async fn write_frame(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Close the connection. A pending `read_frame` returns
    /// [`TransportError::ReadInterrupted`].
    async fn close(&self) -> Result<(), TransportError>;
}
