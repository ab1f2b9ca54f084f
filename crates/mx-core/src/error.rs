//! Typed error definitions for the mxlink session engine.
//!
//! Errors are layered the same way the engine is:
//!
//! - [`TransportError`]: classified low-level I/O failures
//! - [`DecodeError`]: a frame or push payload could not be decoded
//! - [`PromiseError`]: how an awaited reply ended
//! - [`SessionError`]: what callers of `connect` / `subscribe` / `close` see
//! - [`MxError`]: configuration and runner-level failures
//!
//! The engine errors are `Clone` because one outcome is handed to every
//! caller of an idempotent operation (close, unsubscribe).

use thiserror::Error;

/// Configuration and application-level errors.
#[derive(Debug, Error)]
pub enum MxError {
    /// Configuration parsing or validation error.
    #[error("config error: {0}")]
    Config(String),

    /// Missing or unusable API credentials.
    #[error("credentials error: {0}")]
    Credentials(String),

    /// A configured stream name is not known for the session family.
    #[error("unknown stream '{stream}' for {family}")]
    UnknownStream { family: String, stream: String },
}

/// Classified transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Peer closed the connection with a normal close code.
    #[error("connection closed normally")]
    NormalClosure,

    /// Peer closed with an error code or reset without a closing handshake.
    #[error("connection closed abnormally: {0}")]
    AbnormalClosure(String),

    /// The local side closed the transport while a read was in progress.
    #[error("read interrupted by local close")]
    ReadInterrupted,

    /// The stream ended without a close frame.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// Frame violated the protocol or exceeded size limits.
    #[error("payload corrupted: {0}")]
    PayloadCorrupted(String),

    /// DNS, TCP, or TLS level failure.
    #[error("network issue: {0}")]
    NetworkIssue(String),

    /// A write did not complete before the write timeout.
    #[error("write timed out")]
    WriteTimeout,

    /// A write failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// The transport has not been connected or was already closed.
    #[error("transport not connected")]
    NotConnected,

    /// Anything the classifier does not recognise.
    #[error("internal transport error: {0}")]
    Internal(String),
}

impl TransportError {
    /// Whether the error means the peer ended the connection.
    pub fn is_closure(&self) -> bool {
        matches!(self, Self::NormalClosure | Self::AbnormalClosure(_) | Self::UnexpectedEof)
    }
}

/// A frame or push payload could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decode error: {0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Error for a field that was missing or had the wrong JSON type.
    pub fn missing(field: &str) -> Self {
        Self(format!("missing or invalid field '{field}'"))
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.to_string())
    }
}

/// How waiting on a [`Promise`](crate::promise::Promise) ended without a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromiseError {
    /// The remote side refused the request.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The deadline passed before the promise settled.
    #[error("timed out")]
    TimedOut,

    /// The promise was released because the session closed.
    #[error("released")]
    Released,

    /// `wait` was already called on this promise.
    #[error("already awaited")]
    Consumed,
}

/// Errors surfaced by [`Session`](crate::session::Session) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("connect failed: {0}")]
    Connection(TransportError),

    #[error("write failed: {0}")]
    Write(TransportError),

    #[error("read failed: {0}")]
    Read(TransportError),

    /// No reply arrived before the deadline.
    #[error("{op}: timed out waiting for reply")]
    MessageTimeout { op: String },

    /// The server answered with an error.
    #[error("{op}: rejected by server: {reason}")]
    ServerRejected { op: String, reason: String },

    #[error("close failed: {0}")]
    Close(TransportError),

    /// The key is already active or in flight.
    #[error("duplicate subscription: {0}")]
    DuplicateSubscription(String),

    #[error("subscription limit reached ({max})")]
    SubscriptionLimit { max: usize },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("session already connected")]
    AlreadyConnected,

    #[error("session not connected")]
    NotConnected,

    #[error("session closed")]
    SessionClosed,
}

impl SessionError {
    /// Map a promise outcome to the session error seen by the caller of `op`.
    pub fn from_promise(op: &str, err: PromiseError) -> Self {
        match err {
            PromiseError::Rejected(reason) => Self::ServerRejected { op: op.to_string(), reason },
            PromiseError::TimedOut => Self::MessageTimeout { op: op.to_string() },
            PromiseError::Released | PromiseError::Consumed => Self::SessionClosed,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::MessageTimeout { .. })
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::ServerRejected { .. })
    }
}
