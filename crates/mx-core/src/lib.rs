//! # mx-core
//!
//! Session engine for persistent WebSocket connections that mix
//! request/response commands with unsolicited push traffic:
//!
//! - **Transport** (`transport`): byte-frame transport trait + WebSocket implementation
//! - **Promise** (`promise`): write-once reply slot matched against inbound frames
//! - **Router** (`router`): push-frame dispatch to active subscriptions
//! - **Session** (`session`): read loop, subscribe/unsubscribe, heartbeat, close
//! - **Configuration** (`config`): `SessionConfig` defaults + JSON runner config
//! - **Error types** (`error`): transport, promise, session and config errors via thiserror
//! - **Latency** (`latency`): histogram of heartbeat round trips
//! - **Time utilities** (`time_util`): wall-clock timestamps
//! - **Logging** (`logging`): tracing-based structured logging

pub mod config;
pub mod error;
pub mod latency;
pub mod logging;
pub mod promise;
pub mod router;
pub mod session;
pub mod time_util;
pub mod transport;

pub use config::SessionConfig;
pub use error::{DecodeError, MxError, PromiseError, SessionError, TransportError};
pub use promise::{Promise, Verdict};
pub use router::{EventHandler, Router};
pub use session::{
    Correlation, Hooks, Protocol, Request, Session, SessionState, SubscriptionHandle,
    SubscriptionOp, UnsubscribeMode,
};
pub use transport::{Transport, WsTransport};
