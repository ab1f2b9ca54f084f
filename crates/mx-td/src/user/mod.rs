//! Authenticated futures user family.
//!
//! Shares the channel envelope and ping of the futures market family. Right
//! after connect the session logs in:
//!
//! ```text
//! → {"method":"login","param":{"apiKey":"…","reqTime":"1611038237237","signature":"…"}}
//! ← {"channel":"rs.login","data":"success","ts":1611038237246}
//! ```
//!
//! Personal streams are pushed to every logged-in connection, so subscribe
//! and unsubscribe only change local routing.

pub mod streams;
pub mod types;

use std::sync::Arc;

use mx_core::{
    Correlation, DecodeError, Hooks, MxError, Protocol, Request, Session, SessionConfig, SubscriptionOp,
    UnsubscribeMode, Verdict, WsTransport, time_util,
};
use mx_md::futures::{ChannelFrame, ENDPOINT, FuturesStream, decode_channel_frame, ping_request};
use serde_json::json;
use tracing::debug;

use crate::auth::Signer;

pub use streams::{
    AdlLevelUpdate, Asset, Order, Position, PositionModeUpdate, RiskLimit, adl_levels, assets, orders,
    position_modes, positions, risk_limits,
};

/// Millisecond wall clock used for `reqTime`.
pub type Clock = Arc<dyn Fn() -> u64 + Send + Sync>;

fn login_matcher(frame: &ChannelFrame) -> Verdict {
    match frame.channel.as_str() {
        "rs.login" => match frame.data.as_str() {
            Some("success") => Verdict::Accept,
            Some(_) => Verdict::Pass,
            None => Verdict::Reject(format!("invalid success payload: {}", frame.data)),
        },
        "rs.error" => Verdict::Reject(format!("auth failed: {}", frame.data_text())),
        _ => Verdict::Pass,
    }
}

/// Futures user [`Protocol`].
#[derive(Clone)]
pub struct FuturesUser {
    api_key: String,
    signer: Signer,
    clock: Clock,
}

impl FuturesUser {
    pub fn new(api_key: &str, secret_key: &str) -> Result<Self, MxError> {
        if api_key.is_empty() {
            return Err(MxError::Credentials("api key is empty".into()));
        }
        Ok(Self { api_key: api_key.to_string(), signer: Signer::new(secret_key)?, clock: Arc::new(time_util::now_ms) })
    }

    /// Replace the `reqTime` source.
    pub fn with_clock(mut self, clock: impl Fn() -> u64 + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Session over a WebSocket to `url` (or the futures endpoint).
    pub fn session(self, url: Option<&str>, config: SessionConfig, hooks: Hooks) -> Session<Self> {
        let transport = Arc::new(WsTransport::new(
            url.unwrap_or(ENDPOINT),
            Self::FAMILY,
            config.read_queue_capacity,
            config.write_timeout,
        ));
        Session::with_hooks(self, transport, config, hooks)
    }

    fn login_payload(&self) -> String {
        let req_time = (self.clock)().to_string();
        let signature = self.signer.sign(&format!("{}{req_time}", self.api_key));
        debug!("[user] login api_key={} reqTime={req_time}", self.api_key);
        json!({
            "method": "login",
            "param": {"apiKey": self.api_key, "reqTime": req_time, "signature": signature},
        })
        .to_string()
    }
}

impl std::fmt::Debug for FuturesUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuturesUser").field("api_key", &self.api_key).finish_non_exhaustive()
    }
}

impl Protocol for FuturesUser {
    type Frame = ChannelFrame;
    type Spec = dyn FuturesStream;

    const FAMILY: &'static str = "user";
    const MAX_SUBSCRIPTIONS: usize = 6;
    const CORRELATION: Correlation = Correlation::InOrder;
    const UNSUBSCRIBE: UnsubscribeMode = UnsubscribeMode::LocalOnly;

    fn decode(&self, raw: &[u8]) -> Result<ChannelFrame, DecodeError> {
        decode_channel_frame(raw)
    }

    fn ping(&self, id: u64) -> Request<ChannelFrame> {
        ping_request(id)
    }

    fn subscription(&self, _id: u64, _op: SubscriptionOp, _spec: &Self::Spec) -> Option<Request<ChannelFrame>> {
        None
    }

    fn login(&self, id: u64) -> Option<Request<ChannelFrame>> {
        Some(Request::new(id, self.login_payload(), login_matcher))
    }
}
