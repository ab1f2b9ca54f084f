//! Spot market stream family.
//!
//! Requests and their replies are JSON; the server echoes the request `id`:
//!
//! ```text
//! → {"id":7,"method":"SUBSCRIPTION","params":["spot@public.limit.depth.v3.api.pb@BTCUSDT@5"]}
//! ← {"id":7,"code":0,"msg":"spot@public.limit.depth.v3.api.pb@BTCUSDT@5"}
//! → {"method":"PING"}
//! ← {"id":0,"code":0,"msg":"PONG"}
//! ```
//!
//! Stream data arrives as binary protobuf [`PushDataV3ApiWrapper`] frames
//! whose `channel` is the stream name. A reply is accepted when `msg`
//! equals the stream name; any other reply to a pending id rejects the
//! request. Unsubscribe waits for the ack.

pub mod proto;
pub mod streams;

use std::sync::Arc;

use mx_core::session::PING_ID;
use mx_core::{
    Correlation, DecodeError, EventHandler, Hooks, Protocol, Request, Session, SessionConfig,
    SubscriptionOp, UnsubscribeMode, Verdict, WsTransport,
};
use prost::Message;
use serde_json::{Value, json};

pub use proto::PushDataV3ApiWrapper;
pub use streams::{
    BookTicker, BookTickerBatch, Deal, Deals, DepthBatch, DepthChange, DepthDelta, DepthLevels, Kline,
    LimitDepth, SpotStream, TopOfBook, UpdateInterval, book_ticker, book_ticker_batch, deals, diff_depth,
    diff_depth_batch, kline, limit_depth,
};

pub const ENDPOINT: &str = "wss://wbs-api.mexc.com/ws";

/// Data pushed on a subscribed stream.
pub type SpotPush = PushDataV3ApiWrapper;

/// Inbound spot frame.
#[derive(Debug, Clone, PartialEq)]
pub enum SpotFrame {
    /// Reply to a request; ping replies carry id 0.
    Reply { id: u64, code: i64, msg: String },
    Push(SpotPush),
}

fn is_json_object(raw: &[u8]) -> bool {
    raw.len() > 1 && raw[0] == b'{' && raw[raw.len() - 1] == b'}'
}

/// Decode a JSON reply or a protobuf push.
pub fn decode_frame(raw: &[u8]) -> Result<SpotFrame, DecodeError> {
    if !is_json_object(raw) {
        return SpotPush::decode(raw)
            .map(SpotFrame::Push)
            .map_err(|e| DecodeError::new(format!("invalid push: {e}")));
    }
    let v: Value = serde_json::from_slice(raw)?;
    match v.get("msg").and_then(Value::as_str) {
        Some(msg) => Ok(SpotFrame::Reply {
            id: v.get("id").and_then(Value::as_u64).unwrap_or(PING_ID),
            code: v.get("code").and_then(Value::as_i64).unwrap_or(0),
            msg: msg.to_string(),
        }),
        None => Err(DecodeError::new("reply without msg")),
    }
}

/// Matcher accepting a reply whose `msg` is `expected`.
fn reply_matcher(expected: String) -> impl Fn(&SpotFrame) -> Verdict + Send + Sync + 'static {
    move |frame| match frame {
        SpotFrame::Reply { msg, .. } if *msg == expected => Verdict::Accept,
        SpotFrame::Reply { code, msg, .. } => Verdict::Reject(format!("code={code}, msg={msg:?}")),
        SpotFrame::Push(_) => Verdict::Pass,
    }
}

/// Spot market [`Protocol`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SpotMarket;

impl SpotMarket {
    /// Session over a WebSocket to `url` (or [`ENDPOINT`]).
    pub fn session(url: Option<&str>, config: SessionConfig, hooks: Hooks) -> Session<Self> {
        let transport = Arc::new(WsTransport::new(
            url.unwrap_or(ENDPOINT),
            Self::FAMILY,
            config.read_queue_capacity,
            config.write_timeout,
        ));
        Session::with_hooks(Self, transport, config, hooks)
    }
}

impl Protocol for SpotMarket {
    type Frame = SpotFrame;
    type Spec = dyn EventHandler<SpotFrame>;

    const FAMILY: &'static str = "spot";
    const MAX_SUBSCRIPTIONS: usize = 30;
    const CORRELATION: Correlation = Correlation::ById;
    const UNSUBSCRIBE: UnsubscribeMode = UnsubscribeMode::AwaitAck;

    fn decode(&self, raw: &[u8]) -> Result<SpotFrame, DecodeError> {
        decode_frame(raw)
    }

    fn correlation_id(&self, frame: &SpotFrame) -> Option<u64> {
        match frame {
            SpotFrame::Reply { id, .. } => Some(*id),
            SpotFrame::Push(_) => None,
        }
    }

    fn ping(&self, id: u64) -> Request<SpotFrame> {
        Request::new(id, json!({"method": "PING"}).to_string(), reply_matcher("PONG".to_string()))
    }

    fn subscription(&self, id: u64, op: SubscriptionOp, spec: &Self::Spec) -> Option<Request<SpotFrame>> {
        let method = match op {
            SubscriptionOp::Subscribe => "SUBSCRIPTION",
            SubscriptionOp::Unsubscribe => "UNSUBSCRIPTION",
        };
        let payload = json!({"id": id, "method": method, "params": [spec.id()]});
        Some(Request::new(id, payload.to_string(), reply_matcher(spec.id().to_string())))
    }
}
