//! Futures market stream family.
//!
//! Every frame is a channel envelope. Replies carry no request id, so the
//! session keeps at most one request in flight and offers each reply to it:
//!
//! ```text
//! → {"method":"sub.deal","param":{"symbol":"BTC_USDT"},"gzip":false}
//! ← {"channel":"rs.sub.deal","data":"success","ts":1587442022003}
//! ← {"channel":"push.deal","data":{...},"symbol":"BTC_USDT","ts":1587442022003}
//! → {"method":"ping"}
//! ← {"channel":"pong","data":1587453241453}
//! ← {"channel":"rs.error","data":"Contract [XXX_USDT] not exists"}
//! ```
//!
//! Unsubscribe only writes the request; the server does not reliably ack it.
//!
//! Subscriptions ask for uncompressed pushes with `"gzip": false`. A gzip
//! frame that still arrives fails to decode and is dropped.

pub mod streams;

use std::sync::Arc;

use mx_core::{
    Correlation, DecodeError, EventHandler, Hooks, Protocol, Request, Session, SessionConfig,
    SubscriptionOp, UnsubscribeMode, Verdict, WsTransport,
};
use serde_json::{Value, json};

use crate::stream::Callbacks;

pub use streams::{
    AutoTransact, BatchTicker, Deal, Depth, DepthLevel, FundingRate, Kline, OpenType, PriceUpdate,
    Ticker, deals, depth, fair_price, funding_rate, index_price, kline, ticker, tickers,
};

pub const ENDPOINT: &str = "wss://contract.mexc.com/edge";

/// Channel envelope shared by the futures market and user families.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelFrame {
    pub channel: String,
    pub data: Value,
    pub symbol: String,
    pub ts: u64,
}

impl ChannelFrame {
    /// `data` as text: the string itself, or its JSON encoding.
    pub fn data_text(&self) -> String {
        match &self.data {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub fn decode_channel_frame(raw: &[u8]) -> Result<ChannelFrame, DecodeError> {
    if raw.starts_with(&GZIP_MAGIC) {
        return Err(DecodeError::new("gzip-compressed frame"));
    }
    let v: Value = serde_json::from_slice(raw)?;
    let channel = v.get("channel").and_then(Value::as_str).ok_or_else(|| DecodeError::missing("channel"))?;
    Ok(ChannelFrame {
        channel: channel.to_string(),
        symbol: v.get("symbol").and_then(Value::as_str).unwrap_or_default().to_string(),
        ts: v.get("ts").and_then(Value::as_u64).unwrap_or(0),
        data: v.get("data").cloned().unwrap_or(Value::Null),
    })
}

/// Matcher for a `rs.*` ack: `"success"` on `ack_channel` accepts, a
/// non-string payload there or any `rs.error` rejects.
pub fn ack_matcher(ack_channel: String) -> impl Fn(&ChannelFrame) -> Verdict + Send + Sync + 'static {
    move |frame| {
        if frame.channel == ack_channel {
            match frame.data.as_str() {
                Some("success") => Verdict::Accept,
                Some(_) => Verdict::Pass,
                None => Verdict::Reject(format!("invalid success payload: {}", frame.data)),
            }
        } else if frame.channel == "rs.error" {
            Verdict::Reject(format!("sub failed: {}", frame.data_text()))
        } else {
            Verdict::Pass
        }
    }
}

/// Ping request shared by the channel-envelope families.
pub fn ping_request(id: u64) -> Request<ChannelFrame> {
    Request::new(id, json!({"method": "ping"}).to_string(), |frame: &ChannelFrame| match frame.channel.as_str() {
        "pong" => Verdict::Accept,
        "rs.error" => Verdict::Reject(format!("ping failed: {}", frame.data_text())),
        _ => Verdict::Pass,
    })
}

/// Subscription capability set of a channel stream.
pub trait FuturesStream: EventHandler<ChannelFrame> {
    /// Channel name without the `push.` prefix, e.g. `"depth"`.
    fn channel(&self) -> &str;

    /// `param` object of the sub/unsub request.
    fn params(&self) -> Option<&Value>;
}

type Decoder<T> = fn(&ChannelFrame) -> Result<T, DecodeError>;

/// A channel stream delivering decoded `T` values.
pub struct ChannelStream<T> {
    key: String,
    channel: &'static str,
    push_channel: String,
    symbol: Option<String>,
    params: Option<Value>,
    data_filter: Option<(&'static str, String)>,
    decode: Decoder<T>,
    callbacks: Callbacks<T>,
}

impl<T> ChannelStream<T> {
    /// Stream on `push.{channel}`, restricted to `symbol` when given.
    ///
    /// The key is `{channel}@{symbol}`, or just `{channel}` without a symbol.
    pub fn new(
        channel: &'static str,
        symbol: Option<&str>,
        params: Option<Value>,
        decode: Decoder<T>,
        on_data: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        let key = match symbol {
            Some(s) => format!("{channel}@{s}"),
            None => channel.to_string(),
        };
        Self {
            key,
            channel,
            push_channel: format!("push.{channel}"),
            symbol: symbol.map(str::to_string),
            params,
            data_filter: None,
            decode,
            callbacks: Callbacks::new(on_data),
        }
    }

    /// Only accept pushes whose `data.{field}` equals `value`; the value is
    /// appended to the key.
    pub fn with_data_filter(mut self, field: &'static str, value: impl Into<String>) -> Self {
        let value = value.into();
        self.key = format!("{}@{value}", self.key);
        self.data_filter = Some((field, value));
        self
    }

    /// Receive payloads that fail to decode.
    pub fn on_invalid(mut self, f: impl Fn(DecodeError) + Send + Sync + 'static) -> Self {
        self.callbacks.set_on_invalid(f);
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<T> EventHandler<ChannelFrame> for ChannelStream<T> {
    fn id(&self) -> &str {
        &self.key
    }

    fn accept_event(&self, frame: &ChannelFrame) -> bool {
        if frame.channel != self.push_channel {
            return false;
        }
        if let Some(symbol) = &self.symbol {
            if frame.symbol != *symbol {
                return false;
            }
        }
        match &self.data_filter {
            Some((field, value)) => frame.data.get(*field).and_then(Value::as_str) == Some(value.as_str()),
            None => true,
        }
    }

    fn handle_event(&self, frame: &ChannelFrame) {
        self.callbacks.deliver(&self.key, (self.decode)(frame));
    }
}

impl<T> FuturesStream for ChannelStream<T> {
    fn channel(&self) -> &str {
        self.channel
    }

    fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }
}

/// Futures market [`Protocol`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FuturesMarket;

impl FuturesMarket {
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

impl Protocol for FuturesMarket {
    type Frame = ChannelFrame;
    type Spec = dyn FuturesStream;

    const FAMILY: &'static str = "futures";
    const MAX_SUBSCRIPTIONS: usize = 30;
    const CORRELATION: Correlation = Correlation::InOrder;
    const UNSUBSCRIBE: UnsubscribeMode = UnsubscribeMode::WriteOnly;

    fn decode(&self, raw: &[u8]) -> Result<ChannelFrame, DecodeError> {
        decode_channel_frame(raw)
    }

    fn ping(&self, id: u64) -> Request<ChannelFrame> {
        ping_request(id)
    }

    fn subscription(&self, id: u64, op: SubscriptionOp, spec: &Self::Spec) -> Option<Request<ChannelFrame>> {
        let op = match op {
            SubscriptionOp::Subscribe => "sub",
            SubscriptionOp::Unsubscribe => "unsub",
        };
        let channel = spec.channel();
        let mut payload = json!({"method": format!("{op}.{channel}")});
        if let Some(params) = spec.params() {
            payload["param"] = params.clone();
        }
        if op == "sub" {
            payload["gzip"] = Value::Bool(false);
        }
        Some(Request::new(id, payload.to_string(), ack_matcher(format!("rs.{op}.{channel}"))))
    }
}
