//! Futures channel constructors and payload decoders.
//!
//! Channels handled:
//! - `depth`       → [`Depth`], levels as `[price, orderCount, quantity]`
//! - `deal`        → [`Deal`], side/open type/auto-transact codes decoded
//! - `ticker`      → [`Ticker`]
//! - `tickers`     → `Vec<BatchTicker>` for every contract (no symbol)
//! - `kline`       → [`Kline`], filtered by interval
//! - `funding.rate`→ [`FundingRate`]
//! - `index.price` / `fair.price` → [`PriceUpdate`]

use mx_core::DecodeError;
use serde_json::{Value, json};

use super::{ChannelFrame, ChannelStream};
use crate::json_util::{f64_field, i64_field, str_field, u64_field};
use crate::{KlineInterval, TradeSide};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthLevel {
    pub price: f64,
    pub order_count: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Depth {
    pub symbol: String,
    pub version: u64,
    pub asks: Vec<DepthLevel>,
    pub bids: Vec<DepthLevel>,
    pub send_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenType {
    Open,
    Close,
    NoChange,
}

impl TryFrom<i64> for OpenType {
    type Error = DecodeError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Open),
            2 => Ok(Self::Close),
            3 => Ok(Self::NoChange),
            other => Err(DecodeError::new(format!("unknown open type {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoTransact {
    Yes,
    No,
}

impl TryFrom<i64> for AutoTransact {
    type Error = DecodeError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Yes),
            2 => Ok(Self::No),
            other => Err(DecodeError::new(format!("unknown auto-transact flag {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    pub symbol: String,
    pub price: f64,
    pub volume: f64,
    pub side: TradeSide,
    pub open_type: OpenType,
    pub auto_transact: AutoTransact,
    pub time: u64,
    pub send_time: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ticker {
    pub symbol: String,
    pub last_price: f64,
    pub bid1: f64,
    pub ask1: f64,
    pub volume24: f64,
    pub hold_vol: f64,
    pub lower24_price: f64,
    pub high24_price: f64,
    pub rise_fall_rate: f64,
    pub rise_fall_value: f64,
    pub index_price: f64,
    pub fair_price: f64,
    pub funding_rate: f64,
    pub timestamp: u64,
    pub send_time: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchTicker {
    pub symbol: String,
    pub last_price: f64,
    pub volume24: f64,
    pub rise_fall_rate: f64,
    pub fair_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kline {
    pub symbol: String,
    pub interval: KlineInterval,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub amount: f64,
    pub quantity: f64,
    /// Candle start, seconds.
    pub timestamp: u64,
    pub send_time: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FundingRate {
    pub symbol: String,
    pub rate: f64,
    pub next_settle_time: u64,
    pub send_time: u64,
}

/// Index or fair price update.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceUpdate {
    pub symbol: String,
    pub price: f64,
    pub send_time: u64,
}

fn require_symbol(symbol: &str) {
    assert!(!symbol.is_empty(), "futures stream requires a non-empty symbol");
}

fn symbol_param(symbol: &str) -> Option<Value> {
    Some(json!({"symbol": symbol}))
}

/// Full order book snapshots (compressed depth).
///
/// # Panics
///
/// Panics if `symbol` is empty.
pub fn depth(symbol: &str, on_data: impl Fn(Depth) + Send + Sync + 'static) -> ChannelStream<Depth> {
    require_symbol(symbol);
    let params = json!({"symbol": symbol, "compress": true});
    ChannelStream::new("depth", Some(symbol), Some(params), decode_depth, on_data)
}

/// Individual trades.
///
/// # Panics
///
/// Panics if `symbol` is empty.
pub fn deals(symbol: &str, on_data: impl Fn(Deal) + Send + Sync + 'static) -> ChannelStream<Deal> {
    require_symbol(symbol);
    ChannelStream::new("deal", Some(symbol), symbol_param(symbol), decode_deal, on_data)
}

/// Ticker of one contract.
///
/// # Panics
///
/// Panics if `symbol` is empty.
pub fn ticker(symbol: &str, on_data: impl Fn(Ticker) + Send + Sync + 'static) -> ChannelStream<Ticker> {
    require_symbol(symbol);
    ChannelStream::new("ticker", Some(symbol), symbol_param(symbol), decode_ticker, on_data)
}

/// Tickers of every contract, pushed as one batch.
pub fn tickers(on_data: impl Fn(Vec<BatchTicker>) + Send + Sync + 'static) -> ChannelStream<Vec<BatchTicker>> {
    ChannelStream::new("tickers", None, None, decode_tickers, on_data)
}

/// Candles of the given interval. The key includes the interval so several
/// intervals of one contract can be active together.
///
/// # Panics
///
/// Panics if `symbol` is empty.
pub fn kline(
    symbol: &str,
    interval: KlineInterval,
    on_data: impl Fn(Kline) + Send + Sync + 'static,
) -> ChannelStream<Kline> {
    require_symbol(symbol);
    let params = json!({"symbol": symbol, "interval": interval.as_str()});
    ChannelStream::new("kline", Some(symbol), Some(params), decode_kline, on_data)
        .with_data_filter("interval", interval.as_str())
}

/// # Panics
///
/// Panics if `symbol` is empty.
pub fn funding_rate(
    symbol: &str,
    on_data: impl Fn(FundingRate) + Send + Sync + 'static,
) -> ChannelStream<FundingRate> {
    require_symbol(symbol);
    ChannelStream::new("funding.rate", Some(symbol), symbol_param(symbol), decode_funding_rate, on_data)
}

/// # Panics
///
/// Panics if `symbol` is empty.
pub fn index_price(
    symbol: &str,
    on_data: impl Fn(PriceUpdate) + Send + Sync + 'static,
) -> ChannelStream<PriceUpdate> {
    require_symbol(symbol);
    ChannelStream::new("index.price", Some(symbol), symbol_param(symbol), decode_price, on_data)
}

/// # Panics
///
/// Panics if `symbol` is empty.
pub fn fair_price(
    symbol: &str,
    on_data: impl Fn(PriceUpdate) + Send + Sync + 'static,
) -> ChannelStream<PriceUpdate> {
    require_symbol(symbol);
    ChannelStream::new("fair.price", Some(symbol), symbol_param(symbol), decode_price, on_data)
}

fn parse_depth_levels(data: &Value, side: &str) -> Result<Vec<DepthLevel>, DecodeError> {
    let levels = data.get(side).and_then(Value::as_array).ok_or_else(|| DecodeError::missing(side))?;
    levels
        .iter()
        .map(|level| match level.as_array().map(Vec::as_slice) {
            Some([price, count, qty]) => match (price.as_f64(), count.as_f64(), qty.as_f64()) {
                (Some(price), Some(order_count), Some(quantity)) => {
                    Ok(DepthLevel { price, order_count, quantity })
                }
                _ => Err(DecodeError::new(format!("invalid {side} level {level}"))),
            },
            _ => Err(DecodeError::new(format!("invalid {side} level format {level}"))),
        })
        .collect()
}

fn decode_depth(frame: &ChannelFrame) -> Result<Depth, DecodeError> {
    let d = &frame.data;
    Ok(Depth {
        symbol: frame.symbol.clone(),
        version: u64_field(d, "version")?,
        asks: parse_depth_levels(d, "asks")?,
        bids: parse_depth_levels(d, "bids")?,
        send_time: frame.ts,
    })
}

fn decode_deal(frame: &ChannelFrame) -> Result<Deal, DecodeError> {
    let d = &frame.data;
    Ok(Deal {
        symbol: frame.symbol.clone(),
        price: f64_field(d, "p")?,
        volume: f64_field(d, "v")?,
        side: TradeSide::try_from(i64_field(d, "T")?)?,
        open_type: OpenType::try_from(i64_field(d, "O")?)?,
        auto_transact: AutoTransact::try_from(i64_field(d, "M")?)?,
        time: u64_field(d, "t")?,
        send_time: frame.ts,
    })
}

fn decode_ticker(frame: &ChannelFrame) -> Result<Ticker, DecodeError> {
    let d = &frame.data;
    Ok(Ticker {
        symbol: str_field(d, "symbol")?.to_string(),
        last_price: f64_field(d, "lastPrice")?,
        bid1: f64_field(d, "bid1")?,
        ask1: f64_field(d, "ask1")?,
        volume24: f64_field(d, "volume24")?,
        hold_vol: f64_field(d, "holdVol")?,
        lower24_price: f64_field(d, "lower24Price")?,
        high24_price: f64_field(d, "high24Price")?,
        rise_fall_rate: f64_field(d, "riseFallRate")?,
        rise_fall_value: f64_field(d, "riseFallValue")?,
        index_price: f64_field(d, "indexPrice")?,
        fair_price: f64_field(d, "fairPrice")?,
        funding_rate: f64_field(d, "fundingRate")?,
        timestamp: u64_field(d, "timestamp")?,
        send_time: frame.ts,
    })
}

fn decode_tickers(frame: &ChannelFrame) -> Result<Vec<BatchTicker>, DecodeError> {
    let entries = frame.data.as_array().ok_or_else(|| DecodeError::new("tickers payload is not an array"))?;
    entries
        .iter()
        .map(|t| {
            Ok(BatchTicker {
                symbol: str_field(t, "symbol")?.to_string(),
                last_price: f64_field(t, "lastPrice")?,
                volume24: f64_field(t, "volume24")?,
                rise_fall_rate: f64_field(t, "riseFallRate")?,
                fair_price: f64_field(t, "fairPrice")?,
            })
        })
        .collect()
}

fn decode_kline(frame: &ChannelFrame) -> Result<Kline, DecodeError> {
    let d = &frame.data;
    Ok(Kline {
        symbol: str_field(d, "symbol")?.to_string(),
        interval: str_field(d, "interval")?.parse()?,
        open: f64_field(d, "o")?,
        close: f64_field(d, "c")?,
        high: f64_field(d, "h")?,
        low: f64_field(d, "l")?,
        amount: f64_field(d, "a")?,
        quantity: f64_field(d, "q")?,
        timestamp: u64_field(d, "t")?,
        send_time: frame.ts,
    })
}

fn decode_funding_rate(frame: &ChannelFrame) -> Result<FundingRate, DecodeError> {
    let d = &frame.data;
    Ok(FundingRate {
        symbol: str_field(d, "symbol")?.to_string(),
        rate: f64_field(d, "rate")?,
        next_settle_time: u64_field(d, "nextSettleTime")?,
        send_time: frame.ts,
    })
}

fn decode_price(frame: &ChannelFrame) -> Result<PriceUpdate, DecodeError> {
    let d = &frame.data;
    Ok(PriceUpdate {
        symbol: str_field(d, "symbol")?.to_string(),
        price: f64_field(d, "price")?,
        send_time: frame.ts,
    })
}
