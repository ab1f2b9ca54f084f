//! Spot stream constructors and push decoders.
//!
//! | Stream            | Name                                                     | Body                        |
//! |-------------------|----------------------------------------------------------|-----------------------------|
//! | limit depth       | `spot@public.limit.depth.v3.api.pb@{sym}@{5,10,20}`      | `publicLimitDepths`         |
//! | diff depth        | `spot@public.aggre.depth.v3.api.pb@{10ms,100ms}@{sym}`   | `publicAggreDepths`         |
//! | diff depth batch  | `spot@public.increase.depth.batch.v3.api.pb@{sym}`       | `publicIncreaseDepthsBatch` |
//! | deals             | `spot@public.aggre.deals.v3.api.pb@{10ms,100ms}@{sym}`   | `publicAggreDeals`          |
//! | book ticker       | `spot@public.aggre.bookTicker.v3.api.pb@{interval}@{sym}`| `publicAggreBookTicker`     |
//! | book ticker batch | `spot@public.bookTicker.batch.v3.api.pb@{sym}`           | `publicBookTickerBatch`     |
//! | kline             | `spot@public.kline.v3.api.pb@{sym}@{interval}`           | `publicSpotKline`           |
//!
//! A push whose body is not the stream's message, or that lacks the symbol,
//! is skipped. Fields that fail to parse go to `on_invalid`.

use std::fmt;
use std::str::FromStr;

use mx_core::{DecodeError, EventHandler};
use tracing::debug;

use super::proto::push_data_v3_api_wrapper::Body;
use super::proto::{
    PublicAggreDealsV3Api, PublicAggreDepthsV3Api, PublicBookTickerV3Api, PublicDepthV3ApiItem,
    PublicIncreaseDepthsBatchV3Api, PublicLimitDepthsV3Api, PublicSpotKlineV3Api,
};
use super::{SpotFrame, SpotPush};
use crate::stream::Callbacks;
use crate::{KlineInterval, Level, TradeSide};

/// Number of levels in a limit-depth snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthLevels {
    L5,
    L10,
    L20,
}

impl DepthLevels {
    pub fn as_u32(self) -> u32 {
        match self {
            Self::L5 => 5,
            Self::L10 => 10,
            Self::L20 => 20,
        }
    }
}

impl FromStr for DepthLevels {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "5" => Ok(Self::L5),
            "10" => Ok(Self::L10),
            "20" => Ok(Self::L20),
            other => Err(DecodeError::new(format!("unsupported depth levels {other:?}"))),
        }
    }
}

/// Push interval of the aggregated streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateInterval {
    Ms10,
    Ms100,
}

impl UpdateInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ms10 => "10ms",
            Self::Ms100 => "100ms",
        }
    }
}

impl fmt::Display for UpdateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateInterval {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "10ms" => Ok(Self::Ms10),
            "100ms" => Ok(Self::Ms100),
            other => Err(DecodeError::new(format!("unsupported update interval {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LimitDepth {
    pub symbol: String,
    pub version: u64,
    pub asks: Vec<Level>,
    pub bids: Vec<Level>,
    pub send_time: Option<i64>,
}

/// Aggregated book changes between two versions.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthDelta {
    pub symbol: String,
    pub asks: Vec<Level>,
    pub bids: Vec<Level>,
    pub event_type: String,
    pub from_version: u64,
    pub to_version: u64,
    pub send_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DepthChange {
    pub version: i64,
    pub asks: Vec<Level>,
    pub bids: Vec<Level>,
}

/// Several incremental book changes in one push.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthBatch {
    pub symbol: String,
    pub items: Vec<DepthChange>,
    pub send_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deal {
    pub price: f64,
    pub quantity: f64,
    pub side: TradeSide,
    pub time: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Deals {
    pub symbol: String,
    pub deals: Vec<Deal>,
    pub send_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookTicker {
    pub symbol: String,
    pub bid_price: f64,
    pub bid_quantity: f64,
    pub ask_price: f64,
    pub ask_quantity: f64,
    pub send_time: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TopOfBook {
    pub bid_price: f64,
    pub bid_quantity: f64,
    pub ask_price: f64,
    pub ask_quantity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookTickerBatch {
    pub symbol: String,
    pub tickers: Vec<TopOfBook>,
    pub send_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kline {
    pub symbol: String,
    pub interval: KlineInterval,
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub amount: f64,
    pub send_time: Option<i64>,
}

/// Maps a push to a typed value; `None` skips pushes without the expected body.
pub type Decoder<T> = fn(&SpotPush) -> Option<Result<T, DecodeError>>;

/// A subscribable spot stream delivering decoded `T` values.
pub struct SpotStream<T> {
    name: String,
    decode: Decoder<T>,
    callbacks: Callbacks<T>,
}

impl<T> SpotStream<T> {
    pub fn new(name: String, decode: Decoder<T>, on_data: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self { name, decode, callbacks: Callbacks::new(on_data) }
    }

    /// Receive payloads that fail to decode.
    pub fn on_invalid(mut self, f: impl Fn(DecodeError) + Send + Sync + 'static) -> Self {
        self.callbacks.set_on_invalid(f);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> EventHandler<SpotFrame> for SpotStream<T> {
    fn id(&self) -> &str {
        &self.name
    }

    fn accept_event(&self, frame: &SpotFrame) -> bool {
        matches!(frame, SpotFrame::Push(push) if push.channel == self.name)
    }

    fn handle_event(&self, frame: &SpotFrame) {
        let SpotFrame::Push(push) = frame else { return };
        match (self.decode)(push) {
            Some(decoded) => self.callbacks.deliver(&self.name, decoded),
            None => debug!("[{}] skipping push without body or symbol", self.name),
        }
    }
}

fn require_symbol(symbol: &str) {
    assert!(!symbol.trim().is_empty(), "spot stream requires a non-empty symbol");
}

/// Top-of-book snapshot with `levels` levels per side.
///
/// # Panics
///
/// Panics if `symbol` is empty.
pub fn limit_depth(
    symbol: &str,
    levels: DepthLevels,
    on_data: impl Fn(LimitDepth) + Send + Sync + 'static,
) -> SpotStream<LimitDepth> {
    require_symbol(symbol);
    let name = format!("spot@public.limit.depth.v3.api.pb@{symbol}@{}", levels.as_u32());
    SpotStream::new(name, decode_limit_depth, on_data)
}

/// Aggregated book changes pushed every `interval`.
///
/// # Panics
///
/// Panics if `symbol` is empty.
pub fn diff_depth(
    symbol: &str,
    interval: UpdateInterval,
    on_data: impl Fn(DepthDelta) + Send + Sync + 'static,
) -> SpotStream<DepthDelta> {
    require_symbol(symbol);
    let name = format!("spot@public.aggre.depth.v3.api.pb@{interval}@{symbol}");
    SpotStream::new(name, decode_diff_depth, on_data)
}

/// Batched incremental book changes.
///
/// # Panics
///
/// Panics if `symbol` is empty.
pub fn diff_depth_batch(
    symbol: &str,
    on_data: impl Fn(DepthBatch) + Send + Sync + 'static,
) -> SpotStream<DepthBatch> {
    require_symbol(symbol);
    let name = format!("spot@public.increase.depth.batch.v3.api.pb@{symbol}");
    SpotStream::new(name, decode_depth_batch, on_data)
}

/// Aggregated trades pushed every `interval`.
///
/// # Panics
///
/// Panics if `symbol` is empty.
pub fn deals(
    symbol: &str,
    interval: UpdateInterval,
    on_data: impl Fn(Deals) + Send + Sync + 'static,
) -> SpotStream<Deals> {
    require_symbol(symbol);
    let name = format!("spot@public.aggre.deals.v3.api.pb@{interval}@{symbol}");
    SpotStream::new(name, decode_deals, on_data)
}

/// Best bid/ask pushed every `interval`.
///
/// # Panics
///
/// Panics if `symbol` is empty.
pub fn book_ticker(
    symbol: &str,
    interval: UpdateInterval,
    on_data: impl Fn(BookTicker) + Send + Sync + 'static,
) -> SpotStream<BookTicker> {
    require_symbol(symbol);
    let name = format!("spot@public.aggre.bookTicker.v3.api.pb@{interval}@{symbol}");
    SpotStream::new(name, decode_book_ticker, on_data)
}

/// Batched best bid/ask updates.
///
/// # Panics
///
/// Panics if `symbol` is empty.
pub fn book_ticker_batch(
    symbol: &str,
    on_data: impl Fn(BookTickerBatch) + Send + Sync + 'static,
) -> SpotStream<BookTickerBatch> {
    require_symbol(symbol);
    let name = format!("spot@public.bookTicker.batch.v3.api.pb@{symbol}");
    SpotStream::new(name, decode_book_ticker_batch, on_data)
}

/// Candles of the given interval.
///
/// # Panics
///
/// Panics if `symbol` is empty.
pub fn kline(
    symbol: &str,
    interval: KlineInterval,
    on_data: impl Fn(Kline) + Send + Sync + 'static,
) -> SpotStream<Kline> {
    require_symbol(symbol);
    let name = format!("spot@public.kline.v3.api.pb@{symbol}@{interval}");
    SpotStream::new(name, decode_kline, on_data)
}

/// Parse a decimal string field.
pub fn decimal(field: &str, value: &str) -> Result<f64, DecodeError> {
    fast_float2::parse(value).map_err(|_| DecodeError::new(format!("invalid {field} {value:?}")))
}

fn integer<N: FromStr>(field: &str, value: &str) -> Result<N, DecodeError> {
    value.parse().map_err(|_| DecodeError::new(format!("invalid {field} {value:?}")))
}

fn parse_levels(side: &str, items: &[PublicDepthV3ApiItem]) -> Result<Vec<Level>, DecodeError> {
    items
        .iter()
        .map(|l| Ok(Level { price: decimal("price", &l.price)?, quantity: decimal("quantity", &l.quantity)? }))
        .collect::<Result<Vec<_>, DecodeError>>()
        .map_err(|e| DecodeError::new(format!("invalid {side}: {e}")))
}

fn top_of_book(t: &PublicBookTickerV3Api) -> Result<TopOfBook, DecodeError> {
    Ok(TopOfBook {
        bid_price: decimal("bidPrice", &t.bid_price)?,
        bid_quantity: decimal("bidQuantity", &t.bid_quantity)?,
        ask_price: decimal("askPrice", &t.ask_price)?,
        ask_quantity: decimal("askQuantity", &t.ask_quantity)?,
    })
}

fn decode_limit_depth(push: &SpotPush) -> Option<Result<LimitDepth, DecodeError>> {
    let Some(Body::PublicLimitDepths(d)) = &push.body else { return None };
    let symbol = push.symbol.as_ref()?;
    Some(map_limit_depth(d, symbol, push.send_time))
}

fn map_limit_depth(d: &PublicLimitDepthsV3Api, symbol: &str, send_time: Option<i64>) -> Result<LimitDepth, DecodeError> {
    Ok(LimitDepth {
        symbol: symbol.to_string(),
        version: integer("version", &d.version)?,
        asks: parse_levels("asks", &d.asks)?,
        bids: parse_levels("bids", &d.bids)?,
        send_time,
    })
}

fn decode_diff_depth(push: &SpotPush) -> Option<Result<DepthDelta, DecodeError>> {
    let Some(Body::PublicAggreDepths(d)) = &push.body else { return None };
    let symbol = push.symbol.as_ref()?;
    Some(map_diff_depth(d, symbol, push.send_time))
}

fn map_diff_depth(d: &PublicAggreDepthsV3Api, symbol: &str, send_time: Option<i64>) -> Result<DepthDelta, DecodeError> {
    Ok(DepthDelta {
        symbol: symbol.to_string(),
        asks: parse_levels("asks", &d.asks)?,
        bids: parse_levels("bids", &d.bids)?,
        event_type: d.event_type.clone(),
        from_version: integer("fromVersion", &d.from_version)?,
        to_version: integer("toVersion", &d.to_version)?,
        send_time,
    })
}

fn decode_depth_batch(push: &SpotPush) -> Option<Result<DepthBatch, DecodeError>> {
    let Some(Body::PublicIncreaseDepthsBatch(d)) = &push.body else { return None };
    let symbol = push.symbol.as_ref()?;
    Some(map_depth_batch(d, symbol, push.send_time))
}

fn map_depth_batch(
    d: &PublicIncreaseDepthsBatchV3Api,
    symbol: &str,
    send_time: Option<i64>,
) -> Result<DepthBatch, DecodeError> {
    let mut items = Vec::with_capacity(d.items.len());
    for item in &d.items {
        items.push(DepthChange {
            version: integer("version", &item.version)?,
            asks: parse_levels("asks", &item.asks)?,
            bids: parse_levels("bids", &item.bids)?,
        });
    }
    Ok(DepthBatch { symbol: symbol.to_string(), items, send_time })
}

fn decode_deals(push: &SpotPush) -> Option<Result<Deals, DecodeError>> {
    let Some(Body::PublicAggreDeals(d)) = &push.body else { return None };
    let symbol = push.symbol.as_ref()?;
    Some(map_deals(d, symbol, push.send_time))
}

fn map_deals(d: &PublicAggreDealsV3Api, symbol: &str, send_time: Option<i64>) -> Result<Deals, DecodeError> {
    if d.deals.is_empty() {
        return Err(DecodeError::new("trades not found"));
    }
    let mut deals = Vec::with_capacity(d.deals.len());
    for t in &d.deals {
        deals.push(Deal {
            price: decimal("price", &t.price)?,
            quantity: decimal("quantity", &t.quantity)?,
            side: TradeSide::try_from(i64::from(t.trade_type))?,
            time: t.time,
        });
    }
    Ok(Deals { symbol: symbol.to_string(), deals, send_time })
}

fn decode_book_ticker(push: &SpotPush) -> Option<Result<BookTicker, DecodeError>> {
    let Some(Body::PublicAggreBookTicker(t)) = &push.body else { return None };
    let symbol = push.symbol.as_ref()?;
    Some(top_of_book(t).map(|top| BookTicker {
        symbol: symbol.clone(),
        bid_price: top.bid_price,
        bid_quantity: top.bid_quantity,
        ask_price: top.ask_price,
        ask_quantity: top.ask_quantity,
        send_time: push.send_time,
    }))
}

fn decode_book_ticker_batch(push: &SpotPush) -> Option<Result<BookTickerBatch, DecodeError>> {
    let Some(Body::PublicBookTickerBatch(b)) = &push.body else { return None };
    let symbol = push.symbol.as_ref()?;
    let tickers = b.items.iter().map(top_of_book).collect::<Result<Vec<_>, DecodeError>>();
    Some(tickers.map(|tickers| BookTickerBatch { symbol: symbol.clone(), tickers, send_time: push.send_time }))
}

fn decode_kline(push: &SpotPush) -> Option<Result<Kline, DecodeError>> {
    let Some(Body::PublicSpotKline(k)) = &push.body else { return None };
    let symbol = push.symbol.as_ref()?;
    Some(map_kline(k, symbol, push.send_time))
}

fn map_kline(k: &PublicSpotKlineV3Api, symbol: &str, send_time: Option<i64>) -> Result<Kline, DecodeError> {
    Ok(Kline {
        symbol: symbol.to_string(),
        interval: k.interval.parse()?,
        open_time: k.window_start,
        close_time: k.window_end,
        open: decimal("openingPrice", &k.opening_price)?,
        close: decimal("closingPrice", &k.closing_price)?,
        high: decimal("highestPrice", &k.highest_price)?,
        low: decimal("lowestPrice", &k.lowest_price)?,
        volume: decimal("volume", &k.volume)?,
        amount: decimal("amount", &k.amount)?,
        send_time,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use prost::Message;

    use super::*;
    use crate::spot::decode_frame;
    use crate::spot::proto::{
        PublicAggreDealsV3ApiItem, PublicBookTickerBatchV3Api, PublicIncreaseDepthsV3Api,
    };

    /// Encode a push and read it back through the frame decoder.
    fn push(channel: &str, symbol: Option<&str>, body: Body) -> SpotFrame {
        let raw = SpotPush {
            channel: channel.to_string(),
            symbol: symbol.map(str::to_string),
            send_time: Some(1736411507002),
            body: Some(body),
            ..Default::default()
        }
        .encode_to_vec();
        decode_frame(&raw).unwrap()
    }

    fn level(price: &str, quantity: &str) -> PublicDepthV3ApiItem {
        PublicDepthV3ApiItem { price: price.into(), quantity: quantity.into() }
    }

    fn ticker(bid: &str, ask: &str) -> PublicBookTickerV3Api {
        PublicBookTickerV3Api {
            bid_price: bid.into(),
            bid_quantity: "1.2".into(),
            ask_price: ask.into(),
            ask_quantity: "3.7".into(),
        }
    }

    fn capture<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |v: T| sink.lock().push(v))
    }

    #[test]
    fn stream_names() {
        assert_eq!(
            limit_depth("BTCUSDT", DepthLevels::L20, |_| {}).name(),
            "spot@public.limit.depth.v3.api.pb@BTCUSDT@20"
        );
        assert_eq!(
            diff_depth("BTCUSDT", UpdateInterval::Ms10, |_| {}).name(),
            "spot@public.aggre.depth.v3.api.pb@10ms@BTCUSDT"
        );
        assert_eq!(
            diff_depth_batch("BTCUSDT", |_| {}).name(),
            "spot@public.increase.depth.batch.v3.api.pb@BTCUSDT"
        );
        assert_eq!(
            deals("BTCUSDT", UpdateInterval::Ms100, |_| {}).name(),
            "spot@public.aggre.deals.v3.api.pb@100ms@BTCUSDT"
        );
        assert_eq!(
            book_ticker("ETHUSDT", UpdateInterval::Ms10, |_| {}).name(),
            "spot@public.aggre.bookTicker.v3.api.pb@10ms@ETHUSDT"
        );
        assert_eq!(
            book_ticker_batch("ETHUSDT", |_| {}).name(),
            "spot@public.bookTicker.batch.v3.api.pb@ETHUSDT"
        );
        assert_eq!(
            kline("BTCUSDT", KlineInterval::Min15, |_| {}).name(),
            "spot@public.kline.v3.api.pb@BTCUSDT@Min15"
        );
    }

    #[test]
    #[should_panic(expected = "non-empty symbol")]
    fn empty_symbol_panics() {
        let _ = limit_depth("", DepthLevels::L5, |_| {});
    }

    #[test]
    #[should_panic(expected = "non-empty symbol")]
    fn blank_symbol_panics() {
        let _ = diff_depth_batch("  ", |_| {});
    }

    #[test]
    fn limit_depth_decodes() {
        let (seen, on_data) = capture();
        let stream = limit_depth("BTCUSDT", DepthLevels::L5, on_data);
        let frame = push(
            "spot@public.limit.depth.v3.api.pb@BTCUSDT@5",
            Some("BTCUSDT"),
            Body::PublicLimitDepths(PublicLimitDepthsV3Api {
                asks: vec![level("93180.18", "0.21976424")],
                bids: vec![level("93179.98", "2.82651000"), level("93179.9", "1")],
                event_type: "spot@public.limit.depth.v3.api.pb".into(),
                version: "3407459756".into(),
            }),
        );
        assert!(stream.accept_event(&frame));
        stream.handle_event(&frame);

        let seen = seen.lock();
        let depth = &seen[0];
        assert_eq!(depth.version, 3407459756);
        assert_eq!(depth.asks, vec![Level { price: 93180.18, quantity: 0.21976424 }]);
        assert_eq!(depth.bids.len(), 2);
        assert_eq!(depth.bids[1].quantity, 1.0);
        assert_eq!(depth.send_time, Some(1736411507002));
    }

    #[test]
    fn diff_depth_decodes_versions() {
        let (seen, on_data) = capture();
        let stream = diff_depth("BTCUSDT", UpdateInterval::Ms100, on_data);
        stream.handle_event(&push(
            "spot@public.aggre.depth.v3.api.pb@100ms@BTCUSDT",
            Some("BTCUSDT"),
            Body::PublicAggreDepths(PublicAggreDepthsV3Api {
                asks: vec![level("92877.58", "0.00000000")],
                bids: vec![],
                event_type: "spot@public.aggre.depth.v3.api.pb@100ms".into(),
                from_version: "10589632359".into(),
                to_version: "10589632360".into(),
            }),
        ));

        let seen = seen.lock();
        assert_eq!(seen[0].from_version, 10589632359);
        assert_eq!(seen[0].to_version, 10589632360);
        assert_eq!(seen[0].asks[0].quantity, 0.0);
        assert!(seen[0].bids.is_empty());
        assert_eq!(seen[0].event_type, "spot@public.aggre.depth.v3.api.pb@100ms");
    }

    #[test]
    fn diff_depth_batch_decodes_every_change() {
        let (seen, on_data) = capture();
        let stream = diff_depth_batch("BTCUSDT", on_data);
        let change = |version: &str, price: &str| PublicIncreaseDepthsV3Api {
            asks: vec![],
            bids: vec![level(price, "0.5")],
            event_type: String::new(),
            version: version.into(),
        };
        stream.handle_event(&push(
            "spot@public.increase.depth.batch.v3.api.pb@BTCUSDT",
            Some("BTCUSDT"),
            Body::PublicIncreaseDepthsBatch(PublicIncreaseDepthsBatchV3Api {
                items: vec![change("100", "93000"), change("101", "93001")],
                event_type: "spot@public.increase.depth.batch.v3.api.pb".into(),
            }),
        ));

        let seen = seen.lock();
        let versions: Vec<_> = seen[0].items.iter().map(|c| c.version).collect();
        assert_eq!(versions, vec![100, 101]);
        assert_eq!(seen[0].items[1].bids[0].price, 93001.0);
    }

    #[test]
    fn deals_decode_with_sides() {
        let (seen, on_data) = capture();
        let stream = deals("BTCUSDT", UpdateInterval::Ms100, on_data);
        let deal = |price: &str, side: i32| PublicAggreDealsV3ApiItem {
            price: price.into(),
            quantity: "0.0001".into(),
            trade_type: side,
            time: 1736409765051,
        };
        stream.handle_event(&push(
            "spot@public.aggre.deals.v3.api.pb@100ms@BTCUSDT",
            Some("BTCUSDT"),
            Body::PublicAggreDeals(PublicAggreDealsV3Api {
                deals: vec![deal("93220.00", 1), deal("93219.99", 2)],
                event_type: "spot@public.aggre.deals.v3.api.pb@100ms".into(),
            }),
        ));

        let seen = seen.lock();
        let sides: Vec<_> = seen[0].deals.iter().map(|d| d.side).collect();
        assert_eq!(sides, vec![TradeSide::Buy, TradeSide::Sell]);
        assert_eq!(seen[0].deals[0].price, 93220.0);
        assert_eq!(seen[0].deals[0].time, 1736409765051);
    }

    #[test]
    fn empty_deals_are_invalid() {
        let (data, on_data) = capture::<Deals>();
        let (invalid, on_invalid) = capture::<DecodeError>();
        let stream = deals("BTCUSDT", UpdateInterval::Ms10, on_data).on_invalid(on_invalid);
        stream.handle_event(&push(
            "spot@public.aggre.deals.v3.api.pb@10ms@BTCUSDT",
            Some("BTCUSDT"),
            Body::PublicAggreDeals(PublicAggreDealsV3Api { deals: vec![], event_type: String::new() }),
        ));
        assert!(data.lock().is_empty());
        assert_eq!(invalid.lock()[0], DecodeError::new("trades not found"));
    }

    #[test]
    fn book_tickers_and_kline_decode() {
        let (tickers, on_ticker) = capture();
        let single = book_ticker("BTCUSDT", UpdateInterval::Ms100, on_ticker);
        single.handle_event(&push(
            "spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT",
            Some("BTCUSDT"),
            Body::PublicAggreBookTicker(ticker("93200.4", "93200.5")),
        ));
        assert_eq!(tickers.lock()[0].ask_quantity, 3.7);
        assert_eq!(tickers.lock()[0].bid_price, 93200.4);

        let (batches, on_batch) = capture();
        let batch = book_ticker_batch("BTCUSDT", on_batch);
        batch.handle_event(&push(
            "spot@public.bookTicker.batch.v3.api.pb@BTCUSDT",
            Some("BTCUSDT"),
            Body::PublicBookTickerBatch(PublicBookTickerBatchV3Api {
                items: vec![ticker("1", "2"), ticker("1.5", "2.5")],
            }),
        ));
        let batches = batches.lock();
        assert_eq!(batches[0].tickers.len(), 2);
        assert_eq!(batches[0].tickers[1].ask_price, 2.5);

        let (candles, on_candle) = capture();
        let candle = kline("BTCUSDT", KlineInterval::Min1, on_candle);
        candle.handle_event(&push(
            "spot@public.kline.v3.api.pb@BTCUSDT@Min1",
            Some("BTCUSDT"),
            Body::PublicSpotKline(PublicSpotKlineV3Api {
                interval: "Min1".into(),
                window_start: 1736410380,
                opening_price: "92925".into(),
                closing_price: "92928.67".into(),
                highest_price: "92928.67".into(),
                lowest_price: "92925".into(),
                volume: "1.6".into(),
                amount: "148685.5".into(),
                window_end: 1736410440,
            }),
        ));
        let candles = candles.lock();
        assert_eq!(candles[0].interval, KlineInterval::Min1);
        assert_eq!(candles[0].close, 92928.67);
        assert_eq!(candles[0].close_time, 1736410440);
    }

    #[test]
    fn pushes_without_symbol_or_body_are_skipped() {
        let (data, on_data) = capture::<BookTicker>();
        let (invalid, on_invalid) = capture::<DecodeError>();
        let stream = book_ticker("BTCUSDT", UpdateInterval::Ms100, on_data).on_invalid(on_invalid);
        let channel = "spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT";

        stream.handle_event(&push(channel, None, Body::PublicAggreBookTicker(ticker("1", "2"))));
        stream.handle_event(&push(channel, Some("BTCUSDT"), Body::PublicBookTickerBatch(Default::default())));
        let bare = SpotPush { channel: channel.into(), symbol: Some("BTCUSDT".into()), ..Default::default() };
        stream.handle_event(&decode_frame(&bare.encode_to_vec()).unwrap());

        assert!(data.lock().is_empty());
        assert!(invalid.lock().is_empty());
    }

    #[test]
    fn other_channels_are_not_accepted() {
        let stream = limit_depth("BTCUSDT", DepthLevels::L5, |_| {});
        assert!(!stream.accept_event(&push(
            "spot@public.limit.depth.v3.api.pb@BTCUSDT@10",
            Some("BTCUSDT"),
            Body::PublicLimitDepths(Default::default()),
        )));
        assert!(!stream.accept_event(
            &decode_frame(br#"{"id":1,"code":0,"msg":"spot@public.limit.depth.v3.api.pb@BTCUSDT@5"}"#).unwrap()
        ));
    }

    #[test]
    fn invalid_fields_go_to_on_invalid() {
        let (data, on_data) = capture::<BookTicker>();
        let (invalid, on_invalid) = capture::<DecodeError>();
        let stream = book_ticker("BTCUSDT", UpdateInterval::Ms100, on_data).on_invalid(on_invalid);
        stream.handle_event(&push(
            "spot@public.aggre.bookTicker.v3.api.pb@100ms@BTCUSDT",
            Some("BTCUSDT"),
            Body::PublicAggreBookTicker(ticker("1", "x")),
        ));
        assert!(data.lock().is_empty());
        assert_eq!(invalid.lock()[0], DecodeError::new("invalid askPrice \"x\""));

        let (invalid, on_invalid) = capture::<DecodeError>();
        let depth = diff_depth("BTCUSDT", UpdateInterval::Ms10, |_| {}).on_invalid(on_invalid);
        depth.handle_event(&push(
            "spot@public.aggre.depth.v3.api.pb@10ms@BTCUSDT",
            Some("BTCUSDT"),
            Body::PublicAggreDepths(PublicAggreDepthsV3Api {
                bids: vec![level("abc", "1")],
                from_version: "1".into(),
                to_version: "2".into(),
                ..Default::default()
            }),
        ));
        assert_eq!(invalid.lock()[0], DecodeError::new("invalid bids: invalid price \"abc\""));
    }
}
