//! Personal push streams (`push.personal.*`).
//!
//! These channels are delivered to every logged-in connection; nothing is
//! sent to subscribe, so a stream only decides what reaches its callback.

use mx_core::DecodeError;
use mx_md::futures::{ChannelFrame, ChannelStream};
use mx_md::json_util::{f64_field, i64_field, str_field, u64_field};
use serde_json::Value;

use super::types::{
    AdlLevel, MarginMode, OrderCategory, OrderErrorCode, OrderSide, OrderState, OrderType, PositionMode,
    PositionState, PositionType, RiskSource,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: String,
    pub symbol: String,
    pub position_id: i64,
    pub price: f64,
    pub vol: f64,
    pub leverage: f64,
    pub side: OrderSide,
    pub category: OrderCategory,
    pub order_type: OrderType,
    pub deal_avg_price: f64,
    pub deal_vol: f64,
    pub order_margin: f64,
    pub used_margin: f64,
    pub taker_fee: f64,
    pub maker_fee: f64,
    pub profit: f64,
    pub fee_currency: String,
    pub margin_mode: MarginMode,
    pub state: OrderState,
    pub error_code: OrderErrorCode,
    pub external_oid: String,
    pub create_time: u64,
    pub update_time: u64,
    pub send_time: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub currency: String,
    pub position_margin: f64,
    pub frozen_balance: f64,
    pub available_balance: f64,
    pub cash_balance: f64,
    pub send_time: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub position_id: i64,
    pub symbol: String,
    pub hold_vol: f64,
    pub position_type: PositionType,
    pub margin_mode: MarginMode,
    pub state: PositionState,
    pub frozen_vol: f64,
    pub close_vol: f64,
    pub hold_avg_price: f64,
    pub close_avg_price: f64,
    pub open_avg_price: f64,
    pub liquidate_price: f64,
    pub oim: f64,
    pub adl_level: AdlLevel,
    pub im: f64,
    pub hold_fee: f64,
    pub realised: f64,
    pub auto_add_im: bool,
    pub leverage: i64,
    pub send_time: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdlLevelUpdate {
    pub adl_level: AdlLevel,
    pub position_id: i64,
    pub send_time: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionModeUpdate {
    pub position_mode: PositionMode,
    pub send_time: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskLimit {
    pub symbol: String,
    pub position_type: PositionType,
    pub risk_source: RiskSource,
    pub level: i64,
    pub max_vol: f64,
    pub max_leverage: i64,
    pub mmr: f64,
    pub imr: f64,
    pub send_time: u64,
}

pub fn orders(on_data: impl Fn(Order) + Send + Sync + 'static) -> ChannelStream<Order> {
    ChannelStream::new("personal.order", None, None, decode_order, on_data)
}

pub fn assets(on_data: impl Fn(Asset) + Send + Sync + 'static) -> ChannelStream<Asset> {
    ChannelStream::new("personal.asset", None, None, decode_asset, on_data)
}

pub fn positions(on_data: impl Fn(Position) + Send + Sync + 'static) -> ChannelStream<Position> {
    ChannelStream::new("personal.position", None, None, decode_position, on_data)
}

pub fn adl_levels(on_data: impl Fn(AdlLevelUpdate) + Send + Sync + 'static) -> ChannelStream<AdlLevelUpdate> {
    ChannelStream::new("personal.adl.level", None, None, decode_adl_level, on_data)
}

pub fn position_modes(
    on_data: impl Fn(PositionModeUpdate) + Send + Sync + 'static,
) -> ChannelStream<PositionModeUpdate> {
    ChannelStream::new("personal.position.mode", None, None, decode_position_mode, on_data)
}

pub fn risk_limits(on_data: impl Fn(RiskLimit) + Send + Sync + 'static) -> ChannelStream<RiskLimit> {
    ChannelStream::new("personal.risk.limit", None, None, decode_risk_limit, on_data)
}

fn code<T: TryFrom<i64, Error = DecodeError>>(d: &Value, key: &str) -> Result<T, DecodeError> {
    T::try_from(i64_field(d, key)?)
}

fn text(d: &Value, key: &str) -> Result<String, DecodeError> {
    str_field(d, key).map(str::to_string)
}

fn decode_order(frame: &ChannelFrame) -> Result<Order, DecodeError> {
    let d = &frame.data;
    Ok(Order {
        order_id: text(d, "orderId")?,
        symbol: text(d, "symbol")?,
        position_id: i64_field(d, "positionId")?,
        price: f64_field(d, "price")?,
        vol: f64_field(d, "vol")?,
        leverage: f64_field(d, "leverage")?,
        side: code(d, "side")?,
        category: code(d, "category")?,
        order_type: code(d, "orderType")?,
        deal_avg_price: f64_field(d, "dealAvgPrice")?,
        deal_vol: f64_field(d, "dealVol")?,
        order_margin: f64_field(d, "orderMargin")?,
        used_margin: f64_field(d, "usedMargin")?,
        taker_fee: f64_field(d, "takerFee")?,
        maker_fee: f64_field(d, "makerFee")?,
        profit: f64_field(d, "profit")?,
        fee_currency: text(d, "feeCurrency")?,
        margin_mode: code(d, "openType")?,
        state: code(d, "state")?,
        error_code: code(d, "errorCode")?,
        external_oid: d.get("externalOid").and_then(Value::as_str).unwrap_or_default().to_string(),
        create_time: u64_field(d, "createTime")?,
        update_time: u64_field(d, "updateTime")?,
        send_time: frame.ts,
    })
}

fn decode_asset(frame: &ChannelFrame) -> Result<Asset, DecodeError> {
    let d = &frame.data;
    Ok(Asset {
        currency: text(d, "currency")?,
        position_margin: f64_field(d, "positionMargin")?,
        frozen_balance: f64_field(d, "frozenBalance")?,
        available_balance: f64_field(d, "availableBalance")?,
        cash_balance: f64_field(d, "cashBalance")?,
        send_time: frame.ts,
    })
}

fn decode_position(frame: &ChannelFrame) -> Result<Position, DecodeError> {
    let d = &frame.data;
    Ok(Position {
        position_id: i64_field(d, "positionId")?,
        symbol: text(d, "symbol")?,
        hold_vol: f64_field(d, "holdVol")?,
        position_type: code(d, "positionType")?,
        margin_mode: code(d, "openType")?,
        state: code(d, "state")?,
        frozen_vol: f64_field(d, "frozenVol")?,
        close_vol: f64_field(d, "closeVol")?,
        hold_avg_price: f64_field(d, "holdAvgPrice")?,
        close_avg_price: f64_field(d, "closeAvgPrice")?,
        open_avg_price: f64_field(d, "openAvgPrice")?,
        liquidate_price: f64_field(d, "liquidatePrice")?,
        oim: f64_field(d, "oim")?,
        adl_level: code(d, "adlLevel")?,
        im: f64_field(d, "im")?,
        hold_fee: f64_field(d, "holdFee")?,
        realised: f64_field(d, "realised")?,
        auto_add_im: d.get("autoAddIm").and_then(Value::as_bool).unwrap_or(false),
        leverage: i64_field(d, "leverage")?,
        send_time: frame.ts,
    })
}

fn decode_adl_level(frame: &ChannelFrame) -> Result<AdlLevelUpdate, DecodeError> {
    let d = &frame.data;
    Ok(AdlLevelUpdate {
        adl_level: code(d, "adlLevel")?,
        position_id: i64_field(d, "positionId")?,
        send_time: frame.ts,
    })
}

fn decode_position_mode(frame: &ChannelFrame) -> Result<PositionModeUpdate, DecodeError> {
    Ok(PositionModeUpdate { position_mode: code(&frame.data, "positionMode")?, send_time: frame.ts })
}

fn decode_risk_limit(frame: &ChannelFrame) -> Result<RiskLimit, DecodeError> {
    let d = &frame.data;
    Ok(RiskLimit {
        symbol: text(d, "symbol")?,
        position_type: code(d, "positionType")?,
        risk_source: code(d, "riskSource")?,
        level: i64_field(d, "level")?,
        max_vol: f64_field(d, "maxVol")?,
        max_leverage: i64_field(d, "maxLeverage")?,
        mmr: f64_field(d, "mmr")?,
        imr: f64_field(d, "imr")?,
        send_time: frame.ts,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mx_core::EventHandler;
    use mx_md::futures::decode_channel_frame;
    use parking_lot::Mutex;

    use super::*;

    fn frame(raw: &str) -> ChannelFrame {
        decode_channel_frame(raw.as_bytes()).unwrap()
    }

    fn capture<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, impl Fn(T) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |v: T| sink.lock().push(v))
    }

    #[test]
    fn keys_and_channels() {
        let stream = orders(|_| {});
        assert_eq!(stream.key(), "personal.order");
        assert!(stream.accept_event(&frame(r#"{"channel":"push.personal.order","data":{}}"#)));
        assert!(!stream.accept_event(&frame(r#"{"channel":"push.personal.asset","data":{}}"#)));
        assert_eq!(risk_limits(|_| {}).key(), "personal.risk.limit");
    }

    #[test]
    fn order_decodes() {
        let (seen, on_data) = capture();
        orders(on_data).handle_event(&frame(
            r#"{"channel":"push.personal.order","data":{"category":1,"createTime":1610005069976,"dealAvgPrice":0.731,"dealVol":1,"errorCode":0,"externalOid":"_m_95bc2b72d3784bce8f9efecbdef9fe35","feeCurrency":"USDT","leverage":0,"makerFee":0,"openType":1,"orderId":"102067003631907840","orderMargin":0,"orderType":5,"positionId":1397818,"price":0.707,"profit":-0.0005,"side":4,"state":3,"symbol":"CRV_USDT","takerFee":0.00004386,"updateTime":1610005069983,"usedMargin":0,"vol":1},"ts":1610005069989}"#,
        ));
        let seen = seen.lock();
        let order = &seen[0];
        assert_eq!(order.order_id, "102067003631907840");
        assert_eq!(order.side, OrderSide::CloseLong);
        assert_eq!(order.order_type, OrderType::Market);
        assert_eq!(order.state, OrderState::Completed);
        assert_eq!(order.error_code, OrderErrorCode::Normal);
        assert_eq!(order.margin_mode, MarginMode::Isolated);
        assert_eq!(order.send_time, 1610005069989);
    }

    #[test]
    fn asset_and_position_decode() {
        let (assets_seen, on_asset) = capture();
        assets(on_asset).handle_event(&frame(
            r#"{"channel":"push.personal.asset","data":{"availableBalance":0.7514236,"cashBalance":0.7514236,"currency":"USDT","frozenBalance":0,"positionMargin":0},"ts":1610005070083}"#,
        ));
        assert_eq!(assets_seen.lock()[0].available_balance, 0.7514236);

        let (positions_seen, on_position) = capture();
        positions(on_position).handle_event(&frame(
            r#"{"channel":"push.personal.position","data":{"autoAddIm":false,"closeAvgPrice":0.731,"closeVol":1,"frozenVol":0,"holdAvgPrice":0.736,"holdFee":0,"holdVol":0,"im":0,"leverage":15,"liquidatePrice":0,"oim":0,"openAvgPrice":0.736,"openType":1,"positionId":1397818,"positionType":1,"realised":-0.0005,"state":3,"symbol":"CRV_USDT","adlLevel":2},"ts":1610005070157}"#,
        ));
        let positions_seen = positions_seen.lock();
        assert_eq!(positions_seen[0].position_type, PositionType::Long);
        assert_eq!(positions_seen[0].state, PositionState::Closed);
        assert_eq!(positions_seen[0].adl_level.get(), 2);
        assert_eq!(positions_seen[0].leverage, 15);
    }

    #[test]
    fn small_events_decode() {
        let (adl, on_adl) = capture();
        adl_levels(on_adl).handle_event(&frame(
            r#"{"channel":"push.personal.adl.level","data":{"adlLevel":0,"positionId":1397818},"ts":1}"#,
        ));
        assert_eq!(adl.lock()[0].position_id, 1397818);

        let (modes, on_mode) = capture();
        position_modes(on_mode).handle_event(&frame(
            r#"{"channel":"push.personal.position.mode","data":{"positionMode":1},"ts":2}"#,
        ));
        assert_eq!(modes.lock()[0], PositionModeUpdate { position_mode: PositionMode::Hedge, send_time: 2 });

        let (limits, on_limit) = capture();
        risk_limits(on_limit).handle_event(&frame(
            r#"{"channel":"push.personal.risk.limit","data":{"symbol":"BTC_USDT","positionType":2,"riskSource":1,"level":1,"maxVol":1000,"maxLeverage":125,"mmr":0.004,"imr":0.008},"ts":3}"#,
        ));
        let limits = limits.lock();
        assert_eq!(limits[0].risk_source, RiskSource::LiquidationService);
        assert_eq!(limits[0].max_leverage, 125);
    }

    #[test]
    fn bad_codes_reach_on_invalid() {
        let (data, on_data) = capture::<Order>();
        let (invalid, on_invalid) = capture::<DecodeError>();
        let stream = orders(on_data).on_invalid(on_invalid);
        stream.handle_event(&frame(
            r#"{"channel":"push.personal.order","data":{"category":1,"createTime":1,"dealAvgPrice":0,"dealVol":0,"errorCode":99,"feeCurrency":"USDT","leverage":0,"makerFee":0,"openType":1,"orderId":"1","orderMargin":0,"orderType":1,"positionId":1,"price":1,"profit":0,"side":1,"state":1,"symbol":"X","takerFee":0,"updateTime":1,"usedMargin":0,"vol":1},"ts":1}"#,
        ));
        assert!(data.lock().is_empty());
        assert_eq!(invalid.lock()[0], DecodeError::new("unknown order error code: 99"));
    }
}
