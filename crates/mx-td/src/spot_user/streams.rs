//! Spot account push streams (`spot@private.*.v3.api.pb`).

use mx_core::DecodeError;
use mx_md::TradeSide;
use mx_md::spot::proto::push_data_v3_api_wrapper::Body;
use mx_md::spot::proto::{PrivateAccountV3Api, PrivateDealsV3Api, PrivateOrdersV3Api};
use mx_md::spot::streams::decimal;
use mx_md::spot::{SpotPush, SpotStream};

use crate::user::types::code_enum;

code_enum!(SpotOrderType, "order type" {
    1 => LimitOrder,
    2 => PostOnly,
    3 => ImmediateOrCancel,
    4 => FillOrKill,
    5 => MarketOrder,
    100 => StopLossTakeProfit,
});

code_enum!(SpotOrderStatus, "order status" {
    1 => NotTraded,
    2 => FullyTraded,
    3 => PartiallyTraded,
    4 => Canceled,
    5 => PartiallyCanceled,
});

/// Balance change of one asset.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountUpdate {
    pub asset: String,
    pub coin_id: String,
    pub balance_amount: f64,
    pub balance_amount_change: f64,
    pub frozen_amount: f64,
    pub frozen_amount_change: f64,
    pub change_type: String,
    pub time: i64,
    pub send_time: Option<i64>,
}

/// One fill of the account's own order.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountDeal {
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    pub amount: f64,
    pub side: TradeSide,
    pub trade_id: String,
    pub order_id: String,
    pub client_order_id: String,
    pub fee_amount: f64,
    pub fee_currency: String,
    pub time: i64,
    pub is_maker: bool,
    pub is_self_trade: bool,
    pub send_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountOrder {
    pub id: String,
    pub client_id: String,
    pub price: f64,
    pub quantity: f64,
    pub amount: f64,
    pub avg_price: f64,
    pub order_type: SpotOrderType,
    pub side: TradeSide,
    pub is_maker: bool,
    pub remain_amount: f64,
    pub remain_quantity: f64,
    pub last_deal_quantity: Option<f64>,
    pub cumulative_quantity: f64,
    pub cumulative_amount: f64,
    pub status: SpotOrderStatus,
    pub create_time: i64,
    pub market: Option<String>,
    pub trigger_type: Option<i32>,
    pub trigger_price: Option<String>,
    pub state: Option<i32>,
    pub oco_id: Option<String>,
    pub route_factor: Option<String>,
    pub symbol_id: Option<String>,
    pub market_id: Option<String>,
    pub market_currency_id: Option<String>,
    pub currency_id: Option<String>,
    pub send_time: Option<i64>,
}

/// Balance updates of every asset.
pub fn account_updates(on_data: impl Fn(AccountUpdate) + Send + Sync + 'static) -> SpotStream<AccountUpdate> {
    SpotStream::new("spot@private.account.v3.api.pb".to_string(), decode_account_update, on_data)
}

/// Fills of the account's orders.
pub fn account_deals(on_data: impl Fn(AccountDeal) + Send + Sync + 'static) -> SpotStream<AccountDeal> {
    SpotStream::new("spot@private.deals.v3.api.pb".to_string(), decode_account_deal, on_data)
}

/// Order lifecycle updates.
pub fn account_orders(on_data: impl Fn(AccountOrder) + Send + Sync + 'static) -> SpotStream<AccountOrder> {
    SpotStream::new("spot@private.orders.v3.api.pb".to_string(), decode_account_order, on_data)
}

fn decode_account_update(push: &SpotPush) -> Option<Result<AccountUpdate, DecodeError>> {
    let Some(Body::PrivateAccount(a)) = &push.body else { return None };
    Some(map_account_update(a, push.send_time))
}

fn map_account_update(a: &PrivateAccountV3Api, send_time: Option<i64>) -> Result<AccountUpdate, DecodeError> {
    Ok(AccountUpdate {
        asset: a.vcoin_name.clone(),
        coin_id: a.coin_id.clone(),
        balance_amount: decimal("balanceAmount", &a.balance_amount)?,
        balance_amount_change: decimal("balanceAmountChange", &a.balance_amount_change)?,
        frozen_amount: decimal("frozenAmount", &a.frozen_amount)?,
        frozen_amount_change: decimal("frozenAmountChange", &a.frozen_amount_change)?,
        change_type: a.r#type.clone(),
        time: a.time,
        send_time,
    })
}

fn decode_account_deal(push: &SpotPush) -> Option<Result<AccountDeal, DecodeError>> {
    let Some(Body::PrivateDeals(d)) = &push.body else { return None };
    let symbol = push.symbol.as_ref()?;
    Some(map_account_deal(d, symbol, push.send_time))
}

fn map_account_deal(d: &PrivateDealsV3Api, symbol: &str, send_time: Option<i64>) -> Result<AccountDeal, DecodeError> {
    Ok(AccountDeal {
        symbol: symbol.to_string(),
        price: decimal("price", &d.price)?,
        quantity: decimal("quantity", &d.quantity)?,
        amount: decimal("amount", &d.amount)?,
        side: TradeSide::try_from(i64::from(d.trade_type))?,
        trade_id: d.trade_id.clone(),
        order_id: d.order_id.clone(),
        client_order_id: d.client_order_id.clone(),
        fee_amount: decimal("feeAmount", &d.fee_amount)?,
        fee_currency: d.fee_currency.clone(),
        time: d.time,
        is_maker: d.is_maker,
        is_self_trade: d.is_self_trade,
        send_time,
    })
}

fn decode_account_order(push: &SpotPush) -> Option<Result<AccountOrder, DecodeError>> {
    let Some(Body::PrivateOrders(o)) = &push.body else { return None };
    Some(map_account_order(o, push.send_time))
}

fn map_account_order(o: &PrivateOrdersV3Api, send_time: Option<i64>) -> Result<AccountOrder, DecodeError> {
    Ok(AccountOrder {
        id: o.id.clone(),
        client_id: o.client_id.clone(),
        price: decimal("price", &o.price)?,
        quantity: decimal("quantity", &o.quantity)?,
        amount: decimal("amount", &o.amount)?,
        avg_price: decimal("avgPrice", &o.avg_price)?,
        order_type: SpotOrderType::try_from(i64::from(o.order_type))?,
        side: TradeSide::try_from(i64::from(o.trade_type))?,
        is_maker: o.is_maker,
        remain_amount: decimal("remainAmount", &o.remain_amount)?,
        remain_quantity: decimal("remainQuantity", &o.remain_quantity)?,
        last_deal_quantity: o.last_deal_quantity.as_deref().map(|q| decimal("lastDealQuantity", q)).transpose()?,
        cumulative_quantity: decimal("cumulativeQuantity", &o.cumulative_quantity)?,
        cumulative_amount: decimal("cumulativeAmount", &o.cumulative_amount)?,
        status: SpotOrderStatus::try_from(i64::from(o.status))?,
        create_time: o.create_time,
        market: o.market.clone(),
        trigger_type: o.trigger_type,
        trigger_price: o.trigger_price.clone(),
        state: o.state,
        oco_id: o.oco_id.clone(),
        route_factor: o.route_factor.clone(),
        symbol_id: o.symbol_id.clone(),
        market_id: o.market_id.clone(),
        market_currency_id: o.market_currency_id.clone(),
        currency_id: o.currency_id.clone(),
        send_time,
    })
}
