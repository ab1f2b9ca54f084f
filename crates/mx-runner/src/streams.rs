//! Builds subscription specs from config stream names.
//!
//! Names are `kind` or `kind:arg`; every callback logs what it receives.
//!
//! | Family  | Kinds                                                                    |
//! |---------|--------------------------------------------------------------------------|
//! | spot    | `depth[:5/10/20]`, `diff_depth[:10ms/100ms]`, `diff_depth_batch`, `deals[:10ms/100ms]`, `book_ticker[:…]`, `book_ticker_batch`, `kline[:Min1…]` |
//! | futures | `depth`, `deals`, `ticker`, `tickers`, `kline[:Min1…]`, `funding_rate`, `index_price`, `fair_price` |
//! | user    | `order`, `asset`, `position`, `adl_level`, `position_mode`, `risk_limit` (all when empty) |
//! | spot_user | `account`, `deals`, `orders` (all when empty) |

use std::sync::Arc;

use anyhow::Result;
use mx_core::config::{Family, SessionBlock};
use mx_core::{EventHandler, MxError};
use mx_md::KlineInterval;
use mx_md::futures::FuturesStream;
use mx_md::spot::{self, DepthLevels, SpotFrame, UpdateInterval};
use mx_td::{spot_user, user};
use tracing::{info, warn};

fn unknown(family: Family, kind: &str) -> anyhow::Error {
    MxError::UnknownStream { family: family.to_string(), stream: kind.to_string() }.into()
}

fn kline_interval(arg: Option<&str>) -> Result<KlineInterval> {
    Ok(arg.map(str::parse).transpose()?.unwrap_or(KlineInterval::Min1))
}

fn update_interval(arg: Option<&str>) -> Result<UpdateInterval> {
    Ok(arg.map(str::parse).transpose()?.unwrap_or(UpdateInterval::Ms100))
}

/// Callback logging each decoded value under `label`.
macro_rules! logged {
    ($label:expr) => {{
        let label = $label.clone();
        move |v| info!("[{label}] {v:?}")
    }};
}

/// Logs decode failures under `label`.
fn log_invalid(label: &str) -> impl Fn(mx_core::DecodeError) + Send + Sync + 'static {
    let label = label.to_string();
    move |e| warn!("[{label}] invalid payload: {e}")
}

pub fn spot_specs(block: &SessionBlock) -> Result<Vec<Arc<dyn EventHandler<SpotFrame>>>> {
    let label = block.label();
    let mut specs: Vec<Arc<dyn EventHandler<SpotFrame>>> = Vec::new();
    for symbol in &block.symbols {
        for (kind, arg) in block.stream_specs() {
            let spec: Arc<dyn EventHandler<SpotFrame>> = match kind {
                "depth" => {
                    let levels = arg.map(str::parse).transpose()?.unwrap_or(DepthLevels::L5);
                    Arc::new(spot::limit_depth(symbol, levels, logged!(label)).on_invalid(log_invalid(&label)))
                }
                "diff_depth" => Arc::new(
                    spot::diff_depth(symbol, update_interval(arg)?, logged!(label)).on_invalid(log_invalid(&label)),
                ),
                "diff_depth_batch" => {
                    Arc::new(spot::diff_depth_batch(symbol, logged!(label)).on_invalid(log_invalid(&label)))
                }
                "deals" => Arc::new(
                    spot::deals(symbol, update_interval(arg)?, logged!(label)).on_invalid(log_invalid(&label)),
                ),
                "book_ticker" => Arc::new(
                    spot::book_ticker(symbol, update_interval(arg)?, logged!(label)).on_invalid(log_invalid(&label)),
                ),
                "book_ticker_batch" => {
                    Arc::new(spot::book_ticker_batch(symbol, logged!(label)).on_invalid(log_invalid(&label)))
                }
                "kline" => Arc::new(
                    spot::kline(symbol, kline_interval(arg)?, logged!(label)).on_invalid(log_invalid(&label)),
                ),
                other => return Err(unknown(Family::Spot, other)),
            };
            specs.push(spec);
        }
    }
    Ok(specs)
}

pub fn futures_specs(block: &SessionBlock) -> Result<Vec<Arc<dyn FuturesStream>>> {
    use mx_md::futures as f;

    let label = block.label();
    let mut specs: Vec<Arc<dyn FuturesStream>> = Vec::new();
    for (kind, arg) in block.stream_specs() {
        // One batch stream covers every contract.
        if kind == "tickers" {
            specs.push(Arc::new(f::tickers(logged!(label)).on_invalid(log_invalid(&label))));
            continue;
        }
        for symbol in &block.symbols {
            let spec: Arc<dyn FuturesStream> = match kind {
                "depth" => Arc::new(f::depth(symbol, logged!(label)).on_invalid(log_invalid(&label))),
                "deals" => Arc::new(f::deals(symbol, logged!(label)).on_invalid(log_invalid(&label))),
                "ticker" => Arc::new(f::ticker(symbol, logged!(label)).on_invalid(log_invalid(&label))),
                "kline" => Arc::new(
                    f::kline(symbol, kline_interval(arg)?, logged!(label)).on_invalid(log_invalid(&label)),
                ),
                "funding_rate" => Arc::new(f::funding_rate(symbol, logged!(label)).on_invalid(log_invalid(&label))),
                "index_price" => Arc::new(f::index_price(symbol, logged!(label)).on_invalid(log_invalid(&label))),
                "fair_price" => Arc::new(f::fair_price(symbol, logged!(label)).on_invalid(log_invalid(&label))),
                other => return Err(unknown(Family::Futures, other)),
            };
            specs.push(spec);
        }
    }
    Ok(specs)
}

pub fn user_specs(block: &SessionBlock) -> Result<Vec<Arc<dyn FuturesStream>>> {
    const ALL: [&str; 6] = ["order", "asset", "position", "adl_level", "position_mode", "risk_limit"];

    let label = block.label();
    let configured = block.stream_specs();
    let kinds: Vec<&str> =
        if configured.is_empty() { ALL.to_vec() } else { configured.iter().map(|(kind, _)| *kind).collect() };

    kinds
        .into_iter()
        .map(|kind| {
            let spec: Arc<dyn FuturesStream> = match kind {
                "order" => Arc::new(user::orders(logged!(label)).on_invalid(log_invalid(&label))),
                "asset" => Arc::new(user::assets(logged!(label)).on_invalid(log_invalid(&label))),
                "position" => Arc::new(user::positions(logged!(label)).on_invalid(log_invalid(&label))),
                "adl_level" => Arc::new(user::adl_levels(logged!(label)).on_invalid(log_invalid(&label))),
                "position_mode" => Arc::new(user::position_modes(logged!(label)).on_invalid(log_invalid(&label))),
                "risk_limit" => Arc::new(user::risk_limits(logged!(label)).on_invalid(log_invalid(&label))),
                other => return Err(unknown(Family::User, other)),
            };
            Ok(spec)
        })
        .collect()
}

pub fn spot_user_specs(block: &SessionBlock) -> Result<Vec<Arc<dyn EventHandler<SpotFrame>>>> {
    const ALL: [&str; 3] = ["account", "deals", "orders"];

    let label = block.label();
    let configured = block.stream_specs();
    let kinds: Vec<&str> =
        if configured.is_empty() { ALL.to_vec() } else { configured.iter().map(|(kind, _)| *kind).collect() };

    kinds
        .into_iter()
        .map(|kind| {
            let spec: Arc<dyn EventHandler<SpotFrame>> = match kind {
                "account" => Arc::new(spot_user::account_updates(logged!(label)).on_invalid(log_invalid(&label))),
                "deals" => Arc::new(spot_user::account_deals(logged!(label)).on_invalid(log_invalid(&label))),
                "orders" => Arc::new(spot_user::account_orders(logged!(label)).on_invalid(log_invalid(&label))),
                other => return Err(unknown(Family::SpotUser, other)),
            };
            Ok(spec)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(json: &str) -> SessionBlock {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn spot_specs_per_symbol_and_stream() {
        let b = block(r#"{"family":"spot","symbols":["BTCUSDT","ETHUSDT"],"streams":["depth:10","kline:Min5"]}"#);
        let ids: Vec<String> = spot_specs(&b).unwrap().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "spot@public.limit.depth.v3.api.pb@BTCUSDT@10",
                "spot@public.kline.v3.api.pb@BTCUSDT@Min5",
                "spot@public.limit.depth.v3.api.pb@ETHUSDT@10",
                "spot@public.kline.v3.api.pb@ETHUSDT@Min5",
            ]
        );
    }

    #[test]
    fn spot_diff_and_batch_kinds() {
        let b = block(
            r#"{"family":"spot","symbols":["BTCUSDT"],"streams":["diff_depth:10ms","diff_depth_batch","book_ticker_batch"]}"#,
        );
        let ids: Vec<String> = spot_specs(&b).unwrap().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "spot@public.aggre.depth.v3.api.pb@10ms@BTCUSDT",
                "spot@public.increase.depth.batch.v3.api.pb@BTCUSDT",
                "spot@public.bookTicker.batch.v3.api.pb@BTCUSDT",
            ]
        );
    }

    #[test]
    fn spot_user_kinds() {
        let b = block(r#"{"family":"spot_user","listen_key":"k"}"#);
        let ids: Vec<String> = spot_user_specs(&b).unwrap().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(
            ids,
            vec!["spot@private.account.v3.api.pb", "spot@private.deals.v3.api.pb", "spot@private.orders.v3.api.pb"]
        );
        let b = block(r#"{"family":"spot_user","listen_key":"k","streams":["orders","trades"]}"#);
        assert!(spot_user_specs(&b).is_err());
    }

    #[test]
    fn futures_tickers_once() {
        let b = block(r#"{"family":"futures","symbols":["BTC_USDT","ETH_USDT"],"streams":["tickers","deals"]}"#);
        let ids: Vec<String> = futures_specs(&b).unwrap().iter().map(|s| s.id().to_string()).collect();
        assert_eq!(ids, vec!["tickers", "deal@BTC_USDT", "deal@ETH_USDT"]);
    }

    #[test]
    fn user_defaults_to_every_channel() {
        let b = block(r#"{"family":"user","api_key":"k","secret_key":"s"}"#);
        assert_eq!(user_specs(&b).unwrap().len(), 6);
    }

    #[test]
    fn unknown_kinds_and_args_fail() {
        let b = block(r#"{"family":"spot","symbols":["BTCUSDT"],"streams":["trades"]}"#);
        match spot_specs(&b) {
            Err(e) => assert!(e.to_string().contains("unknown stream 'trades'"), "{e}"),
            Ok(_) => panic!("unknown kind accepted"),
        }
        let b = block(r#"{"family":"spot","symbols":["BTCUSDT"],"streams":["depth:7"]}"#);
        assert!(spot_specs(&b).is_err());
        let b = block(r#"{"family":"futures","symbols":["BTC_USDT"],"streams":["kline:Min2"]}"#);
        assert!(futures_specs(&b).is_err());
    }
}
