//! # mx-md
//!
//! Public market-data stream families built on the `mx-core` session engine.
//!
//! - [`spot`]: spot market streams over protobuf pushes (limit and diff depth,
//!   deals, book tickers, kline)
//! - [`futures`]: futures market channels (depth, deals, tickers, kline,
//!   funding rate, index and fair price)
//!
//! ## Shared infrastructure
//!
//! - [`stream`]: `on_data` / `on_invalid` callback plumbing
//! - [`json_util`]: JSON field parsing helpers

pub mod futures;
pub mod json_util;
pub mod spot;
pub mod stream;

use std::fmt;
use std::str::FromStr;

use mx_core::DecodeError;

/// Candle interval, shared by the spot and futures kline streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KlineInterval {
    Min1,
    Min5,
    Min15,
    Min30,
    Min60,
    Hour4,
    Hour8,
    Day1,
    Week1,
    Month1,
}

impl KlineInterval {
    pub const ALL: [KlineInterval; 10] = [
        Self::Min1,
        Self::Min5,
        Self::Min15,
        Self::Min30,
        Self::Min60,
        Self::Hour4,
        Self::Hour8,
        Self::Day1,
        Self::Week1,
        Self::Month1,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Min1 => "Min1",
            Self::Min5 => "Min5",
            Self::Min15 => "Min15",
            Self::Min30 => "Min30",
            Self::Min60 => "Min60",
            Self::Hour4 => "Hour4",
            Self::Hour8 => "Hour8",
            Self::Day1 => "Day1",
            Self::Week1 => "Week1",
            Self::Month1 => "Month1",
        }
    }
}

impl fmt::Display for KlineInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KlineInterval {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == s)
            .ok_or_else(|| DecodeError::new(format!("unknown kline interval {s:?}")))
    }
}

/// Taker side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TryFrom<i64> for TradeSide {
    type Error = DecodeError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Buy),
            2 => Ok(Self::Sell),
            other => Err(DecodeError::new(format!("unknown trade side {other}"))),
        }
    }
}

/// One price level of an order book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Level {
    pub price: f64,
    pub quantity: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kline_interval_parses_its_own_names() {
        for interval in KlineInterval::ALL {
            assert_eq!(interval.to_string().parse::<KlineInterval>().unwrap(), interval);
        }
        assert!("Min2".parse::<KlineInterval>().is_err());
    }

    #[test]
    fn trade_side_codes() {
        assert_eq!(TradeSide::try_from(1).unwrap(), TradeSide::Buy);
        assert_eq!(TradeSide::try_from(2).unwrap(), TradeSide::Sell);
        assert!(TradeSide::try_from(3).is_err());
    }
}
