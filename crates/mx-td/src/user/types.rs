//! Integer-coded enums carried by personal push payloads.

use mx_core::DecodeError;

/// Declares an enum decoded from an integer code via `TryFrom<i64>`.
macro_rules! code_enum {
    ($(#[$meta:meta])* $name:ident, $what:literal { $($code:literal => $variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl TryFrom<i64> for $name {
            type Error = DecodeError;

            fn try_from(code: i64) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok(Self::$variant),)+
                    other => Err(DecodeError::new(format!(concat!("unknown ", $what, " code: {}"), other))),
                }
            }
        }
    };
}

pub(crate) use code_enum;

code_enum!(OrderSide, "order side" {
    1 => OpenLong,
    2 => CloseShort,
    3 => OpenShort,
    4 => CloseLong,
});

code_enum!(OrderType, "order type" {
    1 => Limit,
    2 => LimitMaker,
    3 => ImmediateOrCancel,
    4 => FillOrKill,
    5 => Market,
    6 => MarketToLimit,
});

code_enum!(OrderCategory, "order category" {
    1 => LimitOrder,
    2 => SystemTakeOverDelegate,
    3 => CloseDelegate,
    4 => AdlReduction,
});

code_enum!(OrderState, "order state" {
    1 => Uninformed,
    2 => Uncompleted,
    3 => Completed,
    4 => Cancelled,
    5 => Invalid,
});

code_enum!(
    /// Why an order ended; `Normal` for orders that did not fail.
    OrderErrorCode, "order error" {
    0 => Normal,
    1 => ParamInvalid,
    2 => InsufficientBalance,
    3 => PositionNotExists,
    4 => PositionNotEnough,
    5 => PositionLiq,
    6 => OrderLiq,
    7 => RiskLevelLimit,
    8 => SysCancel,
    9 => PositionModeNotMatch,
    10 => ReduceOnlyLiq,
    11 => ContractNotEnable,
    12 => DeliveryCancel,
    13 => PositionLiqCancel,
    14 => AdlCancel,
    15 => BlackUserCancel,
    16 => SettleFundingCancel,
    17 => PositionImChangeCancel,
    18 => IocCancel,
    19 => FokCancel,
    20 => PostOnlyCancel,
    21 => MarketCancel,
});

code_enum!(PositionType, "position type" {
    1 => Long,
    2 => Short,
});

code_enum!(
    /// Margin mode of an order or position.
    MarginMode, "open type" {
    1 => Isolated,
    2 => Cross,
});

code_enum!(PositionState, "position state" {
    1 => Holding,
    2 => SystemHolding,
    3 => Closed,
});

code_enum!(PositionMode, "position mode" {
    1 => Hedge,
    2 => OneWay,
});

code_enum!(RiskSource, "risk source" {
    0 => Other,
    1 => LiquidationService,
});

/// Auto-deleveraging rank, 0 (none) to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AdlLevel(u8);

impl AdlLevel {
    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for AdlLevel {
    type Error = DecodeError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match u8::try_from(code) {
            Ok(level) if level <= 5 => Ok(Self(level)),
            _ => Err(DecodeError::new(format!("invalid adl level code: {code}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_variants() {
        assert_eq!(OrderSide::try_from(3).unwrap(), OrderSide::OpenShort);
        assert_eq!(OrderType::try_from(6).unwrap(), OrderType::MarketToLimit);
        assert_eq!(OrderErrorCode::try_from(0).unwrap(), OrderErrorCode::Normal);
        assert_eq!(OrderErrorCode::try_from(21).unwrap(), OrderErrorCode::MarketCancel);
        assert_eq!(RiskSource::try_from(0).unwrap(), RiskSource::Other);
        assert_eq!(PositionMode::try_from(2).unwrap(), PositionMode::OneWay);
    }

    #[test]
    fn unknown_codes_are_errors() {
        assert_eq!(
            OrderSide::try_from(0).unwrap_err(),
            DecodeError::new("unknown order side code: 0")
        );
        assert!(OrderErrorCode::try_from(22).is_err());
        assert!(MarginMode::try_from(3).is_err());
    }

    #[test]
    fn adl_level_range() {
        assert_eq!(AdlLevel::try_from(0).unwrap().get(), 0);
        assert_eq!(AdlLevel::try_from(5).unwrap().get(), 5);
        assert!(AdlLevel::try_from(6).is_err());
        assert!(AdlLevel::try_from(-1).is_err());
    }
}
