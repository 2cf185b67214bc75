//! Pure computation engine for trade reconstruction and portfolio analytics.

use crate::domain::{Address, BlockNumber, Decimal, LedgerRecord, TokenSymbol, TxHash, UnixTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub mod balances;
pub mod moments;
pub mod price;
pub mod reconstruct;
pub mod window;

pub use balances::{BalanceChanges, CumulativeBalances};
pub use moments::Moments;
pub use price::{PriceSeries, PricedTrade};
pub use reconstruct::{reconstruct_trades, Inconsistency, Swap, Trade, TradeError, Transfer};
pub use window::{PortfolioWindow, TradeTable};

/// One record's effect on one token, signed from the watched address's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTrade {
    pub hash: TxHash,
    pub block_number: BlockNumber,
    pub timestamp: UnixTime,
    pub token: TokenSymbol,
    /// Negative when the address sent the tokens.
    pub value: Decimal,
}

impl TokenTrade {
    pub fn from_record(record: &LedgerRecord, address: &Address) -> Self {
        Self {
            hash: record.hash.clone(),
            block_number: record.block_number,
            timestamp: record.timestamp,
            token: record.token_symbol.clone(),
            value: record.signed_value(address),
        }
    }
}

/// Add `value` to a running total of `token`.
///
/// A total that leaves the representable range saturates at
/// [`Decimal::MAX`] or [`Decimal::MIN`] and is logged.
pub(crate) fn accumulate(total: Decimal, value: Decimal, token: &TokenSymbol) -> Decimal {
    total.checked_add(value).unwrap_or_else(|| {
        warn!("{} total overflows at {} + {}, saturating", token, total, value);
        total.saturating_add(value)
    })
}

/// Directional bias of an address in one token over a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Every trade was an inflow.
    LongOnly,
    /// Every trade was an outflow.
    ShortOnly,
    /// Inflows outweigh outflows.
    NetLong,
    /// Outflows outweigh inflows.
    NetShort,
    /// Balanced, or no trades at all.
    Mixed,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Classification::LongOnly => "long-only",
            Classification::ShortOnly => "short-only",
            Classification::NetLong => "net-long",
            Classification::NetShort => "net-short",
            Classification::Mixed => "mixed",
        };
        f.write_str(s)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_display() {
        assert_eq!(Classification::LongOnly.to_string(), "long-only");
        assert_eq!(Classification::NetShort.to_string(), "net-short");
    }

    #[test]
    fn test_accumulate_saturates_on_overflow() {
        let big = Decimal::from_str_canonical("50000000000000000000000000000").unwrap();
        let token = TokenSymbol::from("SPAM");
        assert_eq!(accumulate(big, big, &token), Decimal::MAX);
        assert_eq!(accumulate(-big, -big, &token), Decimal::MIN);
        assert_eq!(accumulate(big, -big, &token), Decimal::zero());
    }

    #[test]
    fn test_token_trade_from_outbound_record() {
        let record = testing::record("0x1", 7, 70, testing::WATCHED, "0xdex", "UNI", 3, 0);
        let trade = TokenTrade::from_record(&record, &Address::new(testing::WATCHED));
        assert_eq!(trade.value, -Decimal::from_str_canonical("3").unwrap());
        assert_eq!(trade.block_number, BlockNumber::new(7));
    }
}
