//! Groups transfer records sharing a transaction hash into logical trades.

use crate::domain::{Address, BlockNumber, Decimal, LedgerRecord, TokenSymbol, TxHash, UnixTime};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A single transfer into or out of the watched address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub record: LedgerRecord,
    /// Decimal value, negative when the address is the sender.
    pub value: Decimal,
}

/// Two transfers in one transaction: one leg out of the address, one leg in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap {
    pub outbound: LedgerRecord,
    pub inbound: LedgerRecord,
}

impl Swap {
    pub fn from_token(&self) -> &TokenSymbol {
        &self.outbound.token_symbol
    }

    pub fn to_token(&self) -> &TokenSymbol {
        &self.inbound.token_symbol
    }

    /// Outbound amount, always negative.
    pub fn from_value(&self) -> Decimal {
        -self.outbound.value()
    }

    /// Inbound amount, always positive.
    pub fn to_value(&self) -> Decimal {
        self.inbound.value()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trade {
    Transfer(Transfer),
    Swap(Swap),
}

impl Trade {
    pub fn hash(&self) -> &TxHash {
        match self {
            Trade::Transfer(t) => &t.record.hash,
            Trade::Swap(s) => &s.outbound.hash,
        }
    }

    pub fn block_number(&self) -> BlockNumber {
        match self {
            Trade::Transfer(t) => t.record.block_number,
            Trade::Swap(s) => s.outbound.block_number,
        }
    }

    pub fn timestamp(&self) -> UnixTime {
        match self {
            Trade::Transfer(t) => t.record.timestamp,
            Trade::Swap(s) => s.outbound.timestamp,
        }
    }

    /// Signed contribution of this trade to `token`, or `None` if the trade
    /// does not move that token.
    pub fn value_for(&self, token: &TokenSymbol) -> Option<Decimal> {
        match self {
            Trade::Transfer(t) => (&t.record.token_symbol == token).then_some(t.value),
            Trade::Swap(s) => {
                let mut total = None;
                if s.from_token() == token {
                    total = Some(s.from_value());
                }
                if s.to_token() == token {
                    total = Some(total.unwrap_or_default() + s.to_value());
                }
                total
            }
        }
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trade::Transfer(t) => {
                write!(f, "{}: {} ${}", t.record.timestamp, t.value, t.record.token_symbol)
            }
            Trade::Swap(s) => write!(
                f,
                "{}: {} ${} -> {} ${}",
                s.outbound.timestamp,
                s.from_value(),
                s.from_token(),
                s.to_value(),
                s.to_token()
            ),
        }
    }
}

/// Why the two legs of a swap cannot be accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    BlockMismatch(BlockNumber, BlockNumber),
    TimestampMismatch(UnixTime, UnixTime),
    NoOutboundLeg,
    /// A leg moves nothing, so the swap has no direction in that token.
    ZeroValueLeg(TokenSymbol),
}

impl std::fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Inconsistency::BlockMismatch(a, b) => write!(f, "leg blocks differ ({} vs {})", a, b),
            Inconsistency::TimestampMismatch(a, b) => {
                write!(f, "leg timestamps differ ({} vs {})", a, b)
            }
            Inconsistency::NoOutboundLeg => write!(f, "neither leg leaves the address"),
            Inconsistency::ZeroValueLeg(token) => write!(f, "the {} leg has zero value", token),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TradeError {
    /// More than two address-touching records share one hash.
    #[error("ambiguous trade {hash}: {count} records share the hash")]
    Ambiguous { hash: TxHash, count: usize },
    /// The two legs of a swap disagree.
    #[error("inconsistent trade {hash}: {reason}")]
    Inconsistent { hash: TxHash, reason: Inconsistency },
}

impl TradeError {
    pub fn hash(&self) -> &TxHash {
        match self {
            TradeError::Ambiguous { hash, .. } => hash,
            TradeError::Inconsistent { hash, .. } => hash,
        }
    }
}

/// Reconstruct the trades that move `token` for `address`.
///
/// Every record in `records` carrying a hash that also carries a `token`
/// transfer joins that hash's group, so swap legs of other tokens are found.
/// Groups keep window order, and hashes appear in first-seen order. The
/// first bad group fails the whole token; no partial result is returned.
///
/// The two legs of a swap must agree on block and timestamp and both move a
/// non-zero amount, so every [`Swap`] has `from_value < 0 < to_value`.
pub fn reconstruct_trades(
    address: &Address,
    records: &[LedgerRecord],
    token: &TokenSymbol,
) -> Result<Vec<Trade>, TradeError> {
    let trade_hashes: HashSet<&TxHash> = records
        .iter()
        .filter(|r| &r.token_symbol == token)
        .map(|r| &r.hash)
        .collect();

    let mut order: Vec<&TxHash> = Vec::new();
    let mut groups: HashMap<&TxHash, Vec<&LedgerRecord>> = HashMap::new();
    for record in records {
        if !trade_hashes.contains(&record.hash) || !record.touches(address) {
            continue;
        }
        groups
            .entry(&record.hash)
            .or_insert_with(|| {
                order.push(&record.hash);
                Vec::new()
            })
            .push(record);
    }

    order
        .into_iter()
        .map(|hash| {
            let legs = groups.remove(hash).unwrap_or_default();
            build_trade(address, hash, legs)
        })
        .collect()
}

fn build_trade(
    address: &Address,
    hash: &TxHash,
    legs: Vec<&LedgerRecord>,
) -> Result<Trade, TradeError> {
    match legs.as_slice() {
        [record] => Ok(Trade::Transfer(Transfer {
            value: record.signed_value(address),
            record: (*record).clone(),
        })),
        [first, second] => {
            let (outbound, inbound) = if first.is_outbound_for(address) {
                (*first, *second)
            } else if second.is_outbound_for(address) {
                (*second, *first)
            } else {
                return Err(TradeError::Inconsistent {
                    hash: hash.clone(),
                    reason: Inconsistency::NoOutboundLeg,
                });
            };
            check_legs(outbound, inbound).map_err(|reason| TradeError::Inconsistent {
                hash: hash.clone(),
                reason,
            })?;
            Ok(Trade::Swap(Swap {
                outbound: outbound.clone(),
                inbound: inbound.clone(),
            }))
        }
        _ => Err(TradeError::Ambiguous {
            hash: hash.clone(),
            count: legs.len(),
        }),
    }
}

/// Legs arrive grouped by hash, so only block, time and amount are compared.
fn check_legs(outbound: &LedgerRecord, inbound: &LedgerRecord) -> Result<(), Inconsistency> {
    if outbound.block_number != inbound.block_number {
        return Err(Inconsistency::BlockMismatch(
            outbound.block_number,
            inbound.block_number,
        ));
    }
    if outbound.timestamp != inbound.timestamp {
        return Err(Inconsistency::TimestampMismatch(
            outbound.timestamp,
            inbound.timestamp,
        ));
    }
    for leg in [outbound, inbound] {
        if leg.value().is_zero() {
            return Err(Inconsistency::ZeroValueLeg(leg.token_symbol.clone()));
        }
    }
    Ok(())
}
