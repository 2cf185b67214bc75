//! Token-transfer records: the raw indexer shape and its validated form.

use crate::domain::{Address, BlockNumber, Decimal, TokenSymbol, TxHash, UnixTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// One token-transfer event exactly as the ledger indexer returns it.
///
/// Every field is an optional string so that a record missing a field can be
/// deserialized, reported and skipped instead of failing a whole page. This is
/// also the shape written to and read from on-disk snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransferEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<String>,
    #[serde(default, rename = "timeStamp", skip_serializing_if = "Option::is_none")]
    pub time_stamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_decimal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl RawTransferEvent {
    /// Block number if present and numeric; used by pagination before validation.
    pub fn block(&self) -> Option<BlockNumber> {
        self.block_number
            .as_deref()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(BlockNumber::new)
    }
}

/// A raw record that cannot be turned into a [`LedgerRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing field {0}")]
    MissingField(&'static str),
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("value {value} with {decimals} decimals is out of range")]
    ValueOutOfRange { value: String, decimals: u32 },
}

/// A validated token transfer touching some address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub hash: TxHash,
    pub block_number: BlockNumber,
    pub timestamp: UnixTime,
    pub from: Address,
    pub to: Address,
    pub token_symbol: TokenSymbol,
    pub token_name: Option<String>,
    pub token_decimal: u32,
    pub contract_address: Address,
    /// Amount in the token's smallest unit.
    pub raw_value: u128,
}

impl LedgerRecord {
    /// Decimal-adjusted amount: `raw_value * 10^-token_decimal`.
    ///
    /// Records built by hand may skip [`validate`](Self::validate); an amount
    /// whose whole part does not fit saturates at [`Decimal::MAX`] and is logged.
    pub fn value(&self) -> Decimal {
        self.checked_value().unwrap_or_else(|| {
            warn!(
                "Amount {} of {} in {} cannot be represented, saturating",
                self.raw_value, self.token_symbol, self.hash
            );
            Decimal::MAX
        })
    }

    /// Decimal-adjusted amount, or `None` when it cannot be represented.
    pub fn checked_value(&self) -> Option<Decimal> {
        Decimal::from_raw_units(self.raw_value, self.token_decimal)
    }

    /// Check the invariants that parsing alone cannot: the amount must be
    /// representable at the token's precision.
    pub fn validate(&self) -> Result<(), RecordError> {
        match self.checked_value() {
            Some(_) => Ok(()),
            None => Err(RecordError::ValueOutOfRange {
                value: self.raw_value.to_string(),
                decimals: self.token_decimal,
            }),
        }
    }

    /// Amount signed from the point of view of `address`: negative when it sent.
    pub fn signed_value(&self, address: &Address) -> Decimal {
        let value = self.value();
        if self.is_outbound_for(address) {
            -value
        } else {
            value
        }
    }

    pub fn is_outbound_for(&self, address: &Address) -> bool {
        &self.from == address
    }

    pub fn touches(&self, address: &Address) -> bool {
        &self.from == address || &self.to == address
    }
}

impl TryFrom<&RawTransferEvent> for LedgerRecord {
    type Error = RecordError;

    fn try_from(raw: &RawTransferEvent) -> Result<Self, Self::Error> {
        let hash = required(&raw.hash, "hash")?;
        let block_number = parse_field::<u64>(&raw.block_number, "blockNumber")?;
        let timestamp = parse_field::<i64>(&raw.time_stamp, "timeStamp")?;
        let from = required(&raw.from, "from")?;
        let to = required(&raw.to, "to")?;
        let token_symbol = required(&raw.token_symbol, "tokenSymbol")?;
        let token_decimal = parse_field::<u32>(&raw.token_decimal, "tokenDecimal")?;
        let contract_address = required(&raw.contract_address, "contractAddress")?;
        let raw_value = parse_field::<u128>(&raw.value, "value")?;

        let record = LedgerRecord {
            hash: TxHash::new(hash),
            block_number: BlockNumber::new(block_number),
            timestamp: UnixTime::new(timestamp),
            from: Address::new(from),
            to: Address::new(to),
            token_symbol: TokenSymbol::new(token_symbol),
            token_name: raw.token_name.clone().filter(|n| !n.is_empty()),
            token_decimal,
            contract_address: Address::new(contract_address),
            raw_value,
        };
        record.validate()?;
        Ok(record)
    }
}

impl From<&LedgerRecord> for RawTransferEvent {
    fn from(record: &LedgerRecord) -> Self {
        RawTransferEvent {
            hash: Some(record.hash.to_string()),
            block_number: Some(record.block_number.to_string()),
            time_stamp: Some(record.timestamp.to_string()),
            from: Some(record.from.to_string()),
            to: Some(record.to.to_string()),
            token_symbol: Some(record.token_symbol.to_string()),
            token_name: record.token_name.clone(),
            token_decimal: Some(record.token_decimal.to_string()),
            contract_address: Some(record.contract_address.to_string()),
            value: Some(record.raw_value.to_string()),
        }
    }
}

fn required<'a>(field: &'a Option<String>, name: &'static str) -> Result<&'a str, RecordError> {
    match field.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(RecordError::MissingField(name)),
    }
}

fn parse_field<T: std::str::FromStr>(
    field: &Option<String>,
    name: &'static str,
) -> Result<T, RecordError> {
    let s = required(field, name)?;
    s.parse::<T>().map_err(|_| RecordError::InvalidField {
        field: name,
        value: s.to_string(),
    })
}

/// Per-token metadata, taken from the first record seen for a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub symbol: TokenSymbol,
    pub token_name: Option<String>,
    pub token_decimal: u32,
    pub contract_address: Address,
}

impl TokenInfo {
    pub fn from_record(record: &LedgerRecord) -> Self {
        TokenInfo {
            symbol: record.token_symbol.clone(),
            token_name: record.token_name.clone(),
            token_decimal: record.token_decimal,
            contract_address: record.contract_address.clone(),
        }
    }

    /// Scale a raw on-chain balance by this token's decimals.
    pub fn scale_raw(&self, raw: u128) -> Option<Decimal> {
        Decimal::from_raw_units(raw, self.token_decimal)
    }
}
