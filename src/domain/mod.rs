//! Domain types for on-chain token transfers.
//!
//! This module provides:
//! - Lossless token amounts via the Decimal wrapper
//! - Domain primitives: UnixTime, BlockNumber, Address, TxHash, TokenSymbol
//! - The raw indexer record and its validated `LedgerRecord` form
//! - Named look-back ranges for retrieval windows

pub mod decimal;
pub mod primitives;
pub mod range;
pub mod record;

pub use decimal::Decimal;
pub use primitives::{Address, BlockNumber, SortOrder, TokenSymbol, TxHash, UnixTime};
pub use range::RangeOption;
pub use record::{LedgerRecord, RawTransferEvent, RecordError, TokenInfo};
