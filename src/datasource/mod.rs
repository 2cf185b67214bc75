//! Data source abstraction for ledger transfer events and market prices.

use crate::domain::{Address, BlockNumber, Decimal, RawTransferEvent, SortOrder, UnixTime};
use async_trait::async_trait;
use std::fmt;

pub mod coingecko;
pub mod etherscan;
mod http;
pub mod mock;

pub use coingecko::CoinGeckoDataSource;
pub use etherscan::EtherscanDataSource;
pub use mock::{MockLedgerDataSource, MockPriceDataSource};

/// Maximum number of records the indexer returns for one transfer query.
pub const PAGE_SIZE: usize = 10_000;

/// Source of on-chain token-transfer data.
///
/// Implementations handle transport retries; pagination across pages is the
/// caller's job (see `orchestration::loader`).
#[async_trait]
pub trait LedgerDataSource: Send + Sync + fmt::Debug {
    /// Latest block mined at or before `timestamp`.
    async fn block_number_at_or_before(
        &self,
        timestamp: UnixTime,
    ) -> Result<BlockNumber, DataSourceError>;

    /// One page (at most [`PAGE_SIZE`] records) of token transfers touching
    /// `address` with `start_block <= block <= end_block`.
    async fn transfer_events(
        &self,
        address: &Address,
        start_block: BlockNumber,
        end_block: BlockNumber,
        order: SortOrder,
    ) -> Result<Vec<RawTransferEvent>, DataSourceError>;

    /// Current balance of `contract` held by `address`, in the token's smallest unit.
    async fn token_balance(
        &self,
        address: &Address,
        contract: &Address,
    ) -> Result<u128, DataSourceError>;
}

/// Source of USD market prices.
#[async_trait]
pub trait PriceDataSource: Send + Sync + fmt::Debug {
    /// Provider id for a ticker symbol, or `None` if the provider does not list it.
    async fn coin_id_for_symbol(&self, symbol: &str) -> Result<Option<String>, DataSourceError>;

    /// Historical prices in `[from, to]`, ordered by timestamp.
    async fn price_series(
        &self,
        coin_id: &str,
        from: UnixTime,
        to: UnixTime,
    ) -> Result<Vec<(UnixTime, Decimal)>, DataSourceError>;

    /// Current price.
    async fn spot_price(&self, coin_id: &str) -> Result<Decimal, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
    /// The API answered with an error status in its body
    ApiError(String),
    /// A full page made no block progress, so paging cannot advance
    PaginationStalled(BlockNumber),
    /// Other error
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::ApiError(msg) => write!(f, "API error: {}", msg),
            DataSourceError::PaginationStalled(block) => {
                write!(f, "Pagination stalled at block {}", block)
            }
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}
