pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod store;

pub use config::Config;
pub use datasource::{
    CoinGeckoDataSource, DataSourceError, EtherscanDataSource, LedgerDataSource,
    MockLedgerDataSource, MockPriceDataSource, PriceDataSource,
};
pub use domain::{
    Address, BlockNumber, Decimal, LedgerRecord, RangeOption, RawTransferEvent, TokenSymbol,
    TxHash, UnixTime,
};
pub use engine::{Classification, PortfolioWindow, PriceSeries, Trade, TradeError};
pub use error::AppError;
pub use orchestration::{PriceLoader, Watcher, WindowLoader};
pub use store::SnapshotStore;
