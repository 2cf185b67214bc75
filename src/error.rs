use crate::config::ConfigError;
use crate::datasource::DataSourceError;
use crate::engine::TradeError;
use crate::orchestration::LoadError;
use crate::store::StoreError;
use thiserror::Error;

/// Failure at the binary boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),
    #[error("Snapshot error: {0}")]
    Store(#[from] StoreError),
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
    #[error("Trade reconstruction error: {0}")]
    Trade(#[from] TradeError),
}
