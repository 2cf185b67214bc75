use crate::domain::{Address, RangeOption, TokenSymbol};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub etherscan_api_key: String,
    pub etherscan_api_url: String,
    pub coingecko_api_url: String,
    pub snapshot_dir: Option<String>,
    pub watch_address: Address,
    pub poll_interval: Duration,
    pub window: RangeOption,
    pub base_tokens: Vec<TokenSymbol>,
    pub value_trades: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let etherscan_api_key = env_map
            .get("ETHERSCAN_API_KEY")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("ETHERSCAN_API_KEY".to_string()))?;

        let etherscan_api_url = env_map
            .get("ETHERSCAN_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.etherscan.io/api".to_string());

        let coingecko_api_url = env_map
            .get("COINGECKO_API_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.coingecko.com/api/v3".to_string());

        let snapshot_dir = env_map
            .get("SNAPSHOT_DIR")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let watch_address = resolve_watch_address(&env_map)?;

        let poll_secs = env_map
            .get("POLL_INTERVAL_SECS")
            .map(|s| s.as_str())
            .unwrap_or("120")
            .parse::<u64>()
            .ok()
            .filter(|&secs| secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "POLL_INTERVAL_SECS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let window = env_map
            .get("WINDOW")
            .map(|s| s.as_str())
            .unwrap_or("day")
            .parse::<RangeOption>()
            .map_err(|e| ConfigError::InvalidValue("WINDOW".to_string(), e))?;

        let base_tokens = env_map
            .get("BASE_TOKENS")
            .map(|s| s.as_str())
            .unwrap_or("WETH,USDC,USDT")
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(TokenSymbol::new)
            .collect();

        let value_trades = match env_map
            .get("VALUE_TRADES")
            .map(|s| s.as_str())
            .unwrap_or("false")
        {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "VALUE_TRADES".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        Ok(Config {
            etherscan_api_key,
            etherscan_api_url,
            coingecko_api_url,
            snapshot_dir,
            watch_address,
            poll_interval: Duration::from_secs(poll_secs),
            window,
            base_tokens,
            value_trades,
        })
    }
}

/// `WATCH_ADDRESS` wins; otherwise `WATCH_ALIAS` is looked up in the
/// `alias,address` lines of `WALLETS_FILE`.
fn resolve_watch_address(env_map: &HashMap<String, String>) -> Result<Address, ConfigError> {
    if let Some(address) = env_map.get("WATCH_ADDRESS") {
        return Ok(Address::new(address.as_str()));
    }

    let alias = env_map
        .get("WATCH_ALIAS")
        .ok_or_else(|| ConfigError::MissingEnv("WATCH_ADDRESS".to_string()))?;
    let file_path = env_map
        .get("WALLETS_FILE")
        .ok_or_else(|| ConfigError::MissingEnv("WALLETS_FILE".to_string()))?;
    let content = std::fs::read_to_string(file_path).map_err(|_| {
        ConfigError::InvalidValue(
            "WALLETS_FILE".to_string(),
            "file not found or unreadable".to_string(),
        )
    })?;

    parse_wallets(&content)
        .remove(alias.trim())
        .ok_or_else(|| {
            ConfigError::InvalidValue(
                "WATCH_ALIAS".to_string(),
                format!("{} not found in wallets file", alias),
            )
        })
}

fn parse_wallets(content: &str) -> HashMap<String, Address> {
    content
        .lines()
        .filter_map(|line| {
            let (alias, address) = line.split_once(',')?;
            let (alias, address) = (alias.trim(), address.trim());
            if alias.is_empty() || address.is_empty() {
                return None;
            }
            Some((alias.to_string(), Address::new(address)))
        })
        .collect()
}
