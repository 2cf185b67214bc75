//! CoinGecko public price API client.

use super::{http, DataSourceError, PriceDataSource};
use crate::domain::{Decimal, UnixTime};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Symbols CoinGecko lists under more than one id, pinned to the id that
/// means the token people actually trade.
const PINNED_IDS: &[(&str, &str)] = &[
    ("uni", "uniswap"),
    ("yfi", "yearn-finance"),
    ("fxs", "frax-share"),
    ("cvx", "convex-finance"),
    ("bit", "bitdao"),
    ("sand", "the-sandbox"),
    ("spell", "spell-token"),
    ("rbn", "ribbon-finance"),
    ("ape", "apecoin"),
    ("usdt", "tether"),
    ("usdc", "usd-coin"),
    ("wbtc", "wrapped-bitcoin"),
    ("mana", "decentraland"),
    ("link", "chainlink"),
    ("1inch", "1inch"),
    ("sushi", "sushi"),
    ("comp", "compound-governance-token"),
];

#[derive(Debug, Deserialize)]
struct CoinListEntry {
    id: String,
    symbol: String,
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<(f64, f64)>,
}

/// Price data source backed by the CoinGecko v3 API.
#[derive(Debug)]
pub struct CoinGeckoDataSource {
    client: Client,
    base_url: String,
    coin_index: OnceCell<HashMap<String, Vec<String>>>,
}

impl CoinGeckoDataSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            coin_index: OnceCell::new(),
        }
    }

    /// Create with the public CoinGecko API URL.
    pub fn default_url() -> Self {
        Self::new("https://api.coingecko.com/api/v3".to_string())
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, DataSourceError> {
        let url = format!("{}{}", self.base_url, path);
        http::get_json(&self.client, &url, query, check_body).await
    }

    /// Symbol to ids, loaded from `/coins/list` on first use.
    async fn coin_index(&self) -> Result<&HashMap<String, Vec<String>>, DataSourceError> {
        self.coin_index
            .get_or_try_init(|| async {
                debug!("Loading CoinGecko coin list");
                let body = self.get("/coins/list", &[]).await?;
                let entries: Vec<CoinListEntry> = serde_json::from_value(body)
                    .map_err(|e| DataSourceError::ParseError(e.to_string()))?;
                Ok::<_, DataSourceError>(index_by_symbol(entries))
            })
            .await
    }
}

#[async_trait]
impl PriceDataSource for CoinGeckoDataSource {
    async fn coin_id_for_symbol(&self, symbol: &str) -> Result<Option<String>, DataSourceError> {
        let index = self.coin_index().await?;
        Ok(resolve_coin_id(index, symbol))
    }

    async fn price_series(
        &self,
        coin_id: &str,
        from: UnixTime,
        to: UnixTime,
    ) -> Result<Vec<(UnixTime, Decimal)>, DataSourceError> {
        debug!("Fetching prices for coin={}, from={}, to={}", coin_id, from, to);

        let body = self
            .get(
                &format!("/coins/{}/market_chart/range", coin_id),
                &[
                    ("vs_currency", "usd".to_string()),
                    ("from", from.to_string()),
                    ("to", to.to_string()),
                ],
            )
            .await?;

        parse_market_chart(body)
    }

    async fn spot_price(&self, coin_id: &str) -> Result<Decimal, DataSourceError> {
        debug!("Fetching spot price for coin={}", coin_id);

        let body = self
            .get(
                "/simple/price",
                &[
                    ("ids", coin_id.to_string()),
                    ("vs_currencies", "usd".to_string()),
                ],
            )
            .await?;

        parse_simple_price(&body, coin_id)
    }
}

/// CoinGecko reports throttling inside a 200 body on some plans.
fn check_body(body: serde_json::Value) -> Result<serde_json::Value, DataSourceError> {
    let code = body
        .get("status")
        .and_then(|s| s.get("error_code"))
        .and_then(|c| c.as_u64());
    match code {
        Some(429) => Err(DataSourceError::RateLimited),
        Some(code) => {
            let message = body
                .get("status")
                .and_then(|s| s.get("error_message"))
                .and_then(|m| m.as_str())
                .unwrap_or_default();
            Err(DataSourceError::ApiError(format!("{}: {}", code, message)))
        }
        None => Ok(body),
    }
}

fn index_by_symbol(entries: Vec<CoinListEntry>) -> HashMap<String, Vec<String>> {
    let mut index: HashMap<String, Vec<String>> = HashMap::new();
    for entry in entries {
        index
            .entry(entry.symbol.to_lowercase())
            .or_default()
            .push(entry.id);
    }
    index
}

fn resolve_coin_id(index: &HashMap<String, Vec<String>>, symbol: &str) -> Option<String> {
    let key = symbol.trim().to_lowercase();
    if let Some((_, id)) = PINNED_IDS.iter().find(|(s, _)| *s == key) {
        return Some((*id).to_string());
    }
    let ids = index.get(&key)?;
    if ids.len() > 1 {
        warn!(
            "Symbol {} maps to {} CoinGecko ids, using {}",
            symbol,
            ids.len(),
            ids[0]
        );
    }
    ids.first().cloned()
}

/// `prices` is a list of `[millis, price]` pairs.
fn parse_market_chart(
    body: serde_json::Value,
) -> Result<Vec<(UnixTime, Decimal)>, DataSourceError> {
    let chart: MarketChart =
        serde_json::from_value(body).map_err(|e| DataSourceError::ParseError(e.to_string()))?;

    let mut samples = Vec::with_capacity(chart.prices.len());
    for (millis, price) in chart.prices {
        let Some(price) = Decimal::from_f64(price) else {
            warn!("Skipping non-finite price at {}", millis);
            continue;
        };
        samples.push((UnixTime::new((millis / 1000.0).round() as i64), price));
    }
    Ok(samples)
}

fn parse_simple_price(body: &serde_json::Value, coin_id: &str) -> Result<Decimal, DataSourceError> {
    let price = body
        .get(coin_id)
        .and_then(|c| c.get("usd"))
        .and_then(|p| p.as_f64())
        .ok_or_else(|| DataSourceError::ParseError(format!("No usd price for {}", coin_id)))?;
    Decimal::from_f64(price).ok_or_else(|| {
        DataSourceError::ParseError(format!("Invalid price {} for {}", price, coin_id))
    })
}
