use crate::datasource::{DataSourceError, PriceDataSource};
use crate::domain::{TokenSymbol, UnixTime};
use crate::engine::{PortfolioWindow, PriceSeries, PricedTrade};
use std::sync::Arc;
use tracing::{debug, warn};

/// Seconds fetched before the requested start so the first trade has a left
/// neighbour.
pub const LEFT_PAD_SECS: i64 = 300;

/// Builds price series that end with a live spot sample.
#[derive(Debug, Clone)]
pub struct PriceLoader {
    source: Arc<dyn PriceDataSource>,
}

impl PriceLoader {
    pub fn new(source: Arc<dyn PriceDataSource>) -> Self {
        Self { source }
    }

    /// Historical prices for `[from - 5min, to]` plus the spot price at now.
    pub async fn inclusive_series(
        &self,
        coin_id: &str,
        from: UnixTime,
        to: UnixTime,
    ) -> Result<PriceSeries, DataSourceError> {
        let samples = self
            .source
            .price_series(coin_id, from.offset(-LEFT_PAD_SECS), to)
            .await?;
        let spot = self.source.spot_price(coin_id).await?;
        debug!("Price series for {}: {} samples plus spot {}", coin_id, samples.len(), spot);

        Ok(PriceSeries::new(samples, (UnixTime::now(), spot)))
    }

    /// Value every trade of `token` in `window` in USD.
    ///
    /// Returns `None` when the price source does not list the token.
    pub async fn value_trades(
        &self,
        window: &PortfolioWindow,
        token: &TokenSymbol,
    ) -> Result<Option<Vec<PricedTrade>>, DataSourceError> {
        let Some(coin_id) = self.source.coin_id_for_symbol(token.as_str()).await? else {
            warn!("No price source listing for {}", token);
            return Ok(None);
        };

        let series = self
            .inclusive_series(&coin_id, window.start(), window.end())
            .await?;
        Ok(Some(series.correlate(window.trades_for(token))))
    }
}
