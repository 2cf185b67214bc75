//! Nearest-sample valuation of trades against a sparse price series.

use super::TokenTrade;
use crate::domain::{Decimal, UnixTime};
use std::collections::BTreeMap;

/// USD prices keyed by unix time, ending with a spot sample.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PriceSeries {
    samples: BTreeMap<UnixTime, Decimal>,
}

impl PriceSeries {
    /// Build from historical samples plus the current spot quote.
    ///
    /// Later samples with an equal timestamp replace earlier ones, and the spot
    /// sample is applied last.
    pub fn new(
        samples: impl IntoIterator<Item = (UnixTime, Decimal)>,
        spot: (UnixTime, Decimal),
    ) -> Self {
        let mut samples: BTreeMap<UnixTime, Decimal> = samples.into_iter().collect();
        samples.insert(spot.0, spot.1);
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_timestamp(&self) -> Option<UnixTime> {
        self.samples.keys().next().copied()
    }

    pub fn last_timestamp(&self) -> Option<UnixTime> {
        self.samples.keys().next_back().copied()
    }

    /// True if `t` lies within the first and last sample.
    pub fn covers(&self, t: UnixTime) -> bool {
        matches!(
            (self.first_timestamp(), self.last_timestamp()),
            (Some(first), Some(last)) if first <= t && t <= last
        )
    }

    /// Price of the sample nearest to `t` among the two samples bracketing it.
    ///
    /// The left sample wins only when strictly closer; equal distances take the
    /// right sample. Timestamps outside the series are not priced.
    pub fn price_at(&self, t: UnixTime) -> Option<Decimal> {
        let (&left_t, &left_px) = self.samples.range(..=t).next_back()?;
        let (&right_t, &right_px) = self.samples.range(t..).next()?;
        let left_distance = t.as_secs() - left_t.as_secs();
        let right_distance = right_t.as_secs() - t.as_secs();
        if left_distance < right_distance {
            Some(left_px)
        } else {
            Some(right_px)
        }
    }

    /// Attach a price and USD value to every trade.
    pub fn correlate<I>(&self, trades: I) -> Vec<PricedTrade>
    where
        I: IntoIterator<Item = TokenTrade>,
    {
        trades
            .into_iter()
            .map(|trade| {
                let price = self.price_at(trade.timestamp);
                let usd_value = price.and_then(|px| trade.value.checked_mul(px));
                PricedTrade {
                    trade,
                    price,
                    usd_value,
                }
            })
            .collect()
    }
}

/// A trade with the price matched to its timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedTrade {
    pub trade: TokenTrade,
    /// `None` when the trade falls outside the price series.
    pub price: Option<Decimal>,
    /// Signed value times price.
    pub usd_value: Option<Decimal>,
}
