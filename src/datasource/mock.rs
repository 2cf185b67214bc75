//! Mock data sources for testing without network calls.

use super::{DataSourceError, LedgerDataSource, PriceDataSource, PAGE_SIZE};
use crate::domain::{Address, BlockNumber, Decimal, RawTransferEvent, SortOrder, UnixTime};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock ledger that serves predefined transfer events, paged like the real
/// indexer.
#[derive(Debug, Clone)]
pub struct MockLedgerDataSource {
    events: Vec<RawTransferEvent>,
    blocks: Vec<(UnixTime, BlockNumber)>,
    balances: HashMap<(Address, Address), u128>,
    page_size: usize,
    failure: Option<DataSourceError>,
    page_requests: Arc<AtomicUsize>,
}

impl MockLedgerDataSource {
    /// Create a new mock ledger with no data.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            blocks: Vec::new(),
            balances: HashMap::new(),
            page_size: PAGE_SIZE,
            failure: None,
            page_requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Add a transfer event.
    pub fn with_event(mut self, event: RawTransferEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Add multiple transfer events.
    pub fn with_events(mut self, events: Vec<RawTransferEvent>) -> Self {
        self.events.extend(events);
        self
    }

    /// Declare that `block` was mined at `timestamp`.
    pub fn with_block(mut self, timestamp: UnixTime, block: BlockNumber) -> Self {
        self.blocks.push((timestamp, block));
        self.blocks.sort();
        self
    }

    /// Set the balance of `contract` held by `address`.
    pub fn with_balance(mut self, address: Address, contract: Address, raw: u128) -> Self {
        self.balances.insert((address, contract), raw);
        self
    }

    /// Cap pages at `page_size` records instead of [`PAGE_SIZE`].
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Make every transfer query fail with `error`.
    pub fn with_failure(mut self, error: DataSourceError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Number of transfer pages served so far.
    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::SeqCst)
    }
}

impl Default for MockLedgerDataSource {
    fn default() -> Self {
        Self::new()
    }
}

fn touches(event: &RawTransferEvent, address: &Address) -> bool {
    let matches = |side: &Option<String>| {
        side.as_deref()
            .map(|s| Address::new(s) == *address)
            .unwrap_or(false)
    };
    matches(&event.from) || matches(&event.to)
}

#[async_trait]
impl LedgerDataSource for MockLedgerDataSource {
    async fn block_number_at_or_before(
        &self,
        timestamp: UnixTime,
    ) -> Result<BlockNumber, DataSourceError> {
        Ok(self
            .blocks
            .iter()
            .rev()
            .find(|(t, _)| *t <= timestamp)
            .map(|(_, b)| *b)
            .unwrap_or(BlockNumber::new(0)))
    }

    async fn transfer_events(
        &self,
        address: &Address,
        start_block: BlockNumber,
        end_block: BlockNumber,
        order: SortOrder,
    ) -> Result<Vec<RawTransferEvent>, DataSourceError> {
        self.page_requests.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }

        let mut matching: Vec<RawTransferEvent> = self
            .events
            .iter()
            .filter(|e| touches(e, address))
            .filter(|e| {
                e.block()
                    .map(|b| b >= start_block && b <= end_block)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        matching.sort_by_key(|e| e.block());
        if order == SortOrder::Desc {
            matching.reverse();
        }
        matching.truncate(self.page_size);
        Ok(matching)
    }

    async fn token_balance(
        &self,
        address: &Address,
        contract: &Address,
    ) -> Result<u128, DataSourceError> {
        Ok(self
            .balances
            .get(&(address.clone(), contract.clone()))
            .copied()
            .unwrap_or(0))
    }
}

/// Mock price source with fixed coin ids, histories and spot prices.
#[derive(Debug, Clone, Default)]
pub struct MockPriceDataSource {
    coin_ids: HashMap<String, String>,
    series: HashMap<String, Vec<(UnixTime, Decimal)>>,
    spot: HashMap<String, Decimal>,
}

impl MockPriceDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a ticker symbol (any case) to a coin id.
    pub fn with_coin(mut self, symbol: &str, coin_id: &str) -> Self {
        self.coin_ids
            .insert(symbol.to_lowercase(), coin_id.to_string());
        self
    }

    /// Historical samples for `coin_id`.
    pub fn with_series(mut self, coin_id: &str, samples: Vec<(UnixTime, Decimal)>) -> Self {
        self.series.insert(coin_id.to_string(), samples);
        self
    }

    pub fn with_spot(mut self, coin_id: &str, price: Decimal) -> Self {
        self.spot.insert(coin_id.to_string(), price);
        self
    }
}

#[async_trait]
impl PriceDataSource for MockPriceDataSource {
    async fn coin_id_for_symbol(&self, symbol: &str) -> Result<Option<String>, DataSourceError> {
        Ok(self.coin_ids.get(&symbol.to_lowercase()).cloned())
    }

    async fn price_series(
        &self,
        coin_id: &str,
        from: UnixTime,
        to: UnixTime,
    ) -> Result<Vec<(UnixTime, Decimal)>, DataSourceError> {
        Ok(self
            .series
            .get(coin_id)
            .map(|samples| {
                samples
                    .iter()
                    .filter(|(t, _)| *t >= from && *t <= to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn spot_price(&self, coin_id: &str) -> Result<Decimal, DataSourceError> {
        self.spot
            .get(coin_id)
            .copied()
            .ok_or_else(|| DataSourceError::Other(format!("no spot price for {}", coin_id)))
    }
}
