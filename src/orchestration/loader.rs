use crate::datasource::{DataSourceError, LedgerDataSource, PAGE_SIZE};
use crate::domain::{
    Address, BlockNumber, Decimal, RawTransferEvent, SortOrder, TokenSymbol, TxHash, UnixTime,
};
use crate::engine::PortfolioWindow;
use crate::store::{SnapshotStore, StoreError};
use futures::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    DataSource(#[from] DataSourceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("balance {raw} of {token} cannot be represented")]
    BalanceOutOfRange { token: TokenSymbol, raw: u128 },
}

/// Turns `(address, start, end)` requests into portfolio windows.
#[derive(Debug, Clone)]
pub struct WindowLoader {
    source: Arc<dyn LedgerDataSource>,
    store: Option<SnapshotStore>,
    page_size: usize,
}

impl WindowLoader {
    pub fn new(source: Arc<dyn LedgerDataSource>) -> Self {
        Self {
            source,
            store: None,
            page_size: PAGE_SIZE,
        }
    }

    /// Save every retrieved window to `store`.
    pub fn with_store(mut self, store: SnapshotStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Page length at which the source is assumed to have truncated a result.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn store(&self) -> Option<&SnapshotStore> {
        self.store.as_ref()
    }

    /// All transfer events for `address` in `[start_block, end_block]`.
    ///
    /// A full page means the source truncated the result, so the next request
    /// resumes at the page's last block. That block's records are dropped from
    /// what was collected and re-read whole from the next page.
    pub async fn fetch_all(
        &self,
        address: &Address,
        start_block: BlockNumber,
        end_block: BlockNumber,
    ) -> Result<Vec<RawTransferEvent>, DataSourceError> {
        let mut events: Vec<RawTransferEvent> = Vec::new();
        let mut from = start_block;

        loop {
            let page = self
                .source
                .transfer_events(address, from, end_block, SortOrder::Asc)
                .await?;
            let page_len = page.len();
            let last_block = page.iter().filter_map(RawTransferEvent::block).max();
            debug!(
                "Fetched page of {} events from block {} (last block {:?})",
                page_len, from, last_block
            );
            events.extend(page);

            if page_len < self.page_size {
                break;
            }
            match last_block {
                Some(last) if last > from => {
                    events.retain(|e| e.block() != Some(last));
                    from = last;
                }
                _ => return Err(DataSourceError::PaginationStalled(from)),
            }
        }

        Ok(events)
    }

    /// Raw events for `address` with timestamps in `[start, end]`.
    pub async fn fetch_range(
        &self,
        address: &Address,
        start: UnixTime,
        end: UnixTime,
    ) -> Result<Vec<RawTransferEvent>, LoadError> {
        let start_block = self.source.block_number_at_or_before(start).await?;
        let end_block = self.source.block_number_at_or_before(end).await?;

        let mut events = self.fetch_all(address, start_block, end_block).await?;
        // The block at or before `start` may predate it.
        events.retain(|e| within(e, start, end));
        Ok(events)
    }

    /// Load the window `[start, end]` for `address`, saving a snapshot when a
    /// store is configured.
    pub async fn load(
        &self,
        address: &Address,
        start: UnixTime,
        end: UnixTime,
    ) -> Result<PortfolioWindow, LoadError> {
        self.load_excluding(address, start, end, &HashSet::new()).await
    }

    /// [`load`](Self::load) without the transactions in `seen`; they are
    /// neither saved again nor part of the window.
    pub async fn load_excluding(
        &self,
        address: &Address,
        start: UnixTime,
        end: UnixTime,
        seen: &HashSet<TxHash>,
    ) -> Result<PortfolioWindow, LoadError> {
        let mut events = self.fetch_range(address, start, end).await?;
        if !seen.is_empty() {
            events.retain(|e| match e.hash.as_deref() {
                Some(hash) => !seen.contains(&TxHash::new(hash.trim())),
                None => true,
            });
        }
        info!(
            "Loaded {} events for {} in [{}, {}]",
            events.len(),
            address,
            start,
            end
        );

        if let Some(store) = &self.store {
            if !events.is_empty() {
                store.save(address, start, &events).await?;
            }
        }

        Ok(PortfolioWindow::from_raw(address.clone(), &events, start, end))
    }

    /// Rebuild a window from saved snapshots without touching the source.
    pub async fn load_saved(
        &self,
        address: &Address,
        start: UnixTime,
        end: UnixTime,
    ) -> Result<PortfolioWindow, LoadError> {
        let events = match &self.store {
            Some(store) => store.read_all(address).await?,
            None => Vec::new(),
        };
        let events: Vec<RawTransferEvent> =
            events.into_iter().filter(|e| within(e, start, end)).collect();
        Ok(PortfolioWindow::from_raw(address.clone(), &events, start, end))
    }

    /// Current decimal-adjusted balances of `tokens`, fetched concurrently.
    ///
    /// Tokens the window has never seen have no known contract and are left
    /// out.
    pub async fn live_balances(
        &self,
        window: &PortfolioWindow,
        tokens: &[TokenSymbol],
    ) -> Result<HashMap<TokenSymbol, Decimal>, LoadError> {
        let requests = tokens
            .iter()
            .filter_map(|token| window.token_info(token))
            .map(|info| async move {
                let raw = self
                    .source
                    .token_balance(window.address(), &info.contract_address)
                    .await?;
                let balance = info.scale_raw(raw).ok_or_else(|| LoadError::BalanceOutOfRange {
                    token: info.symbol.clone(),
                    raw,
                })?;
                Ok::<_, LoadError>((info.symbol.clone(), balance))
            });

        Ok(try_join_all(requests).await?.into_iter().collect())
    }
}

/// Unparseable timestamps are kept so validation can report them.
fn within(event: &RawTransferEvent, start: UnixTime, end: UnixTime) -> bool {
    match event
        .time_stamp
        .as_deref()
        .and_then(|s| s.trim().parse::<i64>().ok())
    {
        Some(ts) => start.as_secs() <= ts && ts <= end.as_secs(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockLedgerDataSource;
    use tempfile::TempDir;

    const WATCHED: &str = "0xwatched";

    fn event(hash: &str, block: u64, from: &str, to: &str, symbol: &str, value: &str) -> RawTransferEvent {
        RawTransferEvent {
            hash: Some(hash.to_string()),
            block_number: Some(block.to_string()),
            time_stamp: Some((block * 10).to_string()),
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            token_symbol: Some(symbol.to_string()),
            token_name: None,
            token_decimal: Some("0".to_string()),
            contract_address: Some(format!("0x{}", symbol.to_lowercase())),
            value: Some(value.to_string()),
        }
    }

    fn blocks(events: &[RawTransferEvent]) -> Vec<u64> {
        events.iter().filter_map(|e| e.block()).map(|b| b.as_u64()).collect()
    }

    #[tokio::test]
    async fn test_fetch_all_drops_boundary_duplicates() {
        // Two records per block, pages of three: every page ends mid-block.
        let events: Vec<_> = (1..=4)
            .flat_map(|b| {
                vec![
                    event(&format!("0x{}a", b), b, WATCHED, "0xdex", "UNI", "1"),
                    event(&format!("0x{}b", b), b, "0xdex", WATCHED, "WETH", "1"),
                ]
            })
            .collect();
        let mock = Arc::new(MockLedgerDataSource::new().with_events(events).with_page_size(3));
        let loader = WindowLoader::new(mock.clone()).with_page_size(3);

        let fetched = loader
            .fetch_all(&Address::new(WATCHED), BlockNumber::new(0), BlockNumber::new(100))
            .await
            .unwrap();

        assert_eq!(fetched.len(), 8);
        assert_eq!(blocks(&fetched), vec![1, 1, 2, 2, 3, 3, 4, 4]);
    }

    #[tokio::test]
    async fn test_fetch_all_single_block_overflow_stalls() {
        let events: Vec<_> = (0..4)
            .map(|i| event(&format!("0x{}", i), 5, WATCHED, "0xdex", "UNI", "1"))
            .collect();
        let mock = Arc::new(MockLedgerDataSource::new().with_events(events).with_page_size(3));
        let loader = WindowLoader::new(mock).with_page_size(3);

        let err = loader
            .fetch_all(&Address::new(WATCHED), BlockNumber::new(5), BlockNumber::new(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DataSourceError::PaginationStalled(b) if b == BlockNumber::new(5)));
    }

    #[tokio::test]
    async fn test_load_trims_to_time_range_and_saves() {
        let dir = TempDir::new().unwrap();
        let mock = MockLedgerDataSource::new()
            .with_block(UnixTime::new(10), BlockNumber::new(1))
            .with_block(UnixTime::new(20), BlockNumber::new(2))
            .with_block(UnixTime::new(30), BlockNumber::new(3))
            .with_events(vec![
                event("0x1", 1, WATCHED, "0xdex", "UNI", "5"),
                event("0x2", 2, "0xdex", WATCHED, "UNI", "7"),
                event("0x3", 3, "0xdex", WATCHED, "UNI", "1"),
            ]);
        let loader = WindowLoader::new(Arc::new(mock)).with_store(SnapshotStore::new(dir.path()));
        let address = Address::new(WATCHED);

        let window = loader
            .load(&address, UnixTime::new(15), UnixTime::new(25))
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window.first_block(), Some(BlockNumber::new(2)));

        let saved = loader
            .load_saved(&address, UnixTime::new(0), UnixTime::new(100))
            .await
            .unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn test_load_excluding_skips_seen_hashes() {
        let dir = TempDir::new().unwrap();
        let mock = MockLedgerDataSource::new()
            .with_block(UnixTime::new(20), BlockNumber::new(2))
            .with_events(vec![
                event("0x1", 2, WATCHED, "0xdex", "UNI", "5"),
                event("0x2", 2, "0xdex", WATCHED, "LINK", "7"),
            ]);
        let loader = WindowLoader::new(Arc::new(mock)).with_store(SnapshotStore::new(dir.path()));
        let address = Address::new(WATCHED);
        let seen = HashSet::from([TxHash::new("0x1")]);

        let window = loader
            .load_excluding(&address, UnixTime::new(20), UnixTime::new(20), &seen)
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window.records()[0].hash, TxHash::new("0x2"));

        let saved = loader
            .load_saved(&address, UnixTime::new(0), UnixTime::new(100))
            .await
            .unwrap();
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test]
    async fn test_live_balances_scale_by_decimals() {
        let address = Address::new(WATCHED);
        let mut usdc = event("0x1", 1, "0xdex", WATCHED, "USDC", "2500000");
        usdc.token_decimal = Some("6".to_string());
        let mock = MockLedgerDataSource::new()
            .with_event(usdc.clone())
            .with_balance(address.clone(), Address::new("0xusdc"), 7_500_000);
        let loader = WindowLoader::new(Arc::new(mock));

        let window = PortfolioWindow::from_raw(address, &[usdc], UnixTime::new(0), UnixTime::new(100));
        let balances = loader
            .live_balances(&window, &[TokenSymbol::new("USDC"), TokenSymbol::new("DAI")])
            .await
            .unwrap();

        assert_eq!(balances.len(), 1);
        assert_eq!(
            balances[&TokenSymbol::new("USDC")],
            Decimal::from_str_canonical("7.5").unwrap()
        );
    }
}
