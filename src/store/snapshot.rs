//! Snapshot store: `<root>/<address>/<start unix ts>` files holding JSON
//! arrays of raw transfer events.

use crate::domain::{Address, BlockNumber, LedgerRecord, RawTransferEvent, TokenInfo, UnixTime};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Directory-per-address store of retrieved windows.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn address_dir(&self, address: &Address) -> PathBuf {
        self.root.join(address.as_str())
    }

    /// Write one window's events to `<address>/<start>`, replacing any
    /// snapshot with the same start.
    pub async fn save(
        &self,
        address: &Address,
        start: UnixTime,
        events: &[RawTransferEvent],
    ) -> Result<PathBuf, StoreError> {
        let dir = self.address_dir(address);
        fs::create_dir_all(&dir).await?;

        let path = dir.join(start.as_secs().to_string());
        let body = serde_json::to_vec(events)?;
        fs::write(&path, body).await?;

        debug!("Saved {} events to {}", events.len(), path.display());
        Ok(path)
    }

    /// Every saved event for `address`, files concatenated in ascending
    /// file-name order.
    ///
    /// Unreadable or malformed files are skipped with a warning. Events that
    /// appear in more than one file are kept and reported.
    pub async fn read_all(&self, address: &Address) -> Result<Vec<RawTransferEvent>, StoreError> {
        let mut files = self.snapshot_files(address).await?;
        files.sort();

        let mut events = Vec::new();
        for path in files {
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Skipping unreadable snapshot {}: {}", path.display(), e);
                    continue;
                }
            };
            match serde_json::from_slice::<Vec<RawTransferEvent>>(&bytes) {
                Ok(batch) => events.extend(batch),
                Err(e) => warn!("Skipping malformed snapshot {}: {}", path.display(), e),
            }
        }

        let duplicates = count_duplicates(&events);
        if duplicates > 0 {
            warn!(
                "{} duplicate events across overlapping snapshots for {}",
                duplicates, address
            );
        }
        Ok(events)
    }

    /// Remove every snapshot for `address`.
    pub async fn clear(&self, address: &Address) -> Result<(), StoreError> {
        match fs::remove_dir_all(self.address_dir(address)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Highest block number among saved events.
    pub async fn last_saved_block(
        &self,
        address: &Address,
    ) -> Result<Option<BlockNumber>, StoreError> {
        let events = self.read_all(address).await?;
        Ok(events.iter().filter_map(RawTransferEvent::block).max())
    }

    /// Metadata of every token seen in saved events, first-seen order.
    pub async fn token_catalog(&self, address: &Address) -> Result<Vec<TokenInfo>, StoreError> {
        let events = self.read_all(address).await?;

        let mut seen = HashSet::new();
        let mut catalog = Vec::new();
        for record in events.iter().filter_map(|e| LedgerRecord::try_from(e).ok()) {
            if seen.insert(record.token_symbol.clone()) {
                catalog.push(TokenInfo::from_record(&record));
            }
        }
        Ok(catalog)
    }

    async fn snapshot_files(&self, address: &Address) -> Result<Vec<PathBuf>, StoreError> {
        let mut entries = match fs::read_dir(self.address_dir(address)).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        Ok(files)
    }
}

fn count_duplicates(events: &[RawTransferEvent]) -> usize {
    let mut seen = HashSet::with_capacity(events.len());
    events.iter().filter(|e| !seen.insert(*e)).count()
}
