use super::loader::{LoadError, WindowLoader};
use crate::domain::{Address, TokenSymbol, TxHash, UnixTime};
use crate::engine::{PortfolioWindow, TokenTrade};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

/// Polls the ledger for new transfers of one address and reports them.
#[derive(Debug)]
pub struct Watcher {
    loader: WindowLoader,
    address: Address,
    base_tokens: Vec<TokenSymbol>,
    poll_interval: Duration,
    next_start: UnixTime,
    /// Transactions stamped at `next_start` that were already reported.
    seen: HashSet<TxHash>,
}

/// New activity found by one poll.
#[derive(Debug, Clone)]
pub struct WatchUpdate {
    pub window: PortfolioWindow,
    /// Percentage balance change per non-base token.
    pub balance_changes: Vec<(TokenSymbol, f64)>,
}

impl Watcher {
    pub fn new(
        loader: WindowLoader,
        address: Address,
        base_tokens: Vec<TokenSymbol>,
        poll_interval: Duration,
        start: UnixTime,
    ) -> Self {
        Self {
            loader,
            address,
            base_tokens,
            poll_interval,
            next_start: start,
            seen: HashSet::new(),
        }
    }

    /// Continue after an already reported `window`: polling resumes at its
    /// newest transfer, skipping the transactions it holds at that second.
    pub fn resume_after(mut self, window: &PortfolioWindow) -> Self {
        if let Some(last) = window.last_timestamp() {
            self.next_start = last;
            self.seen = hashes_at(window, last).collect();
        }
        self
    }

    /// Start of the next poll's window.
    pub fn next_start(&self) -> UnixTime {
        self.next_start
    }

    /// Load everything since the previous poll.
    ///
    /// The next window starts at the newest transfer seen, so transfers
    /// indexed late within that same second are still picked up; the hashes
    /// already reported at that second are left out. A poll with no new
    /// activity changes nothing.
    pub async fn poll_once(&mut self, now: UnixTime) -> Result<Option<WatchUpdate>, LoadError> {
        let window = self
            .loader
            .load_excluding(&self.address, self.next_start, now, &self.seen)
            .await?;
        let Some(last) = window.last_timestamp() else {
            return Ok(None);
        };

        let tokens = window.non_base_tokens(&self.base_tokens);
        let balances = self.loader.live_balances(&window, &tokens).await?;
        let balance_changes = window.balance_changes(&balances);

        if last > self.next_start {
            self.next_start = last;
            self.seen.clear();
        }
        self.seen.extend(hashes_at(&window, last));
        Ok(Some(WatchUpdate {
            window,
            balance_changes,
        }))
    }

    /// Poll on every interval tick until Ctrl-C.
    ///
    /// A failed poll is logged and retried on the next tick.
    pub async fn run(mut self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            "Watching {} every {}s from {}",
            self.address,
            self.poll_interval.as_secs(),
            self.next_start
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.poll_once(UnixTime::now()).await {
                        Ok(Some(update)) => println!("{}", update),
                        Ok(None) => info!("No new transfers for {}", self.address),
                        Err(e) => warn!("Poll failed: {}", e),
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Stopping watcher");
                    break;
                }
            }
        }
    }
}

fn hashes_at(window: &PortfolioWindow, timestamp: UnixTime) -> impl Iterator<Item = TxHash> + '_ {
    window
        .records()
        .iter()
        .filter(move |r| r.timestamp == timestamp)
        .map(|r| r.hash.clone())
}

fn leg(trade: &TokenTrade) -> String {
    format!("{} {}", trade.value, trade.token)
}

impl fmt::Display for WatchUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (hash, trades) in self.window.trade_table().iter() {
            let Some(first) = trades.first() else {
                continue;
            };
            write!(f, "{} {} ", first.block_number, hash)?;
            match trades {
                [left, right] => writeln!(f, "{}: {}", leg(left), leg(right))?,
                _ => {
                    let legs: Vec<String> = trades.iter().map(leg).collect();
                    writeln!(f, "{}", legs.join(", "))?
                }
            }
        }
        for (token, change) in &self.balance_changes {
            writeln!(f, "{} balance change: {:.2}%", token, change)?;
        }
        Ok(())
    }
}
