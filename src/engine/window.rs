//! Portfolio window: every transfer for one address between two boundaries.

use super::balances::{BalanceChanges, CumulativeBalances};
use super::moments::{self, Moments};
use super::reconstruct::{reconstruct_trades, Trade, TradeError};
use super::{accumulate, Classification, TokenTrade};
use crate::domain::{
    Address, BlockNumber, Decimal, LedgerRecord, RawTransferEvent, SortOrder, TokenInfo,
    TokenSymbol, TxHash, UnixTime,
};
use std::collections::HashMap;
use tracing::warn;

/// Immutable snapshot of an address's transfers within `[start, end]`.
///
/// Records are kept in block order (stable for records of the same block).
/// Records whose amount cannot be represented are dropped with a warning.
/// Token metadata is derived once at construction from the first record seen
/// for each symbol; later records with conflicting metadata do not change it.
#[derive(Debug, Clone)]
pub struct PortfolioWindow {
    address: Address,
    start: UnixTime,
    end: UnixTime,
    records: Vec<LedgerRecord>,
    tokens: Vec<TokenInfo>,
    token_index: HashMap<TokenSymbol, usize>,
}

impl PortfolioWindow {
    pub fn new(
        address: Address,
        records: Vec<LedgerRecord>,
        start: UnixTime,
        end: UnixTime,
    ) -> Self {
        let mut records: Vec<LedgerRecord> = records
            .into_iter()
            .filter(|record| match record.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("Skipping invalid record (hash={}): {}", record.hash, e);
                    false
                }
            })
            .collect();
        records.sort_by_key(|r| r.block_number);

        let mut tokens = Vec::new();
        let mut token_index = HashMap::new();
        for record in &records {
            if !token_index.contains_key(&record.token_symbol) {
                token_index.insert(record.token_symbol.clone(), tokens.len());
                tokens.push(TokenInfo::from_record(record));
            }
        }

        Self {
            address,
            start,
            end,
            records,
            tokens,
            token_index,
        }
    }

    /// Validate raw indexer records and build a window from the valid ones.
    ///
    /// Malformed records are skipped with a warning.
    pub fn from_raw(
        address: Address,
        raw: &[RawTransferEvent],
        start: UnixTime,
        end: UnixTime,
    ) -> Self {
        let records = raw
            .iter()
            .filter_map(|event| match LedgerRecord::try_from(event) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        "Skipping malformed record (hash={:?}): {}",
                        event.hash.as_deref().unwrap_or("?"),
                        e
                    );
                    None
                }
            })
            .collect();
        Self::new(address, records, start, end)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn start(&self) -> UnixTime {
        self.start
    }

    pub fn end(&self) -> UnixTime {
        self.end
    }

    pub fn records(&self) -> &[LedgerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first_block(&self) -> Option<BlockNumber> {
        self.records.first().map(|r| r.block_number)
    }

    pub fn last_block(&self) -> Option<BlockNumber> {
        self.records.last().map(|r| r.block_number)
    }

    pub fn last_timestamp(&self) -> Option<UnixTime> {
        self.records.iter().map(|r| r.timestamp).max()
    }

    /// Distinct token symbols in first-seen order.
    pub fn token_list(&self) -> Vec<TokenSymbol> {
        self.tokens.iter().map(|t| t.symbol.clone()).collect()
    }

    pub fn token_info(&self, token: &TokenSymbol) -> Option<&TokenInfo> {
        self.token_index.get(token).map(|&i| &self.tokens[i])
    }

    /// Tokens minus the given base/quote symbols.
    pub fn non_base_tokens(&self, base: &[TokenSymbol]) -> Vec<TokenSymbol> {
        self.tokens
            .iter()
            .filter(|t| !base.contains(&t.symbol))
            .map(|t| t.symbol.clone())
            .collect()
    }

    /// Signed per-record trades for `token`, in window order.
    pub fn trades_for(&self, token: &TokenSymbol) -> Vec<TokenTrade> {
        self.records
            .iter()
            .filter(|r| &r.token_symbol == token)
            .map(|r| TokenTrade::from_record(r, &self.address))
            .collect()
    }

    pub fn trades_with_hash_for(&self, token: &TokenSymbol) -> Vec<(TxHash, TokenTrade)> {
        self.trades_for(token)
            .into_iter()
            .map(|t| (t.hash.clone(), t))
            .collect()
    }

    /// Transfers and swaps moving `token`; fails on the first bad hash.
    pub fn reconstructed_trades(&self, token: &TokenSymbol) -> Result<Vec<Trade>, TradeError> {
        reconstruct_trades(&self.address, &self.records, token)
    }

    /// Net signed volume; zero for a token not in the window.
    ///
    /// A total beyond the decimal range saturates at `Decimal::MAX`/`MIN` with a warning.
    pub fn volume_for(&self, token: &TokenSymbol) -> Decimal {
        self.trades_for(token)
            .into_iter()
            .fold(Decimal::zero(), |total, t| accumulate(total, t.value, token))
    }

    pub fn volumes(&self) -> Vec<(TokenSymbol, Decimal)> {
        self.tokens
            .iter()
            .map(|t| (t.symbol.clone(), self.volume_for(&t.symbol)))
            .collect()
    }

    pub fn positive_volumes(&self) -> Vec<(TokenSymbol, Decimal)> {
        self.volumes()
            .into_iter()
            .filter(|(_, v)| v.is_positive())
            .collect()
    }

    pub fn negative_volumes(&self) -> Vec<(TokenSymbol, Decimal)> {
        self.volumes()
            .into_iter()
            .filter(|(_, v)| v.is_negative())
            .collect()
    }

    pub fn long_only_volumes(&self) -> Vec<(TokenSymbol, Decimal)> {
        self.positive_volumes()
            .into_iter()
            .filter(|(t, _)| self.classify(t) == Classification::LongOnly)
            .collect()
    }

    pub fn short_only_volumes(&self) -> Vec<(TokenSymbol, Decimal)> {
        self.negative_volumes()
            .into_iter()
            .filter(|(t, _)| self.classify(t) == Classification::ShortOnly)
            .collect()
    }

    /// Percentage change implied by this window's net volume against the
    /// current on-chain `balance` (decimal-adjusted).
    ///
    /// Inflows are measured against the balance before the window
    /// (`balance - volume`), outflows against the balance after it. A zero
    /// denominator yields an infinity signed like the net flow.
    pub fn balance_change_for(&self, token: &TokenSymbol, balance: Decimal) -> f64 {
        let volume = self.volume_for(token);
        let inflow = !volume.is_negative();
        let denominator = if inflow { balance - volume } else { balance };
        if denominator.is_zero() {
            return if inflow {
                f64::INFINITY
            } else {
                f64::NEG_INFINITY
            };
        }
        volume.to_f64() / denominator.to_f64() * 100.0
    }

    /// [`balance_change_for`](Self::balance_change_for) for every token with a supplied balance.
    pub fn balance_changes(
        &self,
        balances: &HashMap<TokenSymbol, Decimal>,
    ) -> Vec<(TokenSymbol, f64)> {
        self.tokens
            .iter()
            .filter_map(|t| {
                balances
                    .get(&t.symbol)
                    .map(|&b| (t.symbol.clone(), self.balance_change_for(&t.symbol, b)))
            })
            .collect()
    }

    /// Running balance after each trade, oldest first.
    pub fn cumulative_balances(&self, token: &TokenSymbol) -> CumulativeBalances {
        self.cumulative_balances_ordered(token, SortOrder::Asc)
    }

    pub fn cumulative_balances_ordered(
        &self,
        token: &TokenSymbol,
        order: SortOrder,
    ) -> CumulativeBalances {
        let mut trades = self.trades_for(token);
        if order == SortOrder::Desc {
            trades.reverse();
        }
        CumulativeBalances::new(trades)
    }

    pub fn trade_balance_changes(&self, token: &TokenSymbol) -> BalanceChanges {
        BalanceChanges::new(self.cumulative_balances(token))
    }

    fn change_series(&self, token: &TokenSymbol) -> Vec<f64> {
        self.trade_balance_changes(token).collect()
    }

    pub fn variance(&self, token: &TokenSymbol) -> f64 {
        moments::variance(&self.change_series(token))
    }

    pub fn standard_deviation(&self, token: &TokenSymbol) -> f64 {
        moments::standard_deviation(&self.change_series(token))
    }

    pub fn skew(&self, token: &TokenSymbol) -> f64 {
        moments::skew(&self.change_series(token))
    }

    pub fn moments(&self, token: &TokenSymbol) -> Moments {
        Moments::from_series(&self.change_series(token))
    }

    /// Gross inflow (positive) and gross outflow (negative) for `token`.
    pub fn long_short_volumes(&self, token: &TokenSymbol) -> (Decimal, Decimal) {
        let mut long = Decimal::zero();
        let mut short = Decimal::zero();
        for trade in self.trades_for(token) {
            if trade.value.is_positive() {
                long = accumulate(long, trade.value, token);
            } else {
                short = accumulate(short, trade.value, token);
            }
        }
        (long, short)
    }

    /// Shares of gross volume that were inflow and outflow.
    pub fn long_short_split(&self, token: &TokenSymbol) -> Option<(f64, f64)> {
        let (long, short) = self.long_short_volumes(token);
        let total = long - short;
        if total.is_zero() {
            return None;
        }
        let long_share = long.to_f64() / total.to_f64();
        Some((long_share, 1.0 - long_share))
    }

    /// Directional bias of `token`, checked in the order long-only,
    /// short-only, net-long, net-short. Anything else, including a token
    /// without trades, is mixed.
    pub fn classify(&self, token: &TokenSymbol) -> Classification {
        let trades = self.trades_for(token);
        if trades.is_empty() {
            return Classification::Mixed;
        }
        if trades.iter().all(|t| t.value.is_positive()) {
            return Classification::LongOnly;
        }
        if trades.iter().all(|t| t.value.is_negative()) {
            return Classification::ShortOnly;
        }
        let (long, short) = self.long_short_volumes(token);
        let short = short.abs();
        if long > short {
            Classification::NetLong
        } else if long < short {
            Classification::NetShort
        } else {
            Classification::Mixed
        }
    }

    fn tokens_classified(&self, class: Classification) -> Vec<TokenSymbol> {
        self.tokens
            .iter()
            .filter(|t| self.classify(&t.symbol) == class)
            .map(|t| t.symbol.clone())
            .collect()
    }

    pub fn long_only_tokens(&self) -> Vec<TokenSymbol> {
        self.tokens_classified(Classification::LongOnly)
    }

    pub fn short_only_tokens(&self) -> Vec<TokenSymbol> {
        self.tokens_classified(Classification::ShortOnly)
    }

    pub fn net_long_tokens(&self) -> Vec<TokenSymbol> {
        self.tokens_classified(Classification::NetLong)
    }

    pub fn net_short_tokens(&self) -> Vec<TokenSymbol> {
        self.tokens_classified(Classification::NetShort)
    }

    /// Per-record trades grouped by transaction hash, in window order.
    pub fn trade_table(&self) -> TradeTable {
        let mut table = TradeTable::default();
        for record in &self.records {
            table.push(TokenTrade::from_record(record, &self.address));
        }
        table
    }
}

/// Trades grouped by hash; iteration follows the first appearance of each hash.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeTable {
    order: Vec<TxHash>,
    entries: HashMap<TxHash, Vec<TokenTrade>>,
}

impl TradeTable {
    fn push(&mut self, trade: TokenTrade) {
        match self.entries.get_mut(&trade.hash) {
            Some(trades) => trades.push(trade),
            None => {
                self.order.push(trade.hash.clone());
                self.entries.insert(trade.hash.clone(), vec![trade]);
            }
        }
    }

    pub fn get(&self, hash: &TxHash) -> Option<&[TokenTrade]> {
        self.entries.get(hash).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TxHash, &[TokenTrade])> {
        self.order
            .iter()
            .filter_map(|h| self.entries.get(h).map(|t| (h, t.as_slice())))
    }

    /// Number of distinct hashes.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of trades across all hashes.
    pub fn trade_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{record, WATCHED};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn window(records: Vec<LedgerRecord>) -> PortfolioWindow {
        PortfolioWindow::new(Address::new(WATCHED), records, UnixTime::new(0), UnixTime::new(10_000))
    }

    #[test]
    fn test_token_metadata_first_seen_wins() {
        let mut later = record("0x2", 2, 20, "0xdex", WATCHED, "UNI", 1, 6);
        later.contract_address = Address::new("0xfake");
        let w = window(vec![record("0x1", 1, 10, "0xdex", WATCHED, "UNI", 1, 18), later]);
        let info = w.token_info(&"UNI".into()).unwrap();
        assert_eq!(info.token_decimal, 18);
        assert_eq!(info.contract_address, Address::new("0xUNI"));
        assert_eq!(w.token_list(), vec![TokenSymbol::from("UNI")]);
    }

    #[test]
    fn test_records_are_kept_in_block_order() {
        let w = window(vec![
            record("0x2", 5, 50, "0xdex", WATCHED, "UNI", 1, 0),
            record("0x1", 3, 30, "0xdex", WATCHED, "WETH", 1, 0),
        ]);
        assert_eq!(w.first_block(), Some(BlockNumber::new(3)));
        assert_eq!(w.last_block(), Some(BlockNumber::new(5)));
        assert_eq!(w.token_list(), vec![TokenSymbol::from("WETH"), TokenSymbol::from("UNI")]);
        assert_eq!(w.last_timestamp(), Some(UnixTime::new(50)));
    }

    #[test]
    fn test_volume_is_sum_of_signed_values() {
        let w = window(vec![
            record("0x1", 1, 10, "0xdex", WATCHED, "UNI", 10, 0),
            record("0x2", 2, 20, WATCHED, "0xdex", "UNI", 4, 0),
        ]);
        assert_eq!(w.volume_for(&"UNI".into()), d("6"));
        assert_eq!(w.volume_for(&"SHIB".into()), Decimal::zero());
        assert_eq!(window(vec![]).volume_for(&"UNI".into()), Decimal::zero());
    }

    #[test]
    fn test_volume_filters() {
        let w = window(vec![
            record("0x1", 1, 10, "0xdex", WATCHED, "UNI", 10, 0),
            record("0x2", 2, 20, WATCHED, "0xdex", "USDC", 4, 0),
            record("0x3", 3, 30, "0xdex", WATCHED, "LINK", 5, 0),
            record("0x4", 4, 40, WATCHED, "0xdex", "LINK", 1, 0),
        ]);
        assert_eq!(
            w.positive_volumes(),
            vec![("UNI".into(), d("10")), ("LINK".into(), d("4"))]
        );
        assert_eq!(w.negative_volumes(), vec![("USDC".into(), d("-4"))]);
        assert_eq!(w.long_only_volumes(), vec![("UNI".into(), d("10"))]);
        assert_eq!(w.short_only_volumes(), vec![("USDC".into(), d("-4"))]);
    }

    #[test]
    fn test_balance_change_for_inflow_and_outflow() {
        let inflow = window(vec![record("0x1", 1, 10, "0xdex", WATCHED, "UNI", 25, 0)]);
        // 25 / (125 - 25) = 25%
        assert_eq!(inflow.balance_change_for(&"UNI".into(), d("125")), 25.0);

        let outflow = window(vec![record("0x1", 1, 10, WATCHED, "0xdex", "UNI", 50, 0)]);
        // -50 / 200 = -25%
        assert_eq!(outflow.balance_change_for(&"UNI".into(), d("200")), -25.0);
    }

    #[test]
    fn test_balance_change_zero_denominator_is_signed_infinity() {
        let inflow = window(vec![record("0x1", 1, 10, "0xdex", WATCHED, "UNI", 25, 0)]);
        assert_eq!(inflow.balance_change_for(&"UNI".into(), d("25")), f64::INFINITY);

        let outflow = window(vec![record("0x1", 1, 10, WATCHED, "0xdex", "UNI", 25, 0)]);
        assert_eq!(outflow.balance_change_for(&"UNI".into(), Decimal::zero()), f64::NEG_INFINITY);

        // No activity and no balance: zero net flow counts as inflow.
        assert_eq!(window(vec![]).balance_change_for(&"UNI".into(), Decimal::zero()), f64::INFINITY);
    }

    #[test]
    fn test_balance_changes_only_for_supplied_tokens() {
        let w = window(vec![
            record("0x1", 1, 10, "0xdex", WATCHED, "UNI", 25, 0),
            record("0x2", 2, 20, "0xdex", WATCHED, "LINK", 1, 0),
        ]);
        let balances = HashMap::from([(TokenSymbol::from("UNI"), d("125"))]);
        assert_eq!(w.balance_changes(&balances), vec![(TokenSymbol::from("UNI"), 25.0)]);
    }

    #[test]
    fn test_cumulative_balances_descending() {
        let w = window(vec![
            record("0x1", 1, 10, "0xdex", WATCHED, "UNI", 10, 0),
            record("0x2", 2, 20, WATCHED, "0xdex", "UNI", 4, 0),
        ]);
        let asc: Vec<Decimal> = w.cumulative_balances(&"UNI".into()).map(|(_, b)| b).collect();
        assert_eq!(asc, vec![d("10"), d("6")]);
        let desc: Vec<Decimal> = w
            .cumulative_balances_ordered(&"UNI".into(), SortOrder::Desc)
            .map(|(_, b)| b)
            .collect();
        assert_eq!(desc, vec![d("-4"), d("6")]);
    }

    #[test]
    fn test_classification() {
        let w = window(vec![
            record("0x1", 1, 10, "0xdex", WATCHED, "UNI", 10, 0),
            record("0x2", 2, 20, WATCHED, "0xdex", "USDC", 4, 0),
            record("0x3", 3, 30, "0xdex", WATCHED, "LINK", 5, 0),
            record("0x4", 4, 40, WATCHED, "0xdex", "LINK", 1, 0),
            record("0x5", 5, 50, "0xdex", WATCHED, "AAVE", 1, 0),
            record("0x6", 6, 60, WATCHED, "0xdex", "AAVE", 3, 0),
            record("0x7", 7, 70, "0xdex", WATCHED, "CRV", 2, 0),
            record("0x8", 8, 80, WATCHED, "0xdex", "CRV", 2, 0),
        ]);
        assert_eq!(w.classify(&"UNI".into()), Classification::LongOnly);
        assert_eq!(w.classify(&"USDC".into()), Classification::ShortOnly);
        assert_eq!(w.classify(&"LINK".into()), Classification::NetLong);
        assert_eq!(w.classify(&"AAVE".into()), Classification::NetShort);
        assert_eq!(w.classify(&"CRV".into()), Classification::Mixed);
        assert_eq!(w.classify(&"SHIB".into()), Classification::Mixed);

        assert_eq!(w.long_only_tokens(), vec![TokenSymbol::from("UNI")]);
        assert_eq!(w.short_only_tokens(), vec![TokenSymbol::from("USDC")]);
        assert_eq!(w.net_long_tokens(), vec![TokenSymbol::from("LINK")]);
        assert_eq!(w.net_short_tokens(), vec![TokenSymbol::from("AAVE")]);
    }

    #[test]
    fn test_long_short_split() {
        let w = window(vec![
            record("0x1", 1, 10, "0xdex", WATCHED, "LINK", 3, 0),
            record("0x2", 2, 20, WATCHED, "0xdex", "LINK", 1, 0),
        ]);
        assert_eq!(w.long_short_volumes(&"LINK".into()), (d("3"), d("-1")));
        assert_eq!(w.long_short_split(&"LINK".into()), Some((0.75, 0.25)));
        assert_eq!(w.long_short_split(&"SHIB".into()), None);
    }

    #[test]
    fn test_non_base_tokens() {
        let w = window(vec![
            record("0x1", 1, 10, "0xdex", WATCHED, "WETH", 1, 0),
            record("0x2", 2, 20, "0xdex", WATCHED, "UNI", 1, 0),
            record("0x3", 3, 30, "0xdex", WATCHED, "USDC", 1, 0),
        ]);
        let base = vec![TokenSymbol::from("WETH"), TokenSymbol::from("USDC")];
        assert_eq!(w.non_base_tokens(&base), vec![TokenSymbol::from("UNI")]);
    }

    #[test]
    fn test_moments_follow_change_series() {
        // balances 10, 20, 10 -> changes 1.0, -0.5
        let w = window(vec![
            record("0x1", 1, 10, "0xdex", WATCHED, "UNI", 10, 0),
            record("0x2", 2, 20, "0xdex", WATCHED, "UNI", 10, 0),
            record("0x3", 3, 30, WATCHED, "0xdex", "UNI", 10, 0),
        ]);
        let changes: Vec<f64> = w.trade_balance_changes(&"UNI".into()).collect();
        assert_eq!(changes, vec![1.0, -0.5]);
        assert_eq!(w.variance(&"UNI".into()), 0.5625);
        assert_eq!(w.standard_deviation(&"UNI".into()), 0.75);
        // two points are symmetric around their mean
        assert_eq!(w.skew(&"UNI".into()), 0.0);
        assert_eq!(w.moments(&"UNI".into()).count, 2);
    }

    #[test]
    fn test_moments_of_unknown_token_are_zero() {
        let w = window(vec![]);
        assert_eq!(w.variance(&"UNI".into()), 0.0);
        assert_eq!(w.skew(&"UNI".into()), 0.0);
    }

    #[test]
    fn test_trade_table_groups_swap_legs() {
        let w = window(vec![
            record("0xa", 1, 10, "0xdex", WATCHED, "UNI", 1, 0),
            record("0xb", 2, 20, WATCHED, "0xpool", "USDC", 5, 0),
            record("0xb", 2, 20, "0xpool", WATCHED, "UNI", 2, 0),
        ]);
        let table = w.trade_table();
        assert_eq!(table.len(), 2);
        assert_eq!(table.trade_count(), w.len());
        let hashes: Vec<&str> = table.iter().map(|(h, _)| h.as_str()).collect();
        assert_eq!(hashes, vec!["0xa", "0xb"]);
        let swap = table.get(&TxHash::new("0xb")).unwrap();
        assert_eq!(swap.len(), 2);
        assert_eq!(swap[0].value, d("-5"));
        assert_eq!(swap[1].value, d("2"));
    }

    #[test]
    fn test_new_skips_unrepresentable_records() {
        let mut huge = record("0x1", 1, 10, "0xdex", WATCHED, "SPAM", 0, 0);
        huge.raw_value = u128::MAX;
        let w = window(vec![huge, record("0x2", 2, 20, "0xdex", WATCHED, "UNI", 3, 0)]);
        assert_eq!(w.len(), 1);
        assert_eq!(w.token_list(), vec![TokenSymbol::from("UNI")]);
        assert!(w.trades_for(&"SPAM".into()).is_empty());
    }

    #[test]
    fn test_volume_saturates_instead_of_panicking() {
        // 5e28 fits the mantissa on its own; two of them do not.
        let spam = 50_000_000_000_000_000_000_000_000_000;
        let w = window(vec![
            record("0x1", 1, 10, "0xdex", WATCHED, "SPAM", spam, 0),
            record("0x2", 2, 20, "0xdex", WATCHED, "SPAM", spam, 0),
        ]);
        let token = TokenSymbol::from("SPAM");
        assert_eq!(w.len(), 2);
        assert_eq!(w.volume_for(&token), Decimal::MAX);
        assert_eq!(w.long_short_volumes(&token), (Decimal::MAX, Decimal::zero()));
        assert_eq!(w.classify(&token), Classification::LongOnly);

        let balances: Vec<Decimal> = w.cumulative_balances(&token).map(|(_, b)| b).collect();
        assert_eq!(balances, vec![d("50000000000000000000000000000"), Decimal::MAX]);
        assert!(w.variance(&token).is_finite());
        assert!(w.skew(&token).is_finite());
        // balance - volume is zero: treated as a zero denominator
        assert_eq!(w.balance_change_for(&token, Decimal::MAX), f64::INFINITY);
    }

    #[test]
    fn test_max_mantissa_trajectory_stays_finite() {
        let max: u128 = 79_228_162_514_264_337_593_543_950_335;
        // balances: 1, MAX, 1, 1 - MAX
        let w = window(vec![
            record("0x1", 1, 10, "0xdex", WATCHED, "UNI", 1, 0),
            record("0x2", 2, 20, "0xdex", WATCHED, "UNI", max - 1, 0),
            record("0x3", 3, 30, WATCHED, "0xdex", "UNI", max - 1, 0),
            record("0x4", 4, 40, WATCHED, "0xdex", "UNI", max, 0),
        ]);
        let token = TokenSymbol::from("UNI");
        let balances: Vec<Decimal> = w.cumulative_balances(&token).map(|(_, b)| b).collect();
        assert_eq!(balances[1], Decimal::MAX);
        assert_eq!(balances[3], -(Decimal::MAX - d("1")));
        assert_eq!(w.volume_for(&token), balances[3]);

        let changes: Vec<f64> = w.trade_balance_changes(&token).collect();
        assert_eq!(changes.len(), 3);
        assert!(changes.iter().all(|c| c.is_finite()));
        assert!(changes[0] > 7.9e28);
        assert!(changes[2] < -7.9e28);

        let m = w.moments(&token);
        assert_eq!(m.count, 3);
        assert!(m.mean.is_finite());
        assert!(m.variance.is_finite());
        assert!(m.standard_deviation.is_finite());
        assert!(m.skew.is_finite());
    }

    #[test]
    fn test_from_raw_skips_malformed_records() {
        let good = RawTransferEvent::from(&record("0x1", 1, 10, "0xdex", WATCHED, "UNI", 1, 0));
        let mut bad = good.clone();
        bad.token_decimal = None;
        let w = PortfolioWindow::from_raw(
            Address::new(WATCHED),
            &[good, bad],
            UnixTime::new(0),
            UnixTime::new(100),
        );
        assert_eq!(w.len(), 1);
    }
}
