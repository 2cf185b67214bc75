//! Single-pass balance trajectories for one token.
//!
//! Both iterators own their input and are deliberately not `Clone`: once
//! consumed they are exhausted, and a fresh trajectory has to be requested
//! from the window again.

use super::{accumulate, TokenTrade};
use crate::domain::Decimal;

/// Running balance after each trade, starting from zero.
///
/// A balance beyond the decimal range saturates rather than panicking.
#[derive(Debug)]
pub struct CumulativeBalances {
    trades: std::vec::IntoIter<TokenTrade>,
    balance: Decimal,
}

impl CumulativeBalances {
    pub(crate) fn new(trades: Vec<TokenTrade>) -> Self {
        Self {
            trades: trades.into_iter(),
            balance: Decimal::zero(),
        }
    }
}

impl Iterator for CumulativeBalances {
    type Item = (TokenTrade, Decimal);

    fn next(&mut self) -> Option<Self::Item> {
        let trade = self.trades.next()?;
        self.balance = accumulate(self.balance, trade.value, &trade.token);
        Some((trade, self.balance))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.trades.size_hint()
    }
}

/// Fractional change between consecutive running balances.
///
/// An empty trajectory yields a single `0.0`. A step whose previous balance is
/// zero has no defined ratio and is skipped.
#[derive(Debug)]
pub struct BalanceChanges {
    balances: CumulativeBalances,
    previous: Option<Decimal>,
    started: bool,
}

impl BalanceChanges {
    pub(crate) fn new(balances: CumulativeBalances) -> Self {
        Self {
            balances,
            previous: None,
            started: false,
        }
    }
}

impl Iterator for BalanceChanges {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if !self.started {
            self.started = true;
            match self.balances.next() {
                Some((_, first)) => self.previous = Some(first),
                None => return Some(0.0),
            }
        }

        loop {
            let (_, balance) = self.balances.next()?;
            let previous = self.previous.replace(balance).unwrap_or_default();
            if previous.is_zero() {
                continue;
            }
            return Some((balance - previous).to_f64() / previous.to_f64());
        }
    }
}
