//! Market ticker: the feed abstraction and the per-room latest-snapshot board.

use std::collections::BTreeMap;

use super::{entity::TickerSnapshot, value_object::Timestamp};

/// Source of market snapshots.
///
/// A room polls its feed on every ticker interval; implementations decide
/// whether they compute, simulate or fetch the numbers.
#[cfg_attr(test, mockall::automock)]
pub trait TickerFeed: Send + Sync {
    /// Snapshots for the feed's watchlist as of `as_of`.
    fn next_snapshots(&mut self, as_of: Timestamp) -> Vec<TickerSnapshot>;
}

/// Latest snapshot per symbol.
#[derive(Debug, Clone, Default)]
pub struct TickerBoard {
    latest: BTreeMap<String, TickerSnapshot>,
}

impl TickerBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store snapshots, keeping only the newest per symbol.
    ///
    /// Returns the snapshots that superseded what was stored; anything older
    /// than the stored snapshot for its symbol is dropped.
    pub fn apply(&mut self, snapshots: Vec<TickerSnapshot>) -> Vec<TickerSnapshot> {
        let mut accepted = Vec::with_capacity(snapshots.len());
        for snapshot in snapshots {
            let newer = self
                .latest
                .get(&snapshot.symbol)
                .is_none_or(|current| snapshot.as_of >= current.as_of);
            if newer {
                self.latest.insert(snapshot.symbol.clone(), snapshot.clone());
                accepted.push(snapshot);
            }
        }
        accepted
    }

    pub fn get(&self, symbol: &str) -> Option<&TickerSnapshot> {
        self.latest.get(symbol)
    }

    /// All latest snapshots, sorted by symbol.
    pub fn snapshots(&self) -> Vec<TickerSnapshot> {
        self.latest.values().cloned().collect()
    }
}
