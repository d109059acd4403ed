//! Simulated market data: each symbol follows a bounded random walk.

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::domain::{TickerFeed, TickerSnapshot, Timestamp};

/// Symbols quoted when no watchlist is configured
pub const DEFAULT_WATCHLIST: [&str; 4] = ["AAPL", "TSLA", "NVDA", "BTC-USD"];

/// Largest per-tick move as a fraction of the current price
const MAX_STEP: f64 = 0.01;
const MIN_PRICE: f64 = 0.01;

#[derive(Debug, Clone)]
struct Quote {
    symbol: String,
    open: f64,
    price: f64,
    volume: u64,
}

#[derive(Debug)]
pub struct RandomWalkFeed {
    rng: StdRng,
    quotes: Vec<Quote>,
}

impl RandomWalkFeed {
    /// Deterministic feed for a given seed.
    pub fn with_seed(watchlist: &[String], seed: u64) -> Self {
        Self::from_rng(watchlist, StdRng::seed_from_u64(seed))
    }

    /// Feed seeded from the operating system.
    pub fn new(watchlist: &[String]) -> Self {
        Self::from_rng(watchlist, StdRng::from_os_rng())
    }

    fn from_rng(watchlist: &[String], mut rng: StdRng) -> Self {
        let symbols: Vec<String> = if watchlist.is_empty() {
            DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect()
        } else {
            watchlist.to_vec()
        };
        let quotes = symbols
            .into_iter()
            .map(|symbol| {
                let open = round2(rng.random_range(20.0..500.0));
                Quote {
                    symbol,
                    open,
                    price: open,
                    volume: 0,
                }
            })
            .collect();
        Self { rng, quotes }
    }
}

impl TickerFeed for RandomWalkFeed {
    fn next_snapshots(&mut self, as_of: Timestamp) -> Vec<TickerSnapshot> {
        let rng = &mut self.rng;
        self.quotes
            .iter_mut()
            .map(|quote| {
                let step = quote.price * rng.random_range(-MAX_STEP..=MAX_STEP);
                quote.price = round2((quote.price + step).max(MIN_PRICE));
                quote.volume += rng.random_range(100..5_000);
                let change = round2(quote.price - quote.open);
                TickerSnapshot {
                    symbol: quote.symbol.clone(),
                    price: quote.price,
                    change,
                    change_percent: round2(change / quote.open * 100.0),
                    volume: quote.volume,
                    as_of,
                }
            })
            .collect()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watchlist() -> Vec<String> {
        DEFAULT_WATCHLIST.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_snapshot_per_symbol() {
        // テスト項目: ウォッチリストの各銘柄につき 1 つのスナップショットが生成される
        // given (前提条件):
        let mut feed = RandomWalkFeed::with_seed(&watchlist(), 7);

        // when (操作):
        let snapshots = feed.next_snapshots(Timestamp::new(2_000));

        // then (期待する結果):
        let symbols: Vec<&str> = snapshots.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, DEFAULT_WATCHLIST.to_vec());
        assert!(snapshots.iter().all(|s| s.as_of == Timestamp::new(2_000)));
    }

    #[test]
    fn test_same_seed_same_walk() {
        // テスト項目: 同じシードのフィードは同じ値動きを生成する
        // given (前提条件):
        let mut a = RandomWalkFeed::with_seed(&watchlist(), 42);
        let mut b = RandomWalkFeed::with_seed(&watchlist(), 42);

        // when (操作):
        let first = (a.next_snapshots(Timestamp::new(1)), b.next_snapshots(Timestamp::new(1)));
        let second = (a.next_snapshots(Timestamp::new(2)), b.next_snapshots(Timestamp::new(2)));

        // then (期待する結果):
        assert_eq!(first.0, first.1);
        assert_eq!(second.0, second.1);
    }

    #[test]
    fn test_walk_stays_bounded() {
        // テスト項目: 1 ティックの値動きは約 1% 以内で、価格は正、出来高は単調増加する
        // given (前提条件):
        let mut feed = RandomWalkFeed::with_seed(&watchlist(), 3);
        let mut previous = feed.next_snapshots(Timestamp::new(0));

        for tick in 1..200 {
            // when (操作):
            let current = feed.next_snapshots(Timestamp::new(tick));

            // then (期待する結果):
            for (before, after) in previous.iter().zip(current.iter()) {
                assert!(after.price >= MIN_PRICE);
                assert!((after.price - before.price).abs() <= before.price * MAX_STEP + 0.01);
                assert!(after.volume > before.volume);
            }
            previous = current;
        }
    }

    #[test]
    fn test_empty_watchlist_quotes_default_symbols() {
        // テスト項目: ウォッチリストが空のフィードはデフォルト銘柄を配信する
        // given (前提条件):
        let mut feed = RandomWalkFeed::with_seed(&[], 11);

        // when (操作):
        let snapshots = feed.next_snapshots(Timestamp::new(10));

        // then (期待する結果):
        let symbols: Vec<&str> = snapshots.iter().map(|s| s.symbol.as_str()).collect();
        assert_eq!(symbols, DEFAULT_WATCHLIST.to_vec());
    }
}
