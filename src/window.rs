//! Bounded sliding window of fixed-duration candles.
//!
//! The window is the only mutable state of the aggregation core. Every
//! mutation takes `&mut self`, so a window can have exactly one writer at a
//! time; two execution contexts cannot both hold it for `ingest`:
//!
//! ```compile_fail
//! use candle_stream::window::CandleWindow;
//!
//! let mut window = CandleWindow::new(1_000, 20);
//! std::thread::scope(|s| {
//!     s.spawn(|| window.ingest(1.0, 1_000));
//!     s.spawn(|| window.ingest(2.0, 1_001));
//! });
//! ```
//!
//! Callers that receive ticks on another task hand them over through a
//! channel to a single owner (see [`crate::aggregator::Aggregator`]).

use std::collections::VecDeque;

use serde::Deserialize;

use crate::model::candle::Candle;

pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// What to do with a tick stamped before the open candle's `open_time`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StaleTickPolicy {
    /// Fold it into the open candle as if it were current.
    #[default]
    Fold,
    /// Drop it and leave the window untouched.
    Reject,
}

/// Result of a single [`CandleWindow::ingest`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Window was empty; no bucket alignment to fold against.
    Dropped,
    /// Tick was older than the open candle and the policy rejects those.
    Rejected { open_time: u64 },
    /// Tick landed inside the open bucket. Carries the updated candle.
    Folded(Candle),
    /// Tick closed the open bucket and started the next one.
    Rolled {
        opened: Candle,
        evicted: Option<Candle>,
    },
}

#[derive(Debug, Clone)]
pub struct CandleWindow {
    duration_ms: u64,
    capacity: usize,
    stale_policy: StaleTickPolicy,
    candles: VecDeque<Candle>,
}

impl CandleWindow {
    pub fn new(duration_ms: u64, capacity: usize) -> Self {
        assert!(duration_ms > 0, "duration_ms must be > 0");
        assert!(capacity > 0, "window capacity must be > 0");
        Self {
            duration_ms,
            capacity,
            stale_policy: StaleTickPolicy::default(),
            candles: VecDeque::with_capacity(capacity + 1),
        }
    }

    pub fn with_stale_policy(mut self, policy: StaleTickPolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    /// Replace the window contents with historical candles, keeping only the
    /// most recent `capacity` of them. Input must be ascending by `open_time`.
    ///
    /// Returns how many candles were retained.
    pub fn seed(&mut self, candles: impl IntoIterator<Item = Candle>) -> usize {
        self.candles.clear();
        for candle in candles {
            debug_assert!(
                self.candles
                    .back()
                    .map_or(true, |prev| prev.open_time < candle.open_time),
                "seed candles must be strictly ascending by open_time"
            );
            self.candles.push_back(candle);
            if self.candles.len() > self.capacity {
                self.candles.pop_front();
            }
        }
        self.candles.len()
    }

    /// Fold one `(price, timestamp)` observation into the window.
    ///
    /// A tick before the open bucket's end updates the open candle in place.
    /// Anything at or past the end opens exactly one new candle at
    /// `last.open_time + duration`, however late the tick is; skipped
    /// buckets are not backfilled.
    pub fn ingest(&mut self, price: f64, timestamp_ms: u64) -> IngestOutcome {
        let Some(last) = self.candles.back_mut() else {
            return IngestOutcome::Dropped;
        };

        let bucket_end = last.close_time(self.duration_ms);
        if timestamp_ms < bucket_end {
            if timestamp_ms < last.open_time && self.stale_policy == StaleTickPolicy::Reject {
                return IngestOutcome::Rejected {
                    open_time: last.open_time,
                };
            }
            last.fold(price);
            return IngestOutcome::Folded(*last);
        }

        let opened = Candle::flat(bucket_end, price);
        self.candles.push_back(opened);
        let evicted = if self.candles.len() > self.capacity {
            self.candles.pop_front()
        } else {
            None
        };
        IngestOutcome::Rolled { opened, evicted }
    }

    /// Owned copy of the window, oldest first.
    pub fn snapshot(&self) -> Vec<Candle> {
        self.candles.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }

    /// The open (mutable) candle, if any.
    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn stale_policy(&self) -> StaleTickPolicy {
        self.stale_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_truncates_to_most_recent() {
        let mut w = CandleWindow::new(1_000, 3);
        let kept = w.seed((0..5).map(|i| Candle::flat(i * 1_000, i as f64)));
        assert_eq!(kept, 3);
        let times: Vec<u64> = w.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![2_000, 3_000, 4_000]);
    }

    #[test]
    fn seed_replaces_previous_contents() {
        let mut w = CandleWindow::new(1_000, 5);
        w.seed([Candle::flat(0, 1.0), Candle::flat(1_000, 2.0)]);
        w.seed([Candle::flat(9_000, 3.0)]);
        assert_eq!(w.len(), 1);
        assert_eq!(w.last().map(|c| c.open_time), Some(9_000));
    }

    #[test]
    fn tick_exactly_on_bucket_end_rolls() {
        let mut w = CandleWindow::new(1_000, 5);
        w.seed([Candle::flat(1_000, 10.0)]);
        let out = w.ingest(11.0, 2_000);
        assert!(matches!(out, IngestOutcome::Rolled { evicted: None, .. }));
        assert_eq!(w.last().map(|c| c.open_time), Some(2_000));
    }

    #[test]
    #[should_panic(expected = "duration_ms must be > 0")]
    fn rejects_zero_duration() {
        let _ = CandleWindow::new(0, 20);
    }

    #[test]
    #[should_panic(expected = "window capacity must be > 0")]
    fn rejects_zero_capacity() {
        let _ = CandleWindow::new(1_000, 0);
    }
}
