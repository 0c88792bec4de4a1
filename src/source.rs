use std::future::Future;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::model::candle::Candle;

/// Time range and bucket size for the one-shot history fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    pub symbol: String,
    /// Exchange interval string, e.g. "1s" or "1m".
    pub interval: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

impl HistoryRequest {
    /// Range covering the `window` buckets that end at `now_ms`.
    pub fn ending_at(
        symbol: &str,
        interval: &str,
        duration_ms: u64,
        window: usize,
        now_ms: u64,
    ) -> Self {
        let span = duration_ms.saturating_mul(window as u64);
        Self {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
            start_ms: now_ms.saturating_sub(span),
            end_ms: now_ms,
        }
    }
}

/// Wall-clock instant as epoch milliseconds. Instants before the epoch are an
/// error rather than a silent zero.
pub fn unix_ms(now: DateTime<Utc>) -> Result<u64> {
    u64::try_from(now.timestamp_millis()).context("system clock before epoch")
}

/// Supplies seed candles, ascending by `open_time`.
pub trait HistorySource {
    fn fetch_history(
        &self,
        request: &HistoryRequest,
    ) -> impl Future<Output = Result<Vec<Candle>>> + Send;
}
