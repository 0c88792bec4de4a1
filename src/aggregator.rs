use anyhow::Result;
use tokio::sync::{mpsc, watch};

use crate::indicator::signal::{evaluate, BandRsiConfig, BandRsiReading, BandRsiSignal};
use crate::model::candle::Candle;
use crate::model::tick::Tick;
use crate::source::{HistoryRequest, HistorySource};
use crate::window::{CandleWindow, IngestOutcome};

/// Sole owner of a [`CandleWindow`]. Ticks reach it through a channel and are
/// applied one at a time, so the window never sees two writers.
pub struct Aggregator {
    window: CandleWindow,
    indicators: Option<BandRsiConfig>,
}

impl Aggregator {
    pub fn new(window: CandleWindow) -> Self {
        Self {
            window,
            indicators: None,
        }
    }

    /// Evaluate the band/RSI rule after every rollover. Ignored when the
    /// config is disabled.
    pub fn with_indicators(mut self, cfg: BandRsiConfig) -> Self {
        self.indicators = cfg.enabled.then_some(cfg);
        self
    }

    pub fn window(&self) -> &CandleWindow {
        &self.window
    }

    /// Band/RSI reading over the window's closes, the open candle included.
    pub fn evaluate_indicators(&self) -> Option<BandRsiReading> {
        let cfg = self.indicators.as_ref()?;
        let closes: Vec<f64> = self.window.iter().map(|c| c.close).collect();
        evaluate(&closes, cfg)
    }

    /// Fetch history and seed the window. Must complete before [`run`] is
    /// started; `run` consumes the aggregator, so the order is enforced.
    ///
    /// On failure the window is left empty and the error is returned. An
    /// empty result is not an error but leaves the window without data, so
    /// live ticks are dropped until a later seed.
    ///
    /// [`run`]: Aggregator::run
    pub async fn seed_from<S: HistorySource>(
        &mut self,
        source: &S,
        request: &HistoryRequest,
    ) -> Result<usize> {
        tracing::info!(
            symbol = %request.symbol,
            interval = %request.interval,
            start_ms = request.start_ms,
            end_ms = request.end_ms,
            "Fetching historical candles"
        );
        let candles = match source.fetch_history(request).await {
            Ok(c) => c,
            Err(e) => {
                self.window.seed(std::iter::empty());
                tracing::warn!(error = %e, "History fetch failed, starting with empty window");
                return Err(e);
            }
        };

        let fetched = candles.len();
        let kept = self.window.seed(candles);
        if kept == 0 {
            tracing::warn!("History source returned no candles; ticks are dropped until reseeded");
        } else {
            tracing::info!(fetched, kept, "Seeded candle window");
            for candle in self.window.iter() {
                tracing::debug!(candle = %candle, "seed");
            }
        }
        Ok(kept)
    }

    /// Apply one tick and log what it did to the window.
    pub fn apply(&mut self, tick: &Tick) -> IngestOutcome {
        let outcome = self.window.ingest(tick.price, tick.timestamp_ms);
        match &outcome {
            IngestOutcome::Dropped => {
                tracing::trace!(price = tick.price, "No seed candle yet, dropping tick");
            }
            IngestOutcome::Rejected { open_time } => {
                tracing::warn!(
                    timestamp_ms = tick.timestamp_ms,
                    open_time,
                    "Rejected tick older than open candle"
                );
            }
            IngestOutcome::Folded(candle) => {
                tracing::debug!(candle = %candle, confidence = tick.confidence, "Updated current candle");
            }
            IngestOutcome::Rolled { opened, evicted } => {
                tracing::info!(
                    candle = %opened,
                    evicted = evicted.map(|c| c.open_time),
                    "Added new candle"
                );
                self.log_indicators();
            }
        }
        outcome
    }

    fn log_indicators(&self) {
        let Some(reading) = self.evaluate_indicators() else {
            return;
        };
        tracing::debug!(
            price = reading.price,
            bb_upper = reading.bands.upper,
            bb_middle = reading.bands.middle,
            bb_lower = reading.bands.lower,
            rsi = reading.rsi,
            "Indicators"
        );
        match reading.signal {
            BandRsiSignal::Buy { price, stop_loss } => {
                tracing::info!(price, stop_loss, rsi = reading.rsi, "Signal: buy below lower band");
            }
            BandRsiSignal::Close { price } => {
                tracing::info!(price, rsi = reading.rsi, "Signal: close above upper band");
            }
            BandRsiSignal::Hold => {}
        }
    }

    /// Consume ticks until the channel closes or shutdown is signalled, then
    /// hand the window back. Every change is published on `snapshot_tx`.
    pub async fn run(
        mut self,
        mut tick_rx: mpsc::Receiver<Tick>,
        snapshot_tx: watch::Sender<Vec<Candle>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> CandleWindow {
        snapshot_tx.send_replace(self.window.snapshot());

        loop {
            tokio::select! {
                tick = tick_rx.recv() => {
                    let Some(tick) = tick else {
                        tracing::info!("Tick channel closed, aggregator exiting");
                        break;
                    };
                    match self.apply(&tick) {
                        IngestOutcome::Folded(_) | IngestOutcome::Rolled { .. } => {
                            snapshot_tx.send_replace(self.window.snapshot());
                        }
                        IngestOutcome::Dropped | IngestOutcome::Rejected { .. } => {}
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Aggregator shutting down");
                    break;
                }
            }
        }
        self.window
    }
}
