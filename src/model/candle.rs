use std::fmt;

/// One OHLC bucket. `open_time` is the bucket start in epoch milliseconds and
/// identifies the candle inside a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candle {
    pub open_time: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Candle {
    /// A freshly opened bucket: all four prices equal to the first tick.
    pub fn flat(open_time: u64, price: f64) -> Self {
        Self {
            open_time,
            open: price,
            high: price,
            low: price,
            close: price,
        }
    }

    /// Fold a trade price into the bucket. `open` never moves.
    pub fn fold(&mut self, price: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
    }

    pub fn close_time(&self, duration_ms: u64) -> u64 {
        self.open_time.saturating_add(duration_ms)
    }

    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

impl fmt::Display for Candle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {:.4} - {:.4} - {:.4} - {:.4}",
            self.open_time, self.open, self.high, self.low, self.close
        )
    }
}
