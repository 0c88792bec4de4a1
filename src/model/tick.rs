/// One price observation from the live feed, already scaled to a plain price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub price: f64,
    /// Feed-reported confidence interval, same units as `price`.
    pub confidence: f64,
    pub timestamp_ms: u64,
}

impl Tick {
    pub fn new(price: f64, timestamp_ms: u64) -> Self {
        Self {
            price,
            confidence: 0.0,
            timestamp_ms,
        }
    }
}
