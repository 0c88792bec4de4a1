#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bands over the last `period` closes: simple mean ± `std_mult` sample
/// standard deviations. `None` until `period` closes are available.
pub fn bollinger(closes: &[f64], period: usize, std_mult: f64) -> Option<BollingerBands> {
    assert!(period >= 2, "Bollinger period must be >= 2");
    if closes.len() < period {
        return None;
    }
    let recent = &closes[closes.len() - period..];
    let n = period as f64;
    let mean = recent.iter().sum::<f64>() / n;
    let variance = recent
        .iter()
        .map(|p| {
            let d = *p - mean;
            d * d
        })
        .sum::<f64>()
        / (n - 1.0);
    let std_dev = variance.sqrt();

    Some(BollingerBands {
        upper: mean + std_mult * std_dev,
        middle: mean,
        lower: mean - std_mult * std_dev,
    })
}
