/// RSI over the last `period` close-to-close changes, averaging gains and
/// losses with a simple mean. Needs `period + 1` closes.
///
/// Returns `None` while warming up and when prices did not move at all;
/// a window with gains and no losses reads 100.
pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    assert!(period > 0, "RSI period must be > 0");
    if closes.len() < period + 1 {
        return None;
    }
    let recent = &closes[closes.len() - period - 1..];
    let (gain_sum, loss_sum) = recent.windows(2).fold((0.0, 0.0), |(g, l), pair| {
        let delta = pair[1] - pair[0];
        (g + delta.max(0.0), l + (-delta).max(0.0))
    });
    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;

    if avg_loss <= f64::EPSILON {
        if avg_gain <= f64::EPSILON {
            return None;
        }
        return Some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}
