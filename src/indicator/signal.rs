use serde::Deserialize;

use super::bollinger::{bollinger, BollingerBands};
use super::rsi::rsi;

/// Band-breakout / RSI rule parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BandRsiConfig {
    pub enabled: bool,
    pub bb_period: usize,
    pub bb_std: f64,
    pub rsi_period: usize,
    pub rsi_lower: f64,
    pub rsi_upper: f64,
    /// Stop placed this fraction below the entry price on a buy.
    pub stop_loss_pct: f64,
}

impl Default for BandRsiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bb_period: 20,
            bb_std: 2.0,
            rsi_period: 14,
            rsi_lower: 30.0,
            rsi_upper: 70.0,
            stop_loss_pct: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandRsiSignal {
    Buy { price: f64, stop_loss: f64 },
    Close { price: f64 },
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandRsiReading {
    pub price: f64,
    pub bands: BollingerBands,
    pub rsi: f64,
    pub signal: BandRsiSignal,
}

/// Evaluate the rule on a close series, latest close last.
///
/// Returns `None` while either indicator is still warming up. Breaking above
/// the upper band with RSI above `rsi_upper` closes; breaking below the
/// lower band with RSI below `rsi_lower` buys.
pub fn evaluate(closes: &[f64], cfg: &BandRsiConfig) -> Option<BandRsiReading> {
    let price = *closes.last()?;
    let bands = bollinger(closes, cfg.bb_period, cfg.bb_std)?;
    let rsi = rsi(closes, cfg.rsi_period)?;

    let signal = if price >= bands.upper && rsi > cfg.rsi_upper {
        BandRsiSignal::Close { price }
    } else if price <= bands.lower && rsi < cfg.rsi_lower {
        BandRsiSignal::Buy {
            price,
            stop_loss: price * (1.0 - cfg.stop_loss_pct),
        }
    } else {
        BandRsiSignal::Hold
    };

    Some(BandRsiReading {
        price,
        bands,
        rsi,
        signal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(last: f64) -> Vec<f64> {
        let mut closes = vec![100.0; 19];
        closes.push(last);
        closes
    }

    #[test]
    fn sharp_drop_buys_with_stop() {
        let reading = evaluate(&series(80.0), &BandRsiConfig::default()).unwrap();
        assert!(reading.price <= reading.bands.lower);
        assert!(reading.rsi.abs() < f64::EPSILON);
        match reading.signal {
            BandRsiSignal::Buy { price, stop_loss } => {
                assert!((price - 80.0).abs() < f64::EPSILON);
                assert!((stop_loss - 76.0).abs() < 1e-9);
            }
            other => panic!("expected buy, got {:?}", other),
        }
    }

    #[test]
    fn sharp_rise_closes() {
        let reading = evaluate(&series(120.0), &BandRsiConfig::default()).unwrap();
        assert_eq!(reading.signal, BandRsiSignal::Close { price: 120.0 });
    }

    #[test]
    fn inside_bands_holds() {
        let closes: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 100.0 } else { 101.0 })
            .collect();
        let reading = evaluate(&closes, &BandRsiConfig::default()).unwrap();
        assert_eq!(reading.signal, BandRsiSignal::Hold);
    }

    #[test]
    fn warming_up_or_flat_gives_nothing() {
        let cfg = BandRsiConfig::default();
        assert_eq!(evaluate(&[100.0; 10], &cfg), None);
        assert_eq!(evaluate(&[100.0; 20], &cfg), None);
        assert_eq!(evaluate(&[], &cfg), None);
    }
}
