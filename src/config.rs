use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::indicator::signal::BandRsiConfig;
use crate::window::{StaleTickPolicy, DEFAULT_WINDOW_SIZE};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
pub const CONFIG_PATH_ENV: &str = "CANDLE_STREAM_CONFIG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub binance: BinanceConfig,
    pub pyth: PythConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub indicators: BandRsiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// History source. `kline_interval` also fixes the live candle duration.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceConfig {
    pub rest_base_url: String,
    pub symbol: String,
    pub kline_interval: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PythConfig {
    pub ws_url: String,
    pub price_feed_id: String,
    #[serde(default)]
    pub asset: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_size")]
    pub size: usize,
    #[serde(default)]
    pub stale_ticks: StaleTickPolicy,
    #[serde(default = "default_tick_buffer")]
    pub tick_buffer: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: default_window_size(),
            stale_ticks: StaleTickPolicy::default(),
            tick_buffer: default_tick_buffer(),
        }
    }
}

fn default_window_size() -> usize {
    DEFAULT_WINDOW_SIZE
}

fn default_tick_buffer() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Parse a Binance kline interval string (e.g. "1s", "1m", "1h", "1d", "1w") into milliseconds.
///
/// Monthly intervals ("1M") follow calendar months on Binance and have no
/// fixed length, so they are rejected.
pub fn parse_interval_ms(s: &str) -> Result<u64> {
    let Some((suffix_at, suffix)) = s.char_indices().next_back() else {
        bail!("invalid interval '{}': expected format like '1m'", s);
    };
    let num_str = &s[..suffix_at];
    if num_str.is_empty() {
        bail!("invalid interval '{}': expected format like '1m'", s);
    }

    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid interval '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid interval '{}': quantity must be > 0", s);
    }

    let unit_ms = match suffix {
        's' => 1_000,
        'm' => 60_000,
        'h' => 3_600_000,
        'd' => 86_400_000,
        'w' => 7 * 86_400_000,
        'M' => bail!(
            "invalid interval '{}': monthly candles span calendar months and have no fixed duration",
            s
        ),
        _ => bail!(
            "invalid interval '{}': unsupported suffix '{}', expected one of s/m/h/d/w",
            s,
            suffix
        ),
    };

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid interval '{}': value is too large", s))
}

impl BinanceConfig {
    pub fn kline_interval_ms(&self) -> Result<u64> {
        parse_interval_ms(&self.kline_interval)
    }
}

impl Config {
    /// Load from `$CANDLE_STREAM_CONFIG` or `config/default.toml`, after
    /// pulling any `.env` into the environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&config_str).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).context("failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.binance
            .kline_interval_ms()
            .context("binance.kline_interval is invalid")?;
        if self.binance.symbol.trim().is_empty() {
            bail!("binance.symbol must not be empty");
        }
        if self.pyth.price_feed_id.trim().is_empty() {
            bail!("pyth.price_feed_id must not be empty");
        }
        if self.window.size == 0 {
            bail!("window.size must be > 0");
        }
        if self.window.tick_buffer == 0 {
            bail!("window.tick_buffer must be > 0");
        }
        self.validate_indicators()
    }

    fn validate_indicators(&self) -> Result<()> {
        let ind = &self.indicators;
        if !ind.enabled {
            return Ok(());
        }
        if ind.bb_period < 2 {
            bail!("indicators.bb_period must be >= 2");
        }
        if ind.rsi_period == 0 {
            bail!("indicators.rsi_period must be > 0");
        }
        if !(ind.rsi_lower < ind.rsi_upper) {
            bail!("indicators.rsi_lower must be below indicators.rsi_upper");
        }
        if !(0.0..1.0).contains(&ind.stop_loss_pct) {
            bail!("indicators.stop_loss_pct must be in [0, 1)");
        }
        let needed = ind.bb_period.max(ind.rsi_period + 1);
        if self.window.size < needed {
            bail!(
                "window.size {} is too small for indicators (needs {})",
                self.window.size,
                needed
            );
        }
        Ok(())
    }

    /// Candle duration in milliseconds, derived from the kline interval.
    pub fn candle_duration_ms(&self) -> Result<u64> {
        self.binance.kline_interval_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_interval_valid() {
        assert_eq!(parse_interval_ms("1s").unwrap(), 1_000);
        assert_eq!(parse_interval_ms("1m").unwrap(), 60_000);
        assert_eq!(parse_interval_ms("2h").unwrap(), 7_200_000);
        assert_eq!(parse_interval_ms("3d").unwrap(), 259_200_000);
    }

    #[test]
    fn parse_interval_rejects_invalid_inputs() {
        assert!(parse_interval_ms("").is_err());
        assert!(parse_interval_ms("m").is_err());
        assert!(parse_interval_ms("0m").is_err());
        assert!(parse_interval_ms("1x").is_err());
        assert!(parse_interval_ms("1é").is_err());
        assert!(parse_interval_ms("5分").is_err());
        assert!(parse_interval_ms("é").is_err());
    }

    #[test]
    fn parse_interval_rejects_calendar_months() {
        let err = parse_interval_ms("1M").unwrap_err();
        assert!(err.to_string().contains("no fixed duration"));
    }
}
