use serde::Deserialize;

use crate::model::candle::Candle;

/// Deserialize Binance string-encoded numbers to f64.
pub fn string_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<f64>().map_err(serde::de::Error::custom)
}

/// One row of `GET /api/v3/klines`. Binance sends klines as 12-element arrays.
#[derive(Debug, Deserialize)]
pub struct BinanceKline(
    pub u64,
    #[serde(deserialize_with = "string_to_f64")] pub f64,
    #[serde(deserialize_with = "string_to_f64")] pub f64,
    #[serde(deserialize_with = "string_to_f64")] pub f64,
    #[serde(deserialize_with = "string_to_f64")] pub f64,
    /// Base asset volume.
    pub String,
    /// Close time.
    pub u64,
    /// Quote asset volume.
    pub String,
    /// Number of trades.
    pub u64,
    /// Taker buy base asset volume.
    pub String,
    /// Taker buy quote asset volume.
    pub String,
    /// Unused.
    pub serde_json::Value,
);

impl From<BinanceKline> for Candle {
    fn from(k: BinanceKline) -> Self {
        Candle {
            open_time: k.0,
            open: k.1,
            high: k.2,
            low: k.3,
            close: k.4,
        }
    }
}

/// Binance API error response.
#[derive(Debug, Deserialize)]
pub struct BinanceApiErrorResponse {
    pub code: i64,
    pub msg: String,
}
