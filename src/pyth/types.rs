use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::tick::Tick;

/// Envelope of every Hermes websocket message.
#[derive(Debug, Deserialize)]
pub struct PythStreamMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub price_feed: Option<PythPriceFeed>,
}

#[derive(Debug, Deserialize)]
pub struct PythPriceFeed {
    pub id: String,
    pub price: Option<PythPrice>,
}

/// Fixed-point price: `price × 10^expo`.
#[derive(Debug, Deserialize)]
pub struct PythPrice {
    pub price: String,
    pub conf: String,
    pub expo: i32,
    /// Seconds since epoch.
    pub publish_time: i64,
}

#[derive(Debug, Serialize)]
pub struct PythSubscribe<'a> {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub ids: Vec<&'a str>,
}

impl<'a> PythSubscribe<'a> {
    pub fn new(ids: Vec<&'a str>) -> Self {
        Self {
            msg_type: "subscribe",
            ids,
        }
    }
}

/// Scale a fixed-point mantissa by `10^expo`.
pub fn scale_mantissa(mantissa: &str, expo: i32) -> Result<f64, AppError> {
    let m: i64 = mantissa
        .trim()
        .parse()
        .map_err(|e| AppError::Feed(format!("invalid mantissa '{}': {}", mantissa, e)))?;
    let m = m as f64;
    // Dividing by an exact power of ten rounds once; multiplying by 10^-n
    // would round twice.
    Ok(if expo < 0 {
        m / 10f64.powi(-expo)
    } else {
        m * 10f64.powi(expo)
    })
}

/// Feed ids are hex; Hermes omits the `0x` prefix in updates.
pub fn normalize_feed_id(id: &str) -> String {
    id.trim()
        .trim_start_matches("0x")
        .to_ascii_lowercase()
}

impl PythPrice {
    pub fn to_tick(&self) -> Result<Tick, AppError> {
        let timestamp_ms = u64::try_from(self.publish_time)
            .map_err(|_| AppError::Feed(format!("negative publish_time {}", self.publish_time)))?
            .saturating_mul(1_000);
        Ok(Tick {
            price: scale_mantissa(&self.price, self.expo)?,
            confidence: scale_mantissa(&self.conf, self.expo)?,
            timestamp_ms,
        })
    }
}

/// Extract a tick for `feed_id` from a raw message. Returns `Ok(None)` for
/// messages that are not price updates for that feed.
pub fn parse_price_update(text: &str, feed_id: &str) -> Result<Option<Tick>, AppError> {
    let msg: PythStreamMessage = serde_json::from_str(text)?;
    if msg.msg_type != "price_update" {
        return Ok(None);
    }
    let Some(feed) = msg.price_feed else {
        return Ok(None);
    };
    if normalize_feed_id(&feed.id) != normalize_feed_id(feed_id) {
        return Ok(None);
    }
    match feed.price {
        Some(price) => price.to_tick().map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOL_ID: &str = "ef0d8b6fda2ceba41da15d4095d1da392a0d2f8ed0c6c7bc0f4cfac8c280b56d";

    #[test]
    fn parse_price_update_scales_price_and_time() {
        let json = format!(
            r#"{{
                "type": "price_update",
                "price_feed": {{
                    "id": "{}",
                    "price": {{"price": "1234500000", "conf": "250000", "expo": -8, "publish_time": 1700000000}},
                    "ema_price": {{"price": "1230000000", "conf": "260000", "expo": -8, "publish_time": 1700000000}}
                }}
            }}"#,
            SOL_ID
        );
        let tick = parse_price_update(&json, SOL_ID).unwrap().unwrap();
        assert!((tick.price - 12.345).abs() < f64::EPSILON);
        assert!((tick.confidence - 0.0025).abs() < f64::EPSILON);
        assert_eq!(tick.timestamp_ms, 1_700_000_000_000);
    }

    #[test]
    fn other_message_types_are_ignored() {
        let json = r#"{"type": "response", "status": "success"}"#;
        assert!(parse_price_update(json, SOL_ID).unwrap().is_none());
    }

    #[test]
    fn other_feed_ids_are_ignored() {
        let json = r#"{"type": "price_update", "price_feed": {"id": "abcd",
            "price": {"price": "1", "conf": "1", "expo": 0, "publish_time": 1}}}"#;
        assert!(parse_price_update(json, SOL_ID).unwrap().is_none());
    }

    #[test]
    fn feed_id_match_ignores_prefix_and_case() {
        assert_eq!(
            normalize_feed_id("0xEF0D"),
            normalize_feed_id("ef0d")
        );
    }

    #[test]
    fn scale_mantissa_positive_exponent() {
        assert!((scale_mantissa("12", 2).unwrap() - 1200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bad_mantissa_is_an_error() {
        assert!(matches!(scale_mantissa("1.5", -2), Err(AppError::Feed(_))));
    }

    #[test]
    fn subscribe_message_shape() {
        let msg = serde_json::to_string(&PythSubscribe::new(vec![SOL_ID])).unwrap();
        assert_eq!(msg, format!(r#"{{"type":"subscribe","ids":["{}"]}}"#, SOL_ID));
    }
}
