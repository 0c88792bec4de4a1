use anyhow::{Context, Result};

use crate::error::AppError;
use crate::model::candle::Candle;
use crate::source::{HistoryRequest, HistorySource};

use super::types::{BinanceApiErrorResponse, BinanceKline};

/// Binance caps a single klines request at 1000 rows.
pub const MAX_KLINES_LIMIT: usize = 1000;

pub struct BinanceRestClient {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceRestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn klines_url(&self) -> String {
        format!("{}/api/v3/klines", self.base_url)
    }

    pub async fn get_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: u64,
        end_ms: u64,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let limit = limit.clamp(1, MAX_KLINES_LIMIT).to_string();
        let start = start_ms.to_string();
        let end = end_ms.to_string();

        let resp = self
            .http
            .get(self.klines_url())
            .query(&[
                ("symbol", symbol),
                ("interval", interval),
                ("startTime", start.as_str()),
                ("endTime", end.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .context("get_klines HTTP failed")?;

        let status = resp.status();
        let body = resp.text().await.context("get_klines body read failed")?;
        parse_klines_response(status, &body)
    }
}

/// Turn a klines HTTP response into candles. Non-success bodies in Binance's
/// `{code,msg}` shape become [`AppError::BinanceApi`].
pub fn parse_klines_response(status: reqwest::StatusCode, body: &str) -> Result<Vec<Candle>> {
    if !status.is_success() {
        if let Ok(err) = serde_json::from_str::<BinanceApiErrorResponse>(body) {
            return Err(AppError::BinanceApi {
                code: err.code,
                msg: err.msg,
            }
            .into());
        }
        anyhow::bail!("get_klines returned {}: {}", status, body);
    }
    parse_klines(body)
}

/// Parse a klines response body into candles ascending by open time.
pub fn parse_klines(body: &str) -> Result<Vec<Candle>> {
    let rows: Vec<BinanceKline> =
        serde_json::from_str(body).context("get_klines JSON parse failed")?;
    let mut candles: Vec<Candle> = rows.into_iter().map(Candle::from).collect();
    candles.sort_by_key(|c| c.open_time);
    candles.dedup_by_key(|c| c.open_time);
    Ok(candles)
}

impl HistorySource for BinanceRestClient {
    async fn fetch_history(&self, request: &HistoryRequest) -> Result<Vec<Candle>> {
        self.get_klines(
            &request.symbol,
            &request.interval,
            request.start_ms,
            request.end_ms,
            MAX_KLINES_LIMIT,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn klines_url_strips_trailing_slash() {
        let client = BinanceRestClient::new("https://api.binance.com/");
        assert_eq!(client.klines_url(), "https://api.binance.com/api/v3/klines");
    }

    #[test]
    fn parse_klines_sorts_ascending() {
        let body = r#"[
            [2000, "2", "2", "2", "2", "0", 2999, "0", 1, "0", "0", "0"],
            [1000, "1", "1", "1", "1", "0", 1999, "0", 1, "0", "0", "0"]
        ]"#;
        let candles = parse_klines(body).unwrap();
        let times: Vec<u64> = candles.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![1000, 2000]);
    }

    #[test]
    fn parse_klines_empty_array() {
        assert!(parse_klines("[]").unwrap().is_empty());
    }

    #[test]
    fn error_body_maps_to_binance_api_error() {
        let body = r#"{"code": -1121, "msg": "Invalid symbol."}"#;
        let err = parse_klines_response(reqwest::StatusCode::BAD_REQUEST, body).unwrap_err();
        match err.downcast_ref::<AppError>() {
            Some(AppError::BinanceApi { code, msg }) => {
                assert_eq!(*code, -1121);
                assert_eq!(msg, "Invalid symbol.");
            }
            other => panic!("expected BinanceApi error, got {:?}", other),
        }
    }

    #[test]
    fn plain_text_error_body_is_reported() {
        let err = parse_klines_response(
            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            "upstream unavailable",
        )
        .unwrap_err();
        assert!(err.downcast_ref::<AppError>().is_none());
        let text = err.to_string();
        assert!(text.contains("500"));
        assert!(text.contains("upstream unavailable"));
    }

    #[test]
    fn success_body_parses_candles() {
        let body = r#"[[1000, "10", "12", "8", "11", "0", 1999, "0", 3, "0", "0", "0"]]"#;
        let candles = parse_klines_response(reqwest::StatusCode::OK, body).unwrap();
        assert_eq!(
            candles,
            vec![Candle {
                open_time: 1000,
                open: 10.0,
                high: 12.0,
                low: 8.0,
                close: 11.0,
            }]
        );
    }

    #[test]
    fn parse_klines_rejects_object_body() {
        assert!(parse_klines(r#"{"code": -1, "msg": "x"}"#).is_err());
    }
}
