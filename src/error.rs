use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("binance API error (code {code}): {msg}")]
    BinanceApi { code: i64, msg: String },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("price feed error: {0}")]
    Feed(String),
}
