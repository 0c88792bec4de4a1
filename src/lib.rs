pub mod aggregator;
pub mod binance;
pub mod config;
pub mod error;
pub mod event;
pub mod indicator;
pub mod model;
pub mod pyth;
pub mod source;
pub mod window;
