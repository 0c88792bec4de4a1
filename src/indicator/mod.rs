pub mod bollinger;
pub mod rsi;
pub mod signal;
