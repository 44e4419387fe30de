//! Upstream market-data clients: the CryptoPanic headline feed and OKX
//! candlesticks for the price chart.

pub mod candles;
pub mod client;
pub mod error;
mod types;

pub use candles::{Candle, OkxCandleClient};
pub use client::CryptoPanicClient;
pub use error::FeedError;
