//! 외부 데이터 소스 커넥터.

pub mod binance;
pub mod google_trends;

pub use binance::{BinanceClient, BinanceConfig};
pub use google_trends::{GoogleTrendsClient, GoogleTrendsConfig};
