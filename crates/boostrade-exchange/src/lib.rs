//! 시장 데이터 및 검색 관심도 소스.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - `MarketDataSource` / `TrendDataSource` trait: 수집 파이프라인이 의존하는 데이터 소스 인터페이스
//! - Binance 커넥터 (REST kline 조회, API 키 검증)
//! - Google Trends 커넥터 (interest-over-time 조회)
//! - 소스 에러 정규화

pub mod connector;
pub mod error;
pub mod traits;

pub use connector::{BinanceClient, BinanceConfig, GoogleTrendsClient, GoogleTrendsConfig};
pub use error::*;
pub use traits::*;
