//! 데이터 소스 trait 정의.

use async_trait::async_trait;
use boostrade_core::{Candle, Instrument, Timeframe, TrendSeries};

use crate::SourceError;

/// 데이터 소스 작업을 위한 Result 타입.
pub type SourceResult<T> = Result<T, SourceError>;

/// 과거 캔들을 제공하는 거래소 소스.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// 소스 이름 반환.
    fn name(&self) -> &str;

    /// 세션을 엽니다 (연결 확인 및 인증).
    ///
    /// 이미 열려 있으면 세션을 새로 만듭니다.
    async fn connect(&mut self) -> SourceResult<()>;

    /// 세션을 닫습니다.
    async fn disconnect(&mut self) -> SourceResult<()>;

    /// `lookback` 기간 안에서 가장 최근 `limit`개의 캔들을 조회합니다.
    ///
    /// 결과는 캔들 시작 시각 오름차순입니다. 내부 재시도는 하지 않습니다.
    async fn fetch_candles(
        &self,
        instrument: &Instrument,
        interval: Timeframe,
        lookback: chrono::Duration,
        limit: usize,
    ) -> SourceResult<Vec<Candle>>;
}

/// 검색 관심도 시계열을 제공하는 트렌드 소스.
#[async_trait]
pub trait TrendDataSource: Send + Sync {
    /// 소스 이름 반환.
    fn name(&self) -> &str;

    /// 세션을 엽니다. 이미 열려 있으면 새로 만듭니다.
    async fn connect(&mut self) -> SourceResult<()>;

    /// 세션을 닫습니다.
    async fn disconnect(&mut self) -> SourceResult<()>;

    /// 검색어의 기간별 관심도를 조회합니다.
    ///
    /// `timeframe`은 트렌드 서비스의 기간 문자열입니다 (예: `"now 7-d"`).
    async fn fetch_interest(&self, keyword: &str, timeframe: &str) -> SourceResult<TrendSeries>;
}
