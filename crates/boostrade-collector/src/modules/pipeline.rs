//! 수집 파이프라인.
//!
//! 한 사이클은 다음 순서로 진행됩니다:
//! 1. 트렌드 시계열 조회
//! 2. 캔들 조회 (첫 성공 전까지는 `initial_limit`, 이후 `steady_limit`개)
//! 3. 캔들 시작 시각 키로 트렌드 값을 조인 (미스는 건너뜀)
//! 4. 행마다 커밋
//!
//! 두 조회가 모두 끝난 뒤에만 쓰기를 시작하므로 조회 실패 시 그 사이클에는
//! 아무것도 저장되지 않습니다.

use crate::config::CollectorConfig;
use crate::error::{CollectorError, StorageError};
use crate::modules::store::{CandleStore, PgCandleStore};
use crate::{CycleStats, Result};
use boostrade_core::{
    align_candles, cycle_span, trend_keyword, Candle, Credentials, Instrument, Timeframe,
    TimestampRenderer, TrendSeries,
};
use boostrade_exchange::{
    BinanceClient, BinanceConfig, GoogleTrendsClient, GoogleTrendsConfig, MarketDataSource,
    SourceError, SourceResult, TrendDataSource,
};
use secrecy::SecretString;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument as _;
use tracing::{error, info, warn};

/// 첫 사이클에서 조회할 캔들 수 (1시간봉 기준 6일).
pub const DEFAULT_INITIAL_LIMIT: usize = 144;
/// 이후 사이클에서 조회할 캔들 수.
pub const DEFAULT_STEADY_LIMIT: usize = 6;
/// 기본 트렌드 조회 기간.
pub const DEFAULT_TREND_TIMEFRAME: &str = "now 7-d";

/// 파이프라인 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    /// 세션/DB 연결 중
    Initializing,
    /// 종목 테이블 준비 중
    TableEnsuring,
    /// 사이클 반복 중
    Cycling,
    Terminated,
}

/// 파이프라인 실행 설정.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub instrument: Instrument,
    /// 트렌드 검색어에 쓰는 상품명 (예: "bitcoin")
    pub commodity: String,
    pub interval: Timeframe,
    pub trend_timeframe: String,
    pub initial_limit: usize,
    pub steady_limit: usize,
    pub lookback: chrono::Duration,
    pub fetch_timeout: Duration,
    pub cycle_interval: Duration,
    pub renderer: TimestampRenderer,
}

impl PipelineSettings {
    pub fn new(instrument: Instrument, commodity: impl Into<String>) -> Self {
        Self {
            instrument,
            commodity: commodity.into(),
            interval: Timeframe::H1,
            trend_timeframe: DEFAULT_TREND_TIMEFRAME.to_string(),
            initial_limit: DEFAULT_INITIAL_LIMIT,
            steady_limit: DEFAULT_STEADY_LIMIT,
            lookback: chrono::Duration::days(7),
            fetch_timeout: Duration::from_secs(60),
            cycle_interval: Duration::from_secs(3600),
            renderer: TimestampRenderer::default(),
        }
    }

    /// 환경 설정에서 주기/타임아웃/타임존을 가져옵니다.
    pub fn with_config(mut self, config: &CollectorConfig) -> Self {
        self.lookback = config.schedule.lookback();
        self.fetch_timeout = config.schedule.fetch_timeout();
        self.cycle_interval = config.schedule.interval();
        self.renderer = config.trends.renderer();
        self
    }

    pub fn with_interval(mut self, interval: Timeframe) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_trend_timeframe(mut self, timeframe: impl Into<String>) -> Self {
        self.trend_timeframe = timeframe.into();
        self
    }

    pub fn with_limits(mut self, initial_limit: usize, steady_limit: usize) -> Self {
        self.initial_limit = initial_limit;
        self.steady_limit = steady_limit;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    pub fn with_renderer(mut self, renderer: TimestampRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// 시작 파라미터 검증.
    pub fn validate(&self) -> Result<()> {
        if self.commodity.trim().is_empty() {
            return Err(CollectorError::Config("commodity가 비어 있습니다".to_string()));
        }
        if self.trend_timeframe.trim().is_empty() {
            return Err(CollectorError::Config("트렌드 조회 기간이 비어 있습니다".to_string()));
        }
        if self.initial_limit == 0 || self.steady_limit == 0 {
            return Err(CollectorError::Config(
                "캔들 조회 개수는 1 이상이어야 합니다".to_string(),
            ));
        }
        // 이후 사이클의 조회 구간이 사이클 간격보다 짧으면 사이 캔들이 영영 조회되지 않음
        let steady_window = self.steady_window();
        if steady_window < self.cycle_interval {
            return Err(CollectorError::Config(format!(
                "steady_limit({}) x {} = {}분이 수집 주기 {}분보다 짧습니다",
                self.steady_limit,
                self.interval,
                steady_window.as_secs() / 60,
                self.cycle_interval.as_secs() / 60
            )));
        }
        Ok(())
    }

    /// `steady_limit`개 캔들이 덮는 시간.
    pub fn steady_window(&self) -> Duration {
        let secs = self.interval.duration().num_seconds().max(0) as u64;
        Duration::from_secs(secs.saturating_mul(self.steady_limit as u64))
    }
}

/// 거래소 캔들과 트렌드 관심도를 조인해 저장하는 파이프라인.
pub struct CollectionPipeline<M, T, S> {
    market: M,
    trends: T,
    store: S,
    settings: PipelineSettings,
    keyword: String,
    state: PipelineState,
    cycle: u64,
    /// `initial_limit` 조회 사이클이 한 번이라도 성공했는지
    backfilled: bool,
}

/// 실제 Binance/Google Trends/PostgreSQL을 사용하는 파이프라인.
pub type LivePipeline = CollectionPipeline<BinanceClient, GoogleTrendsClient, PgCandleStore>;

/// 자격증명과 설정으로 파이프라인을 조립합니다. 네트워크 연결은 하지 않습니다.
pub fn build_pipeline(
    config: &CollectorConfig,
    credentials: &Credentials,
    settings: PipelineSettings,
) -> Result<LivePipeline> {
    settings.validate()?;

    let binance_config = BinanceConfig::new(
        credentials.exchange_api_key.clone(),
        SecretString::new(credentials.exchange_secret().into()),
    )
    .with_testnet(config.binance_testnet);
    let market = BinanceClient::new(binance_config)
        .map_err(|e| CollectorError::source_unavailable("binance", e))?;

    let trends_config = GoogleTrendsConfig::default()
        .with_language(config.trends.language.clone())
        .with_renderer(settings.renderer);
    let trends = GoogleTrendsClient::new(trends_config)
        .map_err(|e| CollectorError::source_unavailable("google-trends", e))?;

    let store = PgCandleStore::new(&config.database, credentials);

    Ok(CollectionPipeline::new(market, trends, store, settings))
}

impl<M, T, S> CollectionPipeline<M, T, S>
where
    M: MarketDataSource,
    T: TrendDataSource,
    S: CandleStore,
{
    pub fn new(market: M, trends: T, store: S, settings: PipelineSettings) -> Self {
        let keyword = trend_keyword(&settings.commodity);
        Self {
            market,
            trends,
            store,
            settings,
            keyword,
            state: PipelineState::Uninitialized,
            cycle: 0,
            backfilled: false,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// 완료(시도)된 사이클 수.
    pub fn cycle_count(&self) -> u64 {
        self.cycle
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 세션과 DB를 열고 종목 테이블을 준비합니다.
    ///
    /// 어느 단계든 실패하면 에러를 그대로 반환합니다.
    pub async fn start(&mut self) -> Result<()> {
        let instrument = self.settings.instrument.clone();
        info!(
            instrument = %instrument,
            keyword = %self.keyword,
            interval = %self.settings.interval,
            "파이프라인 시작"
        );

        self.state = PipelineState::Initializing;
        self.market
            .connect()
            .await
            .map_err(|e| CollectorError::source_unavailable(self.market.name(), e))?;
        self.trends
            .connect()
            .await
            .map_err(|e| CollectorError::source_unavailable(self.trends.name(), e))?;
        self.store.connect().await?;

        self.state = PipelineState::TableEnsuring;
        self.store.ensure_table(&instrument).await?;

        self.state = PipelineState::Cycling;
        info!(instrument = %instrument, "초기화 완료");
        Ok(())
    }

    /// 한 사이클을 실행합니다.
    pub async fn run_cycle(&mut self) -> Result<CycleStats> {
        let instrument = self.settings.instrument.clone();
        if self.state != PipelineState::Cycling || !self.store.is_table_ready(&instrument) {
            return Err(StorageError::TableNotReady(instrument.table_name()).into());
        }

        self.cycle += 1;
        let cycle = self.cycle;
        let limit = if self.backfilled {
            self.settings.steady_limit
        } else {
            self.settings.initial_limit
        };
        if !self.backfilled && cycle > 1 {
            warn!(cycle, limit, "이전 사이클 실패, 초기 조회를 다시 시도");
        }
        let span = cycle_span!(instrument, cycle);

        let stats = self.collect_once(cycle, limit).instrument(span).await?;
        self.backfilled = true;
        Ok(stats)
    }

    async fn collect_once(&self, cycle: u64, limit: usize) -> Result<CycleStats> {
        let start = Instant::now();
        let instrument = &self.settings.instrument;
        let mut stats = CycleStats::new(cycle);

        let series: TrendSeries = with_timeout(
            self.trends.name(),
            self.settings.fetch_timeout,
            self.trends
                .fetch_interest(&self.keyword, &self.settings.trend_timeframe),
        )
        .await?;
        stats.trend_points = series.len();

        let candles: Vec<Candle> = with_timeout(
            self.market.name(),
            self.settings.fetch_timeout,
            self.market.fetch_candles(
                instrument,
                self.settings.interval,
                self.settings.lookback,
                limit,
            ),
        )
        .await?;
        stats.candles_fetched = candles.len();

        let alignment = align_candles(candles, &series, &self.settings.renderer);
        stats.trend_misses = alignment.miss_count();
        stats.local_collisions = alignment.local_collisions.len();
        if stats.trend_misses > 0 {
            info!(misses = stats.trend_misses, "트렌드 샘플이 없는 캔들 건너뜀");
        }

        for row in &alignment.rows {
            if self.store.insert_row(instrument, row).await? {
                stats.rows_written += 1;
            } else {
                stats.duplicates_ignored += 1;
            }
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    /// 취소될 때까지 사이클을 반복합니다.
    ///
    /// 첫 사이클은 즉시 실행하고, 이후 사이클 사이에는 설정된 주기만큼 대기합니다.
    /// 소스/저장소 에러는 해당 사이클만 중단시키고 다음 사이클로 넘어갑니다.
    pub async fn run(&mut self, token: CancellationToken) -> Result<()> {
        let instrument = self.settings.instrument.to_string();
        if self.state != PipelineState::Cycling {
            return Err(StorageError::TableNotReady(self.settings.instrument.table_name()).into());
        }

        loop {
            if token.is_cancelled() {
                break;
            }

            match self.run_cycle().await {
                Ok(stats) => stats.log_summary(&instrument),
                Err(e @ CollectorError::SourceUnavailable { .. }) => {
                    error!(instrument = %instrument, cycle = self.cycle, error = %e, "사이클 실패");
                    if e.needs_reconnect() {
                        self.reconnect(&e).await;
                    }
                }
                Err(e @ CollectorError::Storage(_)) => {
                    error!(instrument = %instrument, cycle = self.cycle, error = %e, "저장 실패, 사이클 중단");
                }
                Err(e) => return Err(e),
            }

            tokio::select! {
                _ = token.cancelled() => {
                    info!(instrument = %instrument, "종료 신호 수신");
                    break;
                }
                _ = tokio::time::sleep(self.settings.cycle_interval) => {}
            }
        }

        Ok(())
    }

    /// 인증 실패한 소스의 세션을 다시 만듭니다.
    ///
    /// 재연결에 실패해도 다음 사이클에서 `NotConnected`로 다시 시도됩니다.
    async fn reconnect(&mut self, failure: &CollectorError) {
        let CollectorError::SourceUnavailable { source_name, .. } = failure else {
            return;
        };

        let result = if source_name == self.market.name() {
            self.market.connect().await
        } else if source_name == self.trends.name() {
            self.trends.connect().await
        } else {
            return;
        };

        match result {
            Ok(()) => info!(source = %source_name, "세션 재생성 완료"),
            Err(e) => warn!(source = %source_name, error = %e, "세션 재생성 실패"),
        }
    }

    /// DB 연결과 세션을 정리합니다.
    pub async fn shutdown(&mut self) {
        self.store.close().await;
        if let Err(e) = self.market.disconnect().await {
            warn!(source = self.market.name(), error = %e, "세션 종료 실패");
        }
        if let Err(e) = self.trends.disconnect().await {
            warn!(source = self.trends.name(), error = %e, "세션 종료 실패");
        }
        self.state = PipelineState::Terminated;
        info!(
            instrument = %self.settings.instrument,
            cycles = self.cycle,
            "파이프라인 종료"
        );
    }
}

/// 소스 호출에 타임아웃을 적용하고 에러를 `SourceUnavailable`로 변환합니다.
async fn with_timeout<V>(
    source_name: &str,
    timeout: Duration,
    fetch: impl Future<Output = SourceResult<V>>,
) -> Result<V> {
    match tokio::time::timeout(timeout, fetch).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CollectorError::source_unavailable(source_name, e)),
        Err(_) => Err(CollectorError::source_unavailable(
            source_name,
            SourceError::Timeout(format!("{}초 안에 응답이 없습니다", timeout.as_secs())),
        )),
    }
}
