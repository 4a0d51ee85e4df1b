//! Google Trends 관심도 커넥터.
//!
//! 공개 웹 API를 두 단계로 호출합니다:
//! 1. `explore`: 검색어/기간으로 위젯 목록을 받고 `TIMESERIES` 위젯의 토큰을 꺼냄
//! 2. `widgetdata/multiline`: 토큰으로 시간별 관심도(0~100)를 조회
//!
//! 응답 본문 앞에는 JSON 하이재킹 방지 접두사(`)]}'`)가 붙어 있어 제거 후 파싱합니다.
//! 세션 쿠키가 없으면 요청이 거부되므로 `connect`에서 메인 페이지를 먼저 방문합니다.

use crate::traits::{SourceResult, TrendDataSource};
use crate::SourceError;
use async_trait::async_trait;
use boostrade_core::{TimestampRenderer, TrendPoint, TrendSeries};
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

/// 시계열 위젯 ID.
const TIMESERIES_WIDGET_ID: &str = "TIMESERIES";

/// Google Trends 클라이언트 설정.
#[derive(Debug, Clone)]
pub struct GoogleTrendsConfig {
    /// 기본 URL
    pub base_url: String,
    /// 언어 (`hl` 파라미터)
    pub language: String,
    /// 지역 (빈 문자열이면 전 세계)
    pub geo: String,
    /// 카테고리 (0 = 전체)
    pub category: u32,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 트렌드 시각을 키로 렌더링할 타임존
    pub renderer: TimestampRenderer,
}

impl Default for GoogleTrendsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://trends.google.com".to_string(),
            language: "en-US".to_string(),
            geo: String::new(),
            category: 0,
            timeout_secs: 30,
            renderer: TimestampRenderer::default(),
        }
    }
}

impl GoogleTrendsConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_renderer(mut self, renderer: TimestampRenderer) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
struct ExploreResponse {
    #[serde(default)]
    widgets: Vec<ExploreWidget>,
}

#[derive(Debug, Deserialize)]
struct ExploreWidget {
    id: String,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    request: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct MultilineResponse {
    default: MultilineData,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MultilineData {
    #[serde(default)]
    timeline_data: Vec<TimelinePoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelinePoint {
    /// epoch 초 (문자열)
    time: String,
    #[serde(default)]
    value: Vec<u32>,
    #[serde(default)]
    is_partial: bool,
}

impl TimelinePoint {
    fn into_trend_point(self) -> SourceResult<Option<TrendPoint>> {
        let secs: i64 = self
            .time
            .parse()
            .map_err(|_| SourceError::ParseError(format!("잘못된 트렌드 시각: {}", self.time)))?;
        let time = DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| SourceError::ParseError(format!("범위를 벗어난 트렌드 시각: {}", secs)))?;

        Ok(self.value.first().map(|&value| TrendPoint {
            time,
            value,
            is_partial: self.is_partial,
        }))
    }
}

/// 응답 본문에서 JSON 하이재킹 방지 접두사를 제거합니다.
fn strip_json_prefix(body: &str) -> SourceResult<&str> {
    body.find('{')
        .map(|start| &body[start..])
        .ok_or_else(|| SourceError::ParseError("JSON 본문을 찾을 수 없습니다".to_string()))
}

// ============================================================================
// Google Trends 클라이언트
// ============================================================================

/// Google Trends 클라이언트.
pub struct GoogleTrendsClient {
    config: GoogleTrendsConfig,
    client: Client,
    connected: bool,
}

impl GoogleTrendsClient {
    /// 새 클라이언트 생성. 네트워크 요청은 하지 않습니다.
    pub fn new(config: GoogleTrendsConfig) -> Result<Self, SourceError> {
        let client = Self::build_http_client(&config)?;
        Ok(Self {
            config,
            client,
            connected: false,
        })
    }

    fn build_http_client(config: &GoogleTrendsConfig) -> Result<Client, SourceError> {
        Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .build()
            .map_err(|e| SourceError::NetworkError(format!("HTTP 클라이언트 생성 실패: {}", e)))
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn tz_param(&self) -> String {
        self.config.renderer.trends_tz_offset(Utc::now()).to_string()
    }

    /// 상태 코드를 확인하고 본문을 반환합니다.
    async fn read_body(response: Response) -> SourceResult<String> {
        let status = response.status();
        let body = response.text().await?;

        match status.as_u16() {
            200..=299 => Ok(body),
            429 => Err(SourceError::RateLimited),
            401 | 403 => Err(SourceError::Unauthorized(format!(
                "Google Trends 요청 거부 (HTTP {})",
                status.as_u16()
            ))),
            code => Err(SourceError::ApiError {
                code: code as i32,
                message: body.chars().take(200).collect(),
            }),
        }
    }

    /// 1단계: 시계열 위젯의 요청 본문과 토큰 조회.
    async fn explore(&self, keyword: &str, timeframe: &str) -> SourceResult<(String, String)> {
        let req = json!({
            "comparisonItem": [{
                "keyword": keyword,
                "time": timeframe,
                "geo": self.config.geo,
            }],
            "category": self.config.category,
            "property": "",
        });

        let url = format!("{}/trends/api/explore", self.config.base_url);
        debug!(keyword = keyword, timeframe = timeframe, "POST {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[
                ("hl", self.config.language.clone()),
                ("tz", self.tz_param()),
                ("req", req.to_string()),
            ])
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let explore: ExploreResponse = serde_json::from_str(strip_json_prefix(&body)?)?;

        let widget = explore
            .widgets
            .into_iter()
            .find(|w| w.id == TIMESERIES_WIDGET_ID)
            .ok_or_else(|| SourceError::ParseError("TIMESERIES 위젯이 없습니다".to_string()))?;
        let token = widget
            .token
            .ok_or_else(|| SourceError::ParseError("TIMESERIES 위젯 토큰이 없습니다".to_string()))?;

        Ok((widget.request.to_string(), token))
    }

    /// 2단계: 위젯 토큰으로 시계열 조회.
    async fn multiline(&self, request: &str, token: &str) -> SourceResult<Vec<TrendPoint>> {
        let url = format!("{}/trends/api/widgetdata/multiline", self.config.base_url);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("hl", self.config.language.as_str()),
                ("tz", self.tz_param().as_str()),
                ("req", request),
                ("token", token),
            ])
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let data: MultilineResponse = serde_json::from_str(strip_json_prefix(&body)?)?;

        let mut points = Vec::with_capacity(data.default.timeline_data.len());
        for raw in data.default.timeline_data {
            if let Some(point) = raw.into_trend_point()? {
                points.push(point);
            }
        }
        Ok(points)
    }
}

#[async_trait]
impl TrendDataSource for GoogleTrendsClient {
    fn name(&self) -> &str {
        "google-trends"
    }

    async fn connect(&mut self) -> SourceResult<()> {
        info!("Connecting to Google Trends...");

        // 새 쿠키 저장소로 세션 재생성
        self.client = Self::build_http_client(&self.config)?;
        self.connected = false;

        let response = self
            .client
            .get(format!("{}/", self.config.base_url))
            .query(&[("geo", "US")])
            .send()
            .await?;
        Self::read_body(response).await?;

        self.connected = true;
        info!("Connected to Google Trends successfully");
        Ok(())
    }

    async fn disconnect(&mut self) -> SourceResult<()> {
        self.connected = false;
        info!("Disconnected from Google Trends");
        Ok(())
    }

    async fn fetch_interest(&self, keyword: &str, timeframe: &str) -> SourceResult<TrendSeries> {
        if !self.connected {
            return Err(SourceError::NotConnected(
                "Google Trends 세션이 열려 있지 않습니다".into(),
            ));
        }

        let (request, token) = self.explore(keyword, timeframe).await?;
        let points = self.multiline(&request, &token).await?;

        if points.is_empty() {
            warn!(keyword = keyword, timeframe = timeframe, "트렌드 데이터 없음");
        }

        let series =
            TrendSeries::from_points(keyword, timeframe, points, &self.config.renderer);
        debug!(keyword = keyword, points = series.len(), "트렌드 조회 완료");
        Ok(series)
    }
}
