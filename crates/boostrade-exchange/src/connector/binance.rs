//! Binance 거래소 커넥터.
//!
//! Binance Spot REST API로 과거 kline을 조회합니다.
//! 세션을 열 때 서버 시간 조회로 연결을 확인하고, 서명된 요청으로 API 키를 검증합니다.

use crate::traits::{MarketDataSource, SourceResult};
use crate::SourceError;
use async_trait::async_trait;
use boostrade_core::{Candle, Instrument, Timeframe};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::de::IgnoredAny;
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;
use tracing::{debug, error, info};

type HmacSha256 = Hmac<Sha256>;

/// 요청당 최대 kline 수 (Binance 제한).
pub const MAX_KLINES_PER_REQUEST: usize = 1000;

// ============================================================================
// 설정
// ============================================================================

/// Binance 클라이언트 설정.
///
/// # 보안
/// - `Debug` 구현은 민감 정보(`api_key`, `api_secret`)를 마스킹합니다.
pub struct BinanceConfig {
    /// API 키
    pub api_key: String,
    /// API 시크릿
    pub api_secret: SecretString,
    /// 테스트넷 사용
    pub testnet: bool,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
    /// 수신 윈도우 (밀리초)
    pub recv_window: u64,
    /// REST 기본 URL 재정의 (테스트용)
    pub base_url: Option<String>,
}

impl fmt::Debug for BinanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked_key = if self.api_key.len() > 8 {
            format!(
                "{}...{}",
                &self.api_key[..4],
                &self.api_key[self.api_key.len() - 4..]
            )
        } else {
            "***REDACTED***".to_string()
        };

        f.debug_struct("BinanceConfig")
            .field("api_key", &masked_key)
            .field("api_secret", &"***REDACTED***")
            .field("testnet", &self.testnet)
            .field("timeout_secs", &self.timeout_secs)
            .field("recv_window", &self.recv_window)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl BinanceConfig {
    /// 새 설정 생성.
    pub fn new(api_key: impl Into<String>, api_secret: SecretString) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret,
            testnet: false,
            timeout_secs: 30,
            recv_window: 5000,
            base_url: None,
        }
    }

    /// 테스트넷 사용.
    pub fn with_testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    /// 요청 타임아웃 설정.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// REST 기본 URL 재정의.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// REST API 기본 URL 반환.
    pub fn rest_base_url(&self) -> &str {
        if let Some(url) = &self.base_url {
            return url.trim_end_matches('/');
        }
        if self.testnet {
            "https://testnet.binance.vision"
        } else {
            "https://api.binance.com"
        }
    }
}

// ============================================================================
// API 응답 타입
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceServerTime {
    server_time: i64,
}

/// kline 배열 응답. 앞 6개 필드만 사용합니다.
#[derive(Debug, Deserialize)]
struct BinanceKline(
    i64,       // 0: Open time
    String,    // 1: Open
    String,    // 2: High
    String,    // 3: Low
    String,    // 4: Close
    String,    // 5: Volume
    IgnoredAny, // 6: Close time
    IgnoredAny, // 7: Quote asset volume
    IgnoredAny, // 8: Number of trades
    IgnoredAny, // 9: Taker buy base asset volume
    IgnoredAny, // 10: Taker buy quote asset volume
    IgnoredAny, // 11: Ignore
);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceError {
    code: i32,
    msg: String,
}

// ============================================================================
// Binance 클라이언트
// ============================================================================

/// Binance 거래소 클라이언트.
pub struct BinanceClient {
    config: BinanceConfig,
    client: Client,
    connected: bool,
}

impl BinanceClient {
    /// 새 Binance 클라이언트 생성.
    ///
    /// 네트워크 요청은 하지 않습니다. 세션은 `connect`에서 엽니다.
    ///
    /// # Errors
    /// HTTP 클라이언트 생성에 실패하면 `SourceError::NetworkError`를 반환합니다.
    pub fn new(config: BinanceConfig) -> Result<Self, SourceError> {
        let client = Self::build_http_client(&config)?;

        Ok(Self {
            config,
            client,
            connected: false,
        })
    }

    fn build_http_client(config: &BinanceConfig) -> Result<Client, SourceError> {
        Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::NetworkError(format!("HTTP 클라이언트 생성 실패: {}", e)))
    }

    /// 세션이 열려 있는지 확인.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// HMAC-SHA256으로 쿼리 문자열 서명.
    fn sign(&self, query: &str) -> SourceResult<String> {
        let mut mac = HmacSha256::new_from_slice(self.config.api_secret.expose_secret().as_bytes())
            .map_err(|e| SourceError::Unauthorized(format!("잘못된 API 시크릿: {}", e)))?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// 파라미터에서 쿼리 문자열 생성.
    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// 공개 API 요청 (서명 불필요, API 키 헤더만 전송).
    async fn public_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> SourceResult<T> {
        let url = format!("{}{}", self.config.rest_base_url(), endpoint);
        let query = Self::build_query(params);

        let full_url = if query.is_empty() {
            url
        } else {
            format!("{}?{}", url, query)
        };

        debug!("GET {}", full_url);

        let response = self
            .client
            .get(&full_url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// 서명된 API 요청 (인증 필요).
    async fn signed_get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> SourceResult<T> {
        let url = format!("{}{}", self.config.rest_base_url(), endpoint);

        let mut all_params = params.to_vec();
        all_params.push(("timestamp", Utc::now().timestamp_millis().to_string()));
        all_params.push(("recvWindow", self.config.recv_window.to_string()));

        let query = Self::build_query(&all_params);
        let signature = self.sign(&query)?;
        let full_url = format!("{}?{}&signature={}", url, query, signature);

        debug!("GET (signed) {}", endpoint);

        let response = self
            .client
            .get(&full_url)
            .header("X-MBX-APIKEY", &self.config.api_key)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// API 응답 처리.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> SourceResult<T> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&body).map_err(|e| {
                error!("Failed to parse response: {} - Body: {}", e, body);
                SourceError::ParseError(e.to_string())
            })
        } else if status.as_u16() == 429 || status.as_u16() == 418 {
            Err(SourceError::RateLimited)
        } else if let Ok(error) = serde_json::from_str::<BinanceError>(&body) {
            Err(Self::map_error_code(error.code, &error.msg))
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(SourceError::Unauthorized(body))
        } else {
            Err(SourceError::ApiError {
                code: status.as_u16() as i32,
                message: body,
            })
        }
    }

    /// Binance 에러 코드를 SourceError로 매핑.
    fn map_error_code(code: i32, msg: &str) -> SourceError {
        match code {
            -1001 => SourceError::NetworkError(msg.to_string()),
            -1003 => SourceError::RateLimited,
            -1022 | -2014 | -2015 => SourceError::Unauthorized(msg.to_string()),
            _ => SourceError::ApiError {
                code,
                message: msg.to_string(),
            },
        }
    }

    /// kline 한 페이지 조회.
    async fn get_klines_page(
        &self,
        symbol: &str,
        interval: Timeframe,
        start_ms: i64,
        end_ms: i64,
    ) -> SourceResult<Vec<Candle>> {
        let resp: Vec<BinanceKline> = self
            .public_get(
                "/api/v3/klines",
                &[
                    ("symbol", symbol.to_string()),
                    ("interval", interval.to_binance_interval().to_string()),
                    ("startTime", start_ms.to_string()),
                    ("endTime", end_ms.to_string()),
                    ("limit", MAX_KLINES_PER_REQUEST.to_string()),
                ],
            )
            .await?;

        resp.into_iter()
            .map(|k| Candle::from_raw(k.0, &k.1, &k.2, &k.3, &k.4, &k.5).map_err(SourceError::from))
            .collect()
    }
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    fn name(&self) -> &str {
        if self.config.testnet {
            "binance-testnet"
        } else {
            "binance"
        }
    }

    async fn connect(&mut self) -> SourceResult<()> {
        info!(
            "Connecting to Binance {}...",
            if self.config.testnet {
                "testnet"
            } else {
                "mainnet"
            }
        );

        // 세션 재생성 시 이전 커넥션 풀을 버림
        self.client = Self::build_http_client(&self.config)?;
        self.connected = false;

        // 서버 시간 조회로 연결 테스트
        let time: BinanceServerTime = self.public_get("/api/v3/time", &[]).await?;
        debug!(server_time = time.server_time, "Binance 서버 시간");

        // 서명된 요청으로 API 키 검증
        let _: serde_json::Value = self
            .signed_get("/sapi/v1/account/apiRestrictions", &[])
            .await?;

        self.connected = true;
        info!("Connected to Binance successfully");
        Ok(())
    }

    async fn disconnect(&mut self) -> SourceResult<()> {
        self.connected = false;
        info!("Disconnected from Binance");
        Ok(())
    }

    async fn fetch_candles(
        &self,
        instrument: &Instrument,
        interval: Timeframe,
        lookback: chrono::Duration,
        limit: usize,
    ) -> SourceResult<Vec<Candle>> {
        if !self.connected {
            return Err(SourceError::NotConnected("Binance 세션이 열려 있지 않습니다".into()));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let symbol = instrument.as_exchange_symbol();
        let end_ms = Utc::now().timestamp_millis();
        let mut start_ms = end_ms - lookback.num_milliseconds();
        let mut candles: Vec<Candle> = Vec::new();

        // 시작 시각부터 현재까지 페이지 단위로 조회
        loop {
            let page = self
                .get_klines_page(symbol, interval, start_ms, end_ms)
                .await?;
            let page_len = page.len();

            let Some(last_open_ms) = page.last().map(Candle::open_time_ms) else {
                break;
            };
            candles.extend(page);

            if page_len < MAX_KLINES_PER_REQUEST || last_open_ms >= end_ms {
                break;
            }
            start_ms = last_open_ms + interval.as_millis();
        }

        // 가장 최근 limit개만 유지
        if candles.len() > limit {
            candles.drain(..candles.len() - limit);
        }

        debug!(
            symbol = symbol,
            interval = %interval,
            count = candles.len(),
            "kline 조회 완료"
        );

        Ok(candles)
    }
}
