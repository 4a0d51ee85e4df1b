//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use boostrade_core::{Credentials, TimestampRenderer};
use chrono_tz::Tz;
use std::path::Path;
use std::time::Duration;

/// 수집 주기 허용 범위 (분). 최대 1주.
pub const INTERVAL_MINUTES_RANGE: std::ops::RangeInclusive<u64> = 1..=10_080;

/// 한 사이클만 실행할 때 `COLLECT_INTERVAL_MINUTES`가 없으면 쓰는 값 (분).
pub const SINGLE_CYCLE_INTERVAL_MINUTES: u64 = 60;

/// 설정을 읽는 실행 모드.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// 종료 신호까지 반복. 수집 주기가 필수입니다.
    Daemon,
    /// 한 사이클만 실행. 수집 주기는 선택입니다.
    SingleCycle,
}

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 접속 설정 (사용자/DB명/비밀번호는 자격증명 파일에서)
    pub database: DatabaseConfig,
    /// 수집 주기 설정
    pub schedule: ScheduleConfig,
    /// Google Trends 설정
    pub trends: TrendsConfig,
    /// Binance 테스트넷 사용 여부
    pub binance_testnet: bool,
}

/// 데이터베이스 접속 설정
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
}

/// 수집 주기 설정
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// 사이클 간 대기 (분 단위)
    pub interval_minutes: u64,
    /// 소스 호출 하나당 타임아웃 (초)
    pub fetch_timeout_secs: u64,
    /// 캔들 조회 기간 (일)
    pub lookback_days: i64,
}

/// Google Trends 설정
#[derive(Debug, Clone)]
pub struct TrendsConfig {
    /// 캔들/트렌드 시각을 키로 렌더링할 타임존
    pub timezone: Tz,
    /// 요청 언어 (`hl`)
    pub language: String,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env(mode: RunMode) -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup_for(|key| std::env::var(key).ok(), mode)
    }

    /// 키 조회 함수로 데몬 모드 설정 로드.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Self::from_lookup_for(lookup, RunMode::Daemon)
    }

    /// 키 조회 함수로 설정 로드.
    pub fn from_lookup_for(lookup: impl Fn(&str) -> Option<String>, mode: RunMode) -> Result<Self> {
        let interval_minutes = match (mode, lookup("COLLECT_INTERVAL_MINUTES")) {
            (RunMode::SingleCycle, None) => SINGLE_CYCLE_INTERVAL_MINUTES,
            _ => required_interval(&lookup)?,
        };

        let timezone = match lookup("TREND_TIMEZONE") {
            Some(name) => name.trim().parse::<Tz>().map_err(|_| {
                CollectorError::Config(format!("TREND_TIMEZONE이 올바른 IANA 타임존이 아닙니다: {}", name))
            })?,
            None => Tz::UTC,
        };

        let lookback_days = env_var_parse(&lookup, "LOOKBACK_DAYS", 7i64);
        if lookback_days < 1 {
            return Err(CollectorError::Config(format!(
                "LOOKBACK_DAYS는 1 이상이어야 합니다: {}",
                lookback_days
            )));
        }

        Ok(Self {
            database: DatabaseConfig {
                host: lookup("DATABASE_HOST").unwrap_or_else(|| "localhost".to_string()),
                port: env_var_parse(&lookup, "DATABASE_PORT", 5432),
                connect_timeout_secs: env_var_parse(&lookup, "DATABASE_CONNECT_TIMEOUT_SECS", 30),
            },
            schedule: ScheduleConfig {
                interval_minutes,
                fetch_timeout_secs: env_var_parse(&lookup, "FETCH_TIMEOUT_SECS", 60),
                lookback_days,
            },
            trends: TrendsConfig {
                timezone,
                language: lookup("TREND_LANGUAGE").unwrap_or_else(|| "en-US".to_string()),
            },
            binance_testnet: env_var_bool(&lookup, "BINANCE_TESTNET", false),
        })
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl ScheduleConfig {
    /// 사이클 간 대기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(self.lookback_days)
    }
}

impl TrendsConfig {
    pub fn renderer(&self) -> TimestampRenderer {
        TimestampRenderer::new(self.timezone)
    }
}

/// 자격증명 파일을 읽습니다. 어떤 연결도 시도하기 전에 호출합니다.
pub fn load_credentials(path: impl AsRef<Path>) -> Result<Credentials> {
    Ok(Credentials::from_file(path)?)
}

/// `COLLECT_INTERVAL_MINUTES` 필수값 검증.
fn required_interval(lookup: &impl Fn(&str) -> Option<String>) -> Result<u64> {
    let raw = lookup("COLLECT_INTERVAL_MINUTES").ok_or_else(|| {
        CollectorError::Config("COLLECT_INTERVAL_MINUTES 환경변수가 설정되지 않았습니다".to_string())
    })?;

    let minutes: u64 = raw.trim().parse().map_err(|_| {
        CollectorError::Config(format!("COLLECT_INTERVAL_MINUTES 값이 숫자가 아닙니다: {}", raw))
    })?;

    if !INTERVAL_MINUTES_RANGE.contains(&minutes) {
        return Err(CollectorError::Config(format!(
            "COLLECT_INTERVAL_MINUTES는 {}~{} 범위여야 합니다: {}",
            INTERVAL_MINUTES_RANGE.start(),
            INTERVAL_MINUTES_RANGE.end(),
            minutes
        )));
    }

    Ok(minutes)
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = key, value = %raw, "잘못된 설정값, 기본값 사용");
            default
        }),
        None => default,
    }
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    lookup(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}
