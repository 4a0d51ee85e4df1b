//! 캔들 간격(타임프레임) 정의.
//!
//! Binance kline 간격 문자열과 1:1로 대응합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 캔들스틱 타임프레임.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1분봉
    M1,
    /// 3분봉
    M3,
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 30분봉
    M30,
    /// 1시간봉 (기본값, 주간 트렌드 데이터와 맞추기 가장 좋음)
    #[default]
    H1,
    /// 2시간봉
    H2,
    /// 4시간봉
    H4,
    /// 6시간봉
    H6,
    /// 8시간봉
    H8,
    /// 12시간봉
    H12,
    /// 일봉
    D1,
    /// 3일봉
    D3,
    /// 주봉
    W1,
    /// 월봉
    MN1,
}

/// (타임프레임, Binance 간격 문자열, 초 단위 길이)
static TIMEFRAMES: [(Timeframe, &str, i64); 15] = [
    (Timeframe::M1, "1m", 60),
    (Timeframe::M3, "3m", 3 * 60),
    (Timeframe::M5, "5m", 5 * 60),
    (Timeframe::M15, "15m", 15 * 60),
    (Timeframe::M30, "30m", 30 * 60),
    (Timeframe::H1, "1h", 60 * 60),
    (Timeframe::H2, "2h", 2 * 60 * 60),
    (Timeframe::H4, "4h", 4 * 60 * 60),
    (Timeframe::H6, "6h", 6 * 60 * 60),
    (Timeframe::H8, "8h", 8 * 60 * 60),
    (Timeframe::H12, "12h", 12 * 60 * 60),
    (Timeframe::D1, "1d", 24 * 60 * 60),
    (Timeframe::D3, "3d", 3 * 24 * 60 * 60),
    (Timeframe::W1, "1w", 7 * 24 * 60 * 60),
    (Timeframe::MN1, "1M", 30 * 24 * 60 * 60), // 근사값
];

impl Timeframe {
    fn entry(&self) -> &'static (Timeframe, &'static str, i64) {
        TIMEFRAMES
            .iter()
            .find(|(tf, _, _)| tf == self)
            .unwrap_or(&TIMEFRAMES[5])
    }

    /// 바이낸스 간격 문자열로 변환합니다.
    pub fn to_binance_interval(&self) -> &'static str {
        self.entry().1
    }

    /// 바이낸스 간격 문자열에서 파싱합니다.
    pub fn from_binance_interval(s: &str) -> Option<Self> {
        TIMEFRAMES
            .iter()
            .find(|(_, interval, _)| *interval == s)
            .map(|(tf, _, _)| *tf)
    }

    /// 캔들 하나의 길이.
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.entry().2)
    }

    /// 캔들 하나의 길이 (밀리초).
    pub fn as_millis(&self) -> i64 {
        self.entry().2 * 1000
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_binance_interval())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_binance_interval(s.trim()).ok_or_else(|| format!("Invalid timeframe: {}", s))
    }
}
