//! OHLCV 캔들 데이터.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// OHLCV 캔들스틱 한 개.
///
/// 거래소가 돌려준 값 그대로이며 생성 후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// 캔들 시작 시간
    pub open_time: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량 (기준 자산 단위)
    pub volume: Decimal,
}

impl Candle {
    /// 새 캔들을 생성합니다.
    pub fn new(
        open_time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// 거래소 원본 형식(epoch 밀리초 + 십진 문자열)에서 생성합니다.
    pub fn from_raw(
        open_time_ms: i64,
        open: &str,
        high: &str,
        low: &str,
        close: &str,
        volume: &str,
    ) -> Result<Self, CoreError> {
        let open_time = DateTime::from_timestamp_millis(open_time_ms).ok_or_else(|| {
            CoreError::Parse(format!("잘못된 캔들 시작 시간: {}", open_time_ms))
        })?;

        Ok(Self {
            open_time,
            open: parse_decimal("open", open)?,
            high: parse_decimal("high", high)?,
            low: parse_decimal("low", low)?,
            close: parse_decimal("close", close)?,
            volume: parse_decimal("volume", volume)?,
        })
    }

    /// 캔들 시작 시간 (epoch 밀리초).
    pub fn open_time_ms(&self) -> i64 {
        self.open_time.timestamp_millis()
    }
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, CoreError> {
    Decimal::from_str(value)
        .map_err(|e| CoreError::Parse(format!("{} 필드 파싱 실패 ({}): {}", field, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_candle_from_raw() {
        let candle = Candle::from_raw(
            1_700_000_000_000,
            "37000.01000000",
            "37100.00000000",
            "36950.50000000",
            "37050.00000000",
            "812.34500000",
        )
        .unwrap();

        assert_eq!(candle.open_time_ms(), 1_700_000_000_000);
        assert_eq!(candle.open, dec!(37000.01));
        assert_eq!(candle.volume, dec!(812.345));
    }

    #[test]
    fn test_candle_from_raw_rejects_garbage() {
        let err = Candle::from_raw(0, "abc", "1", "1", "1", "1").unwrap_err();
        assert!(matches!(err, CoreError::Parse(_)));
    }
}
