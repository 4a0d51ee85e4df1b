//! 캔들과 트렌드 시계열의 타임스탬프 조인.
//!
//! 조인 정책: 캔들 시작 시각의 키가 트렌드 시계열에 없으면 그 캔들은
//! 저장하지 않습니다 (트렌드 값이 비어 있는 행을 쓰지 않음).

use super::{Candle, TimestampRenderer, TrendSeries};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;

/// 트렌드 값이 없을 때 저장되는 값.
pub const TREND_MISSING: i64 = -1;

/// 저장 단위: 캔들 + 트렌드 관심도.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRow {
    /// 로컬 시각으로 변환된 캔들 시작 시각 (`date` 컬럼)
    pub date: NaiveDateTime,
    pub candle: Candle,
    pub trend: Option<u32>,
}

impl JoinedRow {
    pub fn new(date: NaiveDateTime, candle: Candle, trend: Option<u32>) -> Self {
        Self {
            date,
            candle,
            trend,
        }
    }

    /// `trend` 컬럼에 저장할 값.
    pub fn trend_value(&self) -> Decimal {
        match self.trend {
            Some(value) => Decimal::from(value),
            None => Decimal::from(TREND_MISSING),
        }
    }
}

/// 조인 결과.
#[derive(Debug, Clone, Default)]
pub struct Alignment {
    /// 저장할 행 (입력 캔들 순서 유지)
    pub rows: Vec<JoinedRow>,
    /// 트렌드 샘플이 없어 건너뛴 캔들의 시작 시각
    pub misses: Vec<DateTime<Utc>>,
    /// 앞선 행과 같은 로컬 시각으로 렌더링된 캔들 시작 시각 (서머타임 종료 구간)
    pub local_collisions: Vec<DateTime<Utc>>,
}

impl Alignment {
    pub fn miss_count(&self) -> usize {
        self.misses.len()
    }
}

/// 캔들을 트렌드 시계열과 조인합니다.
///
/// 캔들 순서는 그대로 유지되며, 트렌드 미스인 캔들은 결과 행에서 빠집니다.
pub fn align_candles(
    candles: impl IntoIterator<Item = Candle>,
    series: &TrendSeries,
    renderer: &TimestampRenderer,
) -> Alignment {
    let mut alignment = Alignment::default();
    let mut dates = HashSet::new();

    for candle in candles {
        let key = renderer.key(candle.open_time);
        match series.get(&key) {
            Some(score) => {
                let date = renderer.local(candle.open_time);
                if !dates.insert(date) {
                    tracing::warn!(
                        date = %date,
                        open_time = %candle.open_time,
                        timezone = %renderer.timezone(),
                        "로컬 시각이 겹치는 캔들, 저장 시 무시됨"
                    );
                    alignment.local_collisions.push(candle.open_time);
                }
                alignment.rows.push(JoinedRow::new(date, candle, Some(score)));
            }
            None => {
                tracing::trace!(key = %key, "트렌드 샘플 없음, 캔들 건너뜀");
                alignment.misses.push(candle.open_time);
            }
        }
    }

    alignment
}
