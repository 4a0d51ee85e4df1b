//! 검색 관심도(트렌드) 시계열.
//!
//! 트렌드 서비스는 캔들과 다른 시간 좌표계를 씁니다. 캔들은 epoch 밀리초,
//! 트렌드는 달력 시각 버킷입니다. 두 시계열은 같은 타임존에서 렌더링한
//! 타임스탬프 키(`%Y-%m-%d %H:%M:%S`)로만 맞춰집니다.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 타임스탬프 키 형식.
pub const TIMESTAMP_KEY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 트렌드 검색어 접두사.
const KEYWORD_PREFIX: &str = "buy ";

/// 상품명으로 트렌드 검색어를 만듭니다.
///
/// 티커가 아니라 사람이 읽는 이름을 씁니다 (`"bitcoin"` → `"buy bitcoin"`).
pub fn trend_keyword(commodity: &str) -> String {
    format!("{}{}", KEYWORD_PREFIX, commodity.trim())
}

/// UTC 시각을 지정 타임존의 로컬 시각과 키 문자열로 변환합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampRenderer {
    tz: Tz,
}

impl Default for TimestampRenderer {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl TimestampRenderer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// 로컬 시각 (DB `TIMESTAMP` 컬럼에 저장되는 값).
    pub fn local(&self, time: DateTime<Utc>) -> NaiveDateTime {
        time.with_timezone(&self.tz).naive_local()
    }

    /// 트렌드 시계열 조회 키.
    pub fn key(&self, time: DateTime<Utc>) -> String {
        self.local(time).format(TIMESTAMP_KEY_FORMAT).to_string()
    }

    /// Google Trends `tz` 파라미터 값 (분 단위 UTC 오프셋의 부호 반전).
    ///
    /// 예: UTC → 0, Asia/Seoul(+09:00) → -540
    pub fn trends_tz_offset(&self, at: DateTime<Utc>) -> i32 {
        use chrono::Offset;
        let offset = at.with_timezone(&self.tz).offset().fix().local_minus_utc();
        -(offset / 60)
    }
}

/// 트렌드 서비스가 돌려준 시점 하나.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// 버킷 시작 시각
    pub time: DateTime<Utc>,
    /// 관심도 (0~100)
    pub value: u32,
    /// 아직 집계 중인 버킷인지 여부
    pub is_partial: bool,
}

/// 하나의 검색어/기간에 대한 희소 관심도 시계열.
///
/// 키에 없는 시각 조회는 에러가 아니라 "샘플 없음"입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrendSeries {
    keyword: String,
    timeframe: String,
    points: BTreeMap<String, u32>,
}

impl TrendSeries {
    /// 빈 시계열을 생성합니다.
    pub fn new(keyword: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            timeframe: timeframe.into(),
            points: BTreeMap::new(),
        }
    }

    /// 트렌드 시점들을 키로 렌더링해서 시계열을 만듭니다.
    ///
    /// 같은 키가 두 번 나오면 뒤의 값이 이깁니다.
    pub fn from_points(
        keyword: impl Into<String>,
        timeframe: impl Into<String>,
        points: impl IntoIterator<Item = TrendPoint>,
        renderer: &TimestampRenderer,
    ) -> Self {
        let mut series = Self::new(keyword, timeframe);
        for point in points {
            series.insert(renderer.key(point.time), point.value);
        }
        series
    }

    pub fn insert(&mut self, key: impl Into<String>, value: u32) {
        self.points.insert(key.into(), value);
    }

    /// 정확히 일치하는 키의 관심도.
    pub fn get(&self, key: &str) -> Option<u32> {
        self.points.get(key).copied()
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn timeframe(&self) -> &str {
        &self.timeframe
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 키 순서(시간순)로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.points.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_trend_keyword() {
        assert_eq!(trend_keyword("bitcoin"), "buy bitcoin");
        assert_eq!(trend_keyword("  ethereum "), "buy ethereum");
    }

    #[test]
    fn test_renderer_key_in_timezone() {
        let time = Utc.with_ymd_and_hms(2020, 8, 29, 13, 0, 0).unwrap();

        let utc = TimestampRenderer::default();
        assert_eq!(utc.key(time), "2020-08-29 13:00:00");

        let istanbul = TimestampRenderer::new(chrono_tz::Europe::Istanbul);
        assert_eq!(istanbul.key(time), "2020-08-29 16:00:00");
        assert_eq!(istanbul.trends_tz_offset(time), -180);
    }

    #[test]
    fn test_series_lookup_miss_is_none() {
        let renderer = TimestampRenderer::default();
        let points = vec![TrendPoint {
            time: Utc.with_ymd_and_hms(2020, 8, 29, 8, 0, 0).unwrap(),
            value: 73,
            is_partial: false,
        }];
        let series = TrendSeries::from_points("buy bitcoin", "now 7-d", points, &renderer);

        assert_eq!(series.get("2020-08-29 08:00:00"), Some(73));
        assert_eq!(series.get("2020-08-29 09:00:00"), None);
        assert_eq!(series.len(), 1);
        assert_eq!(series.keyword(), "buy bitcoin");
    }
}
