//! 수집 사이클 통계.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 한 사이클의 수집 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CycleStats {
    /// 사이클 번호 (1부터)
    pub cycle: u64,
    /// 조회한 캔들 수
    pub candles_fetched: usize,
    /// 트렌드 시계열 샘플 수
    pub trend_points: usize,
    /// 새로 저장된 행 수
    pub rows_written: usize,
    /// 이미 있어서 무시된 행 수
    pub duplicates_ignored: usize,
    /// 트렌드 샘플이 없어 건너뛴 캔들 수
    pub trend_misses: usize,
    /// 앞선 행과 로컬 시각이 겹친 캔들 수 (서머타임 종료)
    pub local_collisions: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CycleStats {
    pub fn new(cycle: u64) -> Self {
        Self {
            cycle,
            ..Self::default()
        }
    }

    /// 트렌드 매칭률 계산 (%)
    pub fn match_rate(&self) -> f64 {
        if self.candles_fetched == 0 {
            0.0
        } else {
            ((self.candles_fetched - self.trend_misses) as f64 / self.candles_fetched as f64)
                * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, instrument: &str) {
        tracing::info!(
            instrument = instrument,
            cycle = self.cycle,
            candles = self.candles_fetched,
            trend_points = self.trend_points,
            rows = self.rows_written,
            duplicates = self.duplicates_ignored,
            trend_misses = self.trend_misses,
            local_collisions = self.local_collisions,
            match_rate = format!("{:.1}%", self.match_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "사이클 완료"
        );
    }
}
