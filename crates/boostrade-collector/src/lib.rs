//! Boostrade 데이터 수집기.
//!
//! 이 crate는 거래소 캔들과 검색 관심도를 시각 기준으로 조인해 저장하는 바이너리를 제공합니다:
//! - 환경변수/자격증명 기반 설정
//! - 수집 파이프라인 (조회 → 조인 → 행 단위 커밋 → 대기)
//! - 종목별 PostgreSQL 테이블 저장소

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result, StorageError};
pub use stats::CycleStats;
