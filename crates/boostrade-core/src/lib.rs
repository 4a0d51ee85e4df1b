//! # Boostrade Core
//!
//! 캔들/트렌드 수집기의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 수집 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 종목(`Instrument`) 및 타임프레임 정의
//! - 캔들, 트렌드 시계열, 조인된 행
//! - 타임스탬프 키 변환 및 정렬(조인) 로직
//! - 자격증명 파일 로드
//! - 로깅 인프라

pub mod credentials;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use credentials::Credentials;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
