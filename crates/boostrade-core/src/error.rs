//! 수집기 핵심 에러 타입.

use thiserror::Error;

/// 도메인 및 설정 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 설정 에러 (자격증명 파일 누락, 형식 오류, 필드 누락)
    #[error("설정 에러: {0}")]
    Config(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 파싱 에러
    #[error("파싱 에러: {0}")]
    Parse(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// 설정 에러인지 확인합니다.
    pub fn is_config(&self) -> bool {
        matches!(self, CoreError::Config(_))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_is_config() {
        let err: CoreError = serde_json::from_str::<serde_json::Value>("{not json")
            .unwrap_err()
            .into();
        assert!(err.is_config());

        let input_err = CoreError::InvalidInput("BTC-USDT".to_string());
        assert!(!input_err.is_config());
    }
}
