//! 데이터 소스 에러 타입.

use thiserror::Error;

/// 거래소/트렌드 소스 관련 에러.
#[derive(Debug, Error)]
pub enum SourceError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 인증/권한 에러 (세션 재생성 필요)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 요청 한도 초과
    #[error("Rate limit exceeded")]
    RateLimited,

    /// API 에러 코드
    #[error("API error {code}: {message}")]
    ApiError { code: i32, message: String },

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 세션이 열려 있지 않음
    #[error("Not connected: {0}")]
    NotConnected(String),
}

impl SourceError {
    /// 인증 에러인지 확인.
    ///
    /// 인증 에러가 나면 호출자는 같은 세션으로 반복하지 말고 세션을 다시 만들어야 합니다.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, SourceError::Unauthorized(_) | SourceError::NotConnected(_))
    }

    /// 일시적인 에러인지 확인 (다음 사이클에서 다시 시도할 만한지).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::NetworkError(_) | SourceError::Timeout(_) | SourceError::RateLimited
        )
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SourceError::Timeout(err.to_string())
        } else if err.is_decode() {
            SourceError::ParseError(err.to_string())
        } else {
            SourceError::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::ParseError(err.to_string())
    }
}

impl From<boostrade_core::CoreError> for SourceError {
    fn from(err: boostrade_core::CoreError) -> Self {
        SourceError::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(SourceError::Unauthorized("bad key".into()).is_auth_error());
        assert!(!SourceError::Unauthorized("bad key".into()).is_transient());
        assert!(SourceError::Timeout("30s".into()).is_transient());
        assert!(SourceError::RateLimited.is_transient());
        assert!(!SourceError::ParseError("eof".into()).is_transient());
    }
}
