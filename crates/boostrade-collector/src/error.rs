//! 에러 타입 정의.

use boostrade_core::CoreError;
use boostrade_exchange::SourceError;
use thiserror::Error;

/// PostgreSQL "relation already exists".
pub const PG_DUPLICATE_TABLE: &str = "42P07";

/// 저장소 에러.
#[derive(Debug, Error)]
pub enum StorageError {
    /// 데이터베이스 연결 에러
    #[error("Database connection error: {0}")]
    Connection(String),

    /// 테이블이 이미 존재함
    #[error("Table already exists: {0}")]
    TableExists(String),

    /// 테이블 준비 전 쓰기 시도
    #[error("Table not ready: {0}")]
    TableNotReady(String),

    /// 쿼리 실행 에러
    #[error("Query error: {0}")]
    Query(String),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StorageError::Connection(err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                if db_err.code().as_deref() == Some(PG_DUPLICATE_TABLE) {
                    StorageError::TableExists(db_err.message().to_string())
                } else {
                    StorageError::Query(db_err.message().to_string())
                }
            }
            _ => StorageError::Query(err.to_string()),
        }
    }
}

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러 (자격증명, 환경변수, 시작 파라미터)
    #[error("Configuration error: {0}")]
    Config(String),

    /// 데이터 소스 호출 실패 (타임아웃 포함)
    #[error("Source unavailable ({source_name}): {error}")]
    SourceUnavailable {
        source_name: String,
        #[source]
        error: SourceError,
    },

    /// 저장소 에러
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// 종료 신호로 중단됨
    #[error("Cancelled")]
    Cancelled,
}

impl CollectorError {
    pub fn source_unavailable(source_name: impl Into<String>, error: SourceError) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            error,
        }
    }

    /// 시작 단계에서 발생하면 프로세스를 종료해야 하는 에러인지 확인.
    pub fn is_fatal_at_startup(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// 인증 실패로 세션 재생성이 필요한 소스 에러인지 확인.
    pub fn needs_reconnect(&self) -> bool {
        matches!(self, Self::SourceUnavailable { error, .. } if error.is_auth_error())
    }

    /// 프로세스 종료 코드.
    ///
    /// 0: 정상 종료(취소), 2: 설정 에러, 1: 그 외
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Cancelled => 0,
            Self::Config(_) => 2,
            Self::SourceUnavailable { .. } | Self::Storage(_) => 1,
        }
    }
}

impl From<CoreError> for CollectorError {
    fn from(err: CoreError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
