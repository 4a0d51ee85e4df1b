//! 수집 대상 종목(거래쌍) 정의.
//!
//! 종목 식별자는 두 가지 형태로 쓰입니다:
//! - API 호출: 대문자 (예: `BTCUSDT`)
//! - 저장소 테이블명: 소문자 (예: `btcusdt`)

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 거래쌍 식별자.
///
/// ASCII 영숫자만 허용하므로 소문자 변환 결과를 그대로 SQL 식별자로 쓸 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Instrument(String);

impl Instrument {
    /// 식별자를 검증하고 대문자로 정규화합니다.
    pub fn new(symbol: impl AsRef<str>) -> Result<Self, CoreError> {
        let symbol = symbol.as_ref().trim();
        if symbol.is_empty() {
            return Err(CoreError::InvalidInput("종목 식별자가 비어 있습니다".to_string()));
        }
        // PostgreSQL 식별자 길이 제한(63)
        if symbol.len() > 63 {
            return Err(CoreError::InvalidInput(format!(
                "종목 식별자가 너무 깁니다: {}",
                symbol
            )));
        }
        if !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::InvalidInput(format!(
                "종목 식별자는 영숫자만 허용됩니다: {}",
                symbol
            )));
        }
        Ok(Self(symbol.to_ascii_uppercase()))
    }

    /// 거래소 API용 심볼 (대문자).
    pub fn as_exchange_symbol(&self) -> &str {
        &self.0
    }

    /// 저장 테이블명 (소문자). SQL에서는 항상 큰따옴표로 감싸 사용합니다.
    pub fn table_name(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Instrument {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Instrument {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Instrument> for String {
    fn from(value: Instrument) -> Self {
        value.0
    }
}
