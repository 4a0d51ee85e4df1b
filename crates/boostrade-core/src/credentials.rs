//! 자격증명 파일 로드.
//!
//! 거래소 API 키와 PostgreSQL 접속 정보를 JSON 파일 하나에서 읽습니다.
//!
//! ```json
//! {
//!   "userData": {
//!     "binanceApiPublic": "xxxxxxxx",
//!     "binanceApiSecret": "xxxxxxxx",
//!     "postgresUserName": "xxxxxxxx",
//!     "postgresDatabaseName": "xxxxxxxx",
//!     "postgresPassword": "xxxxxxxx"
//!   }
//! }
//! ```
//!
//! 최상위 키는 `userParams`로 써도 됩니다.
//!
//! # 보안
//! - 시크릿 값은 `SecretString`으로 보관합니다.
//! - `Debug` 구현은 API 키를 마스킹하고 시크릿/비밀번호는 출력하지 않습니다.

use crate::error::CoreError;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

#[derive(Deserialize)]
struct CredentialsFile {
    #[serde(rename = "userData", alias = "userParams")]
    user_data: UserData,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserData {
    binance_api_public: String,
    binance_api_secret: String,
    postgres_user_name: String,
    postgres_database_name: String,
    postgres_password: String,
}

/// 수집기 자격증명.
pub struct Credentials {
    /// 거래소 API 키 (공개 키)
    pub exchange_api_key: String,
    /// 거래소 API 시크릿
    exchange_api_secret: SecretString,
    /// DB 사용자명
    pub database_user: String,
    /// DB 이름
    pub database_name: String,
    /// DB 비밀번호
    database_password: SecretString,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("exchange_api_key", &mask(&self.exchange_api_key))
            .field("exchange_api_secret", &"***REDACTED***")
            .field("database_user", &self.database_user)
            .field("database_name", &self.database_name)
            .field("database_password", &"***REDACTED***")
            .finish()
    }
}

impl Credentials {
    /// 파일에서 자격증명을 읽습니다.
    ///
    /// # Errors
    /// 파일이 없거나, JSON 형식이 잘못되었거나, 필수 필드가 없거나 비어 있으면
    /// `CoreError::Config`를 반환합니다.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("자격증명 파일을 읽을 수 없습니다 ({}): {}", path.display(), e))
        })?;

        Self::from_json(&content)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))
    }

    /// JSON 문자열에서 자격증명을 파싱합니다.
    pub fn from_json(content: &str) -> Result<Self, CoreError> {
        let file: CredentialsFile = serde_json::from_str(content)?;
        let data = file.user_data;

        let fields = [
            ("binanceApiPublic", &data.binance_api_public),
            ("binanceApiSecret", &data.binance_api_secret),
            ("postgresUserName", &data.postgres_user_name),
            ("postgresDatabaseName", &data.postgres_database_name),
            ("postgresPassword", &data.postgres_password),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(CoreError::Config(format!("필수 필드가 비어 있습니다: {}", name)));
        }

        Ok(Self {
            exchange_api_key: data.binance_api_public,
            exchange_api_secret: SecretString::new(data.binance_api_secret.into_boxed_str()),
            database_user: data.postgres_user_name,
            database_name: data.postgres_database_name,
            database_password: SecretString::new(data.postgres_password.into_boxed_str()),
        })
    }

    /// 거래소 API 시크릿 원문.
    pub fn exchange_secret(&self) -> &str {
        self.exchange_api_secret.expose_secret()
    }

    /// DB 비밀번호 원문.
    pub fn database_password(&self) -> &str {
        self.database_password.expose_secret()
    }
}

fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***REDACTED***".to_string()
    }
}
