//! 종목별 캔들 테이블 저장소.
//!
//! 종목마다 테이블 하나를 사용합니다 (테이블명 = 소문자 종목 식별자).
//!
//! ```sql
//! CREATE TABLE "btcusdt" (
//!     date   TIMESTAMP PRIMARY KEY,
//!     open   NUMERIC NOT NULL,
//!     high   NUMERIC NOT NULL,
//!     low    NUMERIC NOT NULL,
//!     close  NUMERIC NOT NULL,
//!     volume NUMERIC NOT NULL,
//!     trend  NUMERIC NOT NULL
//! );
//! ```
//!
//! 행 하나당 트랜잭션 하나로 커밋하며, 같은 `date`가 이미 있으면 무시합니다.

use crate::config::DatabaseConfig;
use crate::error::StorageError;
use async_trait::async_trait;
use boostrade_core::{Credentials, Instrument, JoinedRow};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// 저장소 작업을 위한 Result 타입.
pub type StoreResult<T> = Result<T, StorageError>;

/// 수집 파이프라인이 사용하는 저장소 인터페이스.
#[async_trait]
pub trait CandleStore: Send + Sync {
    /// 저장소에 연결합니다.
    async fn connect(&mut self) -> StoreResult<()>;

    /// 종목 테이블이 존재하도록 보장합니다.
    ///
    /// 이미 준비된 테이블이면 아무것도 하지 않습니다. 테이블이 이미 존재한다는 에러는
    /// 존재 여부를 다시 확인한 뒤 성공으로 처리합니다. 기존 데이터는 건드리지 않습니다.
    async fn ensure_table(&mut self, instrument: &Instrument) -> StoreResult<()>;

    /// 테이블이 쓰기 가능한 상태인지 확인.
    fn is_table_ready(&self, instrument: &Instrument) -> bool;

    /// 행 하나를 저장하고 커밋합니다.
    ///
    /// 새로 저장되면 `true`, 같은 시각의 행이 이미 있어 무시되면 `false`.
    async fn insert_row(&self, instrument: &Instrument, row: &JoinedRow) -> StoreResult<bool>;

    /// 연결을 닫습니다.
    async fn close(&mut self);
}

/// PostgreSQL 저장소.
pub struct PgCandleStore {
    options: PgConnectOptions,
    connect_timeout: Duration,
    pool: Option<PgPool>,
    ready_tables: HashSet<String>,
}

impl PgCandleStore {
    /// 새 저장소 생성. 연결은 `connect`에서 합니다.
    pub fn new(config: &DatabaseConfig, credentials: &Credentials) -> Self {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&credentials.database_user)
            .password(credentials.database_password())
            .database(&credentials.database_name);

        Self::with_options(options, config.connect_timeout())
    }

    /// 접속 옵션을 직접 지정해 생성합니다.
    pub fn with_options(options: PgConnectOptions, connect_timeout: Duration) -> Self {
        Self {
            options,
            connect_timeout,
            pool: None,
            ready_tables: HashSet::new(),
        }
    }

    fn pool(&self) -> StoreResult<&PgPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| StorageError::Connection("데이터베이스에 연결되지 않았습니다".to_string()))
    }

    /// `to_regclass`로 테이블 존재 여부 확인.
    async fn table_exists(&self, table: &str) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(quote_ident(table))
            .fetch_one(self.pool()?)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl CandleStore for PgCandleStore {
    async fn connect(&mut self) -> StoreResult<()> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(self.connect_timeout)
            .connect_with(self.options.clone())
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        self.pool = Some(pool);
        info!("Database connection established");
        Ok(())
    }

    async fn ensure_table(&mut self, instrument: &Instrument) -> StoreResult<()> {
        let table = instrument.table_name();
        if self.ready_tables.contains(&table) {
            return Ok(());
        }

        let sql = create_table_sql(&table);
        match sqlx::query(&sql).execute(self.pool()?).await.map_err(StorageError::from) {
            Ok(_) => info!(table = %table, "테이블 생성"),
            Err(StorageError::TableExists(msg)) => {
                info!(table = %table, "테이블이 이미 존재합니다: {}", msg);
                if !self.table_exists(&table).await? {
                    return Err(StorageError::TableNotReady(table));
                }
            }
            Err(e) => return Err(e),
        }

        self.ready_tables.insert(table);
        Ok(())
    }

    fn is_table_ready(&self, instrument: &Instrument) -> bool {
        self.ready_tables.contains(&instrument.table_name())
    }

    async fn insert_row(&self, instrument: &Instrument, row: &JoinedRow) -> StoreResult<bool> {
        let table = instrument.table_name();
        if !self.ready_tables.contains(&table) {
            return Err(StorageError::TableNotReady(table));
        }

        let sql = insert_sql(&table);
        let mut tx = self.pool()?.begin().await?;

        let result = sqlx::query(&sql)
            .bind(row.date)
            .bind(row.candle.open)
            .bind(row.candle.high)
            .bind(row.candle.low)
            .bind(row.candle.close)
            .bind(row.candle.volume)
            .bind(row.trend_value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let inserted = result.rows_affected() == 1;
        if !inserted {
            debug!(table = %table, date = %row.date, "이미 저장된 행, 무시");
        }
        Ok(inserted)
    }

    async fn close(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
            info!("Database connection closed");
        } else {
            warn!("닫을 데이터베이스 연결이 없습니다");
        }
    }
}

/// SQL 식별자를 큰따옴표로 감쌉니다.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {} (\
         date TIMESTAMP PRIMARY KEY, \
         open NUMERIC NOT NULL, \
         high NUMERIC NOT NULL, \
         low NUMERIC NOT NULL, \
         close NUMERIC NOT NULL, \
         volume NUMERIC NOT NULL, \
         trend NUMERIC NOT NULL)",
        quote_ident(table)
    )
}

fn insert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {} (date, open, high, low, close, volume, trend) \
         VALUES ($1, $2, $3, $4, $5, $6, $7) \
         ON CONFLICT (date) DO NOTHING",
        quote_ident(table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_uses_quoted_table() {
        let create = create_table_sql("1inchusdt");
        assert!(create.starts_with("CREATE TABLE \"1inchusdt\" ("));
        assert!(create.contains("date TIMESTAMP PRIMARY KEY"));
        assert!(create.contains("trend NUMERIC NOT NULL"));

        let insert = insert_sql("btcusdt");
        assert!(insert.starts_with("INSERT INTO \"btcusdt\""));
        assert!(insert.ends_with("ON CONFLICT (date) DO NOTHING"));
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("btcusdt"), "\"btcusdt\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }
}
