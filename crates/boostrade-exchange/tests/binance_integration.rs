//! Binance 커넥터 통합 테스트 (mockito 목 서버 사용).

use boostrade_core::{Instrument, Timeframe};
use boostrade_exchange::{BinanceClient, BinanceConfig, MarketDataSource, SourceError};
use mockito::{Matcher, Mock, Server, ServerGuard};
use secrecy::SecretString;

const HOUR_MS: i64 = 3_600_000;
const PAGE_START_MS: i64 = 1_600_000_000_000;

fn client_for(server: &ServerGuard) -> BinanceClient {
    let config = BinanceConfig::new("test-api-key", SecretString::new("test-secret".into()))
        .with_base_url(server.url());
    BinanceClient::new(config).unwrap()
}

fn kline_json(open_ms: i64) -> serde_json::Value {
    serde_json::json!([
        open_ms,
        "100.0",
        "110.0",
        "90.0",
        "105.0",
        "12.5",
        open_ms + HOUR_MS - 1,
        "1250.0",
        42,
        "6.0",
        "600.0",
        "0"
    ])
}

fn klines_body(count: usize, first_open_ms: i64) -> String {
    let klines: Vec<_> = (0..count as i64)
        .map(|i| kline_json(first_open_ms + i * HOUR_MS))
        .collect();
    serde_json::Value::Array(klines).to_string()
}

async fn mock_session(server: &mut ServerGuard) -> (Mock, Mock) {
    let time = server
        .mock("GET", "/api/v3/time")
        .with_status(200)
        .with_body(r#"{"serverTime":1700000000000}"#)
        .create_async()
        .await;
    let restrictions = server
        .mock("GET", "/sapi/v1/account/apiRestrictions")
        .match_query(Matcher::Regex("signature=[0-9a-f]{64}".into()))
        .match_header("X-MBX-APIKEY", "test-api-key")
        .with_status(200)
        .with_body(r#"{"ipRestrict":false,"enableReading":true}"#)
        .create_async()
        .await;
    (time, restrictions)
}

#[tokio::test]
async fn test_connect_verifies_api_key() {
    let mut server = Server::new_async().await;
    let (time, restrictions) = mock_session(&mut server).await;

    let mut client = client_for(&server);
    assert!(!client.is_connected());

    client.connect().await.unwrap();

    assert!(client.is_connected());
    time.assert_async().await;
    restrictions.assert_async().await;
}

#[tokio::test]
async fn test_rejected_api_key_is_unauthorized() {
    let mut server = Server::new_async().await;
    let _time = server
        .mock("GET", "/api/v3/time")
        .with_status(200)
        .with_body(r#"{"serverTime":1700000000000}"#)
        .create_async()
        .await;
    let _restrictions = server
        .mock("GET", "/sapi/v1/account/apiRestrictions")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"code":-2015,"msg":"Invalid API-key, IP, or permissions for action."}"#)
        .create_async()
        .await;

    let mut client = client_for(&server);
    let err = client.connect().await.unwrap_err();

    assert!(matches!(err, SourceError::Unauthorized(_)));
    assert!(err.is_auth_error());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_fetch_candles_requires_session() {
    let server = Server::new_async().await;
    let client = client_for(&server);
    let instrument = Instrument::new("BTCUSDT").unwrap();

    let err = client
        .fetch_candles(&instrument, Timeframe::H1, chrono::Duration::days(7), 6)
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::NotConnected(_)));
}

#[tokio::test]
async fn test_fetch_candles_keeps_most_recent() {
    let mut server = Server::new_async().await;
    let _session = mock_session(&mut server).await;
    let klines = server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("symbol".into(), "BTCUSDT".into()),
            Matcher::UrlEncoded("interval".into(), "1h".into()),
            Matcher::UrlEncoded("limit".into(), "1000".into()),
        ]))
        .with_status(200)
        .with_body(klines_body(10, PAGE_START_MS))
        .expect(1)
        .create_async()
        .await;

    let mut client = client_for(&server);
    client.connect().await.unwrap();

    let instrument = Instrument::new("btcusdt").unwrap();
    let candles = client
        .fetch_candles(&instrument, Timeframe::H1, chrono::Duration::days(7), 6)
        .await
        .unwrap();

    assert_eq!(candles.len(), 6);
    assert_eq!(candles[0].open_time_ms(), PAGE_START_MS + 4 * HOUR_MS);
    assert_eq!(candles[5].open_time_ms(), PAGE_START_MS + 9 * HOUR_MS);
    assert!(candles.windows(2).all(|w| w[0].open_time < w[1].open_time));
    klines.assert_async().await;
}

#[tokio::test]
async fn test_fetch_candles_follows_pages() {
    let mut server = Server::new_async().await;
    let _session = mock_session(&mut server).await;

    // 첫 페이지: 시작 시각이 현재 - lookback 이므로 정확한 값 대신 자릿수로 매칭
    let first = server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::Regex(r"startTime=1[7-9]\d{11}".into()))
        .with_status(200)
        .with_body(klines_body(1000, PAGE_START_MS))
        .expect(1)
        .create_async()
        .await;
    // 두 번째 페이지: 직전 페이지 마지막 캔들 다음 시각부터
    let next_start = PAGE_START_MS + 1000 * HOUR_MS;
    let second = server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::UrlEncoded("startTime".into(), next_start.to_string()))
        .with_status(200)
        .with_body(klines_body(2, next_start))
        .expect(1)
        .create_async()
        .await;

    let mut client = client_for(&server);
    client.connect().await.unwrap();

    let instrument = Instrument::new("ETHUSDT").unwrap();
    let candles = client
        .fetch_candles(&instrument, Timeframe::H1, chrono::Duration::days(7), 144)
        .await
        .unwrap();

    assert_eq!(candles.len(), 144);
    assert_eq!(
        candles.last().map(|c| c.open_time_ms()),
        Some(next_start + HOUR_MS)
    );
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_rate_limit_is_reported() {
    let mut server = Server::new_async().await;
    let _session = mock_session(&mut server).await;
    let _klines = server
        .mock("GET", "/api/v3/klines")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body(r#"{"code":-1003,"msg":"Too many requests."}"#)
        .create_async()
        .await;

    let mut client = client_for(&server);
    client.connect().await.unwrap();

    let instrument = Instrument::new("BTCUSDT").unwrap();
    let err = client
        .fetch_candles(&instrument, Timeframe::H1, chrono::Duration::days(1), 6)
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::RateLimited));
    assert!(err.is_transient());
}
