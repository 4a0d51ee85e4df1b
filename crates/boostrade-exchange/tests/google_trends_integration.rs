//! Google Trends 커넥터 통합 테스트 (mockito 목 서버 사용).

use boostrade_core::{trend_keyword, TimestampRenderer};
use boostrade_exchange::{GoogleTrendsClient, GoogleTrendsConfig, SourceError, TrendDataSource};
use mockito::{Matcher, Mock, Server, ServerGuard};

const EXPLORE_BODY: &str = r#")]}'
{"widgets":[{"id":"RELATED_QUERIES","token":"rq","request":{}},{"id":"TIMESERIES","token":"ts-token","request":{"time":"now 7-d","resolution":"HOUR","comparisonItem":[{"geo":{},"complexKeywordsRestriction":{"keyword":[{"type":"BROAD","value":"buy gold"}]}}]}}]}"#;

const MULTILINE_BODY: &str = r#")]}',
{"default":{"timelineData":[
{"time":"1598691600","formattedTime":"Aug 29, 2020 at 9:00 AM","value":[41],"hasData":[true],"formattedValue":["41"]},
{"time":"1598695200","formattedTime":"Aug 29, 2020 at 10:00 AM","value":[55],"hasData":[true],"formattedValue":["55"]},
{"time":"1598702400","formattedTime":"Aug 29, 2020 at 12:00 PM","value":[73],"hasData":[true],"formattedValue":["73"],"isPartial":true}
],"averages":[]}}"#;

fn client_for(server: &ServerGuard, renderer: TimestampRenderer) -> GoogleTrendsClient {
    let config = GoogleTrendsConfig::default()
        .with_base_url(server.url())
        .with_renderer(renderer);
    GoogleTrendsClient::new(config).unwrap()
}

async fn mock_home(server: &mut ServerGuard) -> Mock {
    server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("geo".into(), "US".into()))
        .with_status(200)
        .with_header("set-cookie", "NID=test-session; Path=/")
        .with_body("<html></html>")
        .create_async()
        .await
}

#[tokio::test]
async fn test_fetch_interest_two_step_protocol() {
    let mut server = Server::new_async().await;
    let _home = mock_home(&mut server).await;

    let explore = server
        .mock("POST", "/trends/api/explore")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("hl".into(), "en-US".into()),
            Matcher::UrlEncoded("tz".into(), "0".into()),
            Matcher::Regex("buy".into()),
        ]))
        .with_status(200)
        .with_body(EXPLORE_BODY)
        .expect(1)
        .create_async()
        .await;
    let multiline = server
        .mock("GET", "/trends/api/widgetdata/multiline")
        .match_query(Matcher::UrlEncoded("token".into(), "ts-token".into()))
        .with_status(200)
        .with_body(MULTILINE_BODY)
        .expect(1)
        .create_async()
        .await;

    let mut client = client_for(&server, TimestampRenderer::default());
    client.connect().await.unwrap();
    assert!(client.is_connected());

    let keyword = trend_keyword("gold");
    let series = client.fetch_interest(&keyword, "now 7-d").await.unwrap();

    assert_eq!(series.keyword(), "buy gold");
    assert_eq!(series.len(), 3);
    assert_eq!(series.get("2020-08-29 09:00:00"), Some(41));
    assert_eq!(series.get("2020-08-29 10:00:00"), Some(55));
    assert_eq!(series.get("2020-08-29 12:00:00"), Some(73));
    assert_eq!(series.get("2020-08-29 11:00:00"), None);

    explore.assert_async().await;
    multiline.assert_async().await;
}

#[tokio::test]
async fn test_series_keys_follow_configured_timezone() {
    let mut server = Server::new_async().await;
    let _home = mock_home(&mut server).await;
    let _explore = server
        .mock("POST", "/trends/api/explore")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(EXPLORE_BODY)
        .create_async()
        .await;
    let _multiline = server
        .mock("GET", "/trends/api/widgetdata/multiline")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(MULTILINE_BODY)
        .create_async()
        .await;

    let renderer = TimestampRenderer::new(chrono_tz::Asia::Seoul);
    let mut client = client_for(&server, renderer);
    client.connect().await.unwrap();

    let series = client.fetch_interest("buy gold", "now 7-d").await.unwrap();

    assert_eq!(series.get("2020-08-29 18:00:00"), Some(41));
    assert_eq!(series.get("2020-08-29 09:00:00"), None);
}

#[tokio::test]
async fn test_fetch_interest_requires_session() {
    let server = Server::new_async().await;
    let client = client_for(&server, TimestampRenderer::default());

    let err = client.fetch_interest("buy gold", "now 7-d").await.unwrap_err();
    assert!(matches!(err, SourceError::NotConnected(_)));
    assert!(err.is_auth_error());
}

#[tokio::test]
async fn test_rate_limit_is_reported() {
    let mut server = Server::new_async().await;
    let _home = mock_home(&mut server).await;
    let _explore = server
        .mock("POST", "/trends/api/explore")
        .match_query(Matcher::Any)
        .with_status(429)
        .with_body("Too Many Requests")
        .create_async()
        .await;

    let mut client = client_for(&server, TimestampRenderer::default());
    client.connect().await.unwrap();

    let err = client.fetch_interest("buy oil", "now 7-d").await.unwrap_err();
    assert!(matches!(err, SourceError::RateLimited));
}

#[tokio::test]
async fn test_missing_timeseries_widget_is_parse_error() {
    let mut server = Server::new_async().await;
    let _home = mock_home(&mut server).await;
    let _explore = server
        .mock("POST", "/trends/api/explore")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(")]}'\n{\"widgets\":[]}")
        .create_async()
        .await;

    let mut client = client_for(&server, TimestampRenderer::default());
    client.connect().await.unwrap();

    let err = client.fetch_interest("buy oil", "now 7-d").await.unwrap_err();
    assert!(matches!(err, SourceError::ParseError(_)));
}
