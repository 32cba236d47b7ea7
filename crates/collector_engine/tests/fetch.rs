use std::time::{Duration, Instant};

use collector_core::RetryPolicy;
use collector_engine::{FailureKind, FetchSettings, HttpFetcher, JsonFetcher};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_with_retry(retry: RetryPolicy) -> FetchSettings {
    FetchSettings {
        retry,
        ..FetchSettings::default()
    }
}

#[tokio::test]
async fn fetcher_returns_json_with_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/appdetails"))
        .and(query_param("appids", "570"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"570": {"success": true}})))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(FetchSettings::default()).unwrap();
    let url = format!("{}/api/appdetails", server.uri());

    let value = fetcher
        .get_json(&url, &[("appids", "570".to_string())])
        .await
        .expect("fetch ok");
    assert_eq!(value["570"]["success"], json!(true));
}

#[tokio::test]
async fn fetcher_fails_on_http_status_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(FetchSettings::default()).unwrap();
    let url = format!("{}/missing", server.uri());

    let err = fetcher.get_json(&url, &[]).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert!(!err.is_transport());
}

#[tokio::test]
async fn rate_limited_request_waits_for_cooldown_then_succeeds() {
    collector_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": 1})))
        .mount(&server)
        .await;

    let cooldown = Duration::from_millis(200);
    let fetcher =
        HttpFetcher::new(settings_with_retry(RetryPolicy::bounded(3, cooldown))).unwrap();
    let url = format!("{}/limited", server.uri());

    let started = Instant::now();
    let value = fetcher.get_json(&url, &[]).await.expect("retry succeeds");
    assert!(started.elapsed() >= cooldown);
    assert_eq!(value, json!({"ok": 1}));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
}

#[tokio::test]
async fn bounded_retry_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/always-limited"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(settings_with_retry(RetryPolicy::bounded(
        3,
        Duration::from_millis(10),
    )))
    .unwrap();
    let url = format!("{}/always-limited", server.uri());

    let err = fetcher.get_json(&url, &[]).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::RateLimited { attempts: 3 });
}

#[tokio::test]
async fn unbounded_retry_keeps_going_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(5)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(settings_with_retry(RetryPolicy::unbounded(
        Duration::from_millis(10),
    )))
    .unwrap();
    let url = format!("{}/busy", server.uri());

    let value = fetcher.get_json(&url, &[]).await.expect("eventually ok");
    assert_eq!(value, json!([1, 2]));
    assert_eq!(server.received_requests().await.unwrap().len(), 6);
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/html"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(FetchSettings::default()).unwrap();
    let url = format!("{}/html", server.uri());

    let err = fetcher.get_json(&url, &[]).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::MalformedBody);
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("{}"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let fetcher = HttpFetcher::new(settings).unwrap();
    let url = format!("{}/slow", server.uri());

    let err = fetcher.get_json(&url, &[]).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
    assert!(err.is_transport());
}

#[tokio::test]
async fn fetcher_rejects_too_large_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[0,1,2,3,4,5]"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let fetcher = HttpFetcher::new(settings).unwrap();
    let url = format!("{}/large", server.uri());

    let err = fetcher.get_json(&url, &[]).await.unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(13)
        }
    );
}

#[tokio::test]
async fn invalid_url_is_reported() {
    let fetcher = HttpFetcher::new(FetchSettings::default()).unwrap();
    let err = fetcher.get_json("not a url", &[]).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[tokio::test]
async fn pacing_spaces_consecutive_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paced"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let interval = Duration::from_millis(150);
    let settings = FetchSettings {
        min_interval: Some(interval),
        ..FetchSettings::default()
    };
    let fetcher = HttpFetcher::new(settings).unwrap();
    let url = format!("{}/paced", server.uri());

    let started = Instant::now();
    for _ in 0..3 {
        fetcher.get_json(&url, &[]).await.unwrap();
    }
    assert!(started.elapsed() >= interval * 2);
}
