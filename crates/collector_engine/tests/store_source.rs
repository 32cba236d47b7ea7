use std::fs;
use std::sync::Arc;
use std::time::Duration;

use collector_core::{AppId, ProgressSet, RetryPolicy};
use collector_engine::{
    run, store_row, store_schema, AppendSink, DriverOptions, FailureKind, FetchSettings,
    HttpFetcher, ItemSource, ReviewSummary, StoreEndpoints, StoreSource,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn source_for(server: &MockServer) -> StoreSource {
    let settings = FetchSettings {
        retry: RetryPolicy::bounded(2, Duration::from_millis(10)),
        ..FetchSettings::default()
    };
    let fetcher = HttpFetcher::new(settings).unwrap();
    StoreSource::new(Arc::new(fetcher), StoreEndpoints::with_base(&server.uri())).unwrap()
}

fn details_body(appid: AppId) -> serde_json::Value {
    json!({
        appid.to_string(): {
            "success": true,
            "data": {
                "name": "Dota 2",
                "type": "game",
                "is_free": true,
                "short_description": "Every day, millions of players...",
                "release_date": {"coming_soon": false, "date": "9 Jul, 2013"},
                "developers": ["Valve"],
                "publishers": ["Valve", "Other"],
                "genres": [{"id": "1", "description": "Action"}, {"id": "37", "description": "Free to Play"}],
                "categories": [],
                "metacritic": {"score": 90, "url": "https://example.com"},
                "dlc": [1001, 1002]
            }
        }
    })
}

async fn mount_details(server: &MockServer, appid: AppId, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/appdetails"))
        .and(query_param("appids", appid.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_reviews(server: &MockServer, appid: AppId, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/appreviews/{appid}")))
        .and(query_param("json", "1"))
        .and(query_param("language", "all"))
        .and(query_param("purchase_type", "all"))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn app_list_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ISteamApps/GetAppList/v2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "applist": {"apps": [{"appid": 10, "name": "Counter-Strike"}, {"appid": 20}]}
        })))
        .mount(&server)
        .await;

    let apps = source_for(&server).fetch_app_list().await.unwrap();
    let ids: Vec<AppId> = apps.iter().map(|a| a.appid).collect();
    assert_eq!(ids, vec![10, 20]);
    assert_eq!(apps[0].name, "Counter-Strike");
    assert_eq!(apps[1].name, "");
}

#[tokio::test]
async fn app_list_failure_is_distinct_from_an_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ISteamApps/GetAppList/v2/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = source_for(&server).fetch_app_list().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(503));

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ISteamApps/GetAppList/v2/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .mount(&server)
        .await;
    let err = source_for(&server).fetch_app_list().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::MalformedBody);
}

#[tokio::test]
async fn details_and_reviews_become_one_row() {
    let server = MockServer::start().await;
    mount_details(&server, 570, details_body(570)).await;
    mount_reviews(
        &server,
        570,
        ResponseTemplate::new(200).set_body_json(json!({
            "success": 1,
            "query_summary": {
                "num_reviews": 20,
                "review_score": 8,
                "total_positive": 1500,
                "total_negative": 300,
                "total_reviews": 1800
            }
        })),
    )
    .await;

    let source = source_for(&server);
    let item = source.fetch_item(&570).await.unwrap().expect("row");
    assert!(!item.degraded);
    assert_eq!(
        item.row.to_record(),
        vec![
            "570",
            "Dota 2",
            "game",
            "true",
            "",
            "",
            "Every day, millions of players...",
            "9 Jul, 2013",
            "Valve",
            "Valve, Other",
            "Action, Free to Play",
            "",
            "90",
            "1001, 1002",
            "20",
            "8",
            "1500",
            "300",
            "1800",
        ]
    );
}

#[tokio::test]
async fn unsuccessful_lookup_is_no_data() {
    let server = MockServer::start().await;
    mount_details(&server, 99, json!({"99": {"success": false}})).await;
    mount_details(&server, 98, json!({})).await;

    let source = source_for(&server);
    assert!(source.fetch_item(&99).await.unwrap().is_none());
    assert!(source.fetch_item(&98).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_review_lookup_degrades_to_null_fields() {
    let server = MockServer::start().await;
    mount_details(&server, 570, details_body(570)).await;
    mount_reviews(&server, 570, ResponseTemplate::new(500)).await;

    let source = source_for(&server);
    let item = source.fetch_item(&570).await.unwrap().expect("row");
    assert!(item.degraded);
    assert_eq!(item.row.get("name"), Some("Dota 2"));
    for field in ["num_reviews", "review_score", "positive_total", "negative_total", "total_reviews"] {
        assert_eq!(item.row.get(field), None, "{field}");
    }
}

#[tokio::test]
async fn review_summary_defaults_missing_counts() {
    let server = MockServer::start().await;
    mount_reviews(
        &server,
        10,
        ResponseTemplate::new(200).set_body_json(json!({"success": 1, "query_summary": {}})),
    )
    .await;

    let summary = source_for(&server)
        .fetch_review_summary(10)
        .await
        .unwrap()
        .expect("summary");
    assert_eq!(summary, ReviewSummary::default());
}

#[test]
fn store_row_nulls_absent_fields() {
    let schema = store_schema().unwrap();
    let details = json!({
        "name": "Bare",
        "price_overview": {"initial": 1999, "final": 999},
        "developers": []
    });
    let row = store_row(&schema, 42, &details, None);
    assert_eq!(row.get("price_initial"), Some("1999"));
    assert_eq!(row.get("price_final"), Some("999"));
    assert_eq!(row.get("developers"), None);
    assert_eq!(row.get("type"), None);
    assert_eq!(row.cells().len(), schema.len());
}

#[tokio::test]
async fn store_run_appends_rows_and_skips_dropped_apps() {
    let server = MockServer::start().await;
    mount_details(&server, 570, details_body(570)).await;
    mount_details(&server, 99, json!({"99": {"success": false}})).await;
    mount_reviews(
        &server,
        570,
        ResponseTemplate::new(200).set_body_json(json!({"success": 1, "query_summary": {}})),
    )
    .await;

    let temp = TempDir::new().unwrap();
    let path = temp.path().join("Steam_Export.csv");
    let source = source_for(&server);
    let mut sink = AppendSink::open(&path, source.schema()).unwrap();

    let summary = run(
        vec![570, 99],
        ProgressSet::new(),
        &source,
        &mut sink,
        &DriverOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(summary.committed, 1);
    assert_eq!(summary.dropped, 1);
    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("appid,name,type,is_free"));
    assert!(lines[1].starts_with("570,Dota 2,game,true"));
}
