//! Tests for the HTTP archive store against a mocked remote.

use hindsight_core::{ArchiveStore, HttpStore, MirrorError};
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn location_for(server: &MockServer, suffix: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), suffix)).unwrap()
}

#[tokio::test]
async fn test_list_returns_identifiers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/archives"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["job-a", "job-b"])))
        .mount(&server)
        .await;

    let store = HttpStore::new().unwrap();
    let ids = store.list(&location_for(&server, "/archives")).await.unwrap();
    assert_eq!(ids, vec!["job-a", "job-b"]);
}

#[tokio::test]
async fn test_fetch_decodes_bundle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/archives/job-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "archive": [{ "path": "/jobs/overview", "json": "{}" }]
        })))
        .mount(&server)
        .await;

    let store = HttpStore::new().unwrap();
    let bundle = store
        .fetch(&location_for(&server, "/archives"), "job-a")
        .await
        .unwrap();
    assert_eq!(bundle.entries.len(), 1);
    assert_eq!(bundle.entries[0].path, "/jobs/overview");
}

#[tokio::test]
async fn test_error_status_is_a_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/archives"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let store = HttpStore::new().unwrap();
    let result = store.list(&location_for(&server, "/archives")).await;
    match result {
        Err(MirrorError::Network { status, .. }) => assert_eq!(status, Some(503)),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_listing_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/archives"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let store = HttpStore::new().unwrap();
    assert!(store.list(&location_for(&server, "/archives")).await.is_err());
}
