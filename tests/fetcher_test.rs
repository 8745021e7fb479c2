//! Integration tests for RemoteFetcher using wiremock
//!
//! These tests validate request shape, zone filtering and error mapping.

mod common;

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{data_path, ymd, zone_rows, TOKEN};
use foisync::api::{Credential, Endpoint, RemoteFetcher};
use foisync::utils::error::FetchError;
use foisync::FetchTask;

fn fetcher(server: &MockServer) -> RemoteFetcher {
    RemoteFetcher::new(
        &format!("{}{}", server.uri(), common::DATA_PREFIX),
        "WR",
        Duration::from_secs(2),
    )
    .unwrap()
}

fn task(endpoint: Endpoint) -> FetchTask {
    FetchTask::new(endpoint, ymd(2024, 3, 9))
}

/// Test request carries bearer token, accept header and DD-MM-YYYY date
#[tokio::test]
async fn test_fetch_success_filters_zone() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(data_path("pndgindt")))
        .and(query_param("date", "09-03-2024"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(header("accept", "*/*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(zone_rows(&["WR", "CR", "WR"])))
        .expect(1)
        .mount(&server)
        .await;

    let records = fetcher(&server)
        .fetch(&task(Endpoint::PendingIndents), &Credential::new(TOKEN, 3600))
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records.date, ymd(2024, 3, 9));
    assert!(records.rows.iter().all(|r| r["zone"] == "WR"));
}

/// Test origin-destination rows are kept when either zone matches
#[tokio::test]
async fn test_fetch_origin_destination_filter() {
    let server = MockServer::start().await;
    let body = json!([
        {"srczone": "WR", "dstnzone": "CR", "wght": 10},
        {"srczone": "NR", "dstnzone": "WR", "wght": 20},
        {"srczone": "NR", "dstnzone": "CR", "wght": 30}
    ]);

    Mock::given(method("GET"))
        .and(path(data_path("wghtleadntkmfrgt")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let records = fetcher(&server)
        .fetch(&task(Endpoint::OriginDestination), &Credential::new(TOKEN, 3600))
        .await
        .unwrap();

    let weights: Vec<_> = records.rows.iter().map(|r| r["wght"].clone()).collect();
    assert_eq!(weights, vec![json!(10), json!(20)]);
}

/// Test an empty array is an empty record set, not an error
#[tokio::test]
async fn test_fetch_empty_array() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(data_path("plctresndttn")))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let records = fetcher(&server)
        .fetch(&task(Endpoint::PlacementDetention), &Credential::new(TOKEN, 3600))
        .await
        .unwrap();

    assert!(records.is_empty());
}

/// Test server errors map to Api without retrying
#[tokio::test]
async fn test_server_error_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(data_path("pndgindt")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher(&server)
        .fetch(&task(Endpoint::PendingIndents), &Credential::new(TOKEN, 3600))
        .await
        .unwrap_err();

    match err {
        FetchError::Api { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
}

/// Test 429 maps to RateLimited
#[tokio::test]
async fn test_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(data_path("pndgindt")))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = fetcher(&server)
        .fetch(&task(Endpoint::PendingIndents), &Credential::new(TOKEN, 3600))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RateLimited));
}

/// Test undecodable bodies map to Parse
#[tokio::test]
async fn test_invalid_body() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(data_path("pndgindt")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = fetcher(&server)
        .fetch(&task(Endpoint::PendingIndents), &Credential::new(TOKEN, 3600))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Parse(_)));
}

/// Test a JSON object instead of an array maps to Parse
#[tokio::test]
async fn test_object_body_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(data_path("pndgindt")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"zone": "WR"})))
        .mount(&server)
        .await;

    let err = fetcher(&server)
        .fetch(&task(Endpoint::PendingIndents), &Credential::new(TOKEN, 3600))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Parse(_)));
}

/// Test slow responses map to Timeout
#[tokio::test]
async fn test_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(data_path("pndgindt")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("[]")
                .set_delay(Duration::from_secs(10)), // Longer than timeout
        )
        .mount(&server)
        .await;

    let err = fetcher(&server)
        .fetch(&task(Endpoint::PendingIndents), &Credential::new(TOKEN, 3600))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Timeout), "got {err:?}");
}

/// Test connection refused maps to Network
#[tokio::test]
async fn test_connection_refused() {
    let fetcher = RemoteFetcher::new("http://127.0.0.1:1/data", "WR", Duration::from_secs(2)).unwrap();

    let err = fetcher
        .fetch(&task(Endpoint::PendingIndents), &Credential::new(TOKEN, 3600))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Network(_)), "got {err:?}");
}

/// Test no request is sent once the credential is revoked
#[tokio::test]
async fn test_revoked_credential_not_sent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/revoke"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let auth = foisync::api::AuthManager::new(&common::api_config(&server), Duration::from_secs(2))
        .unwrap();
    let mut credential = Credential::new(TOKEN, 3600);
    auth.revoke(&mut credential).await;

    let err = fetcher(&server)
        .fetch(&task(Endpoint::PendingIndents), &credential)
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Revoked));
}
