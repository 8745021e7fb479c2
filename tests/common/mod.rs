//! Common test utilities

#![allow(dead_code)]

use chrono::NaiveDate;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use foisync::api::{AuthManager, RatePolicy, RemoteFetcher};
use foisync::config::ApiConfig;
use foisync::orchestrator::FetchOrchestrator;
use foisync::storage::{DedupWriter, TableRepository};
use foisync::utils::retry::RetryPolicy;

pub const CLIENT_ID: &str = "client-1";
pub const CLIENT_SECRET: &str = "secret-1";
pub const TOKEN: &str = "tok-abc";

/// Data resources are served under this prefix
pub const DATA_PREFIX: &str = "/data";

/// Fixed "today" so planned dates are stable
pub fn today() -> NaiveDate {
    ymd(2024, 3, 10)
}

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// API configuration pointing every URL at the mock server
pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig {
        client_id: CLIENT_ID.to_string(),
        client_secret: CLIENT_SECRET.to_string(),
        token_url: format!("{}/token", server.uri()),
        revoke_url: format!("{}/revoke", server.uri()),
        base_url: format!("{}{DATA_PREFIX}", server.uri()),
        zone: "WR".to_string(),
        request_timeout_secs: 5,
    }
}

/// Mount a successful token exchange
pub async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": TOKEN, "expires_in": 3600})),
        )
        .mount(server)
        .await;
}

/// Mount the revoke endpoint, expecting exactly `times` calls
pub async fn mount_revoke(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/revoke"))
        .and(body_string_contains(format!("token={TOKEN}")))
        .respond_with(ResponseTemplate::new(200))
        .expect(times)
        .mount(server)
        .await;
}

/// Path of an endpoint resource on the mock server
pub fn data_path(endpoint: &str) -> String {
    format!("{DATA_PREFIX}/{endpoint}")
}

/// Rows carrying a `zone` field, one per zone code
pub fn zone_rows(zones: &[&str]) -> Value {
    Value::Array(
        zones
            .iter()
            .enumerate()
            .map(|(i, z)| json!({"zone": z, "sttn": format!("ST{i}"), "count": i}))
            .collect(),
    )
}

/// Orchestrator wired against the mock server with immediate write retries
pub fn orchestrator(
    server: &MockServer,
    repo: Arc<dyn TableRepository>,
    rate: RatePolicy,
) -> FetchOrchestrator {
    let config = api_config(server);
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let auth = AuthManager::new(&config, timeout).unwrap();
    let fetcher = RemoteFetcher::new(&config.base_url, &config.zone, timeout).unwrap();
    let writer = DedupWriter::new(repo, RetryPolicy::fixed(3, Duration::ZERO));

    FetchOrchestrator::new(auth, fetcher, writer, rate)
}
