//! Integration tests for the token lifecycle using wiremock

mod common;

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{basic_auth, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{api_config, CLIENT_ID, CLIENT_SECRET, TOKEN};
use foisync::api::{AuthManager, Credential};
use foisync::utils::error::AuthError;

fn manager(server: &MockServer) -> AuthManager {
    AuthManager::new(&api_config(server), Duration::from_secs(2)).unwrap()
}

/// Test token exchange sends basic auth and the client-credentials grant
#[tokio::test]
async fn test_acquire_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(basic_auth(CLIENT_ID, CLIENT_SECRET))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": TOKEN, "expires_in": 120})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let credential = manager(&server).acquire().await.unwrap();

    assert_eq!(credential.token(), TOKEN);
    assert!(!credential.is_revoked());
    assert_eq!(
        (credential.expires_at() - credential.issued_at()).num_seconds(),
        120
    );
}

/// Test a missing expiry falls back to one hour
#[tokio::test]
async fn test_acquire_default_expiry() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": TOKEN})))
        .mount(&server)
        .await;

    let credential = manager(&server).acquire().await.unwrap();
    assert_eq!(
        (credential.expires_at() - credential.issued_at()).num_seconds(),
        3600
    );
}

/// Test rejected credentials surface status and body
#[tokio::test]
async fn test_acquire_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .mount(&server)
        .await;

    let err = manager(&server).acquire().await.unwrap_err();

    match err {
        AuthError::Rejected { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid_client");
        }
        other => panic!("Expected Rejected, got {other:?}"),
    }
}

/// Test a body without a token is malformed
#[tokio::test]
async fn test_acquire_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token_type": "Bearer"})))
        .mount(&server)
        .await;

    let err = manager(&server).acquire().await.unwrap_err();
    assert!(matches!(err, AuthError::MalformedResponse(_)));
}

/// Test an unreachable token service
#[tokio::test]
async fn test_acquire_unreachable() {
    let server = MockServer::start().await;
    let mut config = api_config(&server);
    config.token_url = "http://127.0.0.1:1/token".to_string();

    let err = AuthManager::new(&config, Duration::from_secs(2))
        .unwrap()
        .acquire()
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Unreachable(_)));
}

/// Test revoke posts the token once, even when called twice
#[tokio::test]
async fn test_revoke_once() {
    let server = MockServer::start().await;
    common::mount_revoke(&server, 1).await;

    let auth = manager(&server);
    let mut credential = Credential::new(TOKEN, 3600);

    auth.revoke(&mut credential).await;
    auth.revoke(&mut credential).await;

    assert!(credential.is_revoked());
}

/// Test revoke failures are swallowed
#[tokio::test]
async fn test_revoke_failure_ignored() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/revoke"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let mut credential = Credential::new(TOKEN, 3600);
    manager(&server).revoke(&mut credential).await;

    assert!(credential.is_revoked());
}
