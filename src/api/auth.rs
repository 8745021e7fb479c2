//! Client-credential token lifecycle
//!
//! One [`Credential`] is acquired per run and revoked exactly once at the end
//! of the run. Revocation is best-effort: failures are logged and never
//! propagated.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::utils::error::AuthError;

const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Access token held for the duration of a run
#[derive(Debug, Clone)]
pub struct Credential {
    token: String,
    issued_at: DateTime<Utc>,
    expires_in: u64,
    revoked: bool,
}

impl Credential {
    pub fn new(token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            token: token.into(),
            issued_at: Utc::now(),
            expires_in,
            revoked: false,
        }
    }

    /// Bearer token value
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + ChronoDuration::seconds(self.expires_in as i64)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at()
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

/// Exchanges client credentials for a token and revokes it
pub struct AuthManager {
    client: Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    revoke_url: String,
}

impl AuthManager {
    /// Create an auth manager from API configuration
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unreachable` if the HTTP client cannot be created
    pub fn new(config: &ApiConfig, timeout: Duration) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AuthError::Unreachable)?;

        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_url: config.token_url.clone(),
            revoke_url: config.revoke_url.clone(),
        })
    }

    /// Exchange the client identifier and secret for an access token
    ///
    /// # Errors
    ///
    /// - `AuthError::Unreachable` if the token service cannot be reached
    /// - `AuthError::Rejected` on a non-success status
    /// - `AuthError::MalformedResponse` if no token can be read from the body
    pub async fn acquire(&self) -> Result<Credential, AuthError> {
        info!(url = %self.token_url, "Requesting access token");

        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(AuthError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(AuthError::Unreachable)?;
        let parsed: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        let token = parsed
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| AuthError::MalformedResponse("missing access_token".to_string()))?;

        let credential = Credential::new(token, parsed.expires_in.unwrap_or(DEFAULT_EXPIRES_IN));
        info!(
            expires_at = %credential.expires_at(),
            "Access token obtained"
        );

        Ok(credential)
    }

    /// Invalidate the token server-side
    ///
    /// Marks the credential revoked whatever the outcome, so no further
    /// authenticated call is attempted with it. Calling this twice is a no-op.
    pub async fn revoke(&self, credential: &mut Credential) {
        if credential.revoked {
            debug!("Credential already revoked");
            return;
        }
        credential.revoked = true;

        info!("Revoking access token");
        let result = self
            .client
            .post(&self.revoke_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("token", credential.token.as_str())])
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                info!("Token revoked");
            }
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                warn!(status = status, body = %body, "Token revocation rejected");
            }
            Err(e) => {
                warn!(error = %e, "Token revocation failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_expiry() {
        let credential = Credential::new("abc", 3600);
        assert!(!credential.is_expired());
        assert!(!credential.is_revoked());
        assert_eq!(
            credential.expires_at() - credential.issued_at(),
            ChronoDuration::seconds(3600)
        );

        let stale = Credential::new("abc", 0);
        assert!(stale.is_expired());
    }

    #[test]
    fn test_token_response_defaults() {
        let parsed: TokenResponse = serde_json::from_str(r#"{"access_token":"t"}"#).unwrap();
        assert_eq!(parsed.access_token.as_deref(), Some("t"));
        assert!(parsed.expires_in.is_none());
    }

    #[test]
    fn test_manager_creation() {
        let manager = AuthManager::new(&ApiConfig::default(), Duration::from_secs(5));
        assert!(manager.is_ok());
    }
}
