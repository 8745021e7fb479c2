//! HTTP fetcher for FOIS dashboard endpoints
//!
//! One GET per (endpoint, day), authorized with the run credential. The
//! response is decoded into rows and narrowed by the endpoint's zone filter
//! before anything else sees it. No retries happen here.

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    Client, Response,
};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::api::auth::Credential;
use crate::models::{FetchTask, RecordSet, Row};
use crate::utils::api_date;
use crate::utils::error::FetchError;

/// Fetcher bound to one API base and zone
pub struct RemoteFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Base the endpoint paths are joined onto (always ends with `/`)
    base_url: Url,

    /// Zone code rows are narrowed to
    zone: String,
}

impl RemoteFetcher {
    /// Create a new fetcher
    ///
    /// # Errors
    ///
    /// Returns `FetchError::InvalidUrl` for an unparsable base and
    /// `FetchError::Network` if the HTTP client cannot be created
    pub fn new(base_url: &str, zone: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(FetchError::Network)?;

        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url =
            Url::parse(&normalized).map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;

        Ok(Self {
            client,
            base_url,
            zone: zone.trim().to_string(),
        })
    }

    /// URL for one task's endpoint, without the date parameter
    pub fn endpoint_url(&self, task: &FetchTask) -> Result<Url, FetchError> {
        self.base_url
            .join(task.endpoint.path())
            .map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }

    /// Fetch one day of one endpoint
    ///
    /// # Errors
    ///
    /// - `FetchError::Revoked` if the credential was already revoked
    /// - `FetchError::Network` / `FetchError::Timeout` on transport failure
    /// - `FetchError::RateLimited` / `FetchError::Api` on non-success status
    /// - `FetchError::Parse` if the body is not an array of objects
    pub async fn fetch(
        &self,
        task: &FetchTask,
        credential: &Credential,
    ) -> Result<RecordSet, FetchError> {
        if credential.is_revoked() {
            return Err(FetchError::Revoked);
        }

        let url = self.endpoint_url(task)?;
        let date = api_date(task.date);
        debug!(url = %url, date = %date, "Fetching endpoint");

        let response = self
            .client
            .get(url)
            .query(&[("date", date.as_str())])
            .headers(Self::build_headers(credential)?)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let rows = self.decode_response(response).await?;
        let fetched = rows.len();
        let rows = task.endpoint.zone_filter().apply(rows, &self.zone);

        debug!(
            endpoint = %task.endpoint,
            date = %task.date,
            fetched = fetched,
            kept = rows.len(),
            "Applied zone filter"
        );

        Ok(RecordSet::new(task.endpoint, task.date, rows))
    }

    async fn decode_response(&self, response: Response) -> Result<Vec<Row>, FetchError> {
        let status = response.status();

        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(FetchError::from_transport)?;
        Self::decode_rows(&body)
    }

    /// Decode a response body into rows
    ///
    /// Accepts a JSON array of objects (an empty array is an empty set).
    pub fn decode_rows(body: &str) -> Result<Vec<Row>, FetchError> {
        let value: Value =
            serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

        let Value::Array(items) = value else {
            return Err(FetchError::Parse("expected a JSON array of rows".to_string()));
        };

        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(row) => Ok(row),
                other => Err(FetchError::Parse(format!(
                    "row {i} is not an object: {other}"
                ))),
            })
            .collect()
    }

    fn build_headers(credential: &Credential) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let bearer = HeaderValue::from_str(&format!("Bearer {}", credential.token()))
            .map_err(|e| FetchError::Parse(format!("token is not a valid header value: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);

        Ok(headers)
    }
}
