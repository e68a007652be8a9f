//! JSON-over-HTTP remote store client.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use super::{ReachabilityProbe, RemoteError, RemoteResult, RemoteStore};
use crate::models::{Appointment, RecordId};
use crate::util::{excerpt, has_http_scheme, non_blank, normalize_base_url};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// `RemoteStore` backed by the salon backend's REST API
#[derive(Clone)]
pub struct HttpRemoteStore {
    base_url: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpRemoteStore {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("HttpRemoteStore")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>) -> crate::Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Build a client whose every request is bounded by `timeout`.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        let base_url = checked_base_url(&base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                crate::Error::Config(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, scope: &str) -> String {
        format!(
            "{}/v1/salons/{}/appointments",
            self.base_url,
            urlencoding::encode(scope)
        )
    }

    fn record_url(&self, id: &RecordId) -> String {
        format!(
            "{}/v1/appointments/{}",
            self.base_url,
            urlencoding::encode(id.as_str())
        )
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn fetch_collection(&self, scope: &str) -> RemoteResult<Vec<Appointment>> {
        let response = self
            .client
            .get(self.collection_url(scope))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        let response = ensure_success(response).await?;
        response
            .json::<Vec<Appointment>>()
            .await
            .map_err(map_transport_error)
    }

    async fn fetch(&self, id: &RecordId) -> RemoteResult<Option<Appointment>> {
        let response = self
            .client
            .get(self.record_url(id))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ensure_success(response).await?;
        response
            .json::<Appointment>()
            .await
            .map(Some)
            .map_err(map_transport_error)
    }

    async fn create(&self, record: &Appointment) -> RemoteResult<RecordId> {
        let response = self
            .client
            .post(format!("{}/v1/appointments", self.base_url))
            .json(record)
            .send()
            .await
            .map_err(map_transport_error)?;
        let response = ensure_success(response).await?;
        let created = response
            .json::<CreatedResponse>()
            .await
            .map_err(map_transport_error)?;

        non_blank(&created.id)
            .map(RecordId::new)
            .ok_or_else(|| RemoteError::InvalidPayload("create response had an empty id".into()))
    }

    async fn update(&self, id: &RecordId, record: &Appointment) -> RemoteResult<()> {
        let response = self
            .client
            .put(self.record_url(id))
            .json(record)
            .send()
            .await
            .map_err(map_transport_error)?;
        ensure_success(response).await?;
        Ok(())
    }
}

impl ReachabilityProbe for HttpRemoteStore {
    async fn is_reachable(&self) -> bool {
        match self
            .client
            .get(format!("{}/v1/health", self.base_url))
            .send()
            .await
        {
            Ok(response) => !response.status().is_server_error(),
            Err(error) => {
                tracing::debug!("Reachability probe failed: {error}");
                false
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

async fn ensure_success(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = parse_api_error(status, &body);
    if is_retryable_status(status) {
        Err(RemoteError::Unreachable(message))
    } else {
        Err(RemoteError::Rejected(message))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || matches!(
            status,
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS
        )
}

fn map_transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_decode() {
        RemoteError::InvalidPayload(error.to_string())
    } else {
        RemoteError::Unreachable(error.to_string())
    }
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = excerpt(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn checked_base_url(raw: &str) -> crate::Result<String> {
    let base_url = normalize_base_url(raw).ok_or_else(|| {
        crate::Error::Config("remote base URL must not be empty".to_string())
    })?;
    if has_http_scheme(&base_url) {
        Ok(base_url)
    } else {
        Err(crate::Error::Config(
            "remote base URL must include http:// or https://".to_string(),
        ))
    }
}
