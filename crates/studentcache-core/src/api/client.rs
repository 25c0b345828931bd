//! HTTP implementation of `AcademicSource` over the dashboard's REST API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{AttendanceEntry, AttendanceStats, GradeEntry, GradeStats, HistoryRecord};

use super::{AcademicSource, ApiError};

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// The fetcher applies its own, shorter, per-call timeout on top of this.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// REST client for the academic endpoints.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpAcademicSource {
    client: Client,
    base_url: Arc<str>,
    token: Option<Arc<str>>,
    initial_backoff: Duration,
}

impl HttpAcademicSource {
    /// Create a new client for the API rooted at `base_url`
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.as_ref().trim_end_matches('/')),
            token: None,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Use a bearer token for every request
    pub fn with_token(mut self, token: impl AsRef<str>) -> Self {
        self.token = Some(Arc::from(token.as_ref()));
        self
    }

    /// Override the first backoff delay used after a 429 response
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    fn student_url(&self, student_id: i64, endpoint: &str) -> String {
        format!("{}/estudiantes/{}/{}", self.base_url, student_id, endpoint)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("Invalid characters in API token")?,
            );
        }
        Ok(headers)
    }

    /// Send a GET for one student endpoint, retrying on 429 with exponential
    /// backoff. Returns the raw successful or non-retryable response.
    async fn send_get(
        &self,
        student_id: i64,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        let url = self.student_url(student_id, endpoint);
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let mut request = self.client.get(&url).headers(self.auth_headers()?);
            if !query.is_empty() {
                request = request.query(query);
            }
            let response = request.send().await.map_err(|source| ApiError::Network {
                endpoint: endpoint.to_string(),
                source,
            })?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            if retries == MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited {
                    endpoint: endpoint.to_string(),
                    retries,
                }
                .into());
            }
            retries += 1;
            warn!(
                student_id,
                endpoint,
                retry = retries,
                backoff_ms = backoff.as_millis() as u64,
                "Rate limited, backing off"
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(endpoint, status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        student_id: i64,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let response = self.send_get(student_id, endpoint, query).await?;
        let response = Self::check_response(endpoint, response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", endpoint))
    }

    /// Like `get`, but a 404 or a `null` body means "nothing there".
    async fn get_optional<T: DeserializeOwned>(
        &self,
        student_id: i64,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>> {
        let response = self.send_get(student_id, endpoint, query).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(student_id, endpoint, "No resource at endpoint, treating as empty");
            return Ok(None);
        }
        let response = Self::check_response(endpoint, response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", endpoint))
    }
}

#[async_trait]
impl AcademicSource for HttpAcademicSource {
    async fn fetch_history(&self, student_id: i64, year: i32) -> Result<Vec<HistoryRecord>> {
        self.get(student_id, "historial-academico", &[("anio", year.to_string())]).await
    }

    async fn fetch_grades(&self, student_id: i64, year: i32) -> Result<Vec<GradeEntry>> {
        self.get(student_id, "seguimiento-academico", &[("anio", year.to_string())]).await
    }

    async fn fetch_attendance(&self, student_id: i64) -> Result<Vec<AttendanceEntry>> {
        self.get(student_id, "asistencia", &[]).await
    }

    async fn fetch_grade_stats(&self, student_id: i64, year: i32) -> Result<Option<GradeStats>> {
        self.get_optional(student_id, "estadisticas/seguimiento", &[("anio", year.to_string())])
            .await
    }

    async fn fetch_attendance_stats(
        &self,
        student_id: i64,
        year: i32,
    ) -> Result<Option<AttendanceStats>> {
        self.get_optional(student_id, "estadisticas/asistencia", &[("anio", year.to_string())])
            .await
    }
}
