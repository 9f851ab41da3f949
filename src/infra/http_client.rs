//! HTTP client factory with consistent timeout configuration.
//!
//! Every outbound provider and notification client is built here so that a
//! stuck provider call is bounded instead of stalling a webhook indefinitely.

use reqwest::Client;
use std::time::Duration;

use crate::app_error::{AppError, AppResult};

/// Default connect timeout (TCP handshake + TLS).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default request timeout (total request/response time).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build an HTTP client with default timeouts.
pub fn build_client() -> AppResult<Client> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(DEFAULT_REQUEST_TIMEOUT)
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Send a request, mapping transport failures to a provider error.
pub async fn send(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> AppResult<reqwest::Response> {
    request
        .send()
        .await
        .map_err(|e| AppError::Provider(format!("{provider} request failed: {e}")))
}

/// Read a response body and parse it as JSON, logging non-success bodies.
pub async fn read_json<T: for<'de> serde::Deserialize<'de>>(
    provider: &str,
    response: reqwest::Response,
) -> AppResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AppError::Provider(format!("Failed to read {provider} response: {e}")))?;

    if !status.is_success() {
        tracing::error!(provider, status = %status, body = %body, "Payment provider API error");
        return Err(AppError::Provider(format!(
            "{provider} API error ({status})"
        )));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::error!(provider, error = %e, body = %body, "Failed to parse provider response");
        AppError::Provider(format!("Failed to parse {provider} response: {e}"))
    })
}

/// Require a specific status code, logging the body otherwise.
pub async fn expect_status(
    provider: &str,
    response: reqwest::Response,
    expected: reqwest::StatusCode,
) -> AppResult<()> {
    let status = response.status();
    if status == expected {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    tracing::error!(provider, status = %status, expected = %expected, body = %body, "Unexpected provider response");
    Err(AppError::Provider(format!(
        "{provider} returned {status}, expected {expected}"
    )))
}
