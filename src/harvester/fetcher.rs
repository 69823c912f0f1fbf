//! HTTP fetcher implementation
//!
//! This module handles the raw HTTP requests made by the harvester:
//! - Building the shared HTTP client with the configured user agent
//! - Issuing GET requests to caller-assembled URLs
//! - Classifying failures into [`FetchError`]
//!
//! Nothing here retries or paces requests; callers wrap these calls in a
//! [`RetryPolicy`](crate::harvester::RetryPolicy).

use crate::config::ApiConfig;
use crate::FetchError;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The API configuration (user agent and timeouts)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use reddit_harvester::config::ApiConfig;
/// use reddit_harvester::harvester::build_http_client;
///
/// let client = build_http_client(&ApiConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and decodes the JSON body
///
/// The URL must already carry its query parameters.
///
/// # Errors
///
/// | Condition | Error |
/// |-----------|-------|
/// | Connection refused, timeout, TLS failure | `FetchError::Request` |
/// | Non-2xx status | `FetchError::Status` |
/// | Body is not the expected JSON | `FetchError::Decode` |
pub async fn fetch_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T, FetchError> {
    tracing::debug!("GET {}", url);
    send_json(client.get(url), url).await
}

/// Sends a prepared request and decodes the JSON body
///
/// Shared by [`fetch_json`] and the authenticated record client, which needs
/// to attach credentials before sending.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    url: &str,
) -> Result<T, FetchError> {
    let response = request.send().await.map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| FetchError::Request {
        url: url.to_string(),
        source,
    })?;

    serde_json::from_str(&body).map_err(|source| FetchError::Decode {
        url: url.to_string(),
        source,
    })
}
