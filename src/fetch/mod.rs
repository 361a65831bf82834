//! HTTP fetch capability and response classification.
//!
//! The pipeline only sees [`FetchCapability`]; [`ReqwestFetcher`] is the production
//! implementation and `MockFetcher` replays scripted responses in tests.

pub mod client;
#[cfg(any(test, feature = "mock"))]
pub mod mock;


pub use client::ReqwestFetcher;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockFetcher;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::retry::{Execution, RemoteError, RetryableExecutor};

/// Raw HTTP response as seen by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

#[async_trait]
/// Issues one GET request. Transport failures map to [`RemoteError::Network`]; any HTTP
/// status is returned as a response.
pub trait FetchCapability: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, RemoteError>;
}

/// Parses an integer-seconds `Retry-After` value. HTTP-date values are ignored.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Maps a response onto the error taxonomy.
///
/// 429 is a rate limit (with its `Retry-After` hint), 408 and 5xx are transient, every other
/// 4xx is a terminal client error. Anything else passes through.
pub fn classify_response(url: &str, response: HttpResponse) -> Result<HttpResponse, RemoteError> {
    match response.status {
        429 => Err(RemoteError::RateLimited {
            retry_after: response.header("retry-after").and_then(parse_retry_after),
        }),
        408 | 500..=599 => Err(RemoteError::network(format!(
            "HTTP {} from {url}",
            response.status
        ))),
        400..=499 => Err(RemoteError::Client {
            status: response.status,
            url: url.to_string(),
        }),
        _ => Ok(response),
    }
}

/// Fetches `url` under the executor's retry policy.
pub async fn fetch_with_retry(
    executor: &RetryableExecutor,
    fetcher: &dyn FetchCapability,
    url: &str,
    timeout: Duration,
) -> Execution<HttpResponse> {
    executor
        .execute(url, || async move {
            let response = fetcher.get(url, timeout).await?;
            classify_response(url, response)
        })
        .await
}
