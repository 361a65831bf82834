use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::debug;

use super::{FetchCapability, HttpResponse};
use crate::retry::RemoteError;

/// `reqwest`-backed [`FetchCapability`] sharing one connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    http: HttpClient,
}

impl ReqwestFetcher {
    /// Fails if the client cannot be built, e.g. for a user agent that is not a valid
    /// header value.
    pub fn new(user_agent: &str) -> Result<Self, reqwest::Error> {
        let http = HttpClient::builder().user_agent(user_agent).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl FetchCapability for ReqwestFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, RemoteError> {
        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| RemoteError::network(format!("{url}: {e}")))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::network(format!("{url}: reading body: {e}")))?;

        debug!(url, status, bytes = body.len(), "Fetched");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
