//! HTTP client implementation
//!
//! A `reqwest` backed implementation of [`DirectoryApi`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client as ReqwestClient, Error as ReqwestError};
use serde::de::DeserializeOwned;

use super::DirectoryApi;
use crate::models::{BlogPost, Event, Listing, SearchParams, SearchResponse};

/// Base URL of the hosted API
pub const DEFAULT_BASE_URL: &str = "https://stg-api.abilitynetwork.in/api";

/// Per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// API client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] ReqwestError),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// HTTP client for the remote directory API
#[derive(Debug, Clone)]
pub struct HttpClient {
    http_client: Arc<ReqwestClient>,
    config: ClientConfig,
}

impl HttpClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self, ClientError> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self, ClientError> {
        let http_client = ReqwestClient::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client: Arc::new(http_client),
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        tracing::debug!(%url, ?query, "GET");

        let response = self.http_client.get(&url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait::async_trait]
impl DirectoryApi for HttpClient {
    async fn search_services(
        &self,
        params: &SearchParams,
    ) -> Result<SearchResponse, ClientError> {
        self.get_json("services/search", &params.to_query_pairs())
            .await
    }

    async fn blogs(&self) -> Result<Vec<BlogPost>, ClientError> {
        let listing: Listing<BlogPost> = self.get_json("blogs", &[]).await?;
        Ok(listing.into_items())
    }

    async fn events(&self) -> Result<Vec<Event>, ClientError> {
        let listing: Listing<Event> = self.get_json("events", &[]).await?;
        Ok(listing.into_items())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = HttpClient::with_config(ClientConfig {
            base_url: "http://localhost:9000/api/".to_string(),
            timeout: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(
            client.url("services/search"),
            "http://localhost:9000/api/services/search"
        );
    }

    #[test]
    fn test_default_config_points_at_hosted_api() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
