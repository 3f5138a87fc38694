//! REST client for the game backend API

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::config::Config;

/// Client for the backend's `/api` routes
#[derive(Clone)]
pub struct ArenaApiClient {
    client: Client,
    base_url: String,
}

impl ArenaApiClient {
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.arena_api_url)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the URL of a route under the API root
    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST a JSON body, parse a JSON response
    pub async fn post<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        data: &T,
    ) -> Result<R, ApiError> {
        let response = self
            .client
            .post(self.api_url(path))
            .header("Content-Type", "application/json")
            .json(data)
            .send()
            .await
            .map_err(ApiError::Request)?;

        Self::parse(response).await
    }

    /// PUT a JSON body, parse a JSON response
    pub async fn put<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        data: &T,
    ) -> Result<R, ApiError> {
        let response = self
            .client
            .put(self.api_url(path))
            .header("Content-Type", "application/json")
            .json(data)
            .send()
            .await
            .map_err(ApiError::Request)?;

        Self::parse(response).await
    }

    async fn parse<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ApiError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(ApiError::Parse)
    }
}

/// Backend API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_join_without_double_slashes() {
        let client = ArenaApiClient::with_base_url("http://localhost:8001/api/");
        assert_eq!(
            client.api_url("/game/session"),
            "http://localhost:8001/api/game/session"
        );
        assert_eq!(
            client.api_url("game/session/abc"),
            "http://localhost:8001/api/game/session/abc"
        );
    }
}
