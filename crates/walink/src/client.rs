// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal HTTP client for talking to a running `walink serve`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use walink_config::model::GatewayConfig;
use walink_core::WalinkError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Client bound to the configured gateway address.
pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl GatewayClient {
    pub fn new(config: &GatewayConfig) -> Result<Self, WalinkError> {
        Self::with_base_url(
            format!("http://{}:{}", config.host, config.port),
            config.bearer_token.clone(),
        )
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        bearer_token: Option<String>,
    ) -> Result<Self, WalinkError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| WalinkError::Internal(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `path`, attaching the bearer token when one is configured.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, WalinkError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| WalinkError::Internal(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WalinkError::Internal(format!(
                "{url} returned {status}: {}",
                body.trim()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| WalinkError::Internal(format!("failed to parse response from {url}: {e}")))
    }
}
