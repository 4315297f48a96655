// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook sink: POSTs each inbound message as JSON.
//!
//! Requests carry the shared secret in a configurable header and an
//! `x-walink-signature: sha256=<hex>` HMAC of the exact body bytes.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use serde::Serialize;
use sha2::Sha256;
use tracing::debug;
use walink_config::model::WebhookConfig;
use walink_core::{
    AdapterType, HealthStatus, InboundMessage, MediaRef, MessageSink, PluginAdapter, WalinkError,
};

pub const SIGNATURE_HEADER: &str = "x-walink-signature";

const SINK_NAME: &str = "webhook";

/// Body posted for every inbound message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload<'a> {
    pub from: &'a str,
    pub message: &'a str,
    pub name: Option<&'a str>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<&'a MediaRef>,
    pub from_me: bool,
    pub timestamp: i64,
}

impl<'a> WebhookPayload<'a> {
    pub fn from_message(message: &'a InboundMessage) -> Self {
        Self {
            from: message.sender_number(),
            message: &message.body,
            name: message.sender_name.as_deref(),
            kind: message.kind.to_string(),
            media: message.media.as_ref(),
            from_me: false,
            timestamp: message.timestamp.timestamp(),
        }
    }
}

/// `sha256=<hex HMAC-SHA256(secret, body)>`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, WalinkError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| WalinkError::Internal(format!("invalid HMAC key: {e}")))?;
    mac.update(body);
    Ok(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: reqwest::Client,
    url: String,
    secret: Option<String>,
    secret_header: HeaderName,
}

impl WebhookSink {
    pub fn new(
        url: impl Into<String>,
        secret: Option<String>,
        secret_header: &str,
    ) -> Result<Self, WalinkError> {
        let secret_header = HeaderName::from_bytes(secret_header.as_bytes()).map_err(|e| {
            WalinkError::Config(format!("invalid webhook secret header '{secret_header}': {e}"))
        })?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WalinkError::Sink {
                sink: SINK_NAME.to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            url: url.into(),
            secret,
            secret_header,
        })
    }

    /// `None` while no webhook URL is configured.
    pub fn from_config(config: &WebhookConfig) -> Result<Option<Self>, WalinkError> {
        match &config.url {
            Some(url) => Self::new(url, config.secret.clone(), &config.secret_header).map(Some),
            None => Ok(None),
        }
    }

    fn sink_error(&self, message: String) -> WalinkError {
        WalinkError::Sink {
            sink: SINK_NAME.to_string(),
            message,
        }
    }
}

#[async_trait]
impl PluginAdapter for WebhookSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sink
    }

    async fn health_check(&self) -> Result<HealthStatus, WalinkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WalinkError> {
        Ok(())
    }
}

#[async_trait]
impl MessageSink for WebhookSink {
    async fn deliver(&self, message: &InboundMessage) -> Result<(), WalinkError> {
        let body = serde_json::to_vec(&WebhookPayload::from_message(message))
            .map_err(|e| self.sink_error(format!("failed to encode payload: {e}")))?;

        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(secret) = &self.secret {
            let secret_value = HeaderValue::from_str(secret)
                .map_err(|e| self.sink_error(format!("invalid secret header value: {e}")))?;
            request = request
                .header(self.secret_header.clone(), secret_value)
                .header(SIGNATURE_HEADER, sign(secret, &body)?);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| self.sink_error(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.sink_error(format!("endpoint returned {status}")));
        }
        debug!(message_id = %message.id, %status, "webhook delivered");
        Ok(())
    }
}
