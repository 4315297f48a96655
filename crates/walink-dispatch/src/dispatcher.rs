// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Validated, serialized outbound sends.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use walink_config::model::OutboundConfig;
use walink_connection::StatusFacade;
use walink_core::{MessageId, OutboundPayload, OutboundRequest, SendError, Transport};

use crate::address::normalize_target;

/// Sends one message at a time through the transport while the session is open.
pub struct OutboundDispatcher {
    status: StatusFacade,
    transport: Arc<dyn Transport>,
    in_flight: Mutex<()>,
    retry_delay: Duration,
}

impl OutboundDispatcher {
    pub fn new(
        status: StatusFacade,
        transport: Arc<dyn Transport>,
        config: &OutboundConfig,
    ) -> Self {
        Self {
            status,
            transport,
            in_flight: Mutex::new(()),
            retry_delay: Duration::from_millis(config.transient_retry_delay_ms),
        }
    }

    /// Send `payload` to `target`.
    ///
    /// Fails fast with [`SendError::NotConnected`] unless the session is open;
    /// nothing is queued. A transient transport failure is retried once.
    pub async fn send(
        &self,
        target: &str,
        payload: OutboundPayload,
    ) -> Result<MessageId, SendError> {
        if !self.status.is_open() {
            metrics::counter!("walink_outbound_rejected_total", "reason" => "not_connected")
                .increment(1);
            return Err(SendError::NotConnected);
        }

        let request = OutboundRequest {
            target: normalize_target(target)?,
            payload,
            requested_at: chrono::Utc::now(),
        };
        validate_payload(&request.payload)?;

        let _guard = self.in_flight.lock().await;
        // The session may have dropped while we waited for the previous send.
        if !self.status.is_open() {
            return Err(SendError::NotConnected);
        }

        let kind = request.payload.kind_label();
        let first = self
            .transport
            .send_message(&request.target, &request.payload)
            .await;
        let result = match first {
            Err(e) if e.is_transient() => {
                debug!(to = %request.target, error = %e, "transient send failure; retrying once");
                tokio::time::sleep(self.retry_delay).await;
                if self.status.is_open() {
                    self.transport
                        .send_message(&request.target, &request.payload)
                        .await
                } else {
                    Err(e)
                }
            }
            other => other,
        };

        let elapsed = (chrono::Utc::now() - request.requested_at)
            .to_std()
            .unwrap_or_default();
        metrics::histogram!("walink_outbound_send_seconds").record(elapsed.as_secs_f64());

        match result {
            Ok(id) => {
                metrics::counter!("walink_outbound_sent_total", "kind" => kind).increment(1);
                info!(
                    to = %request.target,
                    kind,
                    message_id = %id,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "message sent"
                );
                Ok(id)
            }
            Err(e) => {
                metrics::counter!("walink_outbound_failed_total", "kind" => kind).increment(1);
                warn!(to = %request.target, kind, error = %e, "send failed");
                Err(SendError::TransportFailure(e.to_string()))
            }
        }
    }
}

fn validate_payload(payload: &OutboundPayload) -> Result<(), SendError> {
    match payload {
        OutboundPayload::Text(text) if text.trim().is_empty() => Err(SendError::InvalidPayload(
            "message text is empty".to_string(),
        )),
        OutboundPayload::Media(media) if media.bytes.is_empty() => Err(
            SendError::InvalidPayload(format!("{} has no bytes", media.kind)),
        ),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walink_core::{MediaKind, MediaPayload};

    #[test]
    fn blank_text_is_invalid() {
        assert!(matches!(
            validate_payload(&OutboundPayload::Text(" \n".into())),
            Err(SendError::InvalidPayload(_))
        ));
        assert!(validate_payload(&OutboundPayload::Text("oi".into())).is_ok());
    }

    #[test]
    fn empty_media_is_invalid() {
        let media = MediaPayload {
            kind: MediaKind::Document,
            bytes: Vec::new(),
            mimetype: Some("application/pdf".into()),
            caption: None,
            file_name: Some("a.pdf".into()),
        };
        let err = validate_payload(&OutboundPayload::Media(media)).unwrap_err();
        assert_eq!(err, SendError::InvalidPayload("document has no bytes".into()));
    }
}
