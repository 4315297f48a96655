// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use walink_core::{ConnectionPhase, MediaKind, MediaPayload, OutboundPayload, SendError};

use crate::server::GatewayState;

/// Body of `POST /send`.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub to: String,
    #[serde(default)]
    pub message: Option<String>,
    /// `text` (default), `image`, `audio`, `video` or `document`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub media_base64: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl SendRequest {
    fn into_payload(self) -> Result<(String, OutboundPayload), SendError> {
        let kind = self.kind.as_deref().unwrap_or("text");
        if kind == "text" {
            return Ok((self.to, OutboundPayload::Text(self.message.unwrap_or_default())));
        }

        let media_kind: MediaKind = kind
            .parse()
            .map_err(|_| SendError::InvalidPayload(format!("unknown message type '{kind}'")))?;
        let encoded = self.media_base64.unwrap_or_default();
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SendError::InvalidPayload(format!("media_base64 is not valid base64: {e}")))?;
        let payload = OutboundPayload::Media(MediaPayload {
            kind: media_kind,
            bytes,
            mimetype: self.mimetype,
            // A plain `message` doubles as the caption.
            caption: self.caption.or(self.message),
            file_name: self.file_name,
        });
        Ok((self.to, payload))
    }
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub phase: ConnectionPhase,
    pub connected: bool,
    pub device_number: Option<String>,
    pub pairing_code: Option<String>,
    pub last_transition: DateTime<Utc>,
    pub last_close_reason: Option<String>,
    pub reconnect_attempt: u32,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub phase: ConnectionPhase,
}

#[derive(Debug, Deserialize)]
pub struct QrQuery {
    #[serde(default)]
    pub format: Option<String>,
}

fn error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: message.into(),
        }),
    )
        .into_response()
}

pub(crate) fn send_error_response(err: &SendError) -> Response {
    let (status, code) = match err {
        SendError::NotConnected => (StatusCode::SERVICE_UNAVAILABLE, "not_connected"),
        SendError::InvalidTarget(_) => (StatusCode::BAD_REQUEST, "invalid_target"),
        SendError::InvalidPayload(_) => (StatusCode::BAD_REQUEST, "invalid_payload"),
        SendError::TransportFailure(_) => (StatusCode::BAD_GATEWAY, "transport_failure"),
    };
    error(status, code, err.to_string())
}

/// GET /status
pub async fn get_status(State(state): State<GatewayState>) -> Json<StatusResponse> {
    let snapshot = state.status.current();
    Json(StatusResponse {
        phase: snapshot.phase(),
        connected: snapshot.is_open(),
        device_number: snapshot.device_number().map(str::to_string),
        pairing_code: state.status.pairing_code(),
        last_transition: snapshot.last_transition(),
        last_close_reason: snapshot.last_close_reason().map(|r| r.to_string()),
        reconnect_attempt: snapshot.reconnect_attempt(),
    })
}

/// POST /send
pub async fn post_send(
    State(state): State<GatewayState>,
    Json(body): Json<SendRequest>,
) -> Response {
    let (to, payload) = match body.into_payload() {
        Ok(parts) => parts,
        Err(e) => return send_error_response(&e),
    };
    match state.dispatcher.send(&to, payload).await {
        Ok(id) => (StatusCode::OK, Json(SendResponse { id: id.0 })).into_response(),
        Err(e) => send_error_response(&e),
    }
}

/// GET /logout
pub async fn get_logout(State(state): State<GatewayState>) -> Response {
    match state.supervisor.logout().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "logged_out" })),
        )
            .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "logout failed");
            error(StatusCode::INTERNAL_SERVER_ERROR, "logout_failed", e.to_string())
        }
    }
}

/// GET /qr
///
/// The pairing code as JSON, or as an SVG QR image with `?format=svg`.
pub async fn get_qr(State(state): State<GatewayState>, Query(query): Query<QrQuery>) -> Response {
    let Some(code) = state.status.pairing_code() else {
        let message = match state.status.phase() {
            ConnectionPhase::Open => "already paired; no pairing code",
            _ => "pairing code not generated yet, retry in a few seconds",
        };
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "message": message })),
        )
            .into_response();
    };

    if query.format.as_deref() == Some("svg") {
        return match render_svg(&code) {
            Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
            Err(e) => error(StatusCode::INTERNAL_SERVER_ERROR, "qr_render_failed", e),
        };
    }
    Json(serde_json::json!({ "pairing_code": code })).into_response()
}

fn render_svg(code: &str) -> Result<String, String> {
    use qrcode::render::svg;
    let qr = qrcode::QrCode::new(code.as_bytes()).map_err(|e| e.to_string())?;
    Ok(qr
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .build())
}

/// GET /health (public)
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        phase: state.status.phase(),
    })
}

/// GET /metrics (public)
pub async fn get_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}
