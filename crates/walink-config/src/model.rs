// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level walink configuration.
///
/// Every section is optional and defaults to values that run a local
/// instance with no sinks.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WalinkConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub relay: RelayConfig,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub outbound: OutboundConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where session credentials live.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Directory holding `<device_id>.json` and its lock file.
    #[serde(default = "default_credentials_dir")]
    pub credentials_dir: String,

    /// Identity of the linked device. One process per device id.
    #[serde(default = "default_device_id")]
    pub device_id: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            credentials_dir: default_credentials_dir(),
            device_id: default_device_id(),
        }
    }
}

fn default_credentials_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("walink").join("auth"))
        .unwrap_or_else(|| std::path::PathBuf::from("auth_info"))
        .to_string_lossy()
        .into_owned()
}

fn default_device_id() -> String {
    "default".to_string()
}

/// Reconnection policy and lifecycle timing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Delay before the first reconnect attempt.
    #[serde(default = "default_reconnect_initial_ms")]
    pub reconnect_initial_ms: u64,

    /// Upper bound on the reconnect delay.
    #[serde(default = "default_reconnect_max_ms")]
    pub reconnect_max_ms: u64,

    /// Growth factor applied per consecutive failed attempt.
    #[serde(default = "default_reconnect_multiplier")]
    pub reconnect_multiplier: f64,

    /// Fraction of the delay that is randomized (0.0 - 1.0).
    #[serde(default = "default_reconnect_jitter")]
    pub reconnect_jitter: f64,

    /// How long a session may stay in pairing before it is abandoned.
    #[serde(default = "default_pairing_timeout_secs")]
    pub pairing_timeout_secs: u64,

    /// How long `stop()` waits for the driver before aborting it.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_initial_ms: default_reconnect_initial_ms(),
            reconnect_max_ms: default_reconnect_max_ms(),
            reconnect_multiplier: default_reconnect_multiplier(),
            reconnect_jitter: default_reconnect_jitter(),
            pairing_timeout_secs: default_pairing_timeout_secs(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl ConnectionConfig {
    pub fn pairing_timeout(&self) -> Duration {
        Duration::from_secs(self.pairing_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn default_reconnect_initial_ms() -> u64 {
    1_000
}

fn default_reconnect_max_ms() -> u64 {
    60_000
}

fn default_reconnect_multiplier() -> f64 {
    2.0
}

fn default_reconnect_jitter() -> f64 {
    0.2
}

fn default_pairing_timeout_secs() -> u64 {
    120
}

fn default_shutdown_grace_secs() -> u64 {
    5
}

/// Inbound relay: dedup window and sink delivery.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Number of recent message ids remembered for deduplication.
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,

    /// Depth of the queue between the connection driver and the relay.
    #[serde(default = "default_inbound_queue_depth")]
    pub inbound_queue_depth: usize,

    /// Depth of each sink's delivery queue.
    #[serde(default = "default_sink_queue_depth")]
    pub sink_queue_depth: usize,

    /// Per-delivery timeout.
    #[serde(default = "default_sink_timeout_secs")]
    pub sink_timeout_secs: u64,

    /// Retries after the first failed delivery.
    #[serde(default = "default_sink_retries")]
    pub sink_retries: u32,

    /// Base delay between retries; doubled per attempt.
    #[serde(default = "default_sink_retry_backoff_ms")]
    pub sink_retry_backoff_ms: u64,

    /// How long in-flight deliveries may finish during shutdown.
    #[serde(default = "default_relay_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            dedup_capacity: default_dedup_capacity(),
            inbound_queue_depth: default_inbound_queue_depth(),
            sink_queue_depth: default_sink_queue_depth(),
            sink_timeout_secs: default_sink_timeout_secs(),
            sink_retries: default_sink_retries(),
            sink_retry_backoff_ms: default_sink_retry_backoff_ms(),
            shutdown_grace_secs: default_relay_shutdown_grace_secs(),
        }
    }
}

fn default_dedup_capacity() -> usize {
    1_024
}

fn default_inbound_queue_depth() -> usize {
    64
}

fn default_sink_queue_depth() -> usize {
    256
}

fn default_sink_timeout_secs() -> u64 {
    10
}

fn default_sink_retries() -> u32 {
    2
}

fn default_sink_retry_backoff_ms() -> u64 {
    500
}

fn default_relay_shutdown_grace_secs() -> u64 {
    5
}

/// Webhook sink. Disabled while `url` is unset.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: Option<String>,

    /// Shared secret sent in `secret_header` and used for the body signature.
    #[serde(default)]
    pub secret: Option<String>,

    #[serde(default = "default_secret_header")]
    pub secret_header: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            secret: None,
            secret_header: default_secret_header(),
        }
    }
}

fn default_secret_header() -> String {
    "x-webhook-secret".to_string()
}

/// SQLite message log sink.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_storage_enabled")]
    pub enabled: bool,

    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_storage_enabled(),
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_storage_enabled() -> bool {
    true
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("walink").join("messages.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("walink.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Outbound send behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutboundConfig {
    /// Pause before the single retry of a transient failure.
    #[serde(default = "default_transient_retry_delay_ms")]
    pub transient_retry_delay_ms: u64,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            transient_retry_delay_ms: default_transient_retry_delay_ms(),
        }
    }
}

fn default_transient_retry_delay_ms() -> u64 {
    500
}

/// External protocol process.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    /// Executable that speaks the JSON-lines sidecar protocol.
    #[serde(default = "default_transport_command")]
    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// How long a send may wait for its result.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            command: default_transport_command(),
            args: Vec::new(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

fn default_transport_command() -> String {
    "walink-bridge".to_string()
}

fn default_send_timeout_secs() -> u64 {
    30
}

/// HTTP control surface.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_enabled")]
    pub enabled: bool,

    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for the control routes. The server refuses to start without one.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Largest accepted `/send` body in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: default_gateway_enabled(),
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

fn default_gateway_enabled() -> bool {
    true
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    16 * 1024 * 1024
}

/// Prometheus metrics exporter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    #[serde(default = "default_prometheus_enabled")]
    pub enabled: bool,
}

impl Default for PrometheusConfig {
    fn default() -> Self {
        Self {
            enabled: default_prometheus_enabled(),
        }
    }
}

fn default_prometheus_enabled() -> bool {
    true
}
