// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Collects every problem instead of stopping at the first one.

use crate::diagnostic::ConfigError;
use crate::model::WalinkConfig;

pub fn validate_config(config: &WalinkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !matches!(
        config.service.log_level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ConfigError::invalid(
            "service.log_level",
            format!(
                "expected one of trace, debug, info, warn, error; got `{}`",
                config.service.log_level
            ),
        ));
    }

    if config.session.credentials_dir.trim().is_empty() {
        errors.push(ConfigError::invalid(
            "session.credentials_dir",
            "must not be empty",
        ));
    }

    let device_id = &config.session.device_id;
    if device_id.is_empty()
        || !device_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        errors.push(ConfigError::invalid(
            "session.device_id",
            format!("must be non-empty and contain only [A-Za-z0-9_-], got `{device_id}`"),
        ));
    }

    let conn = &config.connection;
    if conn.reconnect_initial_ms == 0 {
        errors.push(ConfigError::invalid(
            "connection.reconnect_initial_ms",
            "must be greater than zero",
        ));
    }
    if conn.reconnect_max_ms < conn.reconnect_initial_ms {
        errors.push(ConfigError::invalid(
            "connection.reconnect_max_ms",
            format!(
                "must be at least reconnect_initial_ms ({}), got {}",
                conn.reconnect_initial_ms, conn.reconnect_max_ms
            ),
        ));
    }
    if !(conn.reconnect_multiplier >= 1.0) {
        errors.push(ConfigError::invalid(
            "connection.reconnect_multiplier",
            format!("must be at least 1.0, got {}", conn.reconnect_multiplier),
        ));
    }
    if !(0.0..=1.0).contains(&conn.reconnect_jitter) {
        errors.push(ConfigError::invalid(
            "connection.reconnect_jitter",
            format!("must be within 0.0..=1.0, got {}", conn.reconnect_jitter),
        ));
    }
    if conn.pairing_timeout_secs == 0 {
        errors.push(ConfigError::invalid(
            "connection.pairing_timeout_secs",
            "must be greater than zero",
        ));
    }

    let relay = &config.relay;
    for (key, value) in [
        ("relay.dedup_capacity", relay.dedup_capacity),
        ("relay.inbound_queue_depth", relay.inbound_queue_depth),
        ("relay.sink_queue_depth", relay.sink_queue_depth),
    ] {
        if value == 0 {
            errors.push(ConfigError::invalid(key, "must be greater than zero"));
        }
    }
    if relay.sink_timeout_secs == 0 {
        errors.push(ConfigError::invalid(
            "relay.sink_timeout_secs",
            "a per-sink timeout is mandatory and must be greater than zero",
        ));
    }

    if let Some(url) = &config.webhook.url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::invalid(
                "webhook.url",
                format!("must be an http(s) URL, got `{url}`"),
            ));
        }
        if config.webhook.secret.as_deref().is_none_or(str::is_empty) {
            errors.push(ConfigError::invalid(
                "webhook.secret",
                "is required when webhook.url is set",
            ));
        }
    }
    if config.webhook.secret_header.trim().is_empty() {
        errors.push(ConfigError::invalid(
            "webhook.secret_header",
            "must not be empty",
        ));
    }

    if config.storage.enabled && config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid(
            "storage.database_path",
            "must not be empty when storage is enabled",
        ));
    }

    if config.transport.command.trim().is_empty() {
        errors.push(ConfigError::invalid("transport.command", "must not be empty"));
    }
    if config.transport.send_timeout_secs == 0 {
        errors.push(ConfigError::invalid(
            "transport.send_timeout_secs",
            "must be greater than zero",
        ));
    }

    let host = config.gateway.host.trim();
    let is_valid_host = host.parse::<std::net::IpAddr>().is_ok()
        || (!host.is_empty()
            && host
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-'));
    if !is_valid_host {
        errors.push(ConfigError::invalid(
            "gateway.host",
            format!("`{host}` is not a valid IP address or hostname"),
        ));
    }
    if let Some(token) = &config.gateway.bearer_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::invalid(
            "gateway.bearer_token",
            "must not be blank; remove it or set a real token",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(errors: &[ConfigError]) -> Vec<&str> {
        errors
            .iter()
            .filter_map(|e| match e {
                ConfigError::Validation { key, .. } => Some(key.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&WalinkConfig::default()).is_ok());
    }

    #[test]
    fn webhook_without_secret_is_rejected() {
        let mut config = WalinkConfig::default();
        config.webhook.url = Some("https://example.com/hook".into());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(keys(&errors), vec!["webhook.secret"]);
    }

    #[test]
    fn backoff_bounds_are_checked() {
        let mut config = WalinkConfig::default();
        config.connection.reconnect_initial_ms = 5_000;
        config.connection.reconnect_max_ms = 1_000;
        config.connection.reconnect_jitter = 1.5;
        let errors = validate_config(&config).unwrap_err();
        let keys = keys(&errors);
        assert!(keys.contains(&"connection.reconnect_max_ms"));
        assert!(keys.contains(&"connection.reconnect_jitter"));
    }

    #[test]
    fn zero_sink_timeout_is_rejected() {
        let mut config = WalinkConfig::default();
        config.relay.sink_timeout_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(keys(&errors), vec!["relay.sink_timeout_secs"]);
    }

    #[test]
    fn device_id_must_be_path_safe() {
        let mut config = WalinkConfig::default();
        config.session.device_id = "../etc".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(keys(&errors), vec!["session.device_id"]);
    }

    #[test]
    fn parsed_file_is_validated_as_a_whole() {
        let config: WalinkConfig = toml::from_str(
            r#"
[webhook]
url = "https://example.com/hook"

[connection]
reconnect_initial_ms = 5000
reconnect_max_ms = 1000
"#,
        )
        .unwrap();
        let errors = validate_config(&config).unwrap_err();
        let keys = keys(&errors);
        assert!(keys.contains(&"webhook.secret"));
        assert!(keys.contains(&"connection.reconnect_max_ms"));
    }

    #[test]
    fn misspelled_key_fails_to_parse() {
        let result = toml::from_str::<WalinkConfig>("[gateway]\nprot = 8080\n");
        assert!(result.is_err());
    }

    #[test]
    fn all_errors_are_collected() {
        let mut config = WalinkConfig::default();
        config.service.log_level = "loud".into();
        config.gateway.host = "not a host!".into();
        config.relay.dedup_capacity = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
