// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./walink.toml` > `~/.config/walink/walink.toml` > `/etc/walink/walink.toml`
//! with environment variable overrides via `WALINK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::WalinkConfig;

/// Section names recognized in `WALINK_<SECTION>_<KEY>` variables.
const SECTIONS: &[&str] = &[
    "service",
    "session",
    "connection",
    "relay",
    "webhook",
    "storage",
    "outbound",
    "transport",
    "gateway",
    "prometheus",
];

pub(crate) const SYSTEM_CONFIG: &str = "/etc/walink/walink.toml";
pub(crate) const LOCAL_CONFIG: &str = "walink.toml";

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("walink/walink.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/walink/walink.toml` (system-wide)
/// 3. `~/.config/walink/walink.toml` (user XDG config)
/// 4. `./walink.toml` (local directory)
/// 5. `WALINK_*` environment variables
pub fn load_config() -> Result<WalinkConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<WalinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WalinkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<WalinkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(WalinkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full layered Figment, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(WalinkConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG))
        .merge(env_provider())
}

/// Env provider mapping `WALINK_WEBHOOK_SECRET_HEADER` to `webhook.secret_header`.
///
/// Only the first underscore after a known section name becomes a dot, so keys
/// containing underscores survive intact.
fn env_provider() -> Env {
    Env::prefixed("WALINK_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_split_on_section_only() {
        assert_eq!(map_env_key("webhook_secret_header"), "webhook.secret_header");
        assert_eq!(
            map_env_key("connection_reconnect_max_ms"),
            "connection.reconnect_max_ms"
        );
        assert_eq!(map_env_key("gateway_bearer_token"), "gateway.bearer_token");
    }

    #[test]
    fn unknown_section_is_left_alone() {
        assert_eq!(map_env_key("something_else"), "something_else");
    }

    #[test]
    fn env_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("WALINK_GATEWAY_PORT", "8081");
            jail.set_env("WALINK_WEBHOOK_URL", "https://hooks.example.com/in");
            let config = load_config()?;
            assert_eq!(config.gateway.port, 8081);
            assert_eq!(
                config.webhook.url.as_deref(),
                Some("https://hooks.example.com/in")
            );
            Ok(())
        });
    }

    #[test]
    fn local_file_is_picked_up() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "walink.toml",
                r#"
                [session]
                device_id = "shop-phone"
                "#,
            )?;
            let config = load_config()?;
            assert_eq!(config.session.device_id, "shop-phone");
            Ok(())
        });
    }
}
