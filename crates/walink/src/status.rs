// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `walink status` command implementation.
//!
//! Asks a running gateway for its health and connection snapshot. Falls back
//! gracefully when the service is not running.

use std::io::IsTerminal;

use serde::{Deserialize, Serialize};
use walink_config::WalinkConfig;
use walink_core::WalinkError;

use crate::client::GatewayClient;

/// `/health` response from the gateway.
#[derive(Debug, Deserialize)]
struct HealthResponse {
    uptime_secs: u64,
}

/// `/status` response from the gateway.
#[derive(Debug, Deserialize)]
struct ConnectionStatus {
    phase: String,
    connected: bool,
    device_number: Option<String>,
    pairing_code: Option<String>,
    last_close_reason: Option<String>,
    reconnect_attempt: u32,
}

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub running: bool,
    pub phase: Option<String>,
    pub connected: bool,
    pub device_number: Option<String>,
    pub pairing: bool,
    pub last_close_reason: Option<String>,
    pub reconnect_attempt: Option<u32>,
    pub uptime_secs: Option<u64>,
    pub uptime_human: Option<String>,
    pub endpoint: String,
    /// Why the connection details are missing, if they are.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_error: Option<String>,
}

impl StatusReport {
    fn offline(endpoint: String) -> Self {
        Self {
            running: false,
            phase: None,
            connected: false,
            device_number: None,
            pairing: false,
            last_close_reason: None,
            reconnect_attempt: None,
            uptime_secs: None,
            uptime_human: None,
            endpoint,
            detail_error: None,
        }
    }
}

/// Format seconds into a human-readable duration string.
fn format_uptime(secs: u64) -> String {
    let days = secs / 86400;
    let hours = (secs % 86400) / 3600;
    let minutes = (secs % 3600) / 60;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Query the gateway and build a report. Never fails on an unreachable service.
pub async fn collect_status(client: &GatewayClient) -> StatusReport {
    let mut report = StatusReport::offline(client.base_url().to_string());

    let Ok(health) = client.get_json::<HealthResponse>("/health").await else {
        return report;
    };
    report.running = true;
    report.uptime_secs = Some(health.uptime_secs);
    report.uptime_human = Some(format_uptime(health.uptime_secs));

    match client.get_json::<ConnectionStatus>("/status").await {
        Ok(status) => {
            report.phase = Some(status.phase);
            report.connected = status.connected;
            report.device_number = status.device_number;
            report.pairing = status.pairing_code.is_some();
            report.last_close_reason = status.last_close_reason;
            report.reconnect_attempt = Some(status.reconnect_attempt);
        }
        Err(e) => report.detail_error = Some(e.to_string()),
    }
    report
}

/// Run the `walink status` command.
///
/// If `--json` is passed, outputs structured JSON for scripting.
/// If `--plain` is passed or stdout is not a TTY, disables colors.
pub async fn run_status(config: &WalinkConfig, json: bool, plain: bool) -> Result<(), WalinkError> {
    let client = GatewayClient::new(&config.gateway)?;
    let report = collect_status(&client).await;

    if json {
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| WalinkError::Internal(format!("failed to render status: {e}")))?;
        println!("{rendered}");
    } else {
        let use_color = !plain && std::io::stdout().is_terminal();
        if report.running {
            print_status_running(&report, use_color);
        } else {
            print_status_offline(&report.endpoint, use_color);
        }
    }

    Ok(())
}

fn print_status_running(report: &StatusReport, use_color: bool) {
    use colored::Colorize;

    let uptime = report.uptime_human.as_deref().unwrap_or("?");
    let phase = report.phase.as_deref().unwrap_or("unknown");

    println!();
    println!("  walink status");
    println!("  {}", "-".repeat(35));

    if use_color {
        let marker = if report.connected {
            "✓".green()
        } else {
            "!".yellow()
        };
        let phase = if report.connected {
            phase.green()
        } else {
            phase.yellow()
        };
        println!("    Session:  {marker} {phase} (uptime: {uptime})");
    } else {
        let marker = if report.connected { "[OK]" } else { "[WAIT]" };
        println!("    Session:  {marker} {phase} (uptime: {uptime})");
    }

    if let Some(number) = &report.device_number {
        println!("    Device:   {number}");
    }
    if report.pairing {
        println!("    Pairing:  code available at {}/qr", report.endpoint);
    }
    if let Some(reason) = &report.last_close_reason {
        println!("    Closed:   {reason}");
    }
    if let Some(attempt) = report.reconnect_attempt.filter(|a| *a > 0) {
        println!("    Retries:  {attempt}");
    }
    if let Some(err) = &report.detail_error {
        println!("    Details:  unavailable ({err})");
    }
    println!();
}

fn print_status_offline(endpoint: &str, use_color: bool) {
    println!();
    println!("  walink status");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        println!("    Session:  {} {}", "✗".red(), "not running".red());
    } else {
        println!("    Session:  [FAIL] not running");
    }

    println!("    Endpoint: {endpoint}/health");
    println!();
    println!("  Start with: walink serve");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_uptime_minutes() {
        assert_eq!(format_uptime(120), "2m");
    }

    #[test]
    fn format_uptime_hours() {
        assert_eq!(format_uptime(3720), "1h 2m");
    }

    #[test]
    fn format_uptime_days() {
        assert_eq!(format_uptime(90060), "1d 1h 1m");
    }

    #[test]
    fn offline_report_serializes() {
        let report = StatusReport::offline("http://127.0.0.1:3000".into());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["running"], false);
        assert_eq!(json["phase"], serde_json::Value::Null);
        assert!(json.get("detail_error").is_none());
    }

    #[tokio::test]
    async fn unreachable_gateway_reports_not_running() {
        // Port 9 (discard) is not served on test hosts.
        let client = GatewayClient::with_base_url("http://127.0.0.1:9", None).unwrap();
        let report = collect_status(&client).await;
        assert!(!report.running);
        assert_eq!(report.endpoint, "http://127.0.0.1:9");
    }
}
