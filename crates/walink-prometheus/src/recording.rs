// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Descriptions for every metric walink emits.
//!
//! The metrics themselves are recorded where they happen through the
//! metrics-rs facade; this only attaches help text for the exporter.

use metrics::{describe_counter, describe_gauge, describe_histogram};

/// Register all walink metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "walink_connection_transitions_total",
        "Connection phase transitions, by target phase"
    );
    describe_gauge!(
        "walink_connection_open",
        "1 while the session is open, 0 otherwise"
    );
    describe_counter!(
        "walink_connection_rejected_transitions_total",
        "Transitions refused by the connection state graph"
    );
    describe_counter!(
        "walink_connection_reconnects_total",
        "Reconnect attempts scheduled by the supervisor"
    );
    describe_counter!(
        "walink_credential_failures_total",
        "Credential writes that failed and closed the session"
    );
    describe_counter!(
        "walink_relay_dispatched_total",
        "Inbound messages handed to the sinks"
    );
    describe_counter!(
        "walink_relay_duplicates_total",
        "Inbound messages discarded as duplicates"
    );
    describe_counter!(
        "walink_relay_sink_dropped_total",
        "Messages dropped because a sink queue was full"
    );
    describe_counter!(
        "walink_relay_sink_failures_total",
        "Deliveries abandoned after exhausting retries"
    );
    describe_counter!("walink_outbound_sent_total", "Messages sent, by kind");
    describe_counter!(
        "walink_outbound_failed_total",
        "Sends that failed in the transport, by kind"
    );
    describe_counter!(
        "walink_outbound_rejected_total",
        "Sends refused before reaching the transport"
    );
    describe_histogram!(
        "walink_outbound_send_seconds",
        "Time from accepting a send to its outcome"
    );
}
