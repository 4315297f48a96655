// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `walink logout` command implementation.

use serde::Deserialize;
use walink_config::WalinkConfig;
use walink_core::WalinkError;

use crate::client::GatewayClient;

#[derive(Debug, Deserialize)]
struct LogoutResponse {
    status: String,
}

/// Ask the running service to unlink the device and clear its credentials.
pub async fn run_logout(config: &WalinkConfig) -> Result<(), WalinkError> {
    if config.gateway.bearer_token.is_none() {
        return Err(WalinkError::Config(
            "gateway.bearer_token is required to call the running service".to_string(),
        ));
    }

    let client = GatewayClient::new(&config.gateway)?;
    let response: LogoutResponse = client.get_json("/logout").await?;
    println!("walink: {}", response.status.replace('_', " "));
    Ok(())
}
