// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `walink serve` command implementation.
//!
//! Assembles the service, starts the connection supervisor and the HTTP
//! gateway, and runs until SIGINT or SIGTERM.

use tracing::{error, info, warn};
use walink_config::WalinkConfig;
use walink_connection::shutdown;
use walink_core::WalinkError;

use crate::service::{Service, ServiceBuilder};

/// Runs the `walink serve` command.
pub async fn run_serve(config: WalinkConfig) -> Result<(), WalinkError> {
    init_tracing(&config.service.log_level);

    info!(version = env!("CARGO_PKG_VERSION"), "starting walink serve");

    let builder = attach_metrics(Service::builder(config.clone()), &config);
    let service = builder.build().await?;
    let cancel = shutdown::install_signal_handler();

    service.start().await;

    if config.gateway.enabled {
        let gateway_cancel = cancel.child_token();
        let result =
            walink_gateway::start_server(&config.gateway, service.gateway_state(), gateway_cancel)
                .await;
        if let Err(e) = result {
            error!(error = %e, "gateway failed");
            cancel.cancel();
            service.shutdown().await;
            return Err(e);
        }
    } else {
        warn!("gateway disabled; the service can only be stopped by a signal");
        cancel.cancelled().await;
    }

    cancel.cancel();
    service.shutdown().await;

    info!("walink serve shutdown complete");
    Ok(())
}

/// Install the Prometheus recorder (if enabled and compiled in).
#[cfg(feature = "prometheus")]
fn attach_metrics(builder: ServiceBuilder, config: &WalinkConfig) -> ServiceBuilder {
    if !config.prometheus.enabled {
        info!("prometheus metrics disabled by configuration");
        return builder;
    }
    match walink_prometheus::PrometheusAdapter::new() {
        Ok(adapter) => {
            info!("prometheus metrics enabled");
            let adapter = std::sync::Arc::new(adapter);
            builder.metrics(std::sync::Arc::new(move || adapter.render()))
        }
        Err(e) => {
            warn!(error = %e, "prometheus initialization failed, continuing without metrics");
            builder
        }
    }
}

#[cfg(not(feature = "prometheus"))]
fn attach_metrics(builder: ServiceBuilder, _config: &WalinkConfig) -> ServiceBuilder {
    info!("prometheus metrics not compiled in");
    builder
}

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("walink={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
