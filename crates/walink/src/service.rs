// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring of the credential store, supervisor, relay, dispatcher and gateway.
//!
//! Every adapter has a production default derived from [`WalinkConfig`];
//! the builder lets tests swap in mocks for the transport and the store.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use walink_config::WalinkConfig;
use walink_connection::{ConnectionSupervisor, StatusFacade};
use walink_core::{CredentialStore, MessageSink, PluginAdapter, Transport, WalinkError};
use walink_dispatch::OutboundDispatcher;
use walink_gateway::{AuthConfig, GatewayState, HealthState};
use walink_relay::{RelayPipeline, WebhookSink};
use walink_session::FileCredentialStore;
use walink_sidecar::SidecarTransport;

#[cfg(feature = "sqlite")]
use walink_storage::SqliteMessageLog;

/// Renders the metrics exposition served at `/metrics`.
pub type MetricsRender = Arc<dyn Fn() -> String + Send + Sync>;

/// Collects adapter overrides before the service is assembled.
pub struct ServiceBuilder {
    config: WalinkConfig,
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn CredentialStore>>,
    extra_sinks: Vec<Arc<dyn MessageSink>>,
    metrics: Option<MetricsRender>,
}

impl ServiceBuilder {
    pub fn new(config: WalinkConfig) -> Self {
        Self {
            config,
            transport: None,
            store: None,
            extra_sinks: Vec::new(),
            metrics: None,
        }
    }

    /// Use `transport` instead of spawning the configured sidecar.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use `store` instead of the file store under `session.credentials_dir`.
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Add a sink next to the configured SQLite and webhook sinks.
    pub fn sink(mut self, sink: Arc<dyn MessageSink>) -> Self {
        self.extra_sinks.push(sink);
        self
    }

    pub fn metrics(mut self, render: MetricsRender) -> Self {
        self.metrics = Some(render);
        self
    }

    /// Open the adapters and spawn the relay. The supervisor is not started.
    pub async fn build(self) -> Result<Service, WalinkError> {
        let config = self.config;

        let store: Arc<dyn CredentialStore> = match self.store {
            Some(store) => store,
            None => Arc::new(
                FileCredentialStore::open(
                    &config.session.credentials_dir,
                    &config.session.device_id,
                )
                .await?,
            ),
        };

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(SidecarTransport::new(&config.transport)),
        };

        let mut sinks: Vec<Arc<dyn MessageSink>> = Vec::new();

        #[cfg(feature = "sqlite")]
        if config.storage.enabled {
            let log = SqliteMessageLog::open(&config.storage).await?;
            info!(path = %config.storage.database_path, "sqlite message log enabled");
            sinks.push(Arc::new(log));
        }

        if let Some(webhook) = WebhookSink::from_config(&config.webhook)? {
            info!("webhook sink enabled");
            sinks.push(Arc::new(webhook));
        }

        sinks.extend(self.extra_sinks);
        if sinks.is_empty() {
            warn!("no sinks configured; inbound messages are classified and dropped");
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(config.relay.inbound_queue_depth.max(1));
        let supervisor = Arc::new(ConnectionSupervisor::new(
            transport.clone(),
            store.clone(),
            &config.connection,
            inbound_tx,
        ));
        let dispatcher = Arc::new(OutboundDispatcher::new(
            supervisor.status(),
            transport.clone(),
            &config.outbound,
        ));

        let relay_cancel = CancellationToken::new();
        let relay = RelayPipeline::new(sinks.clone(), &config.relay);
        let relay_handle = tokio::spawn(relay.run(inbound_rx, relay_cancel.clone()));

        let gateway_state = GatewayState {
            status: supervisor.status(),
            dispatcher: dispatcher.clone(),
            supervisor: supervisor.clone(),
            auth: AuthConfig {
                bearer_token: config.gateway.bearer_token.clone(),
            },
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render: self.metrics,
            },
        };

        info!(
            transport = transport.name(),
            store = store.name(),
            sinks = sinks.len(),
            "service assembled"
        );

        Ok(Service {
            config,
            transport,
            store,
            sinks,
            supervisor,
            dispatcher,
            gateway_state,
            relay_cancel,
            relay_handle: Some(relay_handle),
        })
    }
}

/// A fully wired walink instance.
pub struct Service {
    config: WalinkConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    sinks: Vec<Arc<dyn MessageSink>>,
    supervisor: Arc<ConnectionSupervisor>,
    dispatcher: Arc<OutboundDispatcher>,
    gateway_state: GatewayState,
    relay_cancel: CancellationToken,
    relay_handle: Option<JoinHandle<()>>,
}

impl Service {
    pub fn builder(config: WalinkConfig) -> ServiceBuilder {
        ServiceBuilder::new(config)
    }

    pub fn config(&self) -> &WalinkConfig {
        &self.config
    }

    pub fn supervisor(&self) -> &Arc<ConnectionSupervisor> {
        &self.supervisor
    }

    pub fn dispatcher(&self) -> &Arc<OutboundDispatcher> {
        &self.dispatcher
    }

    pub fn status(&self) -> StatusFacade {
        self.supervisor.status()
    }

    /// State for [`walink_gateway::router`] and [`walink_gateway::start_server`].
    pub fn gateway_state(&self) -> GatewayState {
        self.gateway_state.clone()
    }

    /// Start the connection supervisor.
    pub async fn start(&self) {
        self.supervisor.start().await;
    }

    /// Stop in dependency order: supervisor, relay, then adapters.
    ///
    /// The gateway is expected to have stopped accepting requests already.
    pub async fn shutdown(mut self) {
        self.supervisor.stop().await;

        self.relay_cancel.cancel();
        if let Some(handle) = self.relay_handle.take()
            && let Err(e) = handle.await
        {
            warn!(error = %e, "relay task ended abnormally");
        }

        shutdown_adapter(self.transport.as_ref()).await;
        for sink in &self.sinks {
            shutdown_adapter(sink.as_ref()).await;
        }
        shutdown_adapter(self.store.as_ref()).await;

        info!("service stopped");
    }
}

async fn shutdown_adapter<A: PluginAdapter + ?Sized>(adapter: &A) {
    if let Err(e) = adapter.shutdown().await {
        warn!(adapter = adapter.name(), error = %e, "adapter shutdown failed");
    }
}
