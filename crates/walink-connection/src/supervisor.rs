// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The connection supervisor.
//!
//! One driver task owns the transport session. It consumes transport events
//! strictly in order, persists credential updates before moving on, forwards
//! inbound batches to the relay queue and drives the phase graph:
//!
//! ```text
//! Idle -> Pairing -> Open -> Closing -> Idle        (reconnect after backoff)
//!            |                  \----> Terminated   (logged out)
//!            +-> Idle (pairing timeout / open failure)
//!
//! Idle -> Terminated                                  (logout with no live session)
//! ```
//!
//! The driver slot holds at most one task, so reconnect attempts never overlap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walink_config::model::ConnectionConfig;
use walink_core::{
    CloseReason, ConnectionPhase, ConnectionState, ConnectionUpdate, CredentialStore, RawMessage,
    Transport, TransportEvent, WalinkError,
};

use crate::backoff::ReconnectPolicy;
use crate::state::StateCell;
use crate::status::StatusFacade;

/// Everything the driver task needs; shared with it by `Arc`.
struct DriverContext {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    state: Arc<StateCell>,
    policy: ReconnectPolicy,
    pairing_timeout: Duration,
    inbound: mpsc::Sender<Vec<RawMessage>>,
}

struct Driver {
    cancel: CancellationToken,
    logout: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// How a single session attempt ended.
#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    /// Recoverable; reconnect after backoff. `opened` resets the attempt counter.
    Retry { opened: bool },
    /// Local stop; state is `Idle`.
    Stopped,
    /// Logged out; state is `Terminated`.
    Terminated,
}

/// Owns the lifecycle of the one transport session in this process.
pub struct ConnectionSupervisor {
    ctx: Arc<DriverContext>,
    shutdown_grace: Duration,
    driver: Mutex<Option<Driver>>,
}

impl ConnectionSupervisor {
    /// `inbound` receives every message batch in arrival order.
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        config: &ConnectionConfig,
        inbound: mpsc::Sender<Vec<RawMessage>>,
    ) -> Self {
        Self {
            ctx: Arc::new(DriverContext {
                transport,
                store,
                state: Arc::new(StateCell::new()),
                policy: ReconnectPolicy::from_config(config),
                pairing_timeout: config.pairing_timeout(),
                inbound,
            }),
            shutdown_grace: config.shutdown_grace(),
            driver: Mutex::new(None),
        }
    }

    /// Read-only handle for the dispatcher and HTTP layer.
    pub fn status(&self) -> StatusFacade {
        StatusFacade::new(self.ctx.state.clone())
    }

    /// Non-blocking snapshot of the current state.
    pub fn current_state(&self) -> Arc<ConnectionState> {
        self.ctx.state.load()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<ConnectionState>> {
        self.ctx.state.subscribe()
    }

    pub async fn is_running(&self) -> bool {
        self.driver
            .lock()
            .await
            .as_ref()
            .is_some_and(|d| !d.handle.is_finished())
    }

    /// Start the driver. No-op while one is running or after logout.
    pub async fn start(&self) {
        let mut slot = self.driver.lock().await;
        if slot.as_ref().is_some_and(|d| !d.handle.is_finished()) {
            debug!("connection driver already running");
            return;
        }
        if self.ctx.state.load().phase() == ConnectionPhase::Terminated {
            warn!("session terminated by logout; reinitialize() is required before start()");
            return;
        }

        let cancel = CancellationToken::new();
        let logout = Arc::new(AtomicBool::new(false));
        let handle = tokio::spawn(drive(self.ctx.clone(), cancel.clone(), logout.clone()));
        *slot = Some(Driver {
            cancel,
            logout,
            handle,
        });
        info!("connection supervisor started");
    }

    /// Close the session gracefully and stay `Idle`. Pending reconnects are cancelled.
    pub async fn stop(&self) {
        if self.halt(false).await {
            info!("connection supervisor stopped");
        }
    }

    /// Unlink the device, clear credentials and enter `Terminated`.
    ///
    /// Without a running driver there is nothing to unlink; credentials are
    /// cleared and the state still ends `Terminated`, so `start()` will not
    /// pair again until `reinitialize()`.
    pub async fn logout(&self) -> Result<(), WalinkError> {
        if self.halt(true).await {
            return Ok(());
        }
        if self.ctx.state.load().phase() != ConnectionPhase::Terminated {
            self.ctx.store.clear().await?;
            self.ctx
                .state
                .transition(ConnectionState::terminated(CloseReason::LoggedOut));
            info!("credentials cleared while disconnected");
        }
        Ok(())
    }

    /// Leave `Terminated` and start a fresh pairing.
    pub async fn reinitialize(&self) -> Result<(), WalinkError> {
        {
            let _slot = self.driver.lock().await;
            if self.ctx.state.load().phase() != ConnectionPhase::Terminated {
                debug!("reinitialize ignored; session is not terminated");
                return Ok(());
            }
            self.ctx.store.clear().await?;
            self.ctx.state.transition(ConnectionState::idle());
        }
        self.start().await;
        Ok(())
    }

    /// Cancel the driver and wait for it. Returns whether one was running.
    async fn halt(&self, logout: bool) -> bool {
        let mut slot = self.driver.lock().await;
        let Some(mut driver) = slot.take() else {
            return false;
        };
        if driver.handle.is_finished() {
            return false;
        }

        driver.logout.store(logout, Ordering::SeqCst);
        driver.cancel.cancel();

        if tokio::time::timeout(self.shutdown_grace, &mut driver.handle)
            .await
            .is_err()
        {
            warn!(
                grace_secs = self.shutdown_grace.as_secs(),
                "connection driver did not stop in time; aborting"
            );
            driver.handle.abort();
            self.settle_after_abort(logout).await;
        }
        true
    }

    /// Finish what the aborted driver left undone.
    ///
    /// The session is released and the state walks legal edges to `Idle`, or
    /// to `Terminated` with credentials cleared when this was a logout.
    /// Transport calls are bounded by the shutdown grace.
    async fn settle_after_abort(&self, logout: bool) {
        let ctx = &self.ctx;
        let reason = if logout {
            CloseReason::LoggedOut
        } else {
            CloseReason::LocalStop
        };
        if matches!(
            ctx.state.load().phase(),
            ConnectionPhase::Pairing | ConnectionPhase::Open
        ) {
            ctx.state.transition(ConnectionState::closing(reason));
        }

        if logout
            && tokio::time::timeout(self.shutdown_grace, unlink(ctx))
                .await
                .is_err()
        {
            warn!("transport logout timed out after abort");
        }
        if tokio::time::timeout(self.shutdown_grace, release(ctx))
            .await
            .is_err()
        {
            warn!("transport close timed out after abort");
        }

        if logout {
            clear_credentials(ctx).await;
            if ctx.state.load().phase() != ConnectionPhase::Terminated {
                ctx.state.transition(ConnectionState::terminated(reason));
            }
        } else if ctx.state.load().phase() == ConnectionPhase::Closing {
            ctx.state
                .transition(ConnectionState::idle().with_close_reason(Some(reason)));
        }
    }
}

impl Drop for ConnectionSupervisor {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.driver.try_lock()
            && let Some(driver) = slot.take()
        {
            driver.cancel.cancel();
        }
    }
}

/// Driver loop: one session attempt at a time, backoff in between.
async fn drive(ctx: Arc<DriverContext>, cancel: CancellationToken, logout: Arc<AtomicBool>) {
    let mut failures: u32 = 0;

    loop {
        match run_session(&ctx, &cancel, &logout, failures).await {
            SessionEnd::Stopped | SessionEnd::Terminated => break,
            SessionEnd::Retry { opened } => {
                if opened {
                    failures = 0;
                }
                let delay = ctx.policy.delay(failures);
                failures = failures.saturating_add(1);

                let last_reason = ctx.state.load().last_close_reason();
                ctx.state.transition(
                    ConnectionState::idle()
                        .with_close_reason(last_reason)
                        .with_reconnect_attempt(failures),
                );
                metrics::counter!("walink_connection_reconnects_total").increment(1);
                info!(
                    attempt = failures,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "reconnect scheduled"
                );

                tokio::select! {
                    _ = cancel.cancelled() => {
                        if logout.load(Ordering::SeqCst) {
                            logout_between_sessions(&ctx).await;
                        }
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    debug!("connection driver exited");
}

async fn run_session(
    ctx: &DriverContext,
    cancel: &CancellationToken,
    logout: &AtomicBool,
    attempt: u32,
) -> SessionEnd {
    if cancel.is_cancelled() {
        if logout.load(Ordering::SeqCst) {
            logout_between_sessions(ctx).await;
            return SessionEnd::Terminated;
        }
        return SessionEnd::Stopped;
    }

    let credentials = match ctx.store.load().await {
        Ok(credentials) => credentials,
        Err(e) => {
            warn!(error = %e, "failed to load credentials");
            return SessionEnd::Retry { opened: false };
        }
    };
    if credentials.is_empty() {
        info!("no stored credentials; a new pairing is required");
    }

    if !ctx
        .state
        .transition(ConnectionState::pairing(None).with_reconnect_attempt(attempt))
    {
        return SessionEnd::Stopped;
    }

    let mut events = match ctx.transport.open(credentials).await {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "transport failed to open");
            ctx.state.transition(
                ConnectionState::idle()
                    .with_close_reason(Some(CloseReason::TransportExited))
                    .with_reconnect_attempt(attempt),
            );
            return SessionEnd::Retry { opened: false };
        }
    };

    let pairing_deadline = tokio::time::sleep(ctx.pairing_timeout);
    tokio::pin!(pairing_deadline);
    let mut opened = false;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                return end_on_cancel(ctx, logout.load(Ordering::SeqCst)).await;
            }

            _ = &mut pairing_deadline, if !opened => {
                warn!(
                    timeout_secs = ctx.pairing_timeout.as_secs(),
                    "pairing timed out"
                );
                release(ctx).await;
                ctx.state.transition(
                    ConnectionState::idle()
                        .with_close_reason(Some(CloseReason::PairingTimeout))
                        .with_reconnect_attempt(attempt),
                );
                return SessionEnd::Retry { opened: false };
            }

            event = events.recv() => {
                let Some(event) = event else {
                    warn!("transport event stream ended unexpectedly");
                    return end_on_close(ctx, CloseReason::TransportExited, opened).await;
                };

                match event {
                    TransportEvent::CredentialsUpdated(delta) => {
                        if let Err(e) = ctx.store.save(delta).await {
                            warn!(
                                error = %e,
                                "credentials not persisted; re-pairing may be required"
                            );
                            metrics::counter!("walink_credential_failures_total").increment(1);
                            return end_on_close(ctx, CloseReason::CredentialFailure, opened).await;
                        }
                    }
                    TransportEvent::Connection(ConnectionUpdate::Connecting) => {
                        debug!("transport connecting");
                    }
                    TransportEvent::Connection(ConnectionUpdate::PairingCode(code)) => {
                        if opened {
                            warn!("pairing code received on an open session; ignored");
                        } else if ctx.state.transition(
                            ConnectionState::pairing(Some(code)).with_reconnect_attempt(attempt),
                        ) {
                            info!("pairing code available; scan it to link the device");
                        }
                    }
                    TransportEvent::Connection(ConnectionUpdate::Open { device_number }) => {
                        if ctx.state.transition(ConnectionState::open(device_number)) {
                            opened = true;
                        }
                    }
                    TransportEvent::Connection(ConnectionUpdate::Close { reason }) => {
                        return end_on_close(ctx, reason, opened).await;
                    }
                    TransportEvent::Messages(batch) => {
                        if batch.is_empty() {
                            continue;
                        }
                        debug!(count = batch.len(), "inbound batch");
                        if ctx.inbound.send(batch).await.is_err() {
                            warn!("relay queue closed; inbound batch dropped");
                        }
                    }
                }
            }
        }
    }
}

/// `Closing` → `Terminated` on logout, otherwise `Closing` → `Idle`.
async fn end_on_close(ctx: &DriverContext, reason: CloseReason, opened: bool) -> SessionEnd {
    ctx.state.transition(ConnectionState::closing(reason));
    release(ctx).await;

    if reason.is_logout() {
        info!("device was logged out; clearing credentials");
        clear_credentials(ctx).await;
        ctx.state.transition(ConnectionState::terminated(reason));
        return SessionEnd::Terminated;
    }

    ctx.state
        .transition(ConnectionState::idle().with_close_reason(Some(reason)));
    SessionEnd::Retry { opened }
}

async fn end_on_cancel(ctx: &DriverContext, logout: bool) -> SessionEnd {
    if logout {
        ctx.state
            .transition(ConnectionState::closing(CloseReason::LoggedOut));
        unlink(ctx).await;
        release(ctx).await;
        clear_credentials(ctx).await;
        ctx.state
            .transition(ConnectionState::terminated(CloseReason::LoggedOut));
        return SessionEnd::Terminated;
    }

    ctx.state
        .transition(ConnectionState::closing(CloseReason::LocalStop));
    release(ctx).await;
    ctx.state
        .transition(ConnectionState::idle().with_close_reason(Some(CloseReason::LocalStop)));
    SessionEnd::Stopped
}

/// Logout during backoff: best-effort unlink, then `Idle -> Terminated`.
async fn logout_between_sessions(ctx: &DriverContext) {
    info!("logout requested between sessions");
    unlink(ctx).await;
    release(ctx).await;
    clear_credentials(ctx).await;
    ctx.state
        .transition(ConnectionState::terminated(CloseReason::LoggedOut));
}

async fn unlink(ctx: &DriverContext) {
    if let Err(e) = ctx.transport.logout().await {
        warn!(error = %e, "transport logout failed; clearing local credentials anyway");
    }
}

async fn release(ctx: &DriverContext) {
    if let Err(e) = ctx.transport.close().await {
        debug!(error = %e, "transport close failed");
    }
}

async fn clear_credentials(ctx: &DriverContext) {
    if let Err(e) = ctx.store.clear().await {
        warn!(error = %e, "failed to clear credentials");
    }
}
