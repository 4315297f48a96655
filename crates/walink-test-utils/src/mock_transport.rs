// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic testing.
//!
//! Each `open()` starts a fresh event stream that the test drives with the
//! `emit_*` helpers. Sends are captured and answered from a script.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, mpsc};

use walink_core::{
    AdapterType, CloseReason, ConnectionUpdate, CredentialDelta, HealthStatus, MessageId,
    OutboundPayload, PluginAdapter, RawMessage, SessionCredential, Transport, TransportError,
    TransportEvent, WalinkError,
};

/// A scripted transport session.
pub struct MockTransport {
    session: Mutex<Option<mpsc::Sender<TransportEvent>>>,
    opened_with: Mutex<Vec<SessionCredential>>,
    opens: AtomicUsize,
    open_failures: AtomicUsize,
    closes: AtomicUsize,
    logouts: AtomicUsize,
    hang_close: AtomicBool,
    sent: Mutex<Vec<(String, OutboundPayload)>>,
    send_script: Mutex<VecDeque<Result<MessageId, TransportError>>>,
    send_delay: Mutex<Option<Duration>>,
    changed: Notify,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
            opened_with: Mutex::new(Vec::new()),
            opens: AtomicUsize::new(0),
            open_failures: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            logouts: AtomicUsize::new(0),
            hang_close: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            send_script: Mutex::new(VecDeque::new()),
            send_delay: Mutex::new(None),
            changed: Notify::new(),
        }
    }

    /// Make the next `n` calls to `open()` fail.
    pub fn fail_next_opens(&self, n: usize) {
        self.open_failures.store(n, Ordering::SeqCst);
    }

    /// Make the next `close()` never return, like a wedged session.
    pub fn hang_next_close(&self) {
        self.hang_close.store(true, Ordering::SeqCst);
    }

    /// Queue results for upcoming sends; unscripted sends succeed.
    pub async fn script_send(&self, result: Result<MessageId, TransportError>) {
        self.send_script.lock().await.push_back(result);
    }

    pub async fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().await = Some(delay);
    }

    /// Push an event into the current session. Returns `false` without one.
    pub async fn emit(&self, event: TransportEvent) -> bool {
        let sender = self.session.lock().await.clone();
        match sender {
            Some(tx) => tx.send(event).await.is_ok(),
            None => false,
        }
    }

    pub async fn emit_pairing_code(&self, code: &str) -> bool {
        self.emit(TransportEvent::Connection(ConnectionUpdate::PairingCode(
            code.to_string(),
        )))
        .await
    }

    pub async fn emit_open(&self, device_number: &str) -> bool {
        self.emit(TransportEvent::Connection(ConnectionUpdate::Open {
            device_number: device_number.to_string(),
        }))
        .await
    }

    pub async fn emit_close(&self, reason: CloseReason) -> bool {
        self.emit(TransportEvent::Connection(ConnectionUpdate::Close { reason }))
            .await
    }

    pub async fn emit_credentials(&self, delta: CredentialDelta) -> bool {
        self.emit(TransportEvent::CredentialsUpdated(delta)).await
    }

    pub async fn emit_messages(&self, batch: Vec<RawMessage>) -> bool {
        self.emit(TransportEvent::Messages(batch)).await
    }

    /// Drop the current event stream, as if the session died silently.
    pub async fn end_stream(&self) {
        self.session.lock().await.take();
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }

    /// Credentials passed to each successful `open()`, in order.
    pub async fn opened_with(&self) -> Vec<SessionCredential> {
        self.opened_with.lock().await.clone()
    }

    pub async fn sent(&self) -> Vec<(String, OutboundPayload)> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Wait until `open()` has succeeded at least `n` times.
    pub async fn wait_for_opens(&self, n: usize) {
        loop {
            let notified = self.changed.notified();
            if self.open_count() >= n {
                return;
            }
            notified.await;
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, WalinkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WalinkError> {
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(
        &self,
        credentials: SessionCredential,
    ) -> Result<mpsc::Receiver<TransportEvent>, WalinkError> {
        let pending_failures = self.open_failures.load(Ordering::SeqCst);
        if pending_failures > 0 {
            self.open_failures
                .store(pending_failures - 1, Ordering::SeqCst);
            return Err(WalinkError::transport("mock open failure"));
        }

        let (tx, rx) = mpsc::channel(64);
        *self.session.lock().await = Some(tx);
        self.opened_with.lock().await.push(credentials);
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.changed.notify_waiters();
        Ok(rx)
    }

    async fn send_message(
        &self,
        target: &str,
        payload: &OutboundPayload,
    ) -> Result<MessageId, TransportError> {
        let delay = *self.send_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.sent
            .lock()
            .await
            .push((target.to_string(), payload.clone()));
        match self.send_script.lock().await.pop_front() {
            Some(result) => result,
            None => Ok(MessageId(format!("mock-{}", uuid::Uuid::new_v4()))),
        }
    }

    async fn logout(&self) -> Result<(), WalinkError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), WalinkError> {
        if self.hang_close.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.session.lock().await.take();
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
