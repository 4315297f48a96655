// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sink that records what it receives.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

use walink_core::{
    AdapterType, HealthStatus, InboundMessage, MessageSink, PluginAdapter, WalinkError,
};

/// Records successful deliveries; can be told to fail or to stall.
pub struct RecordingSink {
    name: String,
    delivered: Mutex<Vec<InboundMessage>>,
    attempts: AtomicUsize,
    fail_next: AtomicUsize,
    always_fail: AtomicBool,
    delay: Mutex<Option<Duration>>,
    notify: Notify,
}

impl RecordingSink {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            delivered: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
            fail_next: AtomicUsize::new(0),
            always_fail: AtomicBool::new(false),
            delay: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Fail the next `n` delivery attempts, then succeed.
    pub fn fail_next(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn set_always_fail(&self, fail: bool) {
        self.always_fail.store(fail, Ordering::SeqCst);
    }

    /// Sleep this long inside every delivery.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.lock().await = Some(delay);
    }

    pub async fn delivered(&self) -> Vec<InboundMessage> {
        self.delivered.lock().await.clone()
    }

    pub async fn delivered_ids(&self) -> Vec<String> {
        self.delivered
            .lock()
            .await
            .iter()
            .map(|m| m.id.0.clone())
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` messages were delivered successfully.
    pub async fn wait_for(&self, n: usize) {
        loop {
            let notified = self.notify.notified();
            if self.delivered.lock().await.len() >= n {
                return;
            }
            notified.await;
        }
    }

    /// Wait until at least `n` delivery attempts were made.
    pub async fn wait_for_attempts(&self, n: usize) {
        loop {
            let notified = self.notify.notified();
            if self.attempts() >= n {
                return;
            }
            notified.await;
        }
    }
}

#[async_trait]
impl PluginAdapter for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sink
    }

    async fn health_check(&self) -> Result<HealthStatus, WalinkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WalinkError> {
        Ok(())
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn deliver(&self, message: &InboundMessage) -> Result<(), WalinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.notify.notify_waiters();

        let delay = *self.delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted_failure = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scripted_failure || self.always_fail.load(Ordering::SeqCst) {
            self.notify.notify_waiters();
            return Err(WalinkError::Sink {
                sink: self.name.clone(),
                message: "injected failure".into(),
            });
        }

        self.delivered.lock().await.push(message.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}
