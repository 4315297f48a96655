// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory credential store with failure injection.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use walink_core::{
    AdapterType, CredentialDelta, CredentialStore, HealthStatus, PluginAdapter,
    SessionCredential, WalinkError,
};

pub struct MemoryCredentialStore {
    credentials: Mutex<SessionCredential>,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
    saves: AtomicUsize,
    clears: AtomicUsize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::with_credentials(SessionCredential::default())
    }

    pub fn with_credentials(credentials: SessionCredential) -> Self {
        Self {
            credentials: Mutex::new(credentials),
            fail_saves: AtomicBool::new(false),
            fail_loads: AtomicBool::new(false),
            saves: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> SessionCredential {
        self.credentials.lock().await.clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl Default for MemoryCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryCredentialStore {
    fn name(&self) -> &str {
        "memory-credentials"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::CredentialStore
    }

    async fn health_check(&self) -> Result<HealthStatus, WalinkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WalinkError> {
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<SessionCredential, WalinkError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(WalinkError::Credential {
                message: "injected load failure".into(),
                source: None,
            });
        }
        Ok(self.credentials.lock().await.clone())
    }

    async fn save(&self, delta: CredentialDelta) -> Result<(), WalinkError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(WalinkError::Credential {
                message: "injected save failure".into(),
                source: None,
            });
        }
        self.credentials.lock().await.apply(&delta);
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<(), WalinkError> {
        *self.credentials.lock().await = SessionCredential::default();
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
