// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable storage of session credentials.

use async_trait::async_trait;

use crate::error::WalinkError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{CredentialDelta, SessionCredential};

/// Persists the credential set of a single device identity.
///
/// Implementations must serialize writes and never leave a torn record
/// behind: after a crash, either the old or the new set is readable.
#[async_trait]
pub trait CredentialStore: PluginAdapter {
    /// Loads the stored credentials; an empty set means pairing is required.
    async fn load(&self) -> Result<SessionCredential, WalinkError>;

    /// Merges `delta` into the stored set and persists it before returning.
    async fn save(&self, delta: CredentialDelta) -> Result<(), WalinkError>;

    /// Invalidates the stored credentials (logout).
    async fn clear(&self) -> Result<(), WalinkError>;
}
