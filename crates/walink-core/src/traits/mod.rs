// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod credentials;
pub mod sink;
pub mod transport;

pub use adapter::PluginAdapter;
pub use credentials::CredentialStore;
pub use sink::MessageSink;
pub use transport::Transport;
