// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for walink.
//!
//! Deterministic stand-ins for the external collaborators:
//!
//! - [`MockTransport`] - scripted transport session with captured sends
//! - [`MemoryCredentialStore`] - in-memory credentials with failure injection
//! - [`RecordingSink`] - sink that records deliveries and can fail or stall
//! - [`fixtures`] - raw message builders

pub mod fixtures;
pub mod memory_store;
pub mod mock_transport;
pub mod recording_sink;

pub use memory_store::MemoryCredentialStore;
pub use mock_transport::MockTransport;
pub use recording_sink::RecordingSink;
