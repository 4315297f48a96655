// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sidecar transport for walink.
//!
//! The messaging protocol itself lives in an external process. walink spawns
//! it, hands it the stored credentials and exchanges JSON lines over stdio:
//! commands on stdin, events and send results on stdout. Stderr is logged.

pub mod protocol;
pub mod transport;

pub use transport::SidecarTransport;
