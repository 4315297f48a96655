// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lifecycle management for the single transport session.
//!
//! The [`ConnectionSupervisor`] owns the session and is the only writer of
//! [`ConnectionState`](walink_core::ConnectionState). Everything else reads
//! it through a [`StatusFacade`].

pub mod backoff;
pub mod shutdown;
mod state;
pub mod status;
pub mod supervisor;

pub use backoff::ReconnectPolicy;
pub use status::StatusFacade;
pub use supervisor::ConnectionSupervisor;
