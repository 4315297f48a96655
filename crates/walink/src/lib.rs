// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Walink service assembly and command implementations.
//!
//! The `walink` binary is a thin clap front-end over these modules; the
//! assembled [`Service`] is also what the end-to-end tests drive.

pub mod client;
pub mod logout;
pub mod serve;
pub mod service;
pub mod status;

pub use service::{Service, ServiceBuilder};
