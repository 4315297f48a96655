// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP control surface for walink.
//!
//! Exposes the session status, outbound sends, logout and the pairing code
//! behind a bearer token, plus public `/health` and `/metrics`.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{GatewayState, HealthState, router, start_server};
