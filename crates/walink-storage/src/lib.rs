// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite message log for walink.
//!
//! WAL-mode SQLite with embedded refinery migrations and a single-writer
//! model via `tokio-rusqlite`. [`SqliteMessageLog`] plugs into the relay as a
//! sink.

pub mod database;
mod migrations;
pub mod models;
pub mod queries;
pub mod sink;

pub use database::Database;
pub use models::StoredMessage;
pub use sink::SqliteMessageLog;
