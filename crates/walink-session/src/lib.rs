// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session credential persistence.
//!
//! [`FileCredentialStore`] keeps one JSON document per device identity and
//! replaces it atomically on every credential update. A lock file next to it
//! guarantees that only one process drives a given device.

mod lock;
mod store;

pub use store::FileCredentialStore;
