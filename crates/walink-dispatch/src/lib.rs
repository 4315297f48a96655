// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound sends for walink: target normalization, payload validation and
//! a single in-flight send gated on the connection being open.

pub mod address;
pub mod dispatcher;

pub use address::normalize_target;
pub use dispatcher::OutboundDispatcher;
