// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound relay for walink.
//!
//! Batches from the connection driver are deduplicated by message id,
//! classified by content marker and fanned out to independent sink workers.

pub mod classify;
pub mod dedup;
pub mod pipeline;
pub mod sink_worker;
pub mod webhook;

pub use dedup::DedupSet;
pub use pipeline::{BatchOutcome, RelayPipeline};
pub use sink_worker::{DeliveryPolicy, deliver_with_retry};
pub use webhook::WebhookSink;
