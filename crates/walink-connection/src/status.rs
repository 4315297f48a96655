// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only view of the connection state for the HTTP layer and dispatcher.

use std::sync::Arc;

use tokio::sync::watch;
use walink_core::{ConnectionPhase, ConnectionState};

use crate::state::StateCell;

/// Cheap, cloneable, non-blocking access to the last published state.
#[derive(Debug, Clone)]
pub struct StatusFacade {
    cell: Arc<StateCell>,
}

impl StatusFacade {
    pub(crate) fn new(cell: Arc<StateCell>) -> Self {
        Self { cell }
    }

    /// The current snapshot. Never blocks and never observes a torn state.
    pub fn current(&self) -> Arc<ConnectionState> {
        self.cell.load()
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.cell.load().phase()
    }

    pub fn is_open(&self) -> bool {
        self.cell.load().is_open()
    }

    /// The pairing code, only while pairing.
    pub fn pairing_code(&self) -> Option<String> {
        let state = self.cell.load();
        match state.phase() {
            ConnectionPhase::Pairing => state.pairing_code().map(str::to_string),
            _ => None,
        }
    }

    /// Receives every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConnectionState>> {
        self.cell.subscribe()
    }
}
