// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The published connection snapshot.

use std::sync::{Arc, Mutex};

use arc_swap::ArcSwap;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use walink_core::ConnectionState;

/// Holds the current [`ConnectionState`] behind an atomic pointer.
///
/// Readers never lock. Writers are serialized so that the legality check and
/// the swap happen as one step.
#[derive(Debug)]
pub(crate) struct StateCell {
    current: ArcSwap<ConnectionState>,
    changes: watch::Sender<Arc<ConnectionState>>,
    write: Mutex<()>,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        let initial = Arc::new(ConnectionState::idle());
        let (changes, _) = watch::channel(initial.clone());
        Self {
            current: ArcSwap::new(initial),
            changes,
            write: Mutex::new(()),
        }
    }

    pub(crate) fn load(&self) -> Arc<ConnectionState> {
        self.current.load_full()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<ConnectionState>> {
        self.changes.subscribe()
    }

    /// Publish `next` if it is a legal successor of the current state.
    ///
    /// A state with the same phase replaces the snapshot (pairing code
    /// rotation, attempt counter) but keeps the time the phase was entered.
    /// Returns `false` when the change was refused.
    pub(crate) fn transition(&self, mut next: ConnectionState) -> bool {
        let _guard = self.write.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.current.load();
        let (from, to) = (current.phase(), next.phase());

        if from == to {
            next = next.with_last_transition(current.last_transition());
            debug!(phase = %to, "connection state refreshed");
        } else if from.can_transition_to(to) {
            info!(
                from = %from,
                to = %to,
                device_number = next.device_number(),
                reason = ?next.last_close_reason(),
                "connection phase changed"
            );
            metrics::counter!(
                "walink_connection_transitions_total",
                "from" => from.to_string(),
                "to" => to.to_string()
            )
            .increment(1);
            metrics::gauge!("walink_connection_open").set(if next.is_open() { 1.0 } else { 0.0 });
        } else {
            warn!(from = %from, to = %to, "illegal connection transition ignored");
            metrics::counter!("walink_connection_rejected_transitions_total").increment(1);
            return false;
        }

        let next = Arc::new(next);
        self.current.store(next.clone());
        self.changes.send_replace(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walink_core::{CloseReason, ConnectionPhase};

    #[test]
    fn starts_idle() {
        let cell = StateCell::new();
        assert_eq!(cell.load().phase(), ConnectionPhase::Idle);
    }

    #[test]
    #[tracing_test::traced_test]
    fn illegal_transition_leaves_state_untouched() {
        let cell = StateCell::new();
        assert!(!cell.transition(ConnectionState::open("5511999990000")));
        assert_eq!(cell.load().phase(), ConnectionPhase::Idle);
        assert!(logs_contain("illegal connection transition ignored"));
    }

    #[test]
    fn same_phase_update_replaces_snapshot() {
        let cell = StateCell::new();
        assert!(cell.transition(ConnectionState::pairing(None)));
        assert!(cell.transition(ConnectionState::pairing(Some("2@abc".into()))));
        assert_eq!(cell.load().pairing_code(), Some("2@abc"));
    }

    #[test]
    fn same_phase_update_keeps_transition_time() {
        let cell = StateCell::new();
        let entered = cell.load().last_transition();
        std::thread::sleep(std::time::Duration::from_millis(5));

        assert!(cell.transition(ConnectionState::idle().with_reconnect_attempt(1)));
        assert_eq!(cell.load().reconnect_attempt(), 1);
        assert_eq!(cell.load().last_transition(), entered);

        assert!(cell.transition(ConnectionState::pairing(None)));
        let paired = cell.load().last_transition();
        assert!(paired > entered);
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(cell.transition(ConnectionState::pairing(Some("2@rotated".into()))));
        assert_eq!(cell.load().last_transition(), paired);
    }

    #[tokio::test]
    async fn subscribers_see_each_transition() {
        let cell = StateCell::new();
        let mut rx = cell.subscribe();

        cell.transition(ConnectionState::pairing(None));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().phase(), ConnectionPhase::Pairing);

        cell.transition(ConnectionState::closing(CloseReason::ConnectionLost));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().phase(), ConnectionPhase::Closing);
    }

    #[test]
    fn concurrent_readers_never_see_open_without_number() {
        let cell = Arc::new(StateCell::new());
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = cell.clone();
                let stop = stop.clone();
                std::thread::spawn(move || {
                    while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                        let s = cell.load();
                        if s.phase() == ConnectionPhase::Open {
                            assert!(s.device_number().is_some());
                        }
                    }
                })
            })
            .collect();

        for _ in 0..2_000 {
            cell.transition(ConnectionState::pairing(None));
            cell.transition(ConnectionState::open("5511999990000"));
            cell.transition(ConnectionState::closing(CloseReason::ConnectionLost));
            cell.transition(ConnectionState::idle());
        }
        stop.store(true, std::sync::atomic::Ordering::Relaxed);
        for r in readers {
            r.join().unwrap();
        }
    }
}
