// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The single ordered consumer of inbound batches.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use walink_config::model::RelayConfig;
use walink_core::{Direction, MessageSink, RawMessage};

use crate::classify;
use crate::dedup::DedupSet;
use crate::sink_worker::{DeliveryPolicy, SinkWorker};

/// What happened to one batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Messages handed to the sinks.
    pub dispatched: usize,
    pub duplicates: usize,
    pub echoes: usize,
    pub missing_id: usize,
}

/// Dedups, classifies and fans out inbound messages.
pub struct RelayPipeline {
    dedup: DedupSet,
    workers: Vec<SinkWorker>,
    shutdown_grace: Duration,
}

impl RelayPipeline {
    /// Spawns one worker per sink; call from inside a runtime.
    pub fn new(sinks: Vec<Arc<dyn MessageSink>>, config: &RelayConfig) -> Self {
        let policy = DeliveryPolicy::from_config(config);
        let workers: Vec<SinkWorker> = sinks
            .into_iter()
            .map(|sink| SinkWorker::spawn(sink, config.sink_queue_depth, policy))
            .collect();
        info!(
            sinks = ?workers.iter().map(SinkWorker::name).collect::<Vec<_>>(),
            dedup_capacity = config.dedup_capacity,
            "relay pipeline ready"
        );
        Self {
            dedup: DedupSet::new(config.dedup_capacity),
            workers,
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
        }
    }

    /// Process every event in the batch, in order.
    pub fn process_batch(&mut self, batch: Vec<RawMessage>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for raw in batch {
            let Some(id) = raw.id.as_deref().filter(|id| !id.is_empty()) else {
                warn!(remote = %raw.remote_jid, "inbound event without message id; dropping");
                outcome.missing_id += 1;
                continue;
            };

            if self.dedup.contains(id) {
                metrics::counter!("walink_relay_duplicates_total").increment(1);
                debug!(message_id = id, "duplicate message discarded");
                outcome.duplicates += 1;
                continue;
            }

            let message = classify::build(id, &raw);
            self.dedup.insert(id);

            if message.direction == Direction::Echo {
                debug!(message_id = id, "echo of own message; not forwarded");
                outcome.echoes += 1;
                continue;
            }

            debug!(
                message_id = id,
                kind = %message.kind,
                from = message.sender_number(),
                "dispatching inbound message"
            );
            let message = Arc::new(message);
            for worker in &self.workers {
                worker.offer(Arc::clone(&message));
            }
            metrics::counter!("walink_relay_dispatched_total").increment(1);
            outcome.dispatched += 1;
        }

        outcome
    }

    /// Consume batches until the queue closes or `cancel` fires, then drain.
    ///
    /// Batches already queued when `cancel` fires are still relayed.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Vec<RawMessage>>, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("relay cancelled; stopping intake");
                    rx.close();
                    while let Ok(batch) = rx.try_recv() {
                        self.process_batch(batch);
                    }
                    break;
                }
                batch = rx.recv() => match batch {
                    Some(batch) => {
                        self.process_batch(batch);
                    }
                    None => {
                        debug!("inbound queue closed");
                        break;
                    }
                },
            }
        }
        self.shutdown().await;
    }

    /// Close sink queues and give workers the grace period to finish.
    ///
    /// Workers drain concurrently; they share one deadline.
    pub async fn shutdown(mut self) {
        for worker in &mut self.workers {
            worker.close();
        }
        let deadline = tokio::time::Instant::now() + self.shutdown_grace;
        for worker in self.workers {
            worker.drain(deadline).await;
        }
        info!("relay pipeline stopped");
    }
}
