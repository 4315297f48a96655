// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One delivery worker per sink.
//!
//! Each worker owns a bounded queue and delivers sequentially, so a sink sees
//! messages in relay order. A slow or failing sink only ever fills its own
//! queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use walink_config::model::RelayConfig;
use walink_core::{InboundMessage, MessageSink, WalinkError};

/// Timeout and retry schedule for a single delivery.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryPolicy {
    pub timeout: Duration,
    pub retries: u32,
    pub backoff: Duration,
}

impl DeliveryPolicy {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.sink_timeout_secs),
            retries: config.sink_retries,
            backoff: Duration::from_millis(config.sink_retry_backoff_ms),
        }
    }

    /// Delay before retry number `retry` (1-based): backoff * 2^(retry-1).
    fn retry_delay(&self, retry: u32) -> Duration {
        self.backoff
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

pub(crate) struct SinkWorker {
    name: String,
    tx: Option<mpsc::Sender<Arc<InboundMessage>>>,
    handle: JoinHandle<()>,
}

impl SinkWorker {
    pub(crate) fn spawn(sink: Arc<dyn MessageSink>, depth: usize, policy: DeliveryPolicy) -> Self {
        let name = sink.name().to_string();
        let (tx, mut rx) = mpsc::channel::<Arc<InboundMessage>>(depth.max(1));
        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                if let Err(e) = deliver_with_retry(sink.as_ref(), &message, &policy).await {
                    metrics::counter!("walink_relay_sink_failures_total", "sink" => sink.name().to_string())
                        .increment(1);
                    warn!(
                        sink = sink.name(),
                        message_id = %message.id,
                        error = %e,
                        "giving up on delivery"
                    );
                }
            }
            debug!(sink = sink.name(), "sink worker drained");
        });
        Self {
            name,
            tx: Some(tx),
            handle,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Queue without waiting. A full queue drops the message for this sink only.
    pub(crate) fn offer(&self, message: Arc<InboundMessage>) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                metrics::counter!("walink_relay_sink_dropped_total", "sink" => self.name.clone())
                    .increment(1);
                warn!(sink = %self.name, message_id = %message.id, "sink queue full; dropping message");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Stop accepting messages; the worker exits once the backlog is done.
    pub(crate) fn close(&mut self) {
        self.tx.take();
    }

    /// Wait for the backlog until `deadline`, then abort.
    pub(crate) async fn drain(mut self, deadline: tokio::time::Instant) {
        self.close();
        if tokio::time::timeout_at(deadline, &mut self.handle)
            .await
            .is_err()
        {
            warn!(sink = %self.name, "sink worker did not drain in time; aborting");
            self.handle.abort();
        }
    }
}

/// Deliver one message, bounding each attempt by the policy timeout.
pub async fn deliver_with_retry(
    sink: &dyn MessageSink,
    message: &InboundMessage,
    policy: &DeliveryPolicy,
) -> Result<(), WalinkError> {
    let mut attempt = 0;
    loop {
        let result = match tokio::time::timeout(policy.timeout, sink.deliver(message)).await {
            Ok(result) => result,
            Err(_) => Err(WalinkError::Timeout {
                duration: policy.timeout,
            }),
        };
        match result {
            Ok(()) => return Ok(()),
            Err(e) if attempt < policy.retries => {
                attempt += 1;
                let delay = policy.retry_delay(attempt);
                debug!(
                    sink = sink.name(),
                    message_id = %message.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "delivery failed; retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walink_test_utils::RecordingSink;

    fn message(id: &str) -> InboundMessage {
        crate::classify::build(id, &walink_test_utils::fixtures::text(id, "oi"))
    }

    fn policy(retries: u32) -> DeliveryPolicy {
        DeliveryPolicy {
            timeout: Duration::from_millis(50),
            retries,
            backoff: Duration::from_millis(10),
        }
    }

    #[test]
    fn retry_delay_doubles() {
        let p = policy(3);
        assert_eq!(p.retry_delay(1), Duration::from_millis(10));
        assert_eq!(p.retry_delay(2), Duration::from_millis(20));
        assert_eq!(p.retry_delay(3), Duration::from_millis(40));
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn full_queue_drops_with_warning() {
        let sink = Arc::new(RecordingSink::new("slow"));
        sink.set_delay(Duration::from_secs(60)).await;
        let patient = DeliveryPolicy {
            timeout: Duration::from_secs(120),
            ..policy(0)
        };
        let worker = SinkWorker::spawn(sink.clone(), 1, patient);

        // The first message is taken by the worker, the second fills the queue.
        assert!(worker.offer(Arc::new(message("m1"))));
        sink.wait_for_attempts(1).await;
        assert!(worker.offer(Arc::new(message("m2"))));
        assert!(!worker.offer(Arc::new(message("m3"))));
        assert!(logs_contain("sink queue full; dropping message"));

        worker.drain(tokio::time::Instant::now()).await;
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let sink = RecordingSink::new("rec");
        sink.fail_next(2);
        deliver_with_retry(&sink, &message("m1"), &policy(2))
            .await
            .unwrap();
        assert_eq!(sink.attempts(), 3);
        assert_eq!(sink.delivered_ids().await, vec!["m1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_retries() {
        let sink = RecordingSink::new("rec");
        sink.set_always_fail(true);
        let err = deliver_with_retry(&sink, &message("m1"), &policy(1))
            .await
            .unwrap_err();
        assert!(matches!(err, WalinkError::Sink { .. }));
        assert_eq!(sink.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_sink_times_out() {
        let sink = RecordingSink::new("slow");
        sink.set_delay(Duration::from_secs(60)).await;
        let err = deliver_with_retry(&sink, &message("m1"), &policy(0))
            .await
            .unwrap_err();
        assert!(matches!(err, WalinkError::Timeout { .. }));
    }
}
