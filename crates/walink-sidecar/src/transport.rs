// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`Transport`] backed by a child process speaking JSON lines on stdio.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walink_config::model::TransportConfig;
use walink_core::{
    AdapterType, HealthStatus, MessageId, OutboundPayload, PluginAdapter, SessionCredential,
    Transport, TransportError, TransportEvent, WalinkError,
};

use crate::protocol::{self, HostCommand, SidecarEvent};

const EVENT_QUEUE_DEPTH: usize = 64;
const EXIT_GRACE: Duration = Duration::from_secs(3);

type Pending = Arc<DashMap<String, oneshot::Sender<Result<MessageId, TransportError>>>>;

struct Session {
    child: Child,
    stdin: Arc<Mutex<ChildStdin>>,
    reader: JoinHandle<()>,
}

pub struct SidecarTransport {
    command: String,
    args: Vec<String>,
    send_timeout: Duration,
    session: Mutex<Option<Session>>,
    pending: Pending,
    next_request: AtomicU64,
}

impl SidecarTransport {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            send_timeout: Duration::from_secs(config.send_timeout_secs),
            session: Mutex::new(None),
            pending: Arc::new(DashMap::new()),
            next_request: AtomicU64::new(1),
        }
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    async fn stdin(&self) -> Option<Arc<Mutex<ChildStdin>>> {
        self.session.lock().await.as_ref().map(|s| s.stdin.clone())
    }

    /// Terminate the current child, if any. Waits briefly for a clean exit.
    async fn end_session(&self, farewell: Option<HostCommand<'_>>) {
        let Some(mut session) = self.session.lock().await.take() else {
            return;
        };
        if let Some(command) = farewell
            && let Err(e) = write_line(&session.stdin, &command).await
        {
            debug!(error = %e, "sidecar stdin already closed");
        }
        // Closing stdin is the sidecar's cue to exit.
        drop(session.stdin);
        match tokio::time::timeout(EXIT_GRACE, session.child.wait()).await {
            Ok(Ok(status)) => debug!(%status, "sidecar exited"),
            Ok(Err(e)) => warn!(error = %e, "failed to reap sidecar"),
            Err(_) => {
                warn!("sidecar did not exit in time; killing it");
                if let Err(e) = session.child.kill().await {
                    warn!(error = %e, "failed to kill sidecar");
                }
            }
        }
        session.reader.abort();
        fail_pending(&self.pending, "transport closed");
    }
}

async fn write_line(
    stdin: &Mutex<ChildStdin>,
    command: &HostCommand<'_>,
) -> Result<(), std::io::Error> {
    let mut line = serde_json::to_vec(command)?;
    line.push(b'\n');
    let mut stdin = stdin.lock().await;
    stdin.write_all(&line).await?;
    stdin.flush().await
}

fn fail_pending(pending: &Pending, reason: &str) {
    let ids: Vec<String> = pending.iter().map(|e| e.key().clone()).collect();
    for id in ids {
        if let Some((_, tx)) = pending.remove(&id) {
            let _ = tx.send(Err(TransportError::closed(reason)));
        }
    }
}

/// Read stdout until EOF, translating lines into events.
///
/// Dropping `events` at EOF ends the supervisor's stream.
async fn read_events(stdout: ChildStdout, events: mpsc::Sender<TransportEvent>, pending: Pending) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "failed to read from sidecar");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        let event = match serde_json::from_str::<SidecarEvent>(&line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "ignoring malformed sidecar line");
                continue;
            }
        };

        let forwarded = match event {
            SidecarEvent::Credentials { delta } => Some(TransportEvent::CredentialsUpdated(delta)),
            SidecarEvent::Connection {
                state,
                qr,
                number,
                status_code,
            } => protocol::connection_update(state.as_deref(), qr, number, status_code)
                .map(TransportEvent::Connection),
            SidecarEvent::Messages { messages } => Some(TransportEvent::Messages(messages)),
            SidecarEvent::SendResult {
                request_id,
                ok,
                message_id,
                error,
                transient,
            } => {
                let result = if ok {
                    Ok(MessageId(message_id.unwrap_or_default()))
                } else {
                    let message = error.unwrap_or_else(|| "send failed".to_string());
                    Err(if transient {
                        TransportError::network(message)
                    } else {
                        TransportError::rejected(message)
                    })
                };
                match pending.remove(&request_id) {
                    Some((_, tx)) => {
                        let _ = tx.send(result);
                    }
                    None => debug!(request_id, "send result for unknown or expired request"),
                }
                None
            }
        };

        if let Some(event) = forwarded
            && events.send(event).await.is_err()
        {
            debug!("event receiver dropped; stopping sidecar reader");
            break;
        }
    }
    fail_pending(&pending, "sidecar exited");
    info!("sidecar event stream ended");
}

#[async_trait]
impl PluginAdapter for SidecarTransport {
    fn name(&self) -> &str {
        "sidecar"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, WalinkError> {
        let mut session = self.session.lock().await;
        match session.as_mut() {
            None => Ok(HealthStatus::Degraded("no sidecar running".to_string())),
            Some(s) => match s.child.try_wait() {
                Ok(None) => Ok(HealthStatus::Healthy),
                Ok(Some(status)) => Ok(HealthStatus::Unhealthy(format!("sidecar exited: {status}"))),
                Err(e) => Ok(HealthStatus::Unhealthy(format!("sidecar state unknown: {e}"))),
            },
        }
    }

    async fn shutdown(&self) -> Result<(), WalinkError> {
        self.end_session(Some(HostCommand::Close)).await;
        Ok(())
    }
}

#[async_trait]
impl Transport for SidecarTransport {
    async fn open(
        &self,
        credentials: SessionCredential,
    ) -> Result<mpsc::Receiver<TransportEvent>, WalinkError> {
        // Only one live session per transport.
        self.end_session(Some(HostCommand::Close)).await;

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| WalinkError::Transport {
                message: format!("failed to spawn sidecar '{}'", self.command),
                source: Some(Box::new(e)),
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = child.kill().await;
            return Err(WalinkError::transport("sidecar stdio was not captured"));
        };
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "walink::sidecar", "{line}");
                }
            });
        }

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let reader = tokio::spawn(read_events(stdout, tx, self.pending.clone()));
        let stdin = Arc::new(Mutex::new(stdin));

        if let Err(e) = write_line(
            &stdin,
            &HostCommand::Open {
                credentials: &credentials,
            },
        )
        .await
        {
            reader.abort();
            let _ = child.kill().await;
            return Err(WalinkError::Transport {
                message: "failed to hand credentials to sidecar".to_string(),
                source: Some(Box::new(e)),
            });
        }

        info!(command = %self.command, pid = ?child.id(), "sidecar started");
        *self.session.lock().await = Some(Session {
            child,
            stdin,
            reader,
        });
        Ok(rx)
    }

    async fn send_message(
        &self,
        target: &str,
        payload: &OutboundPayload,
    ) -> Result<MessageId, TransportError> {
        let Some(stdin) = self.stdin().await else {
            return Err(TransportError::closed("transport is not open"));
        };

        let request_id = format!("req-{}", self.next_request.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id.clone(), tx);

        let command = HostCommand::Send {
            request_id: request_id.clone(),
            to: target,
            content: protocol::content(payload),
        };
        if let Err(e) = write_line(&stdin, &command).await {
            self.pending.remove(&request_id);
            return Err(TransportError::closed(format!("failed to write to sidecar: {e}")));
        }

        match tokio::time::timeout(self.send_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::closed("sidecar went away")),
            Err(_) => {
                self.pending.remove(&request_id);
                Err(TransportError::unconfirmed(format!(
                    "no send result after {:?}",
                    self.send_timeout
                )))
            }
        }
    }

    async fn logout(&self) -> Result<(), WalinkError> {
        let Some(stdin) = self.stdin().await else {
            return Err(WalinkError::transport("transport is not open"));
        };
        write_line(&stdin, &HostCommand::Logout)
            .await
            .map_err(|e| WalinkError::Transport {
                message: "failed to request logout".to_string(),
                source: Some(Box::new(e)),
            })
    }

    async fn close(&self) -> Result<(), WalinkError> {
        self.end_session(Some(HostCommand::Close)).await;
        Ok(())
    }
}
