// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests for the assembled service.
//!
//! Each test wires the real supervisor, relay, dispatcher, SQLite log,
//! webhook sink and HTTP router around a mock transport. Tests are
//! independent and order-insensitive.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use walink::Service;
use walink_config::WalinkConfig;
use walink_core::{ConnectionPhase, CredentialDelta};
use walink_storage::{Database, queries};
use walink_test_utils::fixtures::{echo, image, text};
use walink_test_utils::{MemoryCredentialStore, MockTransport, RecordingSink};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "e2e-token";
const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    service: Service,
    transport: Arc<MockTransport>,
    store: Arc<MemoryCredentialStore>,
    sink: Arc<RecordingSink>,
    webhook: MockServer,
    db_path: String,
    _dir: tempfile::TempDir,
}

impl Harness {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir
            .path()
            .join("data")
            .join("messages.db")
            .to_string_lossy()
            .into_owned();

        let webhook = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header_exists("x-walink-signature"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&webhook)
            .await;

        let mut config = WalinkConfig::default();
        config.storage.database_path = db_path.clone();
        config.webhook.url = Some(format!("{}/hook", webhook.uri()));
        config.webhook.secret = Some("hook-secret".into());
        config.gateway.bearer_token = Some(TOKEN.into());
        config.connection.reconnect_initial_ms = 10;
        config.connection.reconnect_max_ms = 50;
        config.connection.reconnect_jitter = 0.0;
        config.connection.shutdown_grace_secs = 2;
        config.relay.sink_retry_backoff_ms = 10;
        config.relay.shutdown_grace_secs = 2;
        config.outbound.transient_retry_delay_ms = 10;

        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(MemoryCredentialStore::new());
        let sink = Arc::new(RecordingSink::new("recording"));

        let service = Service::builder(config)
            .transport(transport.clone())
            .credential_store(store.clone())
            .sink(sink.clone())
            .build()
            .await
            .unwrap();

        Self {
            service,
            transport,
            store,
            sink,
            webhook,
            db_path,
            _dir: dir,
        }
    }

    async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let app = walink_gateway::router(self.service.gateway_state(), 1024 * 1024);
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(
            Request::get(uri)
                .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn send(&self, body: Value) -> (StatusCode, Value) {
        self.request(
            Request::post("/send")
                .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn wait_for_phase(&self, phase: ConnectionPhase) {
        let mut rx = self.service.status().subscribe();
        tokio::time::timeout(WAIT, async {
            loop {
                if rx.borrow_and_update().phase() == phase {
                    return;
                }
                rx.changed().await.expect("state channel closed");
            }
        })
        .await
        .unwrap_or_else(|_| panic!("phase {phase} not reached"));
    }

    async fn open_session(&self) {
        self.service.start().await;
        tokio::time::timeout(WAIT, self.transport.wait_for_opens(1))
            .await
            .expect("transport opened");
        assert!(self.transport.emit_open("5511999990000").await);
        self.wait_for_phase(ConnectionPhase::Open).await;
    }

    async fn wait_for_webhook(&self, n: usize) -> Vec<wiremock::Request> {
        tokio::time::timeout(WAIT, async {
            loop {
                let requests = self.webhook.received_requests().await.unwrap_or_default();
                if requests.len() >= n {
                    return requests;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("webhook deliveries")
    }

    async fn wait_for_rows(&self, n: i64) -> Database {
        let db = Database::open(&self.db_path, true).await.unwrap();
        tokio::time::timeout(WAIT, async {
            while queries::count_messages(&db).await.unwrap() < n {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("stored rows");
        db
    }
}

#[tokio::test]
async fn pairing_code_is_served_until_the_session_opens() {
    let h = Harness::new().await;

    let (status, body) = h.get("/qr").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].as_str().unwrap().contains("not generated"));

    h.service.start().await;
    tokio::time::timeout(WAIT, h.transport.wait_for_opens(1))
        .await
        .unwrap();
    assert!(h.transport.emit_pairing_code("2@abc,def").await);
    h.wait_for_phase(ConnectionPhase::Pairing).await;
    tokio::time::timeout(WAIT, async {
        while h.service.status().pairing_code().is_none() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let (status, body) = h.get("/qr").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pairing_code"], "2@abc,def");

    assert!(h.transport.emit_open("5511999990000").await);
    h.wait_for_phase(ConnectionPhase::Open).await;
    let (status, _) = h.get("/qr").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    h.service.shutdown().await;
}

#[tokio::test]
async fn inbound_batch_reaches_every_sink_once() {
    let h = Harness::new().await;
    h.open_session().await;

    assert!(
        h.transport
            .emit_messages(vec![
                text("ABC123", "Olá"),
                text("ABC123", "Olá"),
                echo("ME1", "sent from phone"),
                image("IMG1", "look"),
            ])
            .await
    );

    tokio::time::timeout(WAIT, h.sink.wait_for(2)).await.unwrap();
    assert_eq!(h.sink.delivered_ids().await, vec!["ABC123", "IMG1"]);

    let requests = h.wait_for_webhook(2).await;
    let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(first["from"], "5511988887777");
    assert_eq!(first["message"], "Olá");
    assert_eq!(first["type"], "text");
    assert_eq!(first["fromMe"], false);
    let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
    assert_eq!(second["type"], "image");
    assert_eq!(second["message"], "look");

    let db = h.wait_for_rows(2).await;
    let rows = queries::list_recent(&db, 10).await.unwrap();
    let mut ids: Vec<_> = rows.iter().map(|r| r.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["ABC123", "IMG1"]);

    // A redelivered batch is still deduplicated.
    assert!(h.transport.emit_messages(vec![text("ABC123", "Olá")]).await);
    assert!(h.transport.emit_messages(vec![text("N2", "next")]).await);
    tokio::time::timeout(WAIT, h.sink.wait_for(3)).await.unwrap();
    assert_eq!(
        h.sink.delivered_ids().await,
        vec!["ABC123", "IMG1", "N2"]
    );

    h.service.shutdown().await;
}

#[tokio::test]
async fn credential_updates_reach_the_store() {
    let h = Harness::new().await;
    h.open_session().await;

    assert!(
        h.transport
            .emit_credentials(CredentialDelta::default().set("registrationId", json!(42)))
            .await
    );
    tokio::time::timeout(WAIT, async {
        while h.store.save_count() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(
        h.store.snapshot().await.get("registrationId"),
        Some(&json!(42))
    );

    h.service.shutdown().await;
}

#[tokio::test]
async fn send_follows_the_connection_state() {
    let h = Harness::new().await;

    let (status, body) = h
        .send(json!({"to": "5511988887777", "message": "too early"}))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "not_connected");

    h.open_session().await;
    let (status, body) = h
        .send(json!({"to": "+55 (11) 98888-7777", "message": "Olá"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["id"].is_string());

    let sent = h.transport.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "5511988887777@s.whatsapp.net");

    let (status, body) = h.get("/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["phase"], "open");
    assert_eq!(body["device_number"], "5511999990000");

    h.service.shutdown().await;
}

#[tokio::test]
async fn logout_over_http_terminates_and_clears_credentials() {
    let h = Harness::new().await;
    h.open_session().await;

    let (status, body) = h.get("/logout").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "logged_out"}));
    assert_eq!(h.service.status().phase(), ConnectionPhase::Terminated);
    assert_eq!(h.transport.logout_count(), 1);
    assert_eq!(h.store.clear_count(), 1);

    let (status, body) = h.send(json!({"to": "5511988887777", "message": "hi"})).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "not_connected");

    // No reconnect after a logout.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(h.transport.open_count(), 1);

    h.service.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_the_session_and_flushes_sinks() {
    let h = Harness::new().await;
    h.open_session().await;

    assert!(h.transport.emit_messages(vec![text("LAST", "bye")]).await);
    tokio::time::timeout(WAIT, h.sink.wait_for(1)).await.unwrap();

    let transport = h.transport.clone();
    let sink = h.sink.clone();
    let status = h.service.status();
    h.service.shutdown().await;

    assert_eq!(status.phase(), ConnectionPhase::Idle);
    assert!(transport.close_count() >= 1);
    assert_eq!(sink.delivered_ids().await, vec!["LAST"]);

    let db = Database::open(&h.db_path, true).await.unwrap();
    assert_eq!(queries::count_messages(&db).await.unwrap(), 1);
}
