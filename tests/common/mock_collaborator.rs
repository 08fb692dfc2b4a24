//! # Mock Collaborator — In-Process Prime-Sum Service for Tests
//!
//! A small axum server that answers the three read-only endpoints the client
//! calls. Each endpoint replays a configurable [`Reply`] (status, body,
//! artificial delay) and every request is logged with its raw query string,
//! so tests can assert on exactly what went over the wire.
//!
//! | Method | Path                               | Default reply                 |
//! |--------|------------------------------------|-------------------------------|
//! | GET    | `/api/find_primes_with_sequences`  | two primes, `total_time` 0.01 |
//! | GET    | `/api/find_prime_phones`           | two phone numbers             |
//! | GET    | `/api/list_prime_phone_prefixes`   | `0912`, `0933`                |
//!
//! ```text
//! MockCollaborator::start()
//!   └─ TcpListener::bind("127.0.0.1:0")   (random port)
//!   └─ axum::serve(listener, router)       (background tokio task)
//!   └─ SharedState (Arc<Mutex<MockState>>) (replies + request log)
//! ```
//!
//! The server task is aborted when the handle is dropped.

#![allow(dead_code)]

use axum::extract::{RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

// ── Configuration Types ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Sequences,
    Phones,
    Prefixes,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Sequences => "/api/find_primes_with_sequences",
            Endpoint::Phones => "/api/find_prime_phones",
            Endpoint::Prefixes => "/api/list_prime_phone_prefixes",
        }
    }
}

/// What one endpoint answers with.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(value: serde_json::Value) -> Self {
        Reply {
            status: 200,
            body: value.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Reply {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One request as the server saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub endpoint: Endpoint,
    /// Raw query string, empty when absent.
    pub query: String,
}

// ── Shared Mock State ───────────────────────────────────────────────

#[derive(Debug)]
struct MockState {
    sequences: Reply,
    phones: Reply,
    prefixes: Reply,
    requests: Vec<RecordedRequest>,
}

impl MockState {
    fn reply_mut(&mut self, endpoint: Endpoint) -> &mut Reply {
        match endpoint {
            Endpoint::Sequences => &mut self.sequences,
            Endpoint::Phones => &mut self.phones,
            Endpoint::Prefixes => &mut self.prefixes,
        }
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            sequences: Reply::json(json!({
                "results": [
                    {"prime": 5, "sequences": [[2, 3]]},
                    {"prime": 17, "sequences": [[2, 3, 5, 7]]}
                ],
                "total_time": 0.01,
                "total_primes": 2
            })),
            phones: Reply::json(json!({
                "prime_phones": ["0912000007", "0912000031"],
                "count": 2
            })),
            prefixes: Reply::json(json!({"prefixes": ["0912", "0933"]})),
            requests: Vec::new(),
        }
    }
}

type SharedState = Arc<Mutex<MockState>>;

// ── MockCollaborator ────────────────────────────────────────────────

pub struct MockCollaborator {
    base_url: String,
    _abort_handle: tokio::task::AbortHandle,
    state: SharedState,
}

impl MockCollaborator {
    pub async fn start() -> Self {
        Self::builder().start().await
    }

    pub fn builder() -> MockCollaboratorBuilder {
        MockCollaboratorBuilder {
            state: MockState::default(),
        }
    }

    /// Base URL with a trailing slash, e.g. `http://127.0.0.1:54321/`.
    pub fn url(&self) -> String {
        self.base_url.clone()
    }

    pub fn base_url(&self) -> url::Url {
        url::Url::parse(&self.base_url).expect("mock URL is valid")
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, endpoint: Endpoint) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.endpoint == endpoint)
            .collect()
    }

    /// Replace an endpoint's reply while the server is running.
    pub fn set_reply(&self, endpoint: Endpoint, reply: Reply) {
        *self.state.lock().unwrap().reply_mut(endpoint) = reply;
    }
}

// ── Builder ─────────────────────────────────────────────────────────

pub struct MockCollaboratorBuilder {
    state: MockState,
}

impl MockCollaboratorBuilder {
    pub fn with_reply(mut self, endpoint: Endpoint, reply: Reply) -> Self {
        *self.state.reply_mut(endpoint) = reply;
        self
    }

    pub fn with_delay(mut self, endpoint: Endpoint, delay: Duration) -> Self {
        self.state.reply_mut(endpoint).delay = delay;
        self
    }

    pub async fn start(self) -> MockCollaborator {
        let shared_state: SharedState = Arc::new(Mutex::new(self.state));

        let app = Router::new()
            .route(Endpoint::Sequences.path(), get(handle_sequences))
            .route(Endpoint::Phones.path(), get(handle_phones))
            .route(Endpoint::Prefixes.path(), get(handle_prefixes))
            .with_state(Arc::clone(&shared_state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock collaborator to random port");
        let addr: SocketAddr = listener
            .local_addr()
            .expect("Failed to get mock collaborator local address");
        let base_url = format!("http://127.0.0.1:{}/", addr.port());

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Mock collaborator server failed");
        });

        MockCollaborator {
            base_url,
            _abort_handle: handle.abort_handle(),
            state: shared_state,
        }
    }
}

/// A base URL nothing listens on: bind a port, then release it.
pub async fn unreachable_url() -> url::Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    url::Url::parse(&format!("http://127.0.0.1:{}/", port)).unwrap()
}

// ── Route Handlers ──────────────────────────────────────────────────

async fn respond(
    endpoint: Endpoint,
    state: SharedState,
    query: Option<String>,
) -> impl IntoResponse {
    let reply = {
        let mut s = state.lock().unwrap();
        s.requests.push(RecordedRequest {
            endpoint,
            query: query.unwrap_or_default(),
        });
        s.reply_mut(endpoint).clone()
    };

    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        reply.body,
    )
}

async fn handle_sequences(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    respond(Endpoint::Sequences, state, query).await
}

async fn handle_phones(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    respond(Endpoint::Phones, state, query).await
}

async fn handle_prefixes(
    State(state): State<SharedState>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    respond(Endpoint::Prefixes, state, query).await
}
