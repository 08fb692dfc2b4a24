//! # Transport — Deadlined, Cancellable Calls to the Collaborator
//!
//! Every search goes through [`Transport::execute`], which makes exactly one
//! backend call and settles it into a [`SearchOutcome`], or reports that the
//! call was cancelled. No retries.
//!
//! ## Abort Paths
//!
//! ```text
//! execute(op, query, deadline, cancel)
//!   └─ select! (biased)
//!        ├─ cancel.cancelled()            → Err(Cancelled)         (silent)
//!        └─ timeout(deadline, backend.call)
//!              ├─ elapsed                  → TransportError{Timeout}
//!              ├─ Err(network)             → TransportError{NetworkFailure}
//!              └─ Ok(reply) → classify()
//!                    ├─ non-2xx            → TransportError{HttpError}
//!                    ├─ not a JSON object  → TransportError{MalformedPayload}
//!                    ├─ truthy "error"     → ApplicationError
//!                    └─ otherwise          → Success(payload)
//! ```
//!
//! Both the deadline timer and the cancellation wait live inside the
//! `execute` future. Whichever way the call ends, both are dropped with it,
//! and dropping the backend future aborts the HTTP request and releases its
//! connection.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::outcome::SearchOutcome;
use crate::request::{Operation, Query};

/// Default client-side deadline for a single call.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Decoded JSON body of a 2xx response.
pub type Payload = serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportErrorKind {
    Timeout,
    HttpError { status: u16 },
    NetworkFailure,
    MalformedPayload,
}

impl TransportErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::HttpError { .. } => "http_error",
            TransportErrorKind::NetworkFailure => "network_failure",
            TransportErrorKind::MalformedPayload => "malformed_payload",
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportErrorKind::HttpError { status } => write!(f, "HTTP {}", status),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn timeout(deadline: Duration) -> Self {
        TransportError {
            kind: TransportErrorKind::Timeout,
            message: format!("no response within {} ms", deadline.as_millis()),
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            body
        };
        TransportError {
            kind: TransportErrorKind::HttpError { status },
            message,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        TransportError {
            kind: TransportErrorKind::NetworkFailure,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        TransportError {
            kind: TransportErrorKind::MalformedPayload,
            message: message.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}

/// The call was cancelled before it settled. Carries no outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("call cancelled")]
pub struct Cancelled;

/// Raw HTTP exchange result: status and body text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

/// One network round trip to the collaborator. Implementations must not
/// retry and must abort their I/O when the returned future is dropped.
pub trait Backend: Send + Sync + 'static {
    fn call(
        &self,
        operation: Operation,
        query: &Query,
    ) -> impl Future<Output = Result<Reply, TransportError>> + Send;
}

/// `reqwest`-backed collaborator client.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// `base_url` must end in `/` so `api/<op>` joins beneath it;
    /// `ClientConfig` guarantees this.
    pub fn new(base_url: Url) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("primesum/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HttpBackend { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint(&self, operation: Operation, query: &Query) -> Result<Url, url::ParseError> {
        let mut url = self.base_url.join(&format!("api/{}", operation.path()))?;
        if !query.is_empty() {
            url.set_query(Some(&query.encode()));
        }
        Ok(url)
    }
}

impl Backend for HttpBackend {
    async fn call(&self, operation: Operation, query: &Query) -> Result<Reply, TransportError> {
        let url = self
            .endpoint(operation, query)
            .map_err(|e| TransportError::network(format!("invalid endpoint: {}", e)))?;
        debug!(%url, "issuing request");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError::network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::network(format!("failed to read response body: {}", e)))?;
        Ok(Reply { status, body })
    }
}

#[derive(Debug, Clone)]
pub struct Transport<B> {
    backend: B,
}

impl<B: Backend> Transport<B> {
    pub fn new(backend: B) -> Self {
        Transport { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run one call under `deadline`, abandoning it as soon as `cancel` fires.
    pub async fn execute(
        &self,
        operation: Operation,
        query: &Query,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> Result<SearchOutcome<Payload>, Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%operation, "call cancelled");
                Err(Cancelled)
            }
            settled = tokio::time::timeout(deadline, self.backend.call(operation, query)) => {
                let outcome = match settled {
                    Ok(Ok(reply)) => classify(reply),
                    Ok(Err(e)) => SearchOutcome::TransportError(e),
                    Err(_) => {
                        warn!(
                            %operation,
                            deadline_ms = deadline.as_millis() as u64,
                            "call timed out"
                        );
                        SearchOutcome::TransportError(TransportError::timeout(deadline))
                    }
                };
                Ok(outcome)
            }
        }
    }
}

/// Map a raw reply onto an outcome. Non-2xx bodies are surfaced verbatim.
pub fn classify(reply: Reply) -> SearchOutcome<Payload> {
    if !(200..300).contains(&reply.status) {
        return SearchOutcome::TransportError(TransportError::http(reply.status, reply.body));
    }

    let payload: Payload = match serde_json::from_str(&reply.body) {
        Ok(payload) => payload,
        Err(e) => {
            return SearchOutcome::TransportError(TransportError::malformed(format!(
                "response is not valid JSON: {}",
                e
            )))
        }
    };
    if !payload.is_object() {
        return SearchOutcome::TransportError(TransportError::malformed(
            "response is not a JSON object",
        ));
    }

    match reported_error(&payload) {
        Some(message) => SearchOutcome::ApplicationError { message },
        None => SearchOutcome::Success(payload),
    }
}

/// The payload's `error` field, if it is set to anything truthy.
fn reported_error(payload: &Payload) -> Option<String> {
    use serde_json::Value;

    match payload.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn reply(status: u16, body: &str) -> Reply {
        Reply {
            status,
            body: body.to_string(),
        }
    }

    // ── Classification ──────────────────────────────────────────────

    #[test]
    fn ok_with_error_field_is_an_application_error() {
        let outcome = classify(reply(200, r#"{"error":"range too large"}"#));
        assert_eq!(
            outcome,
            SearchOutcome::ApplicationError {
                message: "range too large".into()
            }
        );
    }

    #[test]
    fn falsy_error_fields_are_ignored() {
        for body in [
            r#"{"error":null,"results":[]}"#,
            r#"{"error":"","results":[]}"#,
            r#"{"error":false,"results":[]}"#,
            r#"{"error":0,"results":[]}"#,
        ] {
            assert!(classify(reply(200, body)).is_success(), "{}", body);
        }
    }

    #[test]
    fn non_string_error_field_is_stringified() {
        let outcome = classify(reply(200, r#"{"error":{"code":7}}"#));
        assert_eq!(
            outcome,
            SearchOutcome::ApplicationError {
                message: r#"{"code":7}"#.into()
            }
        );
    }

    #[test]
    fn non_success_status_carries_the_body() {
        let outcome = classify(reply(400, "start must be at least 2"));
        match outcome {
            SearchOutcome::TransportError(e) => {
                assert_eq!(e.kind, TransportErrorKind::HttpError { status: 400 });
                assert_eq!(e.message, "start must be at least 2");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn empty_error_body_falls_back_to_status() {
        match classify(reply(502, "")) {
            SearchOutcome::TransportError(e) => assert_eq!(e.message, "HTTP 502"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn error_status_wins_over_json_error_field() {
        let outcome = classify(reply(500, r#"{"error":"boom"}"#));
        assert_eq!(outcome.kind(), "http_error");
    }

    #[test]
    fn unparseable_or_non_object_bodies_are_malformed() {
        for body in ["<html>", "[1,2,3]", "\"text\"", ""] {
            match classify(reply(200, body)) {
                SearchOutcome::TransportError(e) => {
                    assert_eq!(e.kind, TransportErrorKind::MalformedPayload, "{}", body)
                }
                other => panic!("unexpected outcome for {:?}: {:?}", body, other),
            }
        }
    }

    // ── Deadline and cancellation ───────────────────────────────────

    /// Sleeps for `delay` before replying, counting calls.
    struct SlowBackend {
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    impl Backend for SlowBackend {
        async fn call(&self, _: Operation, _: &Query) -> Result<Reply, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(reply(200, r#"{"results":[]}"#))
        }
    }

    fn slow(delay: Duration) -> (Transport<SlowBackend>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = SlowBackend {
            delay,
            calls: Arc::clone(&calls),
        };
        (Transport::new(backend), calls)
    }

    #[tokio::test(start_paused = true)]
    async fn call_past_the_deadline_times_out() {
        let (transport, calls) = slow(Duration::from_secs(45));
        let outcome = transport
            .execute(
                Operation::FindPrimesWithSequences,
                &Query::default(),
                DEFAULT_DEADLINE,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        match outcome {
            SearchOutcome::TransportError(e) => {
                assert!(e.is_timeout());
                assert_eq!(e.message, "no response within 30000 ms");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn call_inside_the_deadline_succeeds() {
        let (transport, _) = slow(Duration::from_secs(29));
        let outcome = transport
            .execute(
                Operation::FindPrimePhones,
                &Query::default(),
                DEFAULT_DEADLINE,
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(outcome.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_is_silent_and_prompt() {
        let (transport, _) = slow(Duration::from_secs(10));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        let result = transport
            .execute(
                Operation::FindPrimePhones,
                &Query::default(),
                DEFAULT_DEADLINE,
                &cancel,
            )
            .await;
        assert_eq!(result, Err(Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn pre_cancelled_token_makes_no_call() {
        let (transport, calls) = slow(Duration::from_millis(1));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = transport
            .execute(
                Operation::ListPrimePhonePrefixes,
                &Query::default(),
                DEFAULT_DEADLINE,
                &cancel,
            )
            .await;
        assert_eq!(result, Err(Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    // ── Endpoints ───────────────────────────────────────────────────

    #[test]
    fn endpoint_joins_under_api_and_appends_query() {
        let backend = HttpBackend::new(Url::parse("http://localhost:5000/").unwrap()).unwrap();
        let query = crate::request::SearchRequest::PhonePrefixSearch(
            crate::validate::PhonePrefix::parse("12").unwrap(),
        )
        .to_query();
        let url = backend.endpoint(Operation::FindPrimePhones, &query).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:5000/api/find_prime_phones?prefix=12"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let backend =
            HttpBackend::new(Url::parse("https://example.test/prime-sum/").unwrap()).unwrap();
        let url = backend
            .endpoint(Operation::ListPrimePhonePrefixes, &Query::default())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/prime-sum/api/list_prime_phone_prefixes"
        );
    }
}
