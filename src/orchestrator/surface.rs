//! Single-flight state machine for one search surface.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::lock_or_recover;
use crate::normalize::normalize;
use crate::outcome::{SearchOutcome, SearchResults};
use crate::projection::{ErrorNotice, Projection, SurfaceKind};
use crate::request::SearchRequest;
use crate::transport::{Backend, Cancelled, Transport};
use crate::validate::{SearchForm, ValidationError};

/// Identity of one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RequestId(Uuid);

impl RequestId {
    fn generate() -> Self {
        RequestId(Uuid::new_v4())
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

enum SurfaceState {
    Idle,
    InFlight {
        id: RequestId,
        cancel: CancellationToken,
        started: Instant,
    },
    Settled {
        id: RequestId,
        at: DateTime<Utc>,
        results: Option<Arc<SearchResults>>,
    },
}

/// Read-only view of a surface's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SurfaceStatus {
    Idle,
    InFlight { id: RequestId },
    Settled { id: RequestId, at: DateTime<Utc> },
}

/// Result of handing a form to a surface.
#[derive(Debug)]
pub enum Submission {
    /// The form failed validation; the error was already shown.
    Rejected(ValidationError),
    Started {
        id: RequestId,
        handle: JoinHandle<()>,
    },
}

impl Submission {
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Submission::Started { id, .. } => Some(*id),
            Submission::Rejected(_) => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Submission::Rejected(_))
    }

    /// True once the background call can no longer produce output.
    pub fn is_finished(&self) -> bool {
        match self {
            Submission::Started { handle, .. } => handle.is_finished(),
            Submission::Rejected(_) => true,
        }
    }

    /// Wait until the background call has finished (settled, been
    /// discarded, or been cancelled). A task that panicked is logged.
    pub async fn settled(self) {
        let id = self.request_id();
        if let Err(e) = self.join().await {
            warn!(request_id = ?id, error = %e, "search task failed");
        }
    }

    /// Like [`Submission::settled`], but hands back the task's failure.
    pub async fn join(self) -> Result<(), JoinError> {
        match self {
            Submission::Started { handle, .. } => handle.await,
            Submission::Rejected(_) => Ok(()),
        }
    }
}

/// Collaborators shared by every surface of one orchestrator.
pub(crate) struct Shared<B, P> {
    pub(crate) transport: Transport<B>,
    pub(crate) projection: Arc<P>,
    pub(crate) deadline: Duration,
}

pub struct Surface<B, P> {
    kind: SurfaceKind,
    shared: Arc<Shared<B, P>>,
    state: Arc<Mutex<SurfaceState>>,
}

impl<B: Backend, P: Projection> Surface<B, P> {
    pub(crate) fn new(kind: SurfaceKind, shared: Arc<Shared<B, P>>) -> Self {
        Surface {
            kind,
            shared,
            state: Arc::new(Mutex::new(SurfaceState::Idle)),
        }
    }

    /// Validate `form` and, if it passes, start a search that supersedes
    /// any call still in flight on this surface.
    pub fn submit<F: SearchForm + ?Sized>(&self, form: &F) -> Submission {
        match form.to_request() {
            Ok(request) => self.start(request),
            Err(e) => {
                info!(surface = %self.kind, error = %e, "submission rejected");
                self.shared
                    .projection
                    .show_error(&ErrorNotice::validation(self.kind, &e));
                Submission::Rejected(e)
            }
        }
    }

    /// Start an already validated request.
    pub fn start(&self, request: SearchRequest) -> Submission {
        let id = RequestId::generate();
        let cancel = CancellationToken::new();
        let operation = request.operation();
        let query = request.to_query();

        {
            let mut state = lock_or_recover(&self.state);
            if let SurfaceState::InFlight {
                id: prior,
                cancel: prior_cancel,
                ..
            } = &*state
            {
                prior_cancel.cancel();
                info!(surface = %self.kind, superseded = %prior, by = %id, "search superseded");
                self.shared.projection.loading_changed(self.kind, false);
            }
            *state = SurfaceState::InFlight {
                id,
                cancel: cancel.clone(),
                started: Instant::now(),
            };
            self.shared.projection.loading_changed(self.kind, true);
        }

        info!(
            surface = %self.kind,
            request_id = %id,
            %operation,
            query = %query.encode(),
            "search submitted"
        );

        let kind = self.kind;
        let shared = Arc::clone(&self.shared);
        let state = Arc::clone(&self.state);
        let span = info_span!("search", surface = %kind, request_id = %id);
        let handle = tokio::spawn(
            async move {
                let settled = shared
                    .transport
                    .execute(operation, &query, shared.deadline, &cancel)
                    .await;
                let outcome = match settled {
                    Ok(outcome) => outcome,
                    Err(Cancelled) => {
                        debug!("call cancelled before settling");
                        return;
                    }
                };
                let outcome = outcome.and_then(|payload| normalize(operation, payload));
                settle(kind, &shared, &state, id, outcome);
            }
            .instrument(span),
        );

        Submission::Started { id, handle }
    }

}

impl<B, P> Surface<B, P> {
    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn is_busy(&self) -> bool {
        matches!(*lock_or_recover(&self.state), SurfaceState::InFlight { .. })
    }

    pub fn status(&self) -> SurfaceStatus {
        match &*lock_or_recover(&self.state) {
            SurfaceState::Idle => SurfaceStatus::Idle,
            SurfaceState::InFlight { id, .. } => SurfaceStatus::InFlight { id: *id },
            SurfaceState::Settled { id, at, .. } => SurfaceStatus::Settled { id: *id, at: *at },
        }
    }

    /// Results of the last successful settlement, while no newer search is
    /// in flight.
    pub fn last_results(&self) -> Option<Arc<SearchResults>> {
        match &*lock_or_recover(&self.state) {
            SurfaceState::Settled { results, .. } => results.clone(),
            _ => None,
        }
    }
}

impl<B, P: Projection> Surface<B, P> {
    /// Abort the call in flight, if any. Loading is hidden; no outcome or
    /// error is shown for the aborted call.
    pub fn cancel(&self) -> bool {
        match self.stop() {
            Some(id) => {
                info!(surface = %self.kind, request_id = %id, "search cancelled");
                true
            }
            None => false,
        }
    }

    /// Same transition as [`Surface::cancel`]. Used on shutdown.
    pub(crate) fn abort(&self) {
        if let Some(id) = self.stop() {
            debug!(surface = %self.kind, request_id = %id, "search aborted on shutdown");
        }
    }

    fn stop(&self) -> Option<RequestId> {
        let mut state = lock_or_recover(&self.state);
        let id = match &*state {
            SurfaceState::InFlight { id, cancel, .. } => {
                cancel.cancel();
                *id
            }
            _ => return None,
        };
        *state = SurfaceState::Settled {
            id,
            at: Utc::now(),
            results: None,
        };
        self.shared.projection.loading_changed(self.kind, false);
        Some(id)
    }
}

fn settle<B, P: Projection>(
    kind: SurfaceKind,
    shared: &Shared<B, P>,
    state: &Mutex<SurfaceState>,
    id: RequestId,
    outcome: SearchOutcome<SearchResults>,
) {
    let mut guard = lock_or_recover(state);
    let started = match &*guard {
        SurfaceState::InFlight {
            id: current,
            started,
            ..
        } if *current == id => *started,
        _ => {
            debug!(outcome = outcome.kind(), "stale completion discarded");
            return;
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(elapsed_ms, outcome = outcome.kind(), "search settled");

    let results = match outcome {
        SearchOutcome::Success(results) => {
            let results = Arc::new(results);
            shared.projection.show_results(kind, &results);
            Some(results)
        }
        failure => {
            if let Some(notice) = ErrorNotice::from_outcome(kind, &failure) {
                shared.projection.show_error(&notice);
            }
            None
        }
    };
    *guard = SurfaceState::Settled {
        id,
        at: Utc::now(),
        results,
    };
    shared.projection.loading_changed(kind, false);
}
