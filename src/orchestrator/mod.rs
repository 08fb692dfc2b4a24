//! # Orchestrator — Request Lifecycle for Every Search Surface
//!
//! Owns the state of the three search surfaces (sequence search, phone
//! search, prefix listing) and the active tab. External event sources (the
//! CLI's interactive loop, tests) drive it through [`Command`]s or the
//! equivalent methods; everything the user should see goes out through the
//! injected [`Projection`].
//!
//! ## Lifecycle per surface
//!
//! ```text
//!            submit (valid)                 settle (same id)
//!   Idle ───────────────────> InFlight ─────────────────────> Settled
//!                              │   ▲                              │
//!              submit (valid)  │   │ new id                       │ submit (valid)
//!              cancel prior ───┘   │                              │
//!                                  └──────────────────────────────┘
//!            cancel(), shutdown() : InFlight ──> Settled   (no outcome shown)
//!            submit (invalid) : error shown, state untouched
//! ```
//!
//! Each submission shows loading once on entering `InFlight` and hides it
//! once on leaving, whether it settled, was cancelled, or was superseded.
//! A completion whose id no longer matches the surface's current id is
//! dropped without any projection call.
//!
//! ## Module Structure
//!
//! - [`surface`]: the single-flight state machine, request ids, submissions

mod surface;


pub use surface::{RequestId, Submission, Surface, SurfaceStatus};

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::info;

use crate::config::ClientConfig;
use crate::outcome::PrefixOption;
use crate::projection::{Projection, SurfaceKind, Tab};
use crate::request::SearchRequest;
use crate::transport::{Backend, HttpBackend, Transport};
use crate::validate::{PhoneForm, SequenceForm};

pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Messages an event source can send to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SubmitSequences(SequenceForm),
    SubmitPhones(PhoneForm),
    RefreshPrefixes,
    SelectPrefix(PrefixOption),
    SelectTab(Tab),
    Cancel(SurfaceKind),
}

pub struct Orchestrator<B, P: Projection> {
    sequences: Surface<B, P>,
    phones: Surface<B, P>,
    prefixes: Surface<B, P>,
    projection: Arc<P>,
    tab: Mutex<Tab>,
}

impl<P: Projection> Orchestrator<HttpBackend, P> {
    pub fn from_config(config: &ClientConfig, projection: Arc<P>) -> reqwest::Result<Self> {
        let backend = HttpBackend::new(config.base_url.clone())?;
        Ok(Orchestrator::new(backend, projection, config.deadline))
    }
}

impl<B: Backend, P: Projection> Orchestrator<B, P> {
    pub fn new(backend: B, projection: Arc<P>, deadline: Duration) -> Self {
        let shared = Arc::new(surface::Shared {
            transport: Transport::new(backend),
            projection: Arc::clone(&projection),
            deadline,
        });
        Orchestrator {
            sequences: Surface::new(SurfaceKind::Sequences, Arc::clone(&shared)),
            phones: Surface::new(SurfaceKind::Phones, Arc::clone(&shared)),
            prefixes: Surface::new(SurfaceKind::Prefixes, shared),
            projection,
            tab: Mutex::new(Tab::default()),
        }
    }

    pub fn surface(&self, kind: SurfaceKind) -> &Surface<B, P> {
        match kind {
            SurfaceKind::Sequences => &self.sequences,
            SurfaceKind::Phones => &self.phones,
            SurfaceKind::Prefixes => &self.prefixes,
        }
    }

    pub fn submit_sequence_search(&self, form: &SequenceForm) -> Submission {
        self.sequences.submit(form)
    }

    pub fn submit_phone_search(&self, form: &PhoneForm) -> Submission {
        self.phones.submit(form)
    }

    pub fn refresh_prefixes(&self) -> Submission {
        self.prefixes.start(SearchRequest::PrefixListing)
    }

    /// Fill the phone form from a listed prefix and search right away.
    pub fn select_prefix(&self, option: &PrefixOption) -> Submission {
        info!(prefix = %option.full, "prefix selected");
        self.phones.submit(&PhoneForm::new(option.short.clone()))
    }

    /// Prefixes from the last successful listing.
    pub fn prefix_options(&self) -> Vec<PrefixOption> {
        self.prefixes
            .last_results()
            .map(|results| results.prefix_options().cloned().collect())
            .unwrap_or_default()
    }

    /// Switch tabs. In-flight searches keep running on either tab.
    pub fn select_tab(&self, tab: Tab) {
        let mut current = lock_or_recover(&self.tab);
        if *current != tab {
            *current = tab;
            self.projection.tab_changed(tab);
        }
    }

    pub fn active_tab(&self) -> Tab {
        *lock_or_recover(&self.tab)
    }

    pub fn cancel(&self, kind: SurfaceKind) -> bool {
        self.surface(kind).cancel()
    }

    pub fn is_busy(&self, kind: SurfaceKind) -> bool {
        self.surface(kind).is_busy()
    }

    /// Dispatch one command. Searches return their [`Submission`].
    pub fn handle(&self, command: Command) -> Option<Submission> {
        match command {
            Command::SubmitSequences(form) => Some(self.submit_sequence_search(&form)),
            Command::SubmitPhones(form) => Some(self.submit_phone_search(&form)),
            Command::RefreshPrefixes => Some(self.refresh_prefixes()),
            Command::SelectPrefix(option) => Some(self.select_prefix(&option)),
            Command::SelectTab(tab) => {
                self.select_tab(tab);
                None
            }
            Command::Cancel(kind) => {
                self.cancel(kind);
                None
            }
        }
    }
}

impl<B, P: Projection> Orchestrator<B, P> {
    /// Abort every call in flight. Loading is hidden on each busy surface;
    /// no outcome or error is reported.
    pub fn shutdown(&self) {
        for surface in [&self.sequences, &self.phones, &self.prefixes] {
            surface.abort();
        }
    }
}

impl<B, P: Projection> Drop for Orchestrator<B, P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
