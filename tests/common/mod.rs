//! Shared test helpers for integration tests.

#![allow(dead_code)]

pub mod mock_collaborator;

use primesum::SequenceForm;
use std::sync::Mutex;

use primesum::{ErrorNotice, Projection, SearchResults, SurfaceKind, Tab};

/// Sequence form with the usual minimums and no upper bounds.
pub fn sequence_form(start: &str, end: &str) -> SequenceForm {
    SequenceForm {
        start: start.to_string(),
        end: end.to_string(),
        min_sequences: "1".to_string(),
        max_sequences: String::new(),
        min_length: "2".to_string(),
        max_length: String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Loading(SurfaceKind, bool),
    Results(SurfaceKind, SearchResults),
    Error(ErrorNotice),
    Tab(Tab),
}

/// Projection that keeps everything it is told, in order.
#[derive(Default)]
pub struct RecordingProjection {
    seen: Mutex<Vec<Seen>>,
}

impl RecordingProjection {
    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn results(&self) -> Vec<SearchResults> {
        self.seen()
            .into_iter()
            .filter_map(|s| match s {
                Seen::Results(_, r) => Some(r),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<ErrorNotice> {
        self.seen()
            .into_iter()
            .filter_map(|s| match s {
                Seen::Error(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    pub fn loading(&self, surface: SurfaceKind) -> Vec<bool> {
        self.seen()
            .into_iter()
            .filter_map(|s| match s {
                Seen::Loading(k, busy) if k == surface => Some(busy),
                _ => None,
            })
            .collect()
    }
}

impl Projection for RecordingProjection {
    fn loading_changed(&self, surface: SurfaceKind, busy: bool) {
        self.seen.lock().unwrap().push(Seen::Loading(surface, busy));
    }

    fn show_results(&self, surface: SurfaceKind, results: &SearchResults) {
        self.seen
            .lock()
            .unwrap()
            .push(Seen::Results(surface, results.clone()));
    }

    fn show_error(&self, notice: &ErrorNotice) {
        self.seen.lock().unwrap().push(Seen::Error(notice.clone()));
    }

    fn tab_changed(&self, tab: Tab) {
        self.seen.lock().unwrap().push(Seen::Tab(tab));
    }
}
