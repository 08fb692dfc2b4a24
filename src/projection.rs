//! # Projection — What the Orchestrator Tells the UI
//!
//! The orchestrator owns all search state and pushes changes through the
//! [`Projection`] trait. Implementations render; they never call back into
//! the orchestrator (calls arrive while a surface's state lock is held).

use serde::Serialize;
use std::fmt;

use crate::outcome::{SearchOutcome, SearchResults};
use crate::transport::{TransportError, TransportErrorKind};
use crate::validate::ValidationError;

/// Independent single-flight search surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    Sequences,
    Phones,
    Prefixes,
}

impl SurfaceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SurfaceKind::Sequences => "sequences",
            SurfaceKind::Phones => "phones",
            SurfaceKind::Prefixes => "prefixes",
        }
    }
}

impl fmt::Display for SurfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Sequences,
    Phones,
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tab::Sequences => write!(f, "sequences"),
            Tab::Phones => write!(f, "phones"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Validation,
    Timeout,
    Http,
    Network,
    Malformed,
    Application,
}

/// A user-facing error, already phrased for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorNotice {
    pub surface: SurfaceKind,
    pub kind: NoticeKind,
    pub message: String,
}

impl ErrorNotice {
    pub fn validation(surface: SurfaceKind, error: &ValidationError) -> Self {
        ErrorNotice {
            surface,
            kind: NoticeKind::Validation,
            message: phrase(surface, &error.to_string()),
        }
    }

    pub fn application(surface: SurfaceKind, message: &str) -> Self {
        ErrorNotice {
            surface,
            kind: NoticeKind::Application,
            message: phrase(surface, message),
        }
    }

    pub fn transport(surface: SurfaceKind, error: &TransportError) -> Self {
        let kind = match error.kind {
            TransportErrorKind::Timeout => NoticeKind::Timeout,
            TransportErrorKind::HttpError { .. } => NoticeKind::Http,
            TransportErrorKind::NetworkFailure => NoticeKind::Network,
            TransportErrorKind::MalformedPayload => NoticeKind::Malformed,
        };
        let message = if kind == NoticeKind::Timeout {
            timeout_phrase(surface).to_string()
        } else {
            phrase(surface, &error.message)
        };
        ErrorNotice {
            surface,
            kind,
            message,
        }
    }

    /// `None` for a success outcome.
    pub fn from_outcome<T>(surface: SurfaceKind, outcome: &SearchOutcome<T>) -> Option<Self> {
        match outcome {
            SearchOutcome::Success(_) => None,
            SearchOutcome::ApplicationError { message } => {
                Some(ErrorNotice::application(surface, message))
            }
            SearchOutcome::TransportError(e) => Some(ErrorNotice::transport(surface, e)),
        }
    }
}

fn phrase(surface: SurfaceKind, detail: &str) -> String {
    match surface {
        SurfaceKind::Prefixes => format!("Failed to load prefixes: {}", detail),
        _ => format!("Error: {}", detail),
    }
}

fn timeout_phrase(surface: SurfaceKind) -> &'static str {
    match surface {
        SurfaceKind::Sequences => {
            "Request timed out. Narrow the search range or adjust the parameters and try again."
        }
        SurfaceKind::Phones => "Request timed out. Try again in a moment.",
        SurfaceKind::Prefixes => "Failed to load prefixes: request timed out.",
    }
}

pub trait Projection: Send + Sync + 'static {
    /// Called exactly once on entering and once on leaving the in-flight
    /// state of each submission.
    fn loading_changed(&self, surface: SurfaceKind, busy: bool);

    fn show_results(&self, surface: SurfaceKind, results: &SearchResults);

    fn show_error(&self, notice: &ErrorNotice);

    fn tab_changed(&self, _tab: Tab) {}
}
