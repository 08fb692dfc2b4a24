//! # Outcome — Settled Search Results
//!
//! [`SearchOutcome`] is what a transport call settles into. The transport
//! produces `SearchOutcome<Payload>`; the orchestrator runs the success arm
//! through the normalizer to get `SearchOutcome<SearchResults>`.

use serde::{Deserialize, Serialize};

use crate::transport::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome<T> {
    Success(T),
    /// 2xx response whose payload reported a logical failure.
    ApplicationError { message: String },
    TransportError(TransportError),
}

impl<T> SearchOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, SearchOutcome::Success(_))
    }

    /// Short tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SearchOutcome::Success(_) => "success",
            SearchOutcome::ApplicationError { .. } => "application_error",
            SearchOutcome::TransportError(e) => e.kind.as_str(),
        }
    }

    /// Chain a fallible step onto the success arm; failures pass through.
    pub fn and_then<U, F>(self, f: F) -> SearchOutcome<U>
    where
        F: FnOnce(T) -> Result<U, TransportError>,
    {
        match self {
            SearchOutcome::Success(value) => match f(value) {
                Ok(mapped) => SearchOutcome::Success(mapped),
                Err(e) => SearchOutcome::TransportError(e),
            },
            SearchOutcome::ApplicationError { message } => {
                SearchOutcome::ApplicationError { message }
            }
            SearchOutcome::TransportError(e) => SearchOutcome::TransportError(e),
        }
    }
}

/// Normalized results, in the order the collaborator returned them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub items: Vec<ResultItem>,
    pub elapsed_seconds: Option<f64>,
}

impl SearchResults {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn prime_sequences(&self) -> impl Iterator<Item = &PrimeSequences> {
        self.items.iter().filter_map(|item| match item {
            ResultItem::Sequence(s) => Some(s),
            _ => None,
        })
    }

    pub fn phone_numbers(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            ResultItem::Phone(p) => Some(p.phone_number.as_str()),
            _ => None,
        })
    }

    pub fn prefix_options(&self) -> impl Iterator<Item = &PrefixOption> {
        self.items.iter().filter_map(|item| match item {
            ResultItem::Prefix(p) => Some(p),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResultItem {
    Sequence(PrimeSequences),
    Phone(PhoneNumber),
    Prefix(PrefixOption),
}

/// A prime together with every run of consecutive primes summing to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeSequences {
    pub prime: u64,
    pub sequences: Vec<Vec<u64>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub phone_number: String,
}

/// A listed dialable prefix (`"0912"`) and the two digits the phone form
/// takes (`"12"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrefixOption {
    pub full: String,
    pub short: String,
}

impl PrefixOption {
    pub fn from_full(full: impl Into<String>) -> Self {
        let full = full.into();
        let short = full.chars().skip(2).collect();
        PrefixOption { full, short }
    }
}
