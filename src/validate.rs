//! # Validate — Form Input Normalization
//!
//! Turns raw form fields (strings exactly as the user typed them) into typed
//! search parameters. Nothing in this module touches the network or the
//! orchestrator state; a rejected form never reaches the transport.
//!
//! ## Rules
//!
//! | Field | Rule |
//! |-------|------|
//! | `start`, `end` | required non-negative integers, `start <= end` |
//! | `min_sequences`, `min_length` | required non-negative integers |
//! | `max_sequences`, `max_length` | optional; blank (or `-1`) means unbounded |
//! | `prefix` | exactly two ASCII digits after trimming |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use thiserror::Error;

use crate::request::SearchRequest;

/// Query value the collaborator reads as "no upper bound".
pub const UNBOUNDED_SENTINEL: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing range")]
    MissingRange,
    #[error("range start {start} is greater than range end {end}")]
    InvertedRange { start: u64, end: u64 },
    #[error("{field} must be a non-negative integer (got {value:?})")]
    InvalidNumber { field: &'static str, value: String },
    #[error("invalid prefix")]
    InvalidPrefix,
}

/// Optional upper bound for a sequence-search parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    Unbounded,
    AtMost(u64),
}

impl Bound {
    /// Wire form: the bound itself, or the `-1` sentinel.
    pub fn to_query_value(self) -> String {
        match self {
            Bound::Unbounded => UNBOUNDED_SENTINEL.to_string(),
            Bound::AtMost(n) => n.to_string(),
        }
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Unbounded => write!(f, "unbounded"),
            Bound::AtMost(n) => write!(f, "{}", n),
        }
    }
}

/// Validated parameters for `find_primes_with_sequences`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceParams {
    pub start: u64,
    pub end: u64,
    pub min_sequences: u64,
    pub max_sequences: Bound,
    pub min_length: u64,
    pub max_length: Bound,
}

/// Two ASCII digits, the short form of a mobile prefix (`"12"` for `0912`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PhonePrefix(String);

impl PhonePrefix {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.len() == 2 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(PhonePrefix(trimmed.to_string()))
        } else {
            Err(ValidationError::InvalidPrefix)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhonePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Anything a surface can accept as a submission.
pub trait SearchForm {
    fn to_request(&self) -> Result<SearchRequest, ValidationError>;
}

/// Raw fields of the sequence search form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceForm {
    pub start: String,
    pub end: String,
    pub min_sequences: String,
    pub max_sequences: String,
    pub min_length: String,
    pub max_length: String,
}

impl SequenceForm {
    pub fn validate(&self) -> Result<SequenceParams, ValidationError> {
        let start = parse_range_end("start", &self.start)?;
        let end = parse_range_end("end", &self.end)?;
        if start > end {
            return Err(ValidationError::InvertedRange { start, end });
        }

        Ok(SequenceParams {
            start,
            end,
            min_sequences: parse_required("min_sequences", &self.min_sequences)?,
            max_sequences: parse_bound("max_sequences", &self.max_sequences)?,
            min_length: parse_required("min_length", &self.min_length)?,
            max_length: parse_bound("max_length", &self.max_length)?,
        })
    }
}

impl SearchForm for SequenceForm {
    fn to_request(&self) -> Result<SearchRequest, ValidationError> {
        self.validate().map(SearchRequest::RangeSequenceSearch)
    }
}

/// Raw field of the phone search form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneForm {
    pub prefix: String,
}

impl PhoneForm {
    pub fn new(prefix: impl Into<String>) -> Self {
        PhoneForm {
            prefix: prefix.into(),
        }
    }

    pub fn validate(&self) -> Result<PhonePrefix, ValidationError> {
        PhonePrefix::parse(&self.prefix)
    }
}

impl SearchForm for PhoneForm {
    fn to_request(&self) -> Result<SearchRequest, ValidationError> {
        self.validate().map(SearchRequest::PhonePrefixSearch)
    }
}

/// `None` unless `trimmed` is one or more ASCII digits; `u64` parsing alone
/// would also take a leading `+`.
fn parse_digits(trimmed: &str) -> Option<Result<u64, ParseIntError>> {
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(trimmed.parse::<u64>())
}

fn parse_range_end(field: &'static str, raw: &str) -> Result<u64, ValidationError> {
    match parse_digits(raw.trim()) {
        Some(Ok(n)) => Ok(n),
        Some(Err(_)) => Err(ValidationError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
        None => Err(ValidationError::MissingRange),
    }
}

fn parse_required(field: &'static str, raw: &str) -> Result<u64, ValidationError> {
    match parse_digits(raw.trim()) {
        Some(Ok(n)) => Ok(n),
        _ => Err(ValidationError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}

fn parse_bound(field: &'static str, raw: &str) -> Result<Bound, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-1" {
        return Ok(Bound::Unbounded);
    }
    parse_required(field, trimmed).map(Bound::AtMost)
}
