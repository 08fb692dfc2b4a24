//! # Request — Canonical Queries for the Collaborator Service
//!
//! Maps a validated [`SearchRequest`] onto one of the three read-only
//! operations and serializes its parameters as ordered key/value pairs.
//! Pure functions only; the transport turns a [`Query`] into a URL.

use serde::Serialize;
use std::fmt;

use crate::validate::{PhonePrefix, SequenceParams};

/// Remote operations exposed under `<base>/api/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    FindPrimesWithSequences,
    FindPrimePhones,
    ListPrimePhonePrefixes,
}

impl Operation {
    pub fn path(self) -> &'static str {
        match self {
            Operation::FindPrimesWithSequences => "find_primes_with_sequences",
            Operation::FindPrimePhones => "find_prime_phones",
            Operation::ListPrimePhonePrefixes => "list_prime_phone_prefixes",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// An immutable, fully validated request. Built at submission and consumed
/// once by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    RangeSequenceSearch(SequenceParams),
    PhonePrefixSearch(PhonePrefix),
    PrefixListing,
}

impl SearchRequest {
    pub fn operation(&self) -> Operation {
        match self {
            SearchRequest::RangeSequenceSearch(_) => Operation::FindPrimesWithSequences,
            SearchRequest::PhonePrefixSearch(_) => Operation::FindPrimePhones,
            SearchRequest::PrefixListing => Operation::ListPrimePhonePrefixes,
        }
    }

    pub fn to_query(&self) -> Query {
        match self {
            SearchRequest::RangeSequenceSearch(p) => Query {
                pairs: vec![
                    ("start", p.start.to_string()),
                    ("end", p.end.to_string()),
                    ("min_sequences", p.min_sequences.to_string()),
                    ("max_sequences", p.max_sequences.to_query_value()),
                    ("min_length", p.min_length.to_string()),
                    ("max_length", p.max_length.to_query_value()),
                ],
            },
            SearchRequest::PhonePrefixSearch(prefix) => Query {
                pairs: vec![("prefix", prefix.as_str().to_string())],
            },
            SearchRequest::PrefixListing => Query::default(),
        }
    }
}

/// Ordered query parameters. Order is part of the contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(&'static str, String)>,
}

impl Query {
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn keys(&self) -> Vec<&'static str> {
        self.pairs.iter().map(|(k, _)| *k).collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `application/x-www-form-urlencoded` form, pairs in insertion order.
    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter().map(|(k, v)| (*k, v.as_str())))
            .finish()
    }
}
