//! # Normalize — Payload to Result Items
//!
//! Decodes the success payload of each operation into [`SearchResults`].
//! Server ordering is kept as-is; nothing is sorted, filtered or
//! deduplicated. A missing or `null` result list is an empty result, not an
//! error.

use serde::Deserialize;

use crate::outcome::{PhoneNumber, PrefixOption, PrimeSequences, ResultItem, SearchResults};
use crate::request::Operation;
use crate::transport::{Payload, TransportError};

#[derive(Deserialize)]
struct SequencePayload {
    #[serde(default)]
    results: Option<Vec<PrimeSequences>>,
    #[serde(default)]
    total_time: Option<f64>,
}

#[derive(Deserialize)]
struct PhonePayload {
    #[serde(default)]
    prime_phones: Option<Vec<PhoneEntry>>,
}

/// Phone numbers normally arrive as strings; some deployments send them as
/// bare integers.
#[derive(Deserialize)]
#[serde(untagged)]
enum PhoneEntry {
    Text(String),
    Number(u64),
}

#[derive(Deserialize)]
struct PrefixPayload {
    #[serde(default)]
    prefixes: Option<Vec<String>>,
}

pub fn normalize(operation: Operation, payload: Payload) -> Result<SearchResults, TransportError> {
    match operation {
        Operation::FindPrimesWithSequences => {
            let decoded: SequencePayload = decode(operation, payload)?;
            Ok(SearchResults {
                items: decoded
                    .results
                    .unwrap_or_default()
                    .into_iter()
                    .map(ResultItem::Sequence)
                    .collect(),
                elapsed_seconds: decoded.total_time,
            })
        }
        Operation::FindPrimePhones => {
            let decoded: PhonePayload = decode(operation, payload)?;
            Ok(SearchResults {
                items: decoded
                    .prime_phones
                    .unwrap_or_default()
                    .into_iter()
                    .map(|entry| {
                        let phone_number = match entry {
                            PhoneEntry::Text(s) => s,
                            PhoneEntry::Number(n) => n.to_string(),
                        };
                        ResultItem::Phone(PhoneNumber { phone_number })
                    })
                    .collect(),
                elapsed_seconds: None,
            })
        }
        Operation::ListPrimePhonePrefixes => {
            let decoded: PrefixPayload = decode(operation, payload)?;
            Ok(SearchResults {
                items: decoded
                    .prefixes
                    .unwrap_or_default()
                    .into_iter()
                    .map(|full| ResultItem::Prefix(PrefixOption::from_full(full)))
                    .collect(),
                elapsed_seconds: None,
            })
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(
    operation: Operation,
    payload: Payload,
) -> Result<T, TransportError> {
    serde_json::from_value(payload).map_err(|e| {
        TransportError::malformed(format!("unexpected {} payload: {}", operation, e))
    })
}
