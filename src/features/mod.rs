//! Request handlers for the portal's serverless functions.

pub mod discover;
pub mod insight_review;
pub mod ma_insights;
pub mod sa_report;

use serde_json::Value;
use tracing::warn;

/// Result of an LLM-backed generation that tolerates unparseable replies.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Generated(Value),
    /// The reply could not be parsed; the record is marked `pending` for manual review.
    PendingReview { error: String },
}

/// Deserializes rows into `T`, logging and skipping the ones that don't fit.
pub(crate) fn typed_rows<T: serde::de::DeserializeOwned>(table: &str, rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(table = %table, "Skipping malformed row: {}", e);
                None
            }
        })
        .collect()
}
