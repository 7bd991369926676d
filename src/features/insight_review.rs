//! Advisor review of generated insights in `ma_insights`.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::clients::store::{Query, Store};
use crate::core::models::{InsightStatus, ReviewAction};
use crate::errors::PortalError;

/// Columns an advisor may change through an edit.
pub const EDITABLE_FIELDS: [&str; 7] = [
    "title",
    "description",
    "recommendation",
    "implications",
    "priority",
    "data_points",
    "show_to_client",
];

/// Columns snapshotted into `original_content` on the first edit.
pub const PRESERVED_FIELDS: [&str; 4] = ["title", "description", "recommendation", "implications"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[serde(default)]
    pub insight_id: String,
    pub action: ReviewAction,
    #[serde(default)]
    pub reviewer_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub changes: Option<Map<String, Value>>,
}

/// Status after applying `action`, or a conflict when the move is not allowed.
///
/// # Errors
///
/// Returns `Conflict` when approving or rejecting an insight that is already
/// approved or rejected.
pub fn transition(
    current: InsightStatus,
    action: ReviewAction,
) -> Result<InsightStatus, PortalError> {
    use InsightStatus::{Approved, Draft, Edited, Rejected};

    match (current, action) {
        (Draft | Edited, ReviewAction::Approve) => Ok(Approved),
        (Draft | Edited, ReviewAction::Reject) => Ok(Rejected),
        (_, ReviewAction::Edit) => Ok(Edited),
        (Approved | Rejected, _) => Err(PortalError::Conflict(format!(
            "Cannot {} an insight that is already {}",
            action.as_str(),
            current.as_str()
        ))),
    }
}

fn current_status(row: &Value) -> Result<InsightStatus, PortalError> {
    match row.get("status") {
        None | Some(Value::Null) => Ok(InsightStatus::Draft),
        Some(status) => serde_json::from_value(status.clone())
            .map_err(|_| PortalError::StoreError(format!("Unknown insight status: {status}"))),
    }
}

/// Builds the update for one review action against the stored row.
///
/// # Errors
///
/// Returns `Conflict` for an illegal transition, or a validation error when
/// an edit carries no editable changes.
pub fn review_patch(
    row: &Value,
    request: &ReviewRequest,
    now: DateTime<Utc>,
) -> Result<(InsightStatus, Value), PortalError> {
    let next = transition(current_status(row)?, request.action)?;
    let stamp = now.to_rfc3339();

    let patch = match request.action {
        ReviewAction::Approve => json!({
            "status": next.as_str(),
            "approved_by": request.reviewer_id,
            "approved_at": stamp,
            "review_notes": request.notes,
        }),
        ReviewAction::Reject => json!({
            "status": next.as_str(),
            "reviewed_by": request.reviewer_id,
            "reviewed_at": stamp,
            "review_notes": request.notes,
        }),
        ReviewAction::Edit => {
            let mut patch: Map<String, Value> = request
                .changes
                .iter()
                .flatten()
                .filter(|(key, _)| EDITABLE_FIELDS.contains(&key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            if patch.is_empty() {
                return Err(PortalError::ValidationError(
                    "changes must include at least one editable field".to_string(),
                ));
            }

            let has_original = row
                .get("original_content")
                .is_some_and(|v| !v.is_null());
            if !has_original {
                let original: Map<String, Value> = PRESERVED_FIELDS
                    .iter()
                    .map(|key| ((*key).to_string(), row.get(*key).cloned().unwrap_or(Value::Null)))
                    .collect();
                patch.insert("original_content".to_string(), Value::Object(original));
            }

            patch.insert("status".to_string(), json!(next.as_str()));
            patch.insert("edited_at".to_string(), json!(stamp));
            Value::Object(patch)
        }
    };

    Ok((next, patch))
}

/// Applies a review action to an insight.
///
/// # Errors
///
/// Returns a validation error for a missing id, `NotFound` for an unknown
/// insight, `Conflict` for an illegal transition, or a store error.
#[tracing::instrument(level = "info", skip(store))]
pub async fn review_insight(
    store: &dyn Store,
    request: &ReviewRequest,
) -> Result<Value, PortalError> {
    let insight_id = request.insight_id.trim();
    if insight_id.is_empty() {
        return Err(PortalError::ValidationError("insightId is required".to_string()));
    }

    let by_id = Query::table("ma_insights").eq("id", insight_id);
    let row = store
        .select_one(&by_id)
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("Insight not found: {insight_id}")))?;

    let (status, patch) = review_patch(&row, request, Utc::now())?;
    store.update(&by_id, patch).await?;

    info!(insight_id = %insight_id, status = status.as_str(), "Insight reviewed");

    Ok(json!({
        "success": true,
        "insightId": insight_id,
        "status": status.as_str(),
    }))
}
