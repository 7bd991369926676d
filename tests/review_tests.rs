mod common;

use chrono::{TimeZone, Utc};
use common::MemoryStore;
use practice_portal::core::models::{InsightStatus, ReviewAction};
use practice_portal::errors::PortalError;
use practice_portal::features::insight_review::{
    ReviewRequest, review_insight, review_patch, transition,
};
use serde_json::{Value, json};

#[test]
fn test_transition_table() {
    use InsightStatus::{Approved, Draft, Edited, Rejected};
    use ReviewAction::{Approve, Edit, Reject};

    assert_eq!(transition(Draft, Approve).unwrap(), Approved);
    assert_eq!(transition(Edited, Approve).unwrap(), Approved);
    assert_eq!(transition(Draft, Reject).unwrap(), Rejected);
    assert_eq!(transition(Edited, Reject).unwrap(), Rejected);
    for status in [Draft, Edited, Approved, Rejected] {
        assert_eq!(transition(status, Edit).unwrap(), Edited);
    }

    let err = transition(Approved, Reject).unwrap_err();
    assert!(matches!(err, PortalError::Conflict(_)));
    assert_eq!(
        err.to_string(),
        "Conflict: Cannot reject an insight that is already approved"
    );
    assert!(transition(Rejected, Approve).is_err());
}

fn request(value: Value) -> ReviewRequest {
    serde_json::from_value(value).unwrap()
}

#[test]
fn test_approve_patch_stamps_reviewer() {
    let now = Utc.with_ymd_and_hms(2025, 4, 2, 10, 0, 0).unwrap();
    let row = json!({ "id": "ins-1", "status": null });
    let req = request(json!({
        "insightId": "ins-1",
        "action": "approve",
        "reviewerId": "adv-7",
        "notes": "Looks right"
    }));

    let (status, patch) = review_patch(&row, &req, now).unwrap();
    assert_eq!(status, InsightStatus::Approved);
    assert_eq!(patch["status"], json!("approved"));
    assert_eq!(patch["approved_by"], json!("adv-7"));
    assert_eq!(patch["approved_at"], json!(now.to_rfc3339()));
    assert_eq!(patch["review_notes"], json!("Looks right"));
}

#[test]
fn test_first_edit_preserves_original_content() {
    let now = Utc::now();
    let row = json!({
        "id": "ins-1",
        "status": "draft",
        "title": "Cash is tight",
        "description": "Two weeks of runway",
        "recommendation": "Chase debtors"
    });
    let req = request(json!({
        "insightId": "ins-1",
        "action": "edit",
        "changes": { "title": "Cash needs attention", "status": "approved", "id": "other" }
    }));

    let (status, patch) = review_patch(&row, &req, now).unwrap();
    assert_eq!(status, InsightStatus::Edited);
    assert_eq!(patch["title"], json!("Cash needs attention"));
    assert_eq!(patch["status"], json!("edited"));
    assert!(patch.get("id").is_none());
    assert_eq!(
        patch["original_content"],
        json!({
            "title": "Cash is tight",
            "description": "Two weeks of runway",
            "recommendation": "Chase debtors",
            "implications": null
        })
    );
}

#[test]
fn test_later_edit_keeps_first_original() {
    let row = json!({
        "status": "edited",
        "title": "Edited once",
        "original_content": { "title": "Generated" }
    });
    let req = request(json!({
        "insightId": "ins-1",
        "action": "edit",
        "changes": { "priority": "high" }
    }));

    let (_, patch) = review_patch(&row, &req, Utc::now()).unwrap();
    assert!(patch.get("original_content").is_none());
    assert_eq!(patch["priority"], json!("high"));
}

#[test]
fn test_edit_without_editable_changes_is_rejected() {
    let row = json!({ "status": "draft" });
    for changes in [json!(null), json!({}), json!({ "status": "approved" })] {
        let req = request(json!({ "insightId": "ins-1", "action": "edit", "changes": changes }));
        let err = review_patch(&row, &req, Utc::now()).unwrap_err();
        assert!(matches!(err, PortalError::ValidationError(_)));
    }
}

#[test]
fn test_unknown_action_fails_to_parse() {
    let parsed = serde_json::from_value::<ReviewRequest>(json!({ "insightId": "x", "action": "publish" }));
    assert!(parsed.is_err());
}

fn insight_store(status: &str) -> MemoryStore {
    MemoryStore::new().with_rows(
        "ma_insights",
        vec![json!({ "id": "ins-1", "status": status, "title": "Margin slipping" })],
    )
}

#[tokio::test]
async fn test_review_updates_the_row() {
    let store = insight_store("draft");
    let req = request(json!({ "insightId": "ins-1", "action": "reject", "reviewerId": "adv-7" }));

    let body = review_insight(&store, &req).await.unwrap();
    assert_eq!(
        body,
        json!({ "success": true, "insightId": "ins-1", "status": "rejected" })
    );

    let row = &store.rows("ma_insights")[0];
    assert_eq!(row["status"], json!("rejected"));
    assert_eq!(row["reviewed_by"], json!("adv-7"));
    assert!(row["reviewed_at"].is_string());
}

#[tokio::test]
async fn test_review_of_unknown_insight_is_not_found() {
    let store = insight_store("draft");
    let req = request(json!({ "insightId": "ins-404", "action": "approve" }));

    let err = review_insight(&store, &req).await.unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.to_string(), "Not found: Insight not found: ins-404");
}

#[tokio::test]
async fn test_approving_twice_is_a_conflict() {
    let store = insight_store("approved");
    let req = request(json!({ "insightId": "ins-1", "action": "approve" }));

    let err = review_insight(&store, &req).await.unwrap_err();
    assert_eq!(err.status_code(), 409);
    assert_eq!(store.rows("ma_insights")[0].get("approved_at"), None);
}

#[tokio::test]
async fn test_review_needs_an_insight_id() {
    let req = request(json!({ "action": "approve" }));
    let err = review_insight(&MemoryStore::new(), &req).await.unwrap_err();
    assert!(matches!(err, PortalError::ValidationError(ref m) if m == "insightId is required"));
}
