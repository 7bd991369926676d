mod common;

use chrono::{TimeZone, Utc};
use common::{MemoryStore, ScriptedModel, test_config};
use practice_portal::errors::PortalError;
use practice_portal::features::GenerationOutcome;
use practice_portal::features::sa_report::summary::{
    finding_code, recommendation_row, report_sentiment, summarize_investment, what_this_enables,
};
use practice_portal::features::sa_report::types::Recommendation;
use practice_portal::features::sa_report::{
    SaReportRequest, client_display_name, generate_sa_report,
};
use serde_json::json;

fn rec(cost: f64, benefit: f64, hours: f64) -> Recommendation {
    Recommendation {
        estimated_cost: cost,
        annual_benefit: benefit,
        hours_saved_weekly: hours,
        ..Recommendation::default()
    }
}

#[test]
fn test_summarize_investment() {
    let summary = summarize_investment(&[rec(4000.0, 18_000.0, 5.0), rec(2000.0, 6000.0, 2.5)]);
    assert_eq!(summary.total_investment, 6000.0);
    assert_eq!(summary.total_annual_benefit, 24_000.0);
    assert_eq!(summary.payback_months, Some(3));
    assert_eq!(summary.roi_ratio, "4.0:1");
    assert_eq!(summary.hours_reclaimable_weekly, 7.5);
}

#[test]
fn test_summarize_investment_without_benefit() {
    let summary = summarize_investment(&[rec(1500.0, 0.0, 0.0)]);
    assert_eq!(summary.payback_months, None);
    assert_eq!(summary.roi_ratio, "0.0:1");

    let empty = summarize_investment(&[]);
    assert_eq!(empty.total_investment, 0.0);
    assert_eq!(empty.payback_months, None);
}

#[test]
fn test_report_sentiment_bands() {
    assert_eq!(report_sentiment(85.0), "strong_foundation");
    assert_eq!(report_sentiment(70.0), "strong_foundation");
    assert_eq!(report_sentiment(69.9), "good_with_gaps");
    assert_eq!(report_sentiment(30.0), "significant_issues");
    assert_eq!(report_sentiment(12.5), "critical_attention");
}

#[test]
fn test_what_this_enables_previews_magic_fix() {
    let fix = "x".repeat(150);
    let items = what_this_enables(&fix);
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], format!("{}...", "x".repeat(100)));

    assert_eq!(what_this_enables("Real-time cash view")[0], "Real-time cash view...");
}

#[test]
fn test_finding_code_format() {
    let now = Utc.with_ymd_and_hms(2025, 1, 15, 9, 30, 0).unwrap();
    let code = finding_code(now);
    let parts: Vec<&str> = code.split('-').collect();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0], "F");
    assert_eq!(parts[1], now.timestamp_millis().to_string());
    assert_eq!(parts[2].len(), 4);
    assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_recommendation_row_rounds_rank() {
    let rec = Recommendation {
        priority_rank: 1.6,
        title: "Connect Xero to HubSpot".to_string(),
        annual_benefit: 9000.0,
        hours_saved_weekly: 4.0,
        ..Recommendation::default()
    };
    let row = recommendation_row("eng-1", &rec);
    assert_eq!(row["priority_rank"], json!(2));
    assert_eq!(row["annual_cost_savings"], json!(9000.0));
    assert_eq!(row["time_reclaimed_weekly"], json!(4.0));
}

#[test]
fn test_client_display_name_preference() {
    let member = json!({ "client_company": "  ", "company": "Acme Ltd", "name": "Sam" });
    assert_eq!(client_display_name(Some(&member)), "Acme Ltd");
    assert_eq!(client_display_name(Some(&json!({ "name": "Sam" }))), "Sam");
    assert_eq!(client_display_name(None), "the business");
}

fn seeded_store() -> MemoryStore {
    MemoryStore::new()
        .with_rows(
            "sa_engagements",
            vec![json!({ "id": "eng-1", "client_id": "client-1", "status": "in_progress" })],
        )
        .with_rows(
            "practice_members",
            vec![json!({ "id": "client-1", "client_company": "Acme Joinery Ltd" })],
        )
        .with_rows(
            "sa_discovery_responses",
            vec![json!({ "engagement_id": "eng-1", "systems_breaking_point": "Month end takes 3 weeks" })],
        )
        .with_rows(
            "sa_system_inventory",
            vec![json!({ "engagement_id": "eng-1", "system_name": "Xero", "category_code": "accounting" })],
        )
        .with_rows(
            "sa_findings",
            vec![
                json!({ "engagement_id": "eng-1", "title": "stale finding" }),
                json!({ "engagement_id": "eng-2", "title": "other engagement" }),
            ],
        )
}

fn pass1_reply() -> String {
    json!({
        "facts": {
            "companyName": "Acme Joinery Ltd",
            "hoursWastedWeekly": 14,
            "annualCostOfChaos": "£21,840",
            "magicFix": "One dashboard",
            "allClientQuotes": ["We live in spreadsheets"]
        },
        "findings": [
            { "severity": "CRITICAL", "title": "No integration", "affectedSystems": ["Xero"] },
            { "severity": "unexpected", "title": "Manual invoicing" }
        ],
        "recommendations": [
            { "priorityRank": 1, "title": "Connect systems", "estimatedCost": 3000, "annualBenefit": 12000, "hoursSavedWeekly": 6 }
        ],
        "scores": {
            "integration": { "score": 20 },
            "automation": { "score": 30 },
            "dataAccessibility": { "score": 40 },
            "scalability": { "score": 50 }
        }
    })
    .to_string()
}

fn pass2_reply() -> String {
    format!(
        "```json\n{}\n```",
        json!({
            "headline": "Acme loses 14 hours a week to rekeying",
            "executiveSummary": "Summary text",
            "costOfChaosNarrative": null
        })
    )
}

fn request(id: &str) -> SaReportRequest {
    SaReportRequest {
        engagement_id: id.to_string(),
    }
}

#[tokio::test]
async fn test_generate_report_end_to_end() {
    let store = seeded_store();
    let llm = ScriptedModel::new([pass1_reply(), pass2_reply()]);
    let config = test_config();

    let outcome = generate_sa_report(&store, &llm, &config, &request("eng-1"))
        .await
        .unwrap();
    let GenerationOutcome::Generated(body) = outcome else {
        panic!("expected a generated report, got {outcome:?}");
    };

    assert_eq!(body["success"], json!(true));
    assert_eq!(body["headline"], json!("Acme loses 14 hours a week to rekeying"));
    assert_eq!(body["hoursWasted"], json!(14.0));
    assert_eq!(body["annualCost"], json!(21840.0));
    assert_eq!(body["totalTokens"], json!(3000));
    assert_eq!(body["generationTimeMs"], json!(84));

    let calls = llm.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].model, config.sa_extraction_model);
    assert_eq!(calls[0].max_tokens, 8000);
    assert!(calls[0].prompt.contains("Company: Acme Joinery Ltd"));
    assert_eq!(calls[1].model, config.sa_narrative_model);
    assert_eq!(calls[1].title, "SA Report Pass 2");

    let reports = store.rows("sa_audit_reports");
    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(body["reportId"], report["id"]);
    assert_eq!(report["status"], json!("generated"));
    assert_eq!(report["executive_summary_sentiment"], json!("significant_issues"));
    assert_eq!(report["critical_findings_count"], json!(1));
    assert_eq!(report["medium_findings_count"], json!(1));
    assert_eq!(report["overall_payback_months"], json!(3));
    assert_eq!(report["cost_of_chaos_narrative"], json!(""));

    let findings = store.rows("sa_findings");
    let titles: Vec<&str> = findings
        .iter()
        .filter(|f| f["engagement_id"] == json!("eng-1"))
        .filter_map(|f| f["title"].as_str())
        .collect();
    assert_eq!(titles, ["No integration", "Manual invoicing"]);
    assert!(findings.iter().any(|f| f["engagement_id"] == json!("eng-2")));

    assert_eq!(store.rows("sa_recommendations").len(), 1);
    assert_eq!(
        store.rows("sa_engagements")[0]["status"],
        json!("analysis_complete")
    );
}

#[tokio::test]
async fn test_unparseable_pass1_marks_report_pending() {
    let store = seeded_store();
    let llm = ScriptedModel::new(["I'm sorry, I can't produce JSON today."]);

    let outcome = generate_sa_report(&store, &llm, &test_config(), &request("eng-1"))
        .await
        .unwrap();
    let GenerationOutcome::PendingReview { error } = outcome else {
        panic!("expected pending review, got {outcome:?}");
    };
    assert!(error.starts_with("Pass 1 parse failed"));

    let reports = store.rows("sa_audit_reports");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["status"], json!("pending"));
    assert_eq!(
        reports[0]["raw_llm_output"],
        json!("I'm sorry, I can't produce JSON today.")
    );
    assert_eq!(llm.calls().len(), 1);
    assert_eq!(store.rows("sa_findings").len(), 2);
}

#[tokio::test]
async fn test_pass2_missing_headline_marks_report_pending() {
    let store = seeded_store();
    let llm = ScriptedModel::new([pass1_reply(), json!({ "executiveSummary": "x" }).to_string()]);

    let outcome = generate_sa_report(&store, &llm, &test_config(), &request("eng-1"))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        GenerationOutcome::PendingReview { ref error } if error.starts_with("Pass 2 parse failed")
    ));
    assert_eq!(store.rows("sa_audit_reports")[0]["status"], json!("pending"));
}

#[tokio::test]
async fn test_missing_engagement_is_not_found() {
    let store = MemoryStore::new();
    let llm = ScriptedModel::new(Vec::<String>::new());

    let err = generate_sa_report(&store, &llm, &test_config(), &request("nope"))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::NotFound(_)));
    assert_eq!(err.status_code(), 404);
    assert!(llm.calls().is_empty());
}

#[tokio::test]
async fn test_blank_engagement_id_is_rejected() {
    let store = MemoryStore::new();
    let llm = ScriptedModel::new(Vec::<String>::new());

    let err = generate_sa_report(&store, &llm, &test_config(), &request("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::ValidationError(_)));
}

#[tokio::test]
async fn test_report_store_failure_is_an_error() {
    let store = seeded_store().fail_writes_to("sa_audit_reports");
    let llm = ScriptedModel::new([pass1_reply(), pass2_reply()]);

    let err = generate_sa_report(&store, &llm, &test_config(), &request("eng-1"))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 500);
    assert!(matches!(err, PortalError::StoreError(_)));
}
