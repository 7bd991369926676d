//! Two-pass systems-audit report generation.
//!
//! Pass 1 extracts structured facts from the engagement's assessment rows,
//! pass 2 writes the narrative sections from those facts. The combined result
//! is upserted into `sa_audit_reports` and the findings and recommendations
//! tables are replaced wholesale.

pub mod summary;
pub mod types;

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use self::summary::{
    GenerationStats, build_report_row, finding_code, finding_row, pending_report_row,
    recommendation_row,
};
use self::types::{DeepDiveRow, Narratives, Pass1Output, SystemInventoryRow};
use crate::clients::llm_client::{
    ChatModel, Completion, CompletionRequest, build_messages, estimate_cost,
};
use crate::clients::store::{Query, Store};
use crate::core::config::AppConfig;
use crate::errors::PortalError;
use crate::features::{GenerationOutcome, typed_rows};
use crate::prompt::sa_report::{build_pass1_prompt, build_pass2_prompt};
use crate::utils::json_extract::parse_llm_json;

pub const DEFAULT_CLIENT_NAME: &str = "the business";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaReportRequest {
    #[serde(default)]
    pub engagement_id: String,
}

/// Everything the prompts need, loaded before any LLM call.
#[derive(Debug, Clone)]
pub struct AuditInputs {
    pub engagement: Value,
    pub discovery: Value,
    pub systems: Vec<SystemInventoryRow>,
    pub deep_dives: Vec<DeepDiveRow>,
    pub client_name: String,
}

/// Picks the display name for the client behind an engagement.
#[must_use]
pub fn client_display_name(member: Option<&Value>) -> String {
    ["client_company", "company", "name"]
        .iter()
        .find_map(|key| {
            member
                .and_then(|m| m.get(*key))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or(DEFAULT_CLIENT_NAME)
        .to_string()
}

/// # Errors
///
/// Returns `NotFound` when the engagement or its discovery responses are
/// missing, or a store error when any read fails.
pub async fn load_inputs(
    store: &dyn Store,
    engagement_id: &str,
) -> Result<AuditInputs, PortalError> {
    let engagement_q = Query::table("sa_engagements").eq("id", engagement_id);
    let discovery_q = Query::table("sa_discovery_responses").eq("engagement_id", engagement_id);
    let systems_q = Query::table("sa_system_inventory").eq("engagement_id", engagement_id);
    let dives_q = Query::table("sa_process_deep_dives").eq("engagement_id", engagement_id);

    let (engagement, discovery, systems, deep_dives) = futures::try_join!(
        store.select_one(&engagement_q),
        store.select_one(&discovery_q),
        store.select(&systems_q),
        store.select(&dives_q),
    )?;

    let engagement = engagement
        .ok_or_else(|| {
            PortalError::NotFound(format!("Failed to fetch engagement: {engagement_id}"))
        })?;
    let discovery = discovery
        .ok_or_else(|| {
            PortalError::NotFound(format!("Failed to fetch discovery: {engagement_id}"))
        })?;

    let member = match engagement.get("client_id").and_then(Value::as_str) {
        Some(client_id) => {
            store
                .select_one(
                    &Query::table("practice_members")
                        .select("client_company, company, name")
                        .eq("id", client_id),
                )
                .await?
        }
        None => None,
    };

    Ok(AuditInputs {
        engagement,
        discovery,
        systems: typed_rows("sa_system_inventory", systems),
        deep_dives: typed_rows("sa_process_deep_dives", deep_dives),
        client_name: client_display_name(member.as_ref()),
    })
}

async fn mark_pending(
    store: &dyn Store,
    engagement_id: &str,
    pass: &str,
    message: &str,
    raw: &str,
) -> GenerationOutcome {
    error!(engagement_id = %engagement_id, pass = %pass, "LLM reply parse error: {}", message);
    if let Err(e) = store
        .upsert(
            "sa_audit_reports",
            pending_report_row(engagement_id, pass, message, raw),
            "engagement_id",
        )
        .await
    {
        error!(engagement_id = %engagement_id, "Failed to mark report pending: {}", e);
    }
    GenerationOutcome::PendingReview {
        error: format!("{pass} parse failed: {message}"),
    }
}

async fn run_pass(
    llm: &dyn ChatModel,
    model: &str,
    prompt: String,
    temperature: f32,
    max_tokens: u32,
    title: &str,
) -> Result<Completion, PortalError> {
    llm.complete(CompletionRequest {
        model: model.to_string(),
        messages: build_messages(None, &prompt),
        temperature,
        max_tokens,
        title: title.to_string(),
    })
    .await
}

/// Generates and stores the systems-audit report for one engagement.
///
/// # Errors
///
/// Returns an error for a missing engagement id, missing source rows, store
/// failures, or LLM transport failures. Unparseable LLM replies are not
/// errors; they produce [`GenerationOutcome::PendingReview`].
#[tracing::instrument(level = "info", skip(store, llm, config))]
pub async fn generate_sa_report(
    store: &dyn Store,
    llm: &dyn ChatModel,
    config: &AppConfig,
    request: &SaReportRequest,
) -> Result<GenerationOutcome, PortalError> {
    let engagement_id = request.engagement_id.trim();
    if engagement_id.is_empty() {
        return Err(PortalError::ValidationError("engagementId is required".to_string()));
    }

    info!(engagement_id = %engagement_id, "Starting two-pass SA report generation");
    let inputs = load_inputs(store, engagement_id).await?;

    // Pass 1: extraction
    let pass1_prompt = build_pass1_prompt(
        &inputs.discovery,
        &inputs.systems,
        &inputs.deep_dives,
        &inputs.client_name,
    );
    let pass1 = run_pass(
        llm,
        &config.sa_extraction_model,
        pass1_prompt,
        0.1,
        8000,
        "SA Report Pass 1",
    )
    .await?;

    let pass1_data: Pass1Output = match parse_llm_json(&pass1.text) {
        Ok(data) => data,
        Err(PortalError::LlmParse { message, raw }) => {
            return Ok(mark_pending(store, engagement_id, "Pass 1", &message, &raw).await);
        }
        Err(e) => return Err(e),
    };

    info!(
        systems = pass1_data.facts.systems.len(),
        processes = pass1_data.facts.processes.len(),
        findings = pass1_data.findings.len(),
        hours_wasted = pass1_data.facts.hours_wasted_weekly,
        tokens = pass1.usage.total_tokens,
        time_ms = pass1.elapsed_ms,
        "Pass 1 complete"
    );

    // Pass 2: narratives
    let pass2 = run_pass(
        llm,
        &config.sa_narrative_model,
        build_pass2_prompt(&pass1_data),
        0.3,
        4000,
        "SA Report Pass 2",
    )
    .await?;

    let narratives: Narratives = match parse_llm_json(&pass2.text) {
        Ok(n) => n,
        Err(PortalError::LlmParse { message, raw }) => {
            return Ok(mark_pending(store, engagement_id, "Pass 2", &message, &raw).await);
        }
        Err(e) => return Err(e),
    };

    info!(
        headline_length = narratives.headline.chars().count(),
        summary_length = narratives.executive_summary.chars().count(),
        tokens = pass2.usage.total_tokens,
        time_ms = pass2.elapsed_ms,
        "Pass 2 complete"
    );

    let stats = GenerationStats {
        llm_model: format!(
            "{} + {}",
            config.sa_extraction_model, config.sa_narrative_model
        ),
        pass1_tokens: pass1.usage.total_tokens,
        pass2_tokens: pass2.usage.total_tokens,
        cost: estimate_cost(&config.sa_extraction_model, pass1.usage.total_tokens)
            + estimate_cost(&config.sa_narrative_model, pass2.usage.total_tokens),
        generation_time_ms: pass1.elapsed_ms + pass2.elapsed_ms,
    };

    let now = Utc::now();
    let report = store
        .upsert(
            "sa_audit_reports",
            build_report_row(engagement_id, &pass1_data, &narratives, &stats, now),
            "engagement_id",
        )
        .await?;
    let report_id = report.get("id").cloned().unwrap_or(Value::Null);

    let by_engagement = |table: &str| Query::table(table).eq("engagement_id", engagement_id);

    store.delete(&by_engagement("sa_findings")).await?;
    for finding in &pass1_data.findings {
        store
            .insert(
                "sa_findings",
                finding_row(engagement_id, finding, &finding_code(now)),
            )
            .await?;
    }

    store.delete(&by_engagement("sa_recommendations")).await?;
    for rec in &pass1_data.recommendations {
        store
            .insert("sa_recommendations", recommendation_row(engagement_id, rec))
            .await?;
    }

    store
        .update(
            &Query::table("sa_engagements").eq("id", engagement_id),
            json!({ "status": "analysis_complete" }),
        )
        .await?;

    info!(
        report_id = %report_id,
        pass1_tokens = stats.pass1_tokens,
        pass2_tokens = stats.pass2_tokens,
        total_cost = %stats.cost_label(),
        total_time_ms = stats.generation_time_ms,
        "SA report complete"
    );

    Ok(GenerationOutcome::Generated(json!({
        "success": true,
        "reportId": report_id,
        "headline": narratives.headline,
        "hoursWasted": pass1_data.facts.hours_wasted_weekly,
        "annualCost": pass1_data.facts.annual_cost_of_chaos,
        "pass1Tokens": stats.pass1_tokens,
        "pass2Tokens": stats.pass2_tokens,
        "totalTokens": stats.total_tokens(),
        "cost": stats.cost_label(),
        "generationTimeMs": stats.generation_time_ms,
    })))
}
