//! Narrative insights for management-accounts clients.
//!
//! Two modes: a financial snapshot produces a monthly-pack insight stored in
//! `ma_monthly_insights`; a client with only a completed assessment gets an
//! assessment-based insight stored as a `client_context` note.

pub mod context;
pub mod types;

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info};

use self::context::{fetch_benchmark, fetch_client_context};
use self::types::{FinancialSnapshot, IndustryBenchmark, InsightsReply};
use crate::clients::llm_client::{
    ChatModel, Completion, CompletionRequest, build_messages, estimate_cost,
};
use crate::clients::store::{Query, Store};
use crate::core::config::AppConfig;
use crate::errors::PortalError;
use crate::features::{GenerationOutcome, typed_rows};
use crate::prompt::ma_insights::{MA_SYSTEM_PROMPT, build_assessment_prompt, build_snapshot_prompt};
use crate::utils::json_extract::{extract_json_object, parse_llm_json};
use crate::utils::lenient::null_as_default;

pub const PROMPT_VERSION: &str = "v1";
pub const MAX_PRIOR_SNAPSHOTS: usize = 12;
const SNAPSHOT_COLUMNS: &str = "*, ma_engagements!inner(id, client_id, practice_id, settings)";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MaInsightsRequest {
    pub snapshot_id: Option<String>,
    pub client_id: Option<String>,
    pub practice_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub regenerate: bool,
}

fn present(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

async fn call_model(
    llm: &dyn ChatModel,
    model: &str,
    prompt: &str,
    title: &str,
) -> Result<Completion, PortalError> {
    llm.complete(CompletionRequest {
        model: model.to_string(),
        messages: build_messages(Some(MA_SYSTEM_PROMPT), prompt),
        temperature: 0.3,
        max_tokens: 4000,
        title: title.to_string(),
    })
    .await
}

fn usage_json(model: &str, completion: &Completion) -> Value {
    json!({
        "totalTokens": completion.usage.total_tokens,
        "promptTokens": completion.usage.prompt_tokens,
        "completionTokens": completion.usage.completion_tokens,
        "cost": estimate_cost(model, completion.usage.total_tokens),
        "timeMs": completion.elapsed_ms,
    })
}

/// Generates insights for a snapshot, or for a client's assessment when no
/// snapshot is given.
///
/// # Errors
///
/// Returns a validation error when neither id is supplied, `NotFound` for a
/// missing snapshot or assessment, and store or LLM transport errors.
#[tracing::instrument(level = "info", skip(store, llm, config))]
pub async fn generate_ma_insights(
    store: &dyn Store,
    llm: &dyn ChatModel,
    config: &AppConfig,
    request: &MaInsightsRequest,
) -> Result<GenerationOutcome, PortalError> {
    let snapshot_id = present(request.snapshot_id.as_ref());
    let client_id = present(request.client_id.as_ref());

    match (snapshot_id, client_id) {
        (Some(snapshot_id), _) => {
            from_snapshot(store, llm, config, snapshot_id, request.regenerate).await
        }
        (None, Some(client_id)) => {
            from_assessment(
                store,
                llm,
                config,
                client_id,
                present(request.practice_id.as_ref()),
            )
            .await
        }
        (None, None) => Err(PortalError::ValidationError(
            "Either snapshotId or clientId is required".to_string(),
        )),
    }
}

/// Assessment replies use their own shape; only the headline is checked.
fn check_headline(reply: &Value, raw: &str) -> Result<(), PortalError> {
    let has = |pointer: &str| {
        reply
            .pointer(pointer)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.trim().is_empty())
    };
    if has("/headline/text") && has("/headline/sentiment") {
        Ok(())
    } else {
        Err(PortalError::LlmParse {
            message: "Missing required headline in LLM response".to_string(),
            raw: raw.to_string(),
        })
    }
}

async fn from_assessment(
    store: &dyn Store,
    llm: &dyn ChatModel,
    config: &AppConfig,
    client_id: &str,
    practice_id: Option<&str>,
) -> Result<GenerationOutcome, PortalError> {
    info!(client_id = %client_id, "Generating insights from assessment");

    let assessment_q = Query::table("service_line_assessments")
        .eq("client_id", client_id)
        .eq("service_line_code", "management_accounts");
    let member_q = Query::table("practice_members")
        .select("id, name, email, company, industry")
        .eq("id", client_id);
    let documents_q = Query::table("client_context")
        .eq("client_id", client_id)
        .eq("data_source_type", "accounts");

    let (assessment, member, documents) = futures::try_join!(
        store.select_one(&assessment_q),
        store.select_one(&member_q),
        store.select(&documents_q),
    )?;
    let assessment = assessment.ok_or_else(|| {
        PortalError::NotFound(format!("Assessment not found for client: {client_id}"))
    })?;

    let prompt = build_assessment_prompt(member.as_ref(), &assessment, documents.len());
    let completion = call_model(llm, &config.ma_insights_model, &prompt, "MA Insights").await?;
    info!(
        time_ms = completion.elapsed_ms,
        tokens = completion.usage.total_tokens,
        "LLM response received"
    );

    let insight = extract_json_object(&completion.text)?;
    check_headline(&insight, &completion.text)?;

    let note = json!({
        "client_id": client_id,
        "practice_id": practice_id,
        "context_type": "note",
        "content": insight.to_string(),
        "data_source_type": "general",
        "processed": true,
    });
    if let Err(e) = store.insert("client_context", note).await {
        error!(client_id = %client_id, "Error storing insight: {}", e);
    }

    Ok(GenerationOutcome::Generated(json!({
        "success": true,
        "insight": insight,
        "mode": "assessment-based",
        "usage": usage_json(&config.ma_insights_model, &completion),
    })))
}

/// Upsert payload for a generated monthly insight.
#[must_use]
pub fn insight_row(
    snapshot: &FinancialSnapshot,
    reply: &InsightsReply,
    benchmark: Option<&IndustryBenchmark>,
    model: &str,
    completion: &Completion,
) -> Value {
    let north_star = reply.north_star_connection.as_ref();
    json!({
        "snapshot_id": snapshot.id,
        "engagement_id": snapshot.engagement_id,
        "period_end_date": snapshot.period_end_date,
        "headline_text": reply.headline.text,
        "headline_sentiment": reply.headline.sentiment,
        "insights": reply.insights,
        "decisions_enabled": reply.decisions_enabled,
        "watch_list": reply.watch_list,
        "north_star_connection": north_star.map(|n| n.narrative.clone()),
        "north_star_sentiment": north_star.map(|n| n.sentiment.clone()),
        "benchmark_comparison": benchmark.map(|b| json!({
            "industryName": b.industry_name,
            "revenueBand": b.revenue_band,
            "highlights": reply.benchmark_highlights,
        })),
        "llm_model": model,
        "llm_tokens_used": completion.usage.total_tokens,
        "llm_cost": estimate_cost(model, completion.usage.total_tokens),
        "generation_time_ms": completion.elapsed_ms,
        "generation_prompt_version": PROMPT_VERSION,
        "status": "generated",
    })
}

/// Upsert payload recording an unparseable reply for manual review.
#[must_use]
pub fn pending_insight_row(snapshot: &FinancialSnapshot, error: &str, raw: &str) -> Value {
    json!({
        "snapshot_id": snapshot.id,
        "engagement_id": snapshot.engagement_id,
        "period_end_date": snapshot.period_end_date,
        "generation_prompt_version": PROMPT_VERSION,
        "status": "pending",
        "review_reason": format!("LLM reply parse failed: {error}"),
        "raw_llm_output": raw,
    })
}

async fn from_snapshot(
    store: &dyn Store,
    llm: &dyn ChatModel,
    config: &AppConfig,
    snapshot_id: &str,
    regenerate: bool,
) -> Result<GenerationOutcome, PortalError> {
    info!(snapshot_id = %snapshot_id, "Generating insights for snapshot");

    let row = store
        .select_one(
            &Query::table("ma_financial_snapshots")
                .select(SNAPSHOT_COLUMNS)
                .eq("id", snapshot_id),
        )
        .await?
        .ok_or_else(|| PortalError::NotFound(format!("Snapshot not found: {snapshot_id}")))?;
    let snapshot: FinancialSnapshot = serde_json::from_value(row)
        .map_err(|e| PortalError::StoreError(format!("Malformed snapshot {snapshot_id}: {e}")))?;
    let client_id = snapshot
        .client_id()
        .ok_or_else(|| {
            PortalError::NotFound(format!("Engagement not found for snapshot: {snapshot_id}"))
        })?
        .to_string();

    info!(client_id = %client_id, engagement_id = %snapshot.engagement_id, "Snapshot loaded");

    if !regenerate {
        let existing = store
            .select_one(
                &Query::table("ma_monthly_insights")
                    .select("id, status")
                    .eq("snapshot_id", snapshot_id),
            )
            .await?;
        if let Some(existing) = existing
            && existing.get("status").and_then(Value::as_str) != Some("generating")
        {
            let insight_id = existing.get("id").cloned().unwrap_or(Value::Null);
            info!(insight_id = %insight_id, "Insight already exists");
            return Ok(GenerationOutcome::Generated(json!({
                "success": true,
                "insightId": insight_id,
                "cached": true,
            })));
        }
    }

    let prior_q = Query::table("ma_financial_snapshots")
        .eq("engagement_id", snapshot.engagement_id.as_str())
        .lt("period_end_date", snapshot.period_end_date.as_str())
        .order("period_end_date", false)
        .limit(MAX_PRIOR_SNAPSHOTS);
    let (prior_rows, client_context) = futures::try_join!(
        store.select(&prior_q),
        fetch_client_context(store, &client_id),
    )?;
    let prior: Vec<FinancialSnapshot> = typed_rows("ma_financial_snapshots", prior_rows);

    info!(
        company = %client_context.company_name,
        has_north_star = client_context.north_star.is_some(),
        prior_periods = prior.len(),
        "Client context loaded"
    );

    let benchmark =
        fetch_benchmark(store, client_context.industry_code.as_deref(), &snapshot).await?;
    if let Some(b) = &benchmark {
        info!(industry = %b.industry_name, band = %b.revenue_band, "Benchmark loaded");
    }

    let prompt = build_snapshot_prompt(&snapshot, &prior, &client_context, benchmark.as_ref());
    info!(prompt_chars = prompt.len(), "Prompt built, calling LLM");

    let model = config.ma_insights_model.as_str();
    let completion = call_model(llm, model, &prompt, "MA Insights").await?;

    let reply = match parse_llm_json::<InsightsReply>(&completion.text).and_then(|r| {
        r.validate().map_err(|message| PortalError::LlmParse {
            message,
            raw: completion.text.clone(),
        })
    }) {
        Ok(reply) => reply,
        Err(PortalError::LlmParse { message, raw }) => {
            error!(snapshot_id = %snapshot_id, "Failed to parse LLM response: {}", message);
            if let Err(e) = store
                .upsert(
                    "ma_monthly_insights",
                    pending_insight_row(&snapshot, &message, &raw),
                    "snapshot_id",
                )
                .await
            {
                error!(snapshot_id = %snapshot_id, "Failed to mark insight pending: {}", e);
            }
            return Ok(GenerationOutcome::PendingReview {
                error: format!("Invalid JSON from LLM: {message}"),
            });
        }
        Err(e) => return Err(e),
    };

    let saved = store
        .upsert(
            "ma_monthly_insights",
            insight_row(&snapshot, &reply, benchmark.as_ref(), model, &completion),
            "snapshot_id",
        )
        .await?;
    let insight_id = saved.get("id").cloned().unwrap_or(Value::Null);

    info!(
        insight_id = %insight_id,
        tokens = completion.usage.total_tokens,
        time_ms = completion.elapsed_ms,
        "Insight saved"
    );

    Ok(GenerationOutcome::Generated(json!({
        "success": true,
        "insightId": insight_id,
        "usage": {
            "tokens": completion.usage.total_tokens,
            "cost": estimate_cost(model, completion.usage.total_tokens),
            "timeMs": completion.elapsed_ms,
        },
    })))
}
