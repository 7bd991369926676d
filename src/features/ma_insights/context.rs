//! Client context and benchmark selection for the monthly-pack prompt.

use chrono::{Datelike, Utc};
use serde_json::Value;
use tracing::warn;

use super::types::{ClientContext, FinancialSnapshot, IndustryBenchmark};
use crate::clients::store::{Query, Store};
use crate::errors::PortalError;

pub const MAX_PHRASES: usize = 5;
pub const MAX_KNOWN_GOALS: usize = 5;
pub const MAX_ADVISOR_NOTES: usize = 3;
pub const CONTEXT_NOTES_LOADED: usize = 10;
pub const DEFAULT_INDUSTRY: &str = "General Business";

/// Benchmark band for an annualised revenue figure.
#[must_use]
pub fn revenue_band(annual_revenue: f64) -> &'static str {
    match annual_revenue {
        r if r < 250_000.0 => "under_250k",
        r if r < 500_000.0 => "250k_500k",
        r if r < 1_000_000.0 => "500k_1m",
        r if r < 2_000_000.0 => "1m_2m",
        r if r < 5_000_000.0 => "2m_5m",
        r if r < 10_000_000.0 => "5m_10m",
        _ => "over_10m",
    }
}

fn text_at<'a>(value: Option<&'a Value>, pointer: &str) -> Option<&'a str> {
    value
        .and_then(|v| v.pointer(pointer))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn string_items(value: Option<&Value>) -> impl Iterator<Item = String> + '_ {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(str::to_string)
}

fn phrases(anchors: Option<&Value>, responses: Option<&Value>, extra_keys: &[&str]) -> Vec<String> {
    string_items(anchors)
        .chain(
            extra_keys
                .iter()
                .filter_map(|key| text_at(responses, &format!("/{key}")).map(str::to_string)),
        )
        .filter(|p| !p.trim().is_empty())
        .take(MAX_PHRASES)
        .collect()
}

/// Assembles the prompt context from the rows loaded for a client.
///
/// `notes` are `client_context` rows, newest first.
#[must_use]
pub fn build_client_context(
    client_id: &str,
    member: Option<&Value>,
    discovery: Option<&Value>,
    roadmap: Option<&Value>,
    notes: &[Value],
) -> ClientContext {
    let responses = discovery.and_then(|d| d.get("responses"));
    let anchors = discovery.and_then(|d| d.get("extracted_anchors"));

    let north_star = text_at(roadmap, "/roadmap_data/fiveYearVision/northStar")
        .or_else(|| text_at(responses, "/tuesday_test"))
        .or_else(|| text_at(responses, "/ten_year_vision"))
        .map(str::to_string);

    let note_content = |n: &Value| n.get("content").and_then(Value::as_str).map(str::to_string);

    let known_goals = notes
        .iter()
        .filter(|n| {
            matches!(
                n.get("context_type").and_then(Value::as_str),
                Some("note" | "transcript")
            )
        })
        .filter_map(note_content)
        .take(MAX_KNOWN_GOALS)
        .collect();

    ClientContext {
        client_id: client_id.to_string(),
        client_name: text_at(member, "/name").unwrap_or("Client").to_string(),
        company_name: text_at(member, "/client_company").unwrap_or("Company").to_string(),
        industry: text_at(responses, "/industry")
            .unwrap_or(DEFAULT_INDUSTRY)
            .to_string(),
        industry_code: text_at(responses, "/sic_code").map(str::to_string),
        north_star,
        archetype: text_at(roadmap, "/roadmap_data/fitProfile/archetype").map(str::to_string),
        pain_phrases: phrases(
            anchors.and_then(|a| a.get("painPhrases")),
            responses,
            &["monday_frustration", "money_worry", "emergency_log"],
        ),
        desire_phrases: phrases(
            anchors.and_then(|a| a.get("desirePhrases")),
            responses,
            &["magic_away_task", "secret_pride", "winning_definition"],
        ),
        known_goals,
        advisor_notes: notes
            .iter()
            .filter_map(note_content)
            .take(MAX_ADVISOR_NOTES)
            .collect(),
    }
}

/// # Errors
///
/// Returns a store error when any of the context reads fail.
pub async fn fetch_client_context(
    store: &dyn Store,
    client_id: &str,
) -> Result<ClientContext, PortalError> {
    let member_q = Query::table("practice_members")
        .select("id, name, client_company")
        .eq("id", client_id);
    let discovery_q = Query::table("destination_discovery")
        .select("responses, extracted_anchors")
        .eq("client_id", client_id)
        .order("created_at", false);
    let roadmap_q = Query::table("client_roadmaps")
        .select("roadmap_data")
        .eq("client_id", client_id)
        .eq("is_active", true);
    let notes_q = Query::table("client_context")
        .select("content, context_type, priority_level")
        .eq("client_id", client_id)
        .order("created_at", false)
        .limit(CONTEXT_NOTES_LOADED);

    let (member, discovery, roadmap, notes) = futures::try_join!(
        store.select_one(&member_q),
        store.select_one(&discovery_q),
        store.select_one(&roadmap_q),
        store.select(&notes_q),
    )?;

    Ok(build_client_context(
        client_id,
        member.as_ref(),
        discovery.as_ref(),
        roadmap.as_ref(),
        &notes,
    ))
}

/// Latest benchmark for the client's industry and size, if one exists.
///
/// A malformed benchmark row is logged and treated as absent.
///
/// # Errors
///
/// Returns a store error when the lookup fails.
pub async fn fetch_benchmark(
    store: &dyn Store,
    industry_code: Option<&str>,
    snapshot: &FinancialSnapshot,
) -> Result<Option<IndustryBenchmark>, PortalError> {
    let (Some(code), Some(annual)) = (
        industry_code,
        snapshot.annualised_revenue().filter(|r| *r > 0.0),
    ) else {
        return Ok(None);
    };

    let query = Query::table("ma_industry_benchmarks")
        .eq("industry_code", code)
        .eq("revenue_band", revenue_band(annual))
        .gte("period_year", Utc::now().year() - 2)
        .order("period_year", false);

    Ok(store.select_one(&query).await?.and_then(|row| {
        serde_json::from_value(row)
            .map_err(|e| warn!(industry_code = %code, "Ignoring malformed benchmark row: {}", e))
            .ok()
    }))
}
