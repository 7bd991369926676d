//! Pure aggregation of pass outputs into `sa_audit_reports` and child rows.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use super::types::{Finding, Narratives, Pass1Output, Recommendation, Severity};

pub const PROMPT_VERSION: &str = "v4-two-pass";
pub const MAX_QUOTES_USED: usize = 10;
pub const MAGIC_FIX_PREVIEW_CHARS: usize = 100;

/// Token and timing totals across both passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationStats {
    pub llm_model: String,
    pub pass1_tokens: u64,
    pub pass2_tokens: u64,
    pub cost: f64,
    pub generation_time_ms: u64,
}

impl GenerationStats {
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.pass1_tokens + self.pass2_tokens
    }

    /// Cost rendered the way the portal shows it, e.g. `£0.0123`.
    #[must_use]
    pub fn cost_label(&self) -> String {
        format!("£{:.4}", self.cost)
    }
}

#[must_use]
pub fn report_sentiment(average_score: f64) -> &'static str {
    if average_score >= 70.0 {
        "strong_foundation"
    } else if average_score >= 50.0 {
        "good_with_gaps"
    } else if average_score >= 30.0 {
        "significant_issues"
    } else {
        "critical_attention"
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvestmentSummary {
    pub total_investment: f64,
    pub total_annual_benefit: f64,
    /// `None` when the recommendations promise no benefit.
    pub payback_months: Option<i64>,
    pub roi_ratio: String,
    pub hours_reclaimable_weekly: f64,
}

#[must_use]
pub fn summarize_investment(recommendations: &[Recommendation]) -> InvestmentSummary {
    let total_investment: f64 = recommendations.iter().map(|r| r.estimated_cost).sum();
    let total_annual_benefit: f64 = recommendations.iter().map(|r| r.annual_benefit).sum();
    let hours_reclaimable_weekly = recommendations.iter().map(|r| r.hours_saved_weekly).sum();

    #[allow(clippy::cast_possible_truncation)]
    let payback_months = (total_annual_benefit > 0.0)
        .then(|| (total_investment / (total_annual_benefit / 12.0)).round() as i64);

    InvestmentSummary {
        total_investment,
        total_annual_benefit,
        payback_months,
        roi_ratio: format!("{:.1}:1", total_annual_benefit / total_investment.max(1.0)),
        hours_reclaimable_weekly,
    }
}

#[must_use]
pub fn count_severity(findings: &[Finding], severity: Severity) -> usize {
    findings.iter().filter(|f| f.severity == severity).count()
}

#[must_use]
pub fn what_this_enables(magic_fix: &str) -> Vec<String> {
    let preview: String = magic_fix.chars().take(MAGIC_FIX_PREVIEW_CHARS).collect();
    vec![
        format!("{preview}..."),
        "Decision-grade numbers within 7 days of month-end".to_string(),
        "Hiring and pricing decisions based on data, not debates".to_string(),
    ]
}

/// Upsert payload for `sa_audit_reports`.
#[must_use]
pub fn build_report_row(
    engagement_id: &str,
    pass1: &Pass1Output,
    narratives: &Narratives,
    stats: &GenerationStats,
    generated_at: DateTime<Utc>,
) -> Value {
    let f = &pass1.facts;
    let scores = &pass1.scores;
    let investment = summarize_investment(&pass1.recommendations);
    let quotes: Vec<&String> = f.all_client_quotes.iter().take(MAX_QUOTES_USED).collect();

    json!({
        "engagement_id": engagement_id,

        "headline": narratives.headline,
        "executive_summary": narratives.executive_summary,
        "executive_summary_sentiment": report_sentiment(scores.average()),

        "total_hours_wasted_weekly": f.hours_wasted_weekly,
        "total_annual_cost_of_chaos": f.annual_cost_of_chaos,
        "growth_multiplier": f.growth_multiplier,
        "projected_cost_at_scale": f.projected_cost_at_scale,
        "cost_of_chaos_narrative": narratives.cost_of_chaos_narrative,

        "systems_count": f.systems.len(),
        "integration_score": scores.integration.score,
        "automation_score": scores.automation.score,
        "data_accessibility_score": scores.data_accessibility.score,
        "scalability_score": scores.scalability.score,

        "critical_findings_count": count_severity(&pass1.findings, Severity::Critical),
        "high_findings_count": count_severity(&pass1.findings, Severity::High),
        "medium_findings_count": count_severity(&pass1.findings, Severity::Medium),
        "low_findings_count": count_severity(&pass1.findings, Severity::Low),

        "quick_wins": pass1.quick_wins,

        "total_recommended_investment": investment.total_investment,
        "total_annual_benefit": investment.total_annual_benefit,
        "overall_payback_months": investment.payback_months,
        "roi_ratio": investment.roi_ratio,

        "hours_reclaimable_weekly": investment.hours_reclaimable_weekly,
        "time_freedom_narrative": narratives.time_freedom_narrative,
        "what_this_enables": what_this_enables(&f.magic_fix),

        "client_quotes_used": quotes,

        "llm_model": stats.llm_model,
        "llm_tokens_used": stats.total_tokens(),
        "llm_cost": stats.cost,
        "generation_time_ms": stats.generation_time_ms,
        "prompt_version": PROMPT_VERSION,

        "status": "generated",
        "generated_at": generated_at.to_rfc3339(),
    })
}

/// Upsert payload marking a report for manual review after an unparseable reply.
#[must_use]
pub fn pending_report_row(engagement_id: &str, pass: &str, error: &str, raw: &str) -> Value {
    json!({
        "engagement_id": engagement_id,
        "status": "pending",
        "prompt_version": PROMPT_VERSION,
        "review_reason": format!("{pass} parse failed: {error}"),
        "raw_llm_output": raw,
    })
}

/// `F-<millis>-<4 hex chars>`
#[must_use]
pub fn finding_code(now: DateTime<Utc>) -> String {
    let suffix: String = Uuid::new_v4().simple().to_string().chars().take(4).collect();
    format!("F-{}-{suffix}", now.timestamp_millis())
}

#[must_use]
pub fn finding_row(engagement_id: &str, finding: &Finding, code: &str) -> Value {
    json!({
        "engagement_id": engagement_id,
        "finding_code": code,
        "source_stage": "ai_generated",
        "category": finding.category,
        "severity": finding.severity.as_str(),
        "title": finding.title,
        "description": format!(
            "{}\n\nSystems affected: {}\nProcesses affected: {}",
            finding.description,
            finding.affected_systems.join(", "),
            finding.affected_processes.join(", ")
        ),
        "evidence": finding.evidence,
        "client_quote": finding.client_quote,
        "hours_wasted_weekly": finding.hours_wasted_weekly,
        "annual_cost_impact": finding.annual_cost_impact,
        "scalability_impact": finding.scalability_impact,
        "recommendation": finding.recommendation,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn rank(value: f64) -> i64 {
    value.round() as i64
}

#[must_use]
pub fn recommendation_row(engagement_id: &str, rec: &Recommendation) -> Value {
    json!({
        "engagement_id": engagement_id,
        "priority_rank": rank(rec.priority_rank),
        "title": rec.title,
        "description": rec.description,
        "category": rec.category,
        "implementation_phase": rec.implementation_phase,
        "estimated_cost": rec.estimated_cost,
        "hours_saved_weekly": rec.hours_saved_weekly,
        "annual_cost_savings": rec.annual_benefit,
        "time_reclaimed_weekly": rec.hours_saved_weekly,
        "freedom_unlocked": rec.freedom_unlocked,
    })
}
