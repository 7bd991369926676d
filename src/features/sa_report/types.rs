//! Input rows and LLM output shapes for the systems-audit report.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::utils::lenient::{
    lenient_f64, lenient_opt_f64, lenient_string, lenient_strings, null_as_default,
};

/// A row of `sa_system_inventory`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SystemInventoryRow {
    #[serde(deserialize_with = "lenient_string")]
    pub system_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub category_code: String,
    pub criticality: Option<String>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub monthly_cost: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub number_of_users: Option<f64>,
    #[serde(deserialize_with = "lenient_strings")]
    pub primary_users: Vec<String>,
    pub integration_method: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub manual_transfer_required: bool,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub manual_hours_monthly: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub data_quality_score: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub user_satisfaction: Option<f64>,
    pub known_issues: Option<String>,
    pub workarounds_in_use: Option<String>,
    pub future_plan: Option<String>,
}

/// A row of `sa_process_deep_dives`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DeepDiveRow {
    #[serde(deserialize_with = "lenient_string")]
    pub chain_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub responses: Map<String, Value>,
    #[serde(deserialize_with = "lenient_strings")]
    pub key_pain_points: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "low" => Severity::Low,
            _ => Severity::Medium,
        })
    }
}

impl Severity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SystemAnalysis {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "lenient_string")]
    pub criticality: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub monthly_cost: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub integration_method: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub integrates_with: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub gaps: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub strengths: Vec<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub manual_hours: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub data_quality: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub user_satisfaction: f64,
    #[serde(deserialize_with = "lenient_strings")]
    pub pain_points: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessAnalysis {
    #[serde(deserialize_with = "lenient_string")]
    pub chain_code: String,
    #[serde(deserialize_with = "lenient_string")]
    pub chain_name: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub key_pain_points: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub specific_metrics: Map<String, Value>,
    #[serde(deserialize_with = "lenient_f64")]
    pub hours_wasted: f64,
    #[serde(deserialize_with = "lenient_strings")]
    pub critical_gaps: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub client_quotes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProcessMetrics {
    #[serde(deserialize_with = "lenient_f64")]
    pub quote_time_mins: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub invoice_lag_days: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub reporting_lag_days: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub month_end_close_days: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub target_close_days: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub debtor_days: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub transaction_volume: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub invoice_volume: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub ap_volume: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub employee_count: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractedFacts {
    #[serde(deserialize_with = "lenient_string")]
    pub company_name: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub team_size: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub projected_team_size: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub growth_multiplier: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub revenue_band: String,
    #[serde(deserialize_with = "lenient_string")]
    pub industry: String,

    #[serde(deserialize_with = "lenient_string")]
    pub breaking_point: String,
    #[serde(deserialize_with = "lenient_string")]
    pub month_end_shame: String,
    #[serde(deserialize_with = "lenient_string")]
    pub expensive_mistake: String,
    #[serde(deserialize_with = "lenient_string")]
    pub magic_fix: String,
    pub north_star: Option<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub fears: Vec<String>,

    #[serde(deserialize_with = "null_as_default")]
    pub systems: Vec<SystemAnalysis>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_system_cost: f64,
    #[serde(deserialize_with = "lenient_strings")]
    pub critical_systems: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub disconnected_systems: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub integration_gaps: Vec<String>,

    #[serde(deserialize_with = "null_as_default")]
    pub processes: Vec<ProcessAnalysis>,
    #[serde(deserialize_with = "null_as_default")]
    pub metrics: ProcessMetrics,

    #[serde(deserialize_with = "lenient_f64")]
    pub hours_wasted_weekly: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub annual_cost_of_chaos: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub projected_cost_at_scale: f64,

    #[serde(deserialize_with = "lenient_strings")]
    pub all_client_quotes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub evidence: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub client_quote: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub affected_systems: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub affected_processes: Vec<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub hours_wasted_weekly: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub annual_cost_impact: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub scalability_impact: String,
    #[serde(deserialize_with = "lenient_string")]
    pub recommendation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuickWin {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub action: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub systems: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub time_to_implement: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub hours_saved_weekly: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub annual_benefit: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub impact: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(deserialize_with = "lenient_f64")]
    pub priority_rank: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "lenient_string")]
    pub implementation_phase: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub systems_involved: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub processes_fixed: Vec<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub estimated_cost: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub hours_saved_weekly: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub annual_benefit: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub payback_months: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub freedom_unlocked: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreEvidence {
    #[serde(deserialize_with = "lenient_f64")]
    pub score: f64,
    #[serde(deserialize_with = "lenient_string")]
    pub evidence: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuditScores {
    #[serde(deserialize_with = "null_as_default")]
    pub integration: ScoreEvidence,
    #[serde(deserialize_with = "null_as_default")]
    pub automation: ScoreEvidence,
    #[serde(deserialize_with = "null_as_default")]
    pub data_accessibility: ScoreEvidence,
    #[serde(deserialize_with = "null_as_default")]
    pub scalability: ScoreEvidence,
}

impl AuditScores {
    #[must_use]
    pub fn average(&self) -> f64 {
        (self.integration.score
            + self.automation.score
            + self.data_accessibility.score
            + self.scalability.score)
            / 4.0
    }
}

/// Structured output of the extraction pass. `facts` is required; every
/// list defaults to empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pass1Output {
    pub facts: ExtractedFacts,
    #[serde(default, deserialize_with = "null_as_default")]
    pub findings: Vec<Finding>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quick_wins: Vec<QuickWin>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recommendations: Vec<Recommendation>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub scores: AuditScores,
}

/// Prose sections written by the narrative pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narratives {
    pub headline: String,
    pub executive_summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost_of_chaos_narrative: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_freedom_narrative: String,
}
