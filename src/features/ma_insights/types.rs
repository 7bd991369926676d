//! Snapshot rows, benchmark rows and the LLM reply for management-accounts insights.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::lenient::{lenient_opt_f64, lenient_string, lenient_strings, null_as_default};

pub const MAX_INSIGHTS: usize = 5;
pub const MAX_DECISIONS: usize = 3;
pub const MAX_WATCH_ITEMS: usize = 4;

/// A row of `ma_financial_snapshots`, optionally with its embedded engagement.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FinancialSnapshot {
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub engagement_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub period_end_date: String,
    pub period_type: Option<String>,

    #[serde(deserialize_with = "lenient_opt_f64")]
    pub revenue: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub revenue_vs_prior_month_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub revenue_vs_prior_year_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub revenue_vs_budget_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub gross_profit: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub gross_margin_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub operating_profit: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub operating_margin_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub net_profit: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub net_margin_pct: Option<f64>,

    #[serde(deserialize_with = "lenient_opt_f64")]
    pub cash_position: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub cash_vs_prior_month: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub debtors_total: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub debtors_days: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub creditors_total: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub creditors_days: Option<f64>,

    #[serde(deserialize_with = "lenient_opt_f64")]
    pub headcount: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub revenue_per_head: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub staff_cost_pct_revenue: Option<f64>,

    pub ma_engagements: Option<Value>,
}

impl FinancialSnapshot {
    /// Client id of the owning engagement, when the engagement was embedded.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        self.ma_engagements
            .as_ref()
            .and_then(|e| e.get("client_id"))
            .and_then(Value::as_str)
    }

    /// Revenue scaled to a year: quarters ×4, everything else ×12.
    #[must_use]
    pub fn annualised_revenue(&self) -> Option<f64> {
        let factor = if self.period_type.as_deref() == Some("quarter") {
            4.0
        } else {
            12.0
        };
        self.revenue.map(|r| r * factor)
    }
}

/// A row of `ma_industry_benchmarks`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndustryBenchmark {
    #[serde(deserialize_with = "lenient_string")]
    pub industry_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub revenue_band: String,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub sample_size: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub median_gross_margin_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub top_quartile_gross_margin_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub median_net_margin_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub top_quartile_net_margin_pct: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub median_debtor_days: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub top_quartile_debtor_days: Option<f64>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub median_revenue_per_head: Option<f64>,
}

/// What the prompt knows about the client beyond the numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientContext {
    pub client_id: String,
    pub client_name: String,
    pub company_name: String,
    pub industry: String,
    pub industry_code: Option<String>,
    pub north_star: Option<String>,
    pub archetype: Option<String>,
    pub pain_phrases: Vec<String>,
    pub desire_phrases: Vec<String>,
    pub known_goals: Vec<String>,
    pub advisor_notes: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Headline {
    #[serde(deserialize_with = "lenient_string")]
    pub text: String,
    #[serde(deserialize_with = "lenient_string")]
    pub sentiment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaInsight {
    #[serde(deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(deserialize_with = "lenient_string")]
    pub finding: String,
    #[serde(deserialize_with = "lenient_string")]
    pub implication: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub urgency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaDecision {
    #[serde(deserialize_with = "lenient_string")]
    pub decision: String,
    #[serde(deserialize_with = "lenient_strings")]
    pub supporting_data: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consideration: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MaWatchItem {
    #[serde(deserialize_with = "lenient_string")]
    pub metric: String,
    #[serde(deserialize_with = "lenient_string")]
    pub current_value: String,
    #[serde(deserialize_with = "lenient_string")]
    pub threshold: String,
    #[serde(deserialize_with = "lenient_string")]
    pub check_date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NorthStarConnection {
    #[serde(deserialize_with = "lenient_string")]
    pub narrative: String,
    #[serde(deserialize_with = "lenient_string")]
    pub sentiment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkHighlights {
    #[serde(deserialize_with = "lenient_strings")]
    pub strengths: Vec<String>,
    #[serde(deserialize_with = "lenient_strings")]
    pub concerns: Vec<String>,
}

/// The monthly-pack reply. Only the headline is mandatory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InsightsReply {
    #[serde(deserialize_with = "null_as_default")]
    pub headline: Headline,
    #[serde(deserialize_with = "lenient_vec")]
    pub insights: Vec<MaInsight>,
    #[serde(deserialize_with = "lenient_vec")]
    pub decisions_enabled: Vec<MaDecision>,
    #[serde(deserialize_with = "lenient_vec")]
    pub watch_list: Vec<MaWatchItem>,
    pub north_star_connection: Option<NorthStarConnection>,
    pub benchmark_highlights: Option<BenchmarkHighlights>,
}

impl InsightsReply {
    /// Enforces the headline requirement and the list caps.
    ///
    /// # Errors
    ///
    /// Returns a message when the headline text or sentiment is missing.
    pub fn validate(mut self) -> Result<Self, String> {
        if self.headline.text.trim().is_empty() || self.headline.sentiment.trim().is_empty() {
            return Err("Missing required headline in LLM response".to_string());
        }
        self.insights.truncate(MAX_INSIGHTS);
        self.decisions_enabled.truncate(MAX_DECISIONS);
        self.watch_list.truncate(MAX_WATCH_ITEMS);
        Ok(self)
    }
}

/// A non-array value (or malformed items) becomes an empty list rather than an error.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
