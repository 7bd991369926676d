use serde::{Deserialize, Serialize};

/// A row of `sa_tech_products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechProduct {
    pub slug: String,
    pub product_name: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub market_position: Option<String>,
    #[serde(default)]
    pub uk_strong: Option<bool>,
    #[serde(default)]
    pub has_zapier: Option<bool>,
    #[serde(default)]
    pub pricing_model: Option<String>,
    #[serde(default)]
    pub price_entry_gbp: Option<f64>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A row of `sa_tech_product_aliases`: an alternative spelling for a catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductAlias {
    pub alias: String,
    pub product_slug: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Alias,
    Slug,
    Name,
    Substring,
    DiscoveredAlias,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    Matched,
    Discovered,
    NotFound,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverRequest {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_true")]
    pub allow_discovery: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoverResponse {
    pub status: DiscoveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<TechProduct>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<MatchConfidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub pending_review: bool,
}

impl DiscoverResponse {
    #[must_use]
    pub fn matched(
        product: TechProduct,
        confidence: MatchConfidence,
        match_type: MatchType,
    ) -> Self {
        Self {
            status: DiscoveryStatus::Matched,
            product: Some(product),
            confidence: Some(confidence),
            match_type: Some(match_type),
            message: None,
            pending_review: false,
        }
    }

    #[must_use]
    pub fn discovered(product: TechProduct) -> Self {
        Self {
            status: DiscoveryStatus::Discovered,
            product: Some(product),
            confidence: Some(MatchConfidence::Low),
            match_type: None,
            message: None,
            pending_review: false,
        }
    }

    #[must_use]
    pub fn not_found(message: &str) -> Self {
        Self {
            status: DiscoveryStatus::NotFound,
            product: None,
            confidence: None,
            match_type: None,
            message: Some(message.to_string()),
            pending_review: false,
        }
    }

    #[must_use]
    pub fn error(message: &str) -> Self {
        Self {
            status: DiscoveryStatus::Error,
            message: Some(message.to_string()),
            ..Self::not_found(message)
        }
    }
}

/// Review state of an insight row in `ma_insights`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightStatus {
    Draft,
    Approved,
    Rejected,
    Edited,
}

impl InsightStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            InsightStatus::Draft => "draft",
            InsightStatus::Approved => "approved",
            InsightStatus::Rejected => "rejected",
            InsightStatus::Edited => "edited",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Approve,
    Reject,
    Edit,
}

impl ReviewAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ReviewAction::Approve => "approve",
            ReviewAction::Reject => "reject",
            ReviewAction::Edit => "edit",
        }
    }
}

fn default_true() -> bool {
    true
}
