use std::env;

pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_REFERER: &str = "https://torsor.co.uk";
pub const DEFAULT_SA_EXTRACTION_MODEL: &str = "anthropic/claude-sonnet-4";
pub const DEFAULT_SA_NARRATIVE_MODEL: &str = "anthropic/claude-opus-4";
pub const DEFAULT_MA_INSIGHTS_MODEL: &str = "anthropic/claude-sonnet-4.5";
pub const DEFAULT_DISCOVERY_MODEL: &str = "anthropic/claude-sonnet-4";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_service_role_key: String,
    pub openrouter_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_referer: String,
    pub sa_extraction_model: String,
    pub sa_narrative_model: String,
    pub ma_insights_model: String,
    pub discovery_model: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required =
            |key: &str| get(key).ok_or_else(|| format!("{key}: environment variable not found"));
        let or_default = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        Ok(Self {
            supabase_url: required("SUPABASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            supabase_service_role_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
            openrouter_api_key: get("OPENROUTER_API_KEY"),
            llm_base_url: or_default("LLM_BASE_URL", DEFAULT_LLM_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            llm_referer: or_default("LLM_REFERER", DEFAULT_LLM_REFERER),
            sa_extraction_model: or_default("SA_EXTRACTION_MODEL", DEFAULT_SA_EXTRACTION_MODEL),
            sa_narrative_model: or_default("SA_NARRATIVE_MODEL", DEFAULT_SA_NARRATIVE_MODEL),
            ma_insights_model: or_default("MA_INSIGHTS_MODEL", DEFAULT_MA_INSIGHTS_MODEL),
            discovery_model: or_default("DISCOVERY_MODEL", DEFAULT_DISCOVERY_MODEL),
        })
    }
}
