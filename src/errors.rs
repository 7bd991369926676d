use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Failed to access Supabase: {0}")]
    StoreError(String),

    #[error("Failed to send HTTP request: {0}")]
    HttpError(String),

    #[error("Failed to access LLM API: {0}")]
    LlmError(String),

    #[error("Invalid JSON from LLM: {message}")]
    LlmParse { message: String, raw: String },
}

impl PortalError {
    /// HTTP status code returned to the browser for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            PortalError::ValidationError(_) => 400,
            PortalError::NotFound(_) => 404,
            PortalError::Conflict(_) => 409,
            PortalError::HttpError(_) | PortalError::LlmError(_) | PortalError::LlmParse { .. } => {
                502
            }
            PortalError::ConfigError(_) | PortalError::StoreError(_) => 500,
        }
    }

    /// The LLM routes were hit without an `OPENROUTER_API_KEY`.
    #[must_use]
    pub fn llm_not_configured() -> Self {
        PortalError::ConfigError("OPENROUTER_API_KEY not configured".to_string())
    }
}

impl From<reqwest::Error> for PortalError {
    fn from(error: reqwest::Error) -> Self {
        PortalError::HttpError(error.to_string())
    }
}

impl From<serde_json::Error> for PortalError {
    fn from(error: serde_json::Error) -> Self {
        PortalError::ValidationError(format!("Invalid JSON: {error}"))
    }
}

impl From<anyhow::Error> for PortalError {
    fn from(error: anyhow::Error) -> Self {
        PortalError::StoreError(error.to_string())
    }
}
