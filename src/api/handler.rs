//! API Lambda handler - thin router that delegates to the feature handlers.
//!
//! This module handles:
//! - CORS preflight and method checks
//! - Body decoding (plain or base64) and JSON parsing
//! - Routing by path suffix to discovery, report, insight and review handlers
//! - Mapping handler results and errors to HTTP responses

use std::sync::Arc;

use lambda_runtime::{Error, LambdaEvent};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{error, info, warn};

use super::{helpers, parsing};
use crate::clients::{ChatModel, LlmClient, Store, SupabaseClient};
use crate::core::config::AppConfig;
use crate::core::models::{DiscoverRequest, DiscoverResponse};
use crate::errors::PortalError;
use crate::features::GenerationOutcome;
use crate::features::discover::discover_product;
use crate::features::insight_review::{ReviewRequest, review_insight};
use crate::features::ma_insights::{MaInsightsRequest, generate_ma_insights};
use crate::features::sa_report::{SaReportRequest, generate_sa_report};

/// Functions exposed by the API, keyed by path suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    DiscoverProduct,
    GenerateSaReport,
    GenerateMaInsights,
    ReviewInsight,
}

impl Route {
    pub const ALL: [Route; 4] = [
        Route::DiscoverProduct,
        Route::GenerateSaReport,
        Route::GenerateMaInsights,
        Route::ReviewInsight,
    ];

    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Route::DiscoverProduct => "/discover-sa-tech-product",
            Route::GenerateSaReport => "/generate-sa-report",
            Route::GenerateMaInsights => "/generate-ma-insights",
            Route::ReviewInsight => "/review-insight",
        }
    }

    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = path.trim_end_matches('/');
        Self::ALL.into_iter().find(|r| path.ends_with(r.suffix()))
    }
}

/// Clients and configuration shared across invocations.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn Store>,
    /// `None` when no LLM key is configured; only LLM-backed routes fail then.
    pub llm: Option<Arc<dyn ChatModel>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, store: Arc<dyn Store>, llm: Option<Arc<dyn ChatModel>>) -> Self {
        Self { config, store, llm }
    }

    /// Builds production clients from the environment.
    ///
    /// # Errors
    ///
    /// Returns a config error when the Supabase settings are missing or
    /// invalid. A missing LLM key is logged, not fatal.
    pub fn from_env() -> Result<Self, PortalError> {
        let config = AppConfig::from_env().map_err(PortalError::ConfigError)?;
        let store: Arc<dyn Store> = Arc::new(SupabaseClient::new(&config)?);
        let llm: Option<Arc<dyn ChatModel>> = match LlmClient::from_config(&config) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("LLM routes disabled: {}", e);
                None
            }
        };
        Ok(Self::new(config, store, llm))
    }

    fn require_llm(&self) -> Result<&dyn ChatModel, PortalError> {
        self.llm.as_deref().ok_or_else(PortalError::llm_not_configured)
    }
}

/// Lambda handler for the API entrypoint.
///
/// # Errors
///
/// Never fails at the Lambda level; every problem is reported as an HTTP
/// error response.
#[tracing::instrument(
    level = "info",
    skip(state, event),
    fields(request_id = %event.context.request_id)
)]
pub async fn handler(state: &AppState, event: LambdaEvent<Value>) -> Result<Value, Error> {
    Ok(route(state, &event.payload).await)
}

/// Routes one gateway event to its feature handler and builds the response.
pub async fn route(state: &AppState, event: &Value) -> Value {
    let method = parsing::request_method(event);
    let path = parsing::request_path(event);
    info!(method = %method, raw_path = %path, "Request received");

    if method == "OPTIONS" {
        return helpers::preflight();
    }

    let Some(route) = Route::from_path(path) else {
        warn!(raw_path = %path, "Unknown route");
        return helpers::err_response(404, &format!("Not found: {path}"));
    };

    if method != "POST" {
        return helpers::err_response(405, "Method not allowed");
    }

    let body = match parsing::json_body(event) {
        Ok(body) => body,
        Err(e) => {
            error!("Request body parse error: {}", e);
            return match route {
                Route::DiscoverProduct => {
                    helpers::json_response(400, &DiscoverResponse::error(&e.to_string()))
                }
                _ => helpers::error_response(&e),
            };
        }
    };

    match route {
        Route::DiscoverProduct => discover(state, body).await,
        Route::GenerateSaReport => generation_response(sa_report(state, body).await),
        Route::GenerateMaInsights => generation_response(ma_insights(state, body).await),
        Route::ReviewInsight => match review(state, body).await {
            Ok(body) => helpers::ok_json(&body),
            Err(e) => {
                error!("Insight review failed: {}", e);
                helpers::error_response(&e)
            }
        },
    }
}

async fn sa_report(state: &AppState, body: Value) -> Result<GenerationOutcome, PortalError> {
    let request: SaReportRequest = parse_request(body)?;
    generate_sa_report(state.store.as_ref(), state.require_llm()?, &state.config, &request).await
}

async fn ma_insights(state: &AppState, body: Value) -> Result<GenerationOutcome, PortalError> {
    let request: MaInsightsRequest = parse_request(body)?;
    generate_ma_insights(state.store.as_ref(), state.require_llm()?, &state.config, &request).await
}

async fn review(state: &AppState, body: Value) -> Result<Value, PortalError> {
    let request: ReviewRequest = parse_request(body)?;
    review_insight(state.store.as_ref(), &request).await
}

fn parse_request<T: DeserializeOwned>(body: Value) -> Result<T, PortalError> {
    Ok(serde_json::from_value(body)?)
}

fn generation_response(result: Result<GenerationOutcome, PortalError>) -> Value {
    match result {
        Ok(GenerationOutcome::Generated(body)) => helpers::ok_json(&body),
        Ok(GenerationOutcome::PendingReview { error }) => helpers::pending_response(&error),
        Err(e) => {
            error!("Generation failed: {}", e);
            helpers::error_response(&e)
        }
    }
}

async fn discover(state: &AppState, body: Value) -> Value {
    let result = match parse_request::<DiscoverRequest>(body) {
        Ok(request) => {
            discover_product(state.store.as_ref(), state.llm.as_deref(), &state.config, &request)
                .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(response) => helpers::ok_json(&response),
        Err(e) => {
            error!("Product discovery failed: {}", e);
            let status = match e {
                PortalError::ValidationError(_) => 400,
                _ => 500,
            };
            helpers::json_response(status, &DiscoverResponse::error(&e.to_string()))
        }
    }
}
