//! Practice portal - serverless back end for an accounting practice's client portal.
//!
//! This crate implements a single API Lambda serving four functions:
//! 1. Product discovery: resolves technology product names typed by clients to a
//!    curated catalog, researching unknown products with an LLM
//! 2. Systems-audit reports: two LLM passes turn assessment answers into a
//!    stored, scored report with findings and recommendations
//! 3. Management-accounts insights: monthly narrative insights from financial
//!    snapshots, or assessment-based insights for new clients
//! 4. Insight review: the advisor approval workflow for generated insights
//!
//! # Architecture
//!
//! The system uses:
//! - AWS Lambda for serverless execution
//! - Supabase (PostgREST) for storage, behind the `Store` trait
//! - An OpenAI-compatible chat completions API (OpenRouter), behind the `ChatModel` trait
//! - Tokio for async runtime
//!
//! # Example
//!
//! ```no_run
//! use practice_portal::api::{AppState, route};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Set up structured logging
//!     practice_portal::setup_logging();
//!
//!     // Build the Supabase and LLM clients from the environment
//!     let state = AppState::from_env()?;
//!
//!     let event = json!({
//!         "rawPath": "/discover-sa-tech-product",
//!         "requestContext": { "http": { "method": "POST" } },
//!         "body": json!({ "productName": "Xero" }).to_string(),
//!     });
//!     let response = route(&state, &event).await;
//!     println!("{}", response["body"]);
//!
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod api;
pub mod catalog;
pub mod clients;
pub mod core;
pub mod errors;
pub mod features;
pub mod prompt;
pub mod utils;

pub use errors::PortalError;

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// This function sets up tracing-subscriber with a JSON formatter suitable for
/// `CloudWatch` Logs integration. It should be called once at cold start.
///
/// # Example
///
/// ```
/// // Initialize structured logging at the start of your Lambda handler
/// practice_portal::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::prelude::*;
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    tracing_subscriber::registry().with(fmt_layer).init();
}
