//! Supabase (PostgREST) client module
//!
//! Encapsulates table reads and writes against `/rest/v1` using the
//! service-role key.

use anyhow::Context;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};
use url::Url;

use super::store::{Query, Store};
use crate::core::config::AppConfig;
use crate::errors::PortalError;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_else(|_| Client::new())
});

pub struct SupabaseClient {
    rest_url: String,
    headers: HeaderMap,
}

impl SupabaseClient {
    /// # Errors
    ///
    /// Returns an error if the service-role key cannot be used as a header value.
    pub fn new(config: &AppConfig) -> Result<Self, PortalError> {
        Self::with_credentials(&config.supabase_url, &config.supabase_service_role_key)
    }

    /// # Errors
    ///
    /// Returns an error if the key cannot be used as a header value.
    pub fn with_credentials(base_url: &str, service_key: &str) -> Result<Self, PortalError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(service_key).context("invalid Supabase service key")?,
        );
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&format!("Bearer {service_key}"))
                .context("invalid Supabase service key")?,
        );
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        Ok(Self {
            rest_url: format!("{}/rest/v1", base_url.trim_end_matches('/')),
            headers,
        })
    }

    /// Full endpoint URL for a table with the given query-string pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured base URL is not a valid URL.
    pub fn table_url(&self, table: &str, params: &[(String, String)]) -> Result<Url, PortalError> {
        let mut url = Url::parse(&format!("{}/{table}", self.rest_url))
            .map_err(|e| PortalError::ConfigError(format!("SUPABASE_URL: {e}")))?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    fn request(&self, builder: RequestBuilder, prefer: &str) -> RequestBuilder {
        builder
            .headers(self.headers.clone())
            .header("Prefer", prefer)
    }

    async fn rows(table: &str, response: Response) -> Result<Vec<Value>, PortalError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(table = %table, status = %status, "Supabase request failed: {}", body);
            return Err(PortalError::StoreError(format!("{table}: {status} {body}")));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        match serde_json::from_str::<Value>(&text)
            .map_err(|e| PortalError::StoreError(format!("{table}: invalid response: {e}")))?
        {
            Value::Array(rows) => Ok(rows),
            other => Ok(vec![other]),
        }
    }

    fn first_row(table: &str, rows: Vec<Value>) -> Result<Value, PortalError> {
        rows.into_iter()
            .next()
            .ok_or_else(|| PortalError::StoreError(format!("{table}: no row returned")))
    }
}

#[async_trait]
impl Store for SupabaseClient {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, PortalError> {
        let url = self.table_url(&query.table, &query.to_params())?;
        debug!(table = %query.table, url = %url, "Supabase select");
        let response = self
            .request(HTTP_CLIENT.get(url), "count=none")
            .send()
            .await?;
        Self::rows(&query.table, response).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, PortalError> {
        let url = self.table_url(table, &[])?;
        let response = self
            .request(HTTP_CLIENT.post(url), "return=representation")
            .json(&row)
            .send()
            .await?;
        Self::first_row(table, Self::rows(table, response).await?)
    }

    async fn upsert(
        &self,
        table: &str,
        row: Value,
        on_conflict: &str,
    ) -> Result<Value, PortalError> {
        let url = self.table_url(table, &[("on_conflict".to_string(), on_conflict.to_string())])?;
        let response = self
            .request(
                HTTP_CLIENT.post(url),
                "return=representation,resolution=merge-duplicates",
            )
            .json(&row)
            .send()
            .await?;
        Self::first_row(table, Self::rows(table, response).await?)
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>, PortalError> {
        let params: Vec<_> = query
            .to_params()
            .into_iter()
            .filter(|(k, _)| k != "limit" && k != "order")
            .collect();
        let url = self.table_url(&query.table, &params)?;
        let response = self
            .request(HTTP_CLIENT.patch(url), "return=representation")
            .json(&patch)
            .send()
            .await?;
        Self::rows(&query.table, response).await
    }

    async fn delete(&self, query: &Query) -> Result<(), PortalError> {
        if query.filters.is_empty() {
            return Err(PortalError::StoreError(format!(
                "{}: refusing to delete without a filter",
                query.table
            )));
        }
        let params: Vec<_> = query
            .filters
            .iter()
            .map(|f| (f.column().to_string(), f.expression()))
            .collect();
        let url = self.table_url(&query.table, &params)?;
        let response = self
            .request(HTTP_CLIENT.delete(url), "return=minimal")
            .send()
            .await?;
        Self::rows(&query.table, response).await.map(|_| ())
    }
}
