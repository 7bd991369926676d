//! Table access seam used by every handler.
//!
//! Handlers talk to Postgres through PostgREST-shaped queries. The
//! [`Store`] trait keeps them independent from the HTTP transport so the
//! same feature code runs against Supabase in production and against an
//! in-memory table set in tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::PortalError;

/// A single column predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
    Lt(String, Value),
    Gte(String, Value),
    In(String, Vec<Value>),
}

impl Filter {
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq(c, _) | Filter::Lt(c, _) | Filter::Gte(c, _) | Filter::In(c, _) => c,
        }
    }

    /// PostgREST operator expression, e.g. `eq.abc` or `in.(a,b)`.
    #[must_use]
    pub fn expression(&self) -> String {
        match self {
            Filter::Eq(_, v) => format!("eq.{}", scalar(v)),
            Filter::Lt(_, v) => format!("lt.{}", scalar(v)),
            Filter::Gte(_, v) => format!("gte.{}", scalar(v)),
            Filter::In(_, vs) => format!(
                "in.({})",
                vs.iter().map(scalar).collect::<Vec<_>>().join(",")
            ),
        }
    }
}

/// Renders a JSON scalar the way PostgREST expects it in a query string.
#[must_use]
pub fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<(String, bool)>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.columns = columns.split_whitespace().collect::<String>();
        self
    }

    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn lt(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Lt(column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn gte(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Gte(column.to_string(), value.into()));
        self
    }

    #[must_use]
    pub fn is_in(mut self, column: &str, values: Vec<Value>) -> Self {
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    #[must_use]
    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some((column.to_string(), ascending));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs for the PostgREST endpoint.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns.clone())];
        params.extend(
            self.filters
                .iter()
                .map(|f| (f.column().to_string(), f.expression())),
        );
        if let Some((column, ascending)) = &self.order {
            let dir = if *ascending { "asc" } else { "desc" };
            params.push(("order".to_string(), format!("{column}.{dir}")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, PortalError>;

    /// Inserts one row and returns it as stored.
    async fn insert(&self, table: &str, row: Value) -> Result<Value, PortalError>;

    /// Inserts or merges one row, resolving conflicts on `on_conflict`.
    async fn upsert(&self, table: &str, row: Value, on_conflict: &str)
    -> Result<Value, PortalError>;

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>, PortalError>;

    async fn delete(&self, query: &Query) -> Result<(), PortalError>;

    /// First row of the query, if any (`maybeSingle`).
    async fn select_one(&self, query: &Query) -> Result<Option<Value>, PortalError> {
        let limited = query.clone().limit(1);
        Ok(self.select(&limited).await?.into_iter().next())
    }
}
