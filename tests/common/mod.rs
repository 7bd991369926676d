//! Shared fakes for integration tests: an in-memory table set and a
//! chat model that replays canned replies.

#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use openai_api_rs::v1::chat_completion::{Content, MessageRole};
use practice_portal::clients::llm_client::{ChatModel, Completion, CompletionRequest, Usage};
use practice_portal::clients::store::{Filter, Query, Store};
use practice_portal::core::config::AppConfig;
use practice_portal::errors::PortalError;
use serde_json::{Map, Value};

pub fn test_config() -> AppConfig {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("SUPABASE_URL", "https://example.supabase.co/"),
        ("SUPABASE_SERVICE_ROLE_KEY", "service-role-key"),
        ("OPENROUTER_API_KEY", "sk-test"),
    ]);
    AppConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string()))
        .expect("test config should build")
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.partial_cmp(&y),
        _ => Some(plain(a).cmp(&plain(b))),
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_matches(row: &Value, filter: &Filter) -> bool {
    let cell = row.get(filter.column()).unwrap_or(&Value::Null);
    match filter {
        Filter::Eq(_, v) => plain(cell) == plain(v),
        Filter::Lt(_, v) => !cell.is_null() && compare(cell, v) == Some(Ordering::Less),
        Filter::Gte(_, v) => {
            !cell.is_null() && matches!(compare(cell, v), Some(Ordering::Greater | Ordering::Equal))
        }
        Filter::In(_, vs) => vs.iter().any(|v| plain(cell) == plain(v)),
    }
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Value::Object(t), Value::Object(p)) = (target, patch) {
        for (k, v) in p {
            t.insert(k.clone(), v.clone());
        }
    }
}

/// PostgREST stand-in. Column lists are ignored; every row is returned whole.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Vec<Value>>>,
    next_id: Mutex<u64>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
        self
    }

    /// Makes every write to `table` fail.
    pub fn fail_writes_to(self, table: &str) -> Self {
        self.failing.lock().unwrap().insert(table.to_string());
        self
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    fn check_writable(&self, table: &str) -> Result<(), PortalError> {
        if self.failing.lock().unwrap().contains(table) {
            Err(PortalError::StoreError(format!("write to {table} rejected")))
        } else {
            Ok(())
        }
    }

    fn with_id(&self, mut row: Value) -> Value {
        if let Value::Object(map) = &mut row
            && !map.contains_key("id")
        {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            map.insert("id".to_string(), Value::String(format!("row-{next}")));
        }
        row
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn select(&self, query: &Query) -> Result<Vec<Value>, PortalError> {
        let mut rows: Vec<Value> = self
            .rows(&query.table)
            .into_iter()
            .filter(|row| query.filters.iter().all(|f| row_matches(row, f)))
            .collect();

        if let Some((column, ascending)) = &query.order {
            rows.sort_by(|a, b| {
                let a = a.get(column).unwrap_or(&Value::Null);
                let b = b.get(column).unwrap_or(&Value::Null);
                let ord = compare(a, b).unwrap_or(Ordering::Equal);
                if *ascending { ord } else { ord.reverse() }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, PortalError> {
        self.check_writable(table)?;
        let row = self.with_id(row);
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn upsert(&self, table: &str, row: Value, on_conflict: &str) -> Result<Value, PortalError> {
        self.check_writable(table)?;
        let key = row.get(on_conflict).cloned().unwrap_or(Value::Null);
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        if let Some(existing) = rows.iter_mut().find(|r| r.get(on_conflict) == Some(&key)) {
            merge(existing, &row);
            return Ok(existing.clone());
        }
        let row = self.with_id(row);
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, query: &Query, patch: Value) -> Result<Vec<Value>, PortalError> {
        self.check_writable(&query.table)?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(query.table.clone()).or_default();
        let mut updated = Vec::new();
        for row in rows.iter_mut() {
            if query.filters.iter().all(|f| row_matches(row, f)) {
                merge(row, &patch);
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, query: &Query) -> Result<(), PortalError> {
        self.check_writable(&query.table)?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(&query.table) {
            rows.retain(|row| !query.filters.iter().all(|f| row_matches(row, f)));
        }
        Ok(())
    }
}

/// What a scripted model saw for one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub title: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system: Option<String>,
    pub prompt: String,
}

/// Replays canned replies in order; runs dry with an LLM error.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

fn text_of(content: &Content) -> String {
    match content {
        Content::Text(text) => text.clone(),
        Content::ImageUrl(_) => String::new(),
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, PortalError> {
        let system = request
            .messages
            .iter()
            .find(|m| matches!(m.role, MessageRole::system))
            .map(|m| text_of(&m.content));
        let prompt = request
            .messages
            .last()
            .map(|m| text_of(&m.content))
            .unwrap_or_default();
        self.calls.lock().unwrap().push(RecordedCall {
            model: request.model.clone(),
            title: request.title.clone(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            system,
            prompt,
        });

        let text = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| PortalError::LlmError("no scripted reply left".to_string()))?;
        Ok(Completion {
            text,
            usage: Usage {
                prompt_tokens: 1000,
                completion_tokens: 500,
                total_tokens: 1500,
            },
            elapsed_ms: 42,
        })
    }
}

/// Builds an object from key/value pairs.
pub fn obj(pairs: &[(&str, Value)]) -> Value {
    Value::Object(
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect::<Map<String, Value>>(),
    )
}
