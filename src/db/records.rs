//! Generic record repository against `{schema}/{table}`
//!
//! Writes return a three-way `Outcome`: a 2xx body can still carry a
//! business-rule rejection (`{status: "error", message}`), which callers show
//! exactly like a transport failure but must not treat as success.

use crate::db::catalog::decode_read;
use crate::db::driver::{resource_path, ApiResponse, HttpClient, Method};
use crate::db::schema::Record;
use crate::error::{CrudError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a create/update/delete
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// 2xx without an error marker; carries the decoded body when there is one
    Success(Option<Value>),
    /// 2xx whose body says `status: "error"`
    ApplicationError(String),
    /// Non-2xx or no response at all
    TransportError(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Only a successful write refreshes the list
    pub fn should_reload(&self) -> bool {
        self.is_success()
    }

    /// Failure message to show the operator, if any
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Outcome::Success(_) => None,
            Outcome::ApplicationError(msg) | Outcome::TransportError(msg) => Some(msg),
        }
    }

    /// Returned record for creates/updates that echo the row
    pub fn record(&self) -> Option<&Record> {
        match self {
            Outcome::Success(Some(Value::Object(obj))) => Some(obj),
            _ => None,
        }
    }
}

/// Record API client
#[derive(Clone)]
pub struct RecordRepository {
    client: Arc<dyn HttpClient>,
}

impl RecordRepository {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    /// All rows of a table
    pub async fn list(&self, schema: &str, table: &str) -> Result<Vec<Record>> {
        let path = resource_path(&[schema, table]);
        let rows: Vec<Record> = self.read(&path).await?;
        debug!(schema, table, rows = rows.len(), "rows loaded");
        Ok(rows)
    }

    /// Rows matching a primary-key value
    pub async fn get(&self, schema: &str, table: &str, id: &str) -> Result<Vec<Record>> {
        let path = resource_path(&[schema, table, id]);
        self.read(&path).await
    }

    /// Server-side search; each value may start with `>=`, `<=`, `>`, `<` or `!=`
    pub async fn search(&self, schema: &str, table: &str, filters: &[(String, String)]) -> Result<Vec<Record>> {
        let mut path = resource_path(&[schema, table, "search"]);
        if !filters.is_empty() {
            let query: Vec<String> = filters
                .iter()
                .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
                .collect();
            path.push('?');
            path.push_str(&query.join("&"));
        }
        self.read(&path).await
    }

    pub async fn create(&self, schema: &str, table: &str, record: &Record) -> Outcome {
        let path = resource_path(&[schema, table]);
        self.write(Method::Post, &path, Some(Value::Object(record.clone()))).await
    }

    pub async fn update(&self, schema: &str, table: &str, id: &str, record: &Record) -> Outcome {
        let path = resource_path(&[schema, table, id]);
        self.write(Method::Put, &path, Some(Value::Object(record.clone()))).await
    }

    pub async fn remove(&self, schema: &str, table: &str, id: &str) -> Outcome {
        let path = resource_path(&[schema, table, id]);
        self.write(Method::Delete, &path, None).await
    }

    async fn read<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(path)
            .await
            .map_err(|e| CrudError::Transport(transport_message(None, Some(&e))))?;
        decode_read(path, resp)
    }

    async fn write(&self, method: Method, path: &str, body: Option<Value>) -> Outcome {
        let result = self.client.request(method, path, body.as_ref()).await;
        let outcome = decode_write(result);
        match &outcome {
            Outcome::Success(_) => info!(%method, path, "write succeeded"),
            Outcome::ApplicationError(msg) => warn!(%method, path, message = %msg, "write rejected by backend"),
            Outcome::TransportError(msg) => warn!(%method, path, message = %msg, "write failed"),
        }
        outcome
    }
}

/// Classify a write response into an `Outcome`
pub fn decode_write(result: anyhow::Result<ApiResponse>) -> Outcome {
    let resp = match result {
        Ok(resp) => resp,
        Err(e) => return Outcome::TransportError(transport_message(None, Some(&e))),
    };
    if !resp.is_success() {
        return Outcome::TransportError(transport_message(Some(&resp), None));
    }
    if resp.body.trim().is_empty() {
        return Outcome::Success(None);
    }
    match serde_json::from_str::<Value>(&resp.body) {
        Ok(Value::Object(obj)) if obj.get("status").and_then(Value::as_str) == Some("error") => {
            let message = obj
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("operation failed");
            Outcome::ApplicationError(message.to_string())
        }
        Ok(value) => Outcome::Success(Some(value)),
        Err(_) => Outcome::Success(Some(Value::String(resp.body))),
    }
}

/// Resolve the user-facing message of a failed request.
///
/// Order: structured `message` (or `error`) field, the body itself when it is
/// plain text, the network error, then a generic status line.
pub fn transport_message(resp: Option<&ApiResponse>, err: Option<&anyhow::Error>) -> String {
    if let Some(resp) = resp {
        let body = resp.body.trim();
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Object(obj)) => {
                let field = ["message", "error"]
                    .iter()
                    .find_map(|k| obj.get(*k).and_then(Value::as_str).filter(|m| !m.is_empty()));
                if let Some(msg) = field {
                    return msg.to_string();
                }
            }
            Ok(Value::String(text)) if !text.is_empty() => return text,
            Ok(_) => {}
            Err(_) if !body.is_empty() => return body.to_string(),
            Err(_) => {}
        }
    }
    if let Some(err) = err {
        let msg = err.to_string();
        if !msg.is_empty() {
            return msg;
        }
    }
    let status = resp
        .map(|r| r.status.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    format!("operation failed (status: {})", status)
}
