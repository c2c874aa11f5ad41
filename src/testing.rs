//! In-memory backends for tests

use crate::db::{ApiResponse, HttpClient, Method};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One request seen by a backend
#[derive(Clone, Debug)]
pub struct SentRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Clone)]
enum Reply {
    Respond(u16, String),
    Fail(String),
}

/// Fixed responses keyed by path (and optionally method); unknown paths get 404
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    routes: Arc<Mutex<HashMap<(Option<Method>, String), Reply>>>,
    sent: Arc<Mutex<Vec<SentRequest>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, path: &str, status: u16, body: Value) -> Self {
        self.insert(None, path, Reply::Respond(status, body.to_string()))
    }

    pub fn route_method(self, method: Method, path: &str, status: u16, body: Value) -> Self {
        self.insert(Some(method), path, Reply::Respond(status, body.to_string()))
    }

    pub fn route_text(self, path: &str, status: u16, body: &str) -> Self {
        self.insert(None, path, Reply::Respond(status, body.to_string()))
    }

    /// Simulate a network failure
    pub fn fail(self, path: &str, message: &str) -> Self {
        self.insert(None, path, Reply::Fail(message.to_string()))
    }

    fn insert(self, method: Option<Method>, path: &str, reply: Reply) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), reply);
        self
    }

    pub fn requests(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }

    pub fn was_requested(&self, path: &str) -> bool {
        self.sent.lock().unwrap().iter().any(|r| r.path == path)
    }

    pub fn count(&self, method: Method) -> usize {
        self.sent.lock().unwrap().iter().filter(|r| r.method == method).count()
    }
}

#[async_trait]
impl HttpClient for ScriptedBackend {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        self.sent.lock().unwrap().push(SentRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });
        let routes = self.routes.lock().unwrap();
        let reply = routes
            .get(&(Some(method), path.to_string()))
            .or_else(|| routes.get(&(None, path.to_string())))
            .cloned();
        match reply {
            Some(Reply::Respond(status, body)) => Ok(ApiResponse::new(status, body)),
            Some(Reply::Fail(msg)) => Err(anyhow!(msg)),
            None => Ok(ApiResponse::new(404, "")),
        }
    }
}

/// A tiny table server implementing the generic record API over `serde_json`
/// rows: columns, list, create (assigns serial ids), update, delete.
#[derive(Clone, Default)]
pub struct MemoryServer {
    tables: Arc<Mutex<HashMap<(String, String), MemoryTable>>>,
    /// Values rejected with a 200 `{status: "error"}` body, keyed by column
    unique: Arc<Mutex<Vec<(String, String)>>>,
    sent: Arc<Mutex<Vec<SentRequest>>>,
}

#[derive(Clone, Default)]
struct MemoryTable {
    columns: Value,
    primary_key: String,
    rows: Vec<Map<String, Value>>,
    next_id: i64,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, schema: &str, table: &str, primary_key: &str, columns: Value) -> Self {
        self.tables.lock().unwrap().insert(
            (schema.to_string(), table.to_string()),
            MemoryTable {
                columns,
                primary_key: primary_key.to_string(),
                rows: Vec::new(),
                next_id: 1,
            },
        );
        self
    }

    /// Reject writes whose `column` equals `value` with a business-rule error
    pub fn with_unique_violation(self, column: &str, value: &str) -> Self {
        self.unique
            .lock()
            .unwrap()
            .push((column.to_string(), value.to_string()));
        self
    }

    pub fn rows(&self, schema: &str, table: &str) -> Vec<Map<String, Value>> {
        self.tables
            .lock()
            .unwrap()
            .get(&(schema.to_string(), table.to_string()))
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, method: Method) -> usize {
        self.sent.lock().unwrap().iter().filter(|r| r.method == method).count()
    }

    fn violation(&self, body: &Map<String, Value>) -> Option<String> {
        let unique = self.unique.lock().unwrap();
        unique.iter().find_map(|(col, val)| {
            (body.get(col).and_then(Value::as_str) == Some(val.as_str()))
                .then(|| format!("{} already exists: {}", col, val))
        })
    }

    fn handle(&self, method: Method, path: &str, body: Option<&Value>) -> ApiResponse {
        let segments: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(|s| urlencoding::decode(s).map(|c| c.into_owned()).unwrap_or_default())
            .collect();
        let mut tables = self.tables.lock().unwrap();

        if segments.len() == 1 && segments[0] == "schemas" {
            let mut schemas: Vec<&String> = tables.keys().map(|(s, _)| s).collect();
            schemas.sort();
            schemas.dedup();
            return ApiResponse::json(200, &json!(schemas));
        }
        if segments.len() == 2 && segments[0] == "tables" {
            let mut names: Vec<&String> = tables
                .keys()
                .filter(|(s, _)| *s == segments[1])
                .map(|(_, t)| t)
                .collect();
            if names.is_empty() {
                return ApiResponse::json(404, &json!({"message": "unknown schema"}));
            }
            names.sort();
            return ApiResponse::json(200, &json!(names));
        }
        if segments.len() < 2 {
            return ApiResponse::new(404, "");
        }
        let key = (segments[0].clone(), segments[1].clone());
        let Some(table) = tables.get_mut(&key) else {
            return ApiResponse::new(404, "");
        };
        let input = body.and_then(Value::as_object).cloned().unwrap_or_default();

        match (method, segments.len()) {
            (Method::Get, 3) if segments[2] == "columns" => ApiResponse::json(200, &table.columns),
            (Method::Get, 3) if segments[2] == "constraints" => ApiResponse::json(200, &json!([])),
            (Method::Get, 2) => ApiResponse::json(200, &json!(table.rows)),
            (Method::Post, 2) => {
                drop(tables);
                if let Some(msg) = self.violation(&input) {
                    return ApiResponse::json(200, &json!({"status": "error", "message": msg}));
                }
                let mut tables = self.tables.lock().unwrap();
                let Some(table) = tables.get_mut(&key) else {
                    return ApiResponse::new(404, "");
                };
                let mut row = input;
                row.insert(table.primary_key.clone(), json!(table.next_id));
                table.next_id += 1;
                table.rows.push(row.clone());
                ApiResponse::json(200, &Value::Object(row))
            }
            (Method::Put, 3) => {
                let id = segments[2].clone();
                let pk = table.primary_key.clone();
                drop(tables);
                if let Some(msg) = self.violation(&input) {
                    return ApiResponse::json(200, &json!({"status": "error", "message": msg}));
                }
                let mut tables = self.tables.lock().unwrap();
                let Some(table) = tables.get_mut(&key) else {
                    return ApiResponse::new(404, "");
                };
                match table.rows.iter_mut().find(|r| id_matches(r.get(&pk), &id)) {
                    Some(row) => {
                        for (k, v) in input {
                            if k != pk {
                                row.insert(k, v);
                            }
                        }
                        ApiResponse::json(200, &Value::Object(row.clone()))
                    }
                    None => ApiResponse::json(404, &json!({"message": format!("no row with id {}", id)})),
                }
            }
            (Method::Delete, 3) => {
                let pk = table.primary_key.clone();
                let before = table.rows.len();
                table.rows.retain(|r| !id_matches(r.get(&pk), &segments[2]));
                ApiResponse::json(200, &json!(before - table.rows.len()))
            }
            _ => ApiResponse::new(404, ""),
        }
    }
}

fn id_matches(value: Option<&Value>, id: &str) -> bool {
    match value {
        Some(Value::String(s)) => s == id,
        Some(other) => other.to_string() == id,
        None => false,
    }
}

#[async_trait]
impl HttpClient for MemoryServer {
    async fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<ApiResponse> {
        self.sent.lock().unwrap().push(SentRequest {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });
        Ok(self.handle(method, path, body))
    }
}
