//! Metadata types reported by the backend

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One table row keyed by column name
pub type Record = Map<String, Value>;

/// System/audit columns: never editable, never displayed
pub const AUDIT_FIELDS: &[&str] = &[
    "created_by",
    "created_date",
    "modified_by",
    "modified_date",
    "created_ip_addr",
    "modified_ip_addr",
    "created_mac_addr",
    "modified_mac_addr",
    "created_uri",
    "modified_uri",
    "api_service_url",
];

pub fn is_audit_field(name: &str) -> bool {
    AUDIT_FIELDS.contains(&name)
}

/// Closed set of semantic column types, decided once at metadata load
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
    Timestamp,
    Json,
}

impl SemanticType {
    /// Classify a raw SQL type name (`int4`, `timestamp with time zone`, `jsonb`...)
    pub fn from_sql_type(raw: &str) -> Self {
        let t = raw.trim().to_lowercase();
        if t.contains("timestamp") {
            return SemanticType::Timestamp;
        }
        if t.contains("date") {
            return SemanticType::Date;
        }
        match t.as_str() {
            "json" | "jsonb" => SemanticType::Json,
            "bool" | "boolean" | "bit" => SemanticType::Boolean,
            _ if is_numeric_type(&t) => SemanticType::Number,
            _ => SemanticType::Text,
        }
    }
}

fn is_numeric_type(t: &str) -> bool {
    const NUMERIC: &[&str] = &[
        "int", "serial", "numeric", "decimal", "real", "double", "float", "money",
    ];
    NUMERIC.iter().any(|n| t.contains(n))
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SemanticType::Text => write!(f, "text"),
            SemanticType::Number => write!(f, "number"),
            SemanticType::Boolean => write!(f, "boolean"),
            SemanticType::Date => write!(f, "date"),
            SemanticType::Timestamp => write!(f, "timestamp"),
            SemanticType::Json => write!(f, "json"),
        }
    }
}

/// Column definition as reported by `/{schema}/{table}/columns`
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    pub name: String,
    pub semantic_type: SemanticType,
    /// Raw SQL type name, kept for display
    pub sql_type: String,
    pub size: Option<i64>,
    pub nullable: bool,
    pub is_primary_key: bool,
    pub is_auto_increment: bool,
    pub is_foreign_key: bool,
    pub has_check_constraint: bool,
    pub default_value: Option<String>,
}

impl ColumnDescriptor {
    /// Plain text column, nullable, no key flags
    pub fn new(name: &str, semantic_type: SemanticType) -> Self {
        Self {
            name: name.to_string(),
            semantic_type,
            sql_type: semantic_type.to_string(),
            size: None,
            nullable: true,
            is_primary_key: false,
            is_auto_increment: false,
            is_foreign_key: false,
            has_check_constraint: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.is_auto_increment = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn foreign_key(mut self) -> Self {
        self.is_foreign_key = true;
        self
    }

    pub fn with_default(mut self, value: &str) -> Self {
        self.default_value = Some(value.to_string());
        self
    }

    pub fn is_audit(&self) -> bool {
        is_audit_field(&self.name)
    }
}

/// Wire shape; accepts both the backend's names and the descriptor's own
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawColumn {
    name: String,
    #[serde(default, rename = "type")]
    sql_type: Option<String>,
    #[serde(default)]
    semantic_type: Option<SemanticType>,
    #[serde(default)]
    size: Option<i64>,
    #[serde(default = "default_true")]
    nullable: bool,
    #[serde(default, alias = "isPrimaryKey")]
    primary_key: bool,
    #[serde(default, alias = "isAutoIncrement")]
    auto_increment: bool,
    #[serde(default)]
    is_foreign_key: bool,
    #[serde(default)]
    has_check_constraint: bool,
    #[serde(default, alias = "default", deserialize_with = "loose_string")]
    default_value: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Defaults arrive as strings, numbers or null depending on the driver
fn loose_string<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(de)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

impl<'de> Deserialize<'de> for ColumnDescriptor {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw = RawColumn::deserialize(de)?;
        let sql_type = raw.sql_type.unwrap_or_default();
        let semantic_type = raw
            .semantic_type
            .unwrap_or_else(|| SemanticType::from_sql_type(&sql_type));
        Ok(Self {
            name: raw.name,
            semantic_type,
            sql_type,
            size: raw.size,
            nullable: raw.nullable,
            is_primary_key: raw.primary_key,
            is_auto_increment: raw.auto_increment,
            is_foreign_key: raw.is_foreign_key,
            has_check_constraint: raw.has_check_constraint,
            default_value: raw.default_value,
        })
    }
}

/// Constraint metadata, shown to the operator but not interpreted
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintDescriptor {
    #[serde(default, alias = "conname")]
    pub name: String,
    #[serde(default)]
    pub definition: String,
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Selectable value for a foreign-key or check-constrained column
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptionEntry {
    pub value: Value,
    pub label: String,
}

impl OptionEntry {
    pub fn text(value: &str) -> Self {
        Self {
            value: Value::String(value.to_string()),
            label: value.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for OptionEntry {
    /// Foreign-key rows are `{id, value}`, check options plain strings
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(de)?;
        Ok(match raw {
            Value::Object(mut obj) => {
                let value = obj
                    .remove("id")
                    .or_else(|| obj.get("value").cloned())
                    .unwrap_or(Value::Null);
                let label = obj
                    .get("label")
                    .or_else(|| obj.get("value"))
                    .map(scalar_text)
                    .unwrap_or_else(|| scalar_text(&value));
                OptionEntry { value, label }
            }
            other => OptionEntry {
                label: scalar_text(&other),
                value: other,
            },
        })
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Type-ahead filter: label starts with `prefix`, case-insensitive
pub fn filter_options<'a>(options: &'a [OptionEntry], prefix: &str) -> Vec<&'a OptionEntry> {
    let prefix = prefix.to_lowercase();
    options
        .iter()
        .filter(|o| o.label.to_lowercase().starts_with(&prefix))
        .collect()
}
