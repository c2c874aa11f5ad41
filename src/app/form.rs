//! Form synthesis and the edit session built on top of it

use crate::db::{
    is_audit_field, normalize_for_display, normalize_for_submit, strip_fractional, ColumnDescriptor,
    Record, SemanticType,
};
use crate::error::{CrudError, Result};
use serde_json::Value;

/// Editable state of one column
#[derive(Clone, Debug, PartialEq)]
pub struct FieldState {
    pub name: String,
    pub semantic_type: SemanticType,
    pub value: String,
    pub enabled: bool,
    pub required: bool,
}

/// Builds field sets from column descriptors
pub struct FormSynthesizer;

impl FormSynthesizer {
    /// One field per non-audit column, in column order.
    ///
    /// Running it twice on the same columns yields the same fields with
    /// default values; nothing from a previous form survives.
    pub fn build(columns: &[ColumnDescriptor]) -> Vec<FieldState> {
        columns
            .iter()
            .filter(|c| !is_audit_field(&c.name))
            .map(|c| FieldState {
                name: c.name.clone(),
                semantic_type: c.semantic_type,
                value: initial_value(c),
                enabled: !(c.is_auto_increment || c.is_primary_key),
                required: !c.nullable,
            })
            .collect()
    }
}

fn initial_value(column: &ColumnDescriptor) -> String {
    match (&column.semantic_type, &column.default_value) {
        (SemanticType::Timestamp, Some(default)) => strip_fractional(default),
        _ => String::new(),
    }
}

/// Row being edited
#[derive(Clone, Debug, PartialEq)]
pub struct EditTarget {
    pub row: Record,
    pub row_id: String,
}

/// Active form: field values plus the optional row under edit
#[derive(Clone, Debug, Default)]
pub struct FormState {
    pub fields: Vec<FieldState>,
    pub editing: Option<EditTarget>,
    defaults: Vec<FieldState>,
}

impl FormState {
    pub fn new(columns: &[ColumnDescriptor]) -> Self {
        let fields = FormSynthesizer::build(columns);
        Self {
            defaults: fields.clone(),
            fields,
            editing: None,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.editing.is_some()
    }

    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.value.as_str())
    }

    /// Operator input for one field
    pub fn set_value(&mut self, name: &str, value: &str) -> Result<()> {
        let field = self
            .fields
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| CrudError::Validation(format!("unknown field '{}'", name)))?;
        if !field.enabled {
            return Err(CrudError::Validation(format!("field '{}' is read-only", name)));
        }
        field.value = value.to_string();
        Ok(())
    }

    /// Load a row into the form and remember which row it is
    pub fn edit(&mut self, row: &Record, row_id: String) {
        for field in &mut self.fields {
            field.value = match row.get(&field.name) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) if field.semantic_type == SemanticType::Timestamp => {
                    strip_fractional(s)
                }
                Some(v) => normalize_for_display(v),
            };
        }
        self.editing = Some(EditTarget {
            row: row.clone(),
            row_id,
        });
    }

    /// Enabled required fields must be non-blank
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.enabled && f.required && f.value.trim().is_empty())
            .map(|f| f.name.as_str())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CrudError::Validation(format!("required: {}", missing.join(", "))))
        }
    }

    /// Values to submit, normalized per column type.
    ///
    /// Enabled fields are always sent; disabled fields only when they carry a
    /// value (the primary key of the row under edit).
    pub fn payload(&self) -> Record {
        let mut record = Record::new();
        for field in &self.fields {
            if !field.enabled && field.value.is_empty() {
                continue;
            }
            let value = normalize_for_submit(&field.value, field.semantic_type);
            record.insert(field.name.clone(), Value::String(value));
        }
        record
    }

    /// Back to defaults, out of edit mode
    pub fn reset(&mut self) {
        self.fields = self.defaults.clone();
        self.editing = None;
    }
}
