//! Metadata catalog: schemas, tables, columns and option sets
//!
//! Every table selection produces one immutable `TableSnapshot`. Nothing is
//! merged across selections; the caller swaps the whole snapshot.

use crate::db::driver::{resource_path, ApiResponse, HttpClient};
use crate::db::records::transport_message;
use crate::db::schema::{ColumnDescriptor, ConstraintDescriptor, OptionEntry, Record};
use crate::error::{CrudError, Result};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything known about one (schema, table) selection
#[derive(Clone, Debug, Default)]
pub struct TableSnapshot {
    pub schema: String,
    pub table: String,
    /// Selection generation this snapshot was loaded for
    pub generation: u64,
    pub columns: Vec<ColumnDescriptor>,
    /// First column flagged primary key, resolved once at load
    pub primary_key: Option<String>,
    pub fk_options: HashMap<String, Vec<OptionEntry>>,
    pub check_options: HashMap<String, Vec<OptionEntry>>,
    pub constraints: Vec<ConstraintDescriptor>,
}

impl TableSnapshot {
    /// Build a snapshot from columns alone; option maps start empty
    pub fn new(schema: &str, table: &str, generation: u64, columns: Vec<ColumnDescriptor>) -> Self {
        let primary_key = columns
            .iter()
            .find(|c| c.is_primary_key)
            .map(|c| c.name.clone());
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            generation,
            columns,
            primary_key,
            ..Self::default()
        }
    }

    /// `schema.table`, the key used by the check-option endpoint
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Columns shown to the operator (audit columns excluded)
    pub fn display_columns(&self) -> impl Iterator<Item = &ColumnDescriptor> {
        self.columns.iter().filter(|c| !c.is_audit())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Options offered for a column: foreign-key values first, then check values
    pub fn options_for(&self, column: &str) -> Option<&[OptionEntry]> {
        self.fk_options
            .get(column)
            .or_else(|| self.check_options.get(column))
            .map(|v| v.as_slice())
    }

    /// Primary-key value of `record` as a path segment.
    ///
    /// Fails locally when the table has no primary key or the record lacks a value.
    pub fn primary_key_value(&self, record: &Record) -> Result<String> {
        let pk = self.primary_key.as_deref().ok_or_else(|| {
            CrudError::Validation(format!(
                "table {} has no primary key; update and delete are unavailable",
                self.qualified_name()
            ))
        })?;
        match record.get(pk) {
            None | Some(serde_json::Value::Null) => Err(CrudError::Validation(format!(
                "record has no value for primary key '{}'",
                pk
            ))),
            Some(serde_json::Value::String(s)) if s.is_empty() => Err(CrudError::Validation(
                format!("record has no value for primary key '{}'", pk),
            )),
            Some(serde_json::Value::String(s)) => Ok(s.clone()),
            Some(other) => Ok(other.to_string()),
        }
    }

    fn install_check_options(&mut self, column: &str, options: Vec<OptionEntry>) {
        if options.is_empty() {
            return;
        }
        if let Some(col) = self.columns.iter_mut().find(|c| c.name == column) {
            col.has_check_constraint = true;
        }
        self.check_options.insert(column.to_string(), options);
    }
}

/// Metadata service client
#[derive(Clone)]
pub struct MetadataCatalog {
    client: Arc<dyn HttpClient>,
}

impl MetadataCatalog {
    pub fn new(client: Arc<dyn HttpClient>) -> Self {
        Self { client }
    }

    /// List schema names; an empty list is valid
    pub async fn list_schemas(&self) -> Result<Vec<String>> {
        self.fetch("/schemas").await
    }

    /// List tables of a schema
    pub async fn list_tables(&self, schema: &str) -> Result<Vec<String>> {
        let path = resource_path(&["tables", schema]);
        match self.fetch(&path).await {
            Err(CrudError::NotFound(_)) => Err(CrudError::NotFound(format!("schema '{}'", schema))),
            other => other,
        }
    }

    /// All tables grouped by schema
    pub async fn list_all_tables(&self) -> Result<BTreeMap<String, Vec<String>>> {
        self.fetch("/tables").await
    }

    /// Column descriptors in display order
    pub async fn get_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let path = resource_path(&[schema, table, "columns"]);
        let columns: Vec<ColumnDescriptor> = self.fetch(&path).await?;
        info!(schema, table, count = columns.len(), "columns loaded");
        Ok(columns)
    }

    pub async fn get_foreign_key_options(
        &self,
        schema: &str,
        table: &str,
        column: &str,
    ) -> Result<Vec<OptionEntry>> {
        let path = resource_path(&[schema, table, "fk-values", column]);
        self.fetch(&path).await
    }

    /// Check-constraint values; `qualified_table` is `schema.table`
    pub async fn get_check_options(&self, qualified_table: &str, column: &str) -> Result<Vec<OptionEntry>> {
        let path = resource_path(&["check", qualified_table, column]);
        self.fetch(&path).await
    }

    pub async fn get_constraints(&self, schema: &str, table: &str) -> Result<Vec<ConstraintDescriptor>> {
        let path = resource_path(&[schema, table, "constraints"]);
        self.fetch(&path).await
    }

    /// Load a complete snapshot for one selection.
    ///
    /// Columns are fetched first; option sets and constraints are then issued
    /// concurrently. A failed option or constraint fetch is logged and skipped.
    pub async fn load_table(&self, schema: &str, table: &str, generation: u64) -> Result<TableSnapshot> {
        let columns = self.get_columns(schema, table).await?;
        if columns.is_empty() {
            return Err(CrudError::NotFound(format!("table '{}.{}'", schema, table)));
        }
        let mut snapshot = TableSnapshot::new(schema, table, generation, columns);
        let qualified = snapshot.qualified_name();

        let fk_columns: Vec<String> = snapshot
            .display_columns()
            .filter(|c| c.is_foreign_key)
            .map(|c| c.name.clone())
            .collect();
        let check_columns: Vec<String> = snapshot.display_columns().map(|c| c.name.clone()).collect();

        let fk_fetches = join_all(fk_columns.iter().map(|col| async move {
            (col, self.get_foreign_key_options(schema, table, col).await)
        }));
        let check_fetches = join_all(check_columns.iter().map(|col| {
            let qualified = qualified.as_str();
            async move { (col, self.get_check_options(qualified, col).await) }
        }));
        let (fk_results, check_results, constraints) =
            futures::join!(fk_fetches, check_fetches, self.get_constraints(schema, table));

        for (col, result) in fk_results {
            match result {
                Ok(options) => {
                    snapshot.fk_options.insert(col.clone(), options);
                }
                Err(e) => warn!(schema, table, column = %col, error = %e, "foreign-key options unavailable"),
            }
        }
        for (col, result) in check_results {
            match result {
                Ok(options) => snapshot.install_check_options(col, options),
                Err(e) => warn!(schema, table, column = %col, error = %e, "check options unavailable"),
            }
        }
        match constraints {
            Ok(constraints) => snapshot.constraints = constraints,
            Err(e) => warn!(schema, table, error = %e, "constraints unavailable"),
        }

        debug!(
            schema,
            table,
            generation,
            fk = snapshot.fk_options.len(),
            check = snapshot.check_options.len(),
            "table snapshot ready"
        );
        Ok(snapshot)
    }

    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .client
            .get(path)
            .await
            .map_err(|e| CrudError::Transport(transport_message(None, Some(&e))))?;
        decode_read(path, resp)
    }
}

/// Shared read decoding: 404 is `NotFound`, other failures are transport errors
pub(crate) fn decode_read<T: DeserializeOwned>(path: &str, resp: ApiResponse) -> Result<T> {
    if resp.status == 404 {
        return Err(CrudError::NotFound(path.to_string()));
    }
    if !resp.is_success() {
        return Err(CrudError::Transport(transport_message(Some(&resp), None)));
    }
    Ok(resp.decode()?)
}
