//! Session actions - async operations and business logic
//!
//! This module contains the actions that modify session state: browsing the
//! catalog, selecting a table, editing, submitting and deleting rows.

use crate::app::{FormState, GridProjector, SelectionTicket, Session};
use crate::db::{Outcome, Record, TableSnapshot, TABLE_SELECTION_ROUTE};
use crate::error::{CrudError, Result};
use tracing::{debug, info, warn};

impl Session {
    /// Load schema names from the catalog
    pub async fn load_schemas(&mut self) -> Result<()> {
        match self.catalog.list_schemas().await {
            Ok(schemas) => {
                self.schemas = schemas;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Load the tables of a schema
    pub async fn select_schema(&mut self, schema: &str) -> Result<()> {
        if !self.schemas.is_empty() && !self.schemas.iter().any(|s| s == schema) {
            let err = CrudError::NotFound(format!("schema '{}'", schema));
            self.error = Some(err.to_string());
            return Err(err);
        }
        match self.catalog.list_tables(schema).await {
            Ok(tables) => {
                self.tables = tables;
                self.tables_schema = Some(schema.to_string());
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Start a new selection: validate it, bump the generation and discard
    /// everything loaded for the previous table
    pub fn begin_selection(&mut self, schema: &str, table: &str) -> Result<SelectionTicket> {
        if !self.schemas.is_empty() && !self.schemas.iter().any(|s| s == schema) {
            return Err(CrudError::NotFound(format!("schema '{}'", schema)));
        }
        let tables_known = self.tables_schema.as_deref() == Some(schema);
        if tables_known && !self.tables.iter().any(|t| t == table) {
            return Err(CrudError::NotFound(format!("table '{}.{}'", schema, table)));
        }

        self.generation += 1;
        self.selected_schema = Some(schema.to_string());
        self.selected_table = Some(table.to_string());
        self.clear_selection();
        self.clear_messages();
        self.is_loading = true;

        info!(schema, table, generation = self.generation, "table selected");
        Ok(SelectionTicket {
            generation: self.generation,
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    /// Install a loaded snapshot; returns false when it belongs to an older selection
    pub fn install_snapshot(&mut self, snapshot: TableSnapshot) -> bool {
        if !self.is_current(snapshot.generation) {
            debug!(
                stale = snapshot.generation,
                current = self.generation,
                "discarding stale table snapshot"
            );
            return false;
        }
        let rows = std::mem::take(&mut self.grid.rows);
        self.form = FormState::new(&snapshot.columns);
        self.is_form_ready = true;
        self.grid = GridProjector::project(rows, &snapshot.columns, self.config.page_size);
        self.snapshot = Some(snapshot);
        true
    }

    /// Install a fetched record list; returns false when it is stale
    pub fn install_records(&mut self, generation: u64, records: Vec<Record>) -> bool {
        if !self.is_current(generation) {
            debug!(stale = generation, current = self.generation, "discarding stale records");
            return false;
        }
        self.grid.replace_rows(records);
        true
    }

    /// Select a table: metadata and rows load concurrently, columns strictly
    /// before the option sets that depend on them
    pub async fn select_table(&mut self, schema: &str, table: &str) -> Result<()> {
        let ticket = match self.begin_selection(schema, table) {
            Ok(ticket) => ticket,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        let (snapshot, records) = futures::join!(
            self.catalog.load_table(&ticket.schema, &ticket.table, ticket.generation),
            self.repo.list(&ticket.schema, &ticket.table)
        );
        self.is_loading = false;

        match snapshot {
            Ok(snapshot) => {
                self.install_snapshot(snapshot);
            }
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e);
            }
        }
        match records {
            Ok(records) => {
                self.install_records(ticket.generation, records);
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Re-read the rows of the active table
    pub async fn reload(&mut self) -> Result<()> {
        let (schema, table, generation) = self.active()?;
        match self.repo.list(&schema, &table).await {
            Ok(records) => {
                self.install_records(generation, records);
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Set one field of the active form
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<()> {
        self.form.set_value(name, value)
    }

    /// Put a row into the form for editing
    pub fn edit_row(&mut self, row: &Record) -> Result<()> {
        let snapshot = self.snapshot.as_ref().ok_or_else(no_table)?;
        let row_id = snapshot.primary_key_value(row)?;
        self.form.edit(row, row_id);
        Ok(())
    }

    /// Clear the form back to its defaults and leave edit mode
    pub fn reset_form(&mut self) {
        self.form.reset();
    }

    /// Validate, normalize and dispatch the form as a create or update.
    ///
    /// Local validation failures return `Err` without any request. Remote
    /// failures come back as an `Outcome` and leave the form as typed.
    pub async fn submit(&mut self) -> Result<Outcome> {
        let (schema, table, _) = self.active()?;
        self.clear_messages();
        if let Err(e) = self.form.validate() {
            self.error = Some(e.to_string());
            return Err(e);
        }
        let payload = self.form.payload();

        let (outcome, success_msg) = match &self.form.editing {
            Some(target) => (
                self.repo.update(&schema, &table, &target.row_id, &payload).await,
                "Row updated successfully",
            ),
            None => (
                self.repo.create(&schema, &table, &payload).await,
                "Row inserted successfully",
            ),
        };

        self.finish_write(&outcome, success_msg).await;
        if outcome.is_success() {
            self.form.reset();
        }
        Ok(outcome)
    }

    /// Delete a row by its primary key
    pub async fn delete_row(&mut self, row: &Record) -> Result<Outcome> {
        let (schema, table, _) = self.active()?;
        self.clear_messages();
        let snapshot = self.snapshot.as_ref().ok_or_else(no_table)?;
        let row_id = match snapshot.primary_key_value(row) {
            Ok(id) => id,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        let outcome = self.repo.remove(&schema, &table, &row_id).await;
        self.finish_write(&outcome, "Row deleted successfully").await;
        if outcome.is_success() && self.form.editing.as_ref().map(|t| &t.row_id) == Some(&row_id) {
            self.form.reset();
        }
        Ok(outcome)
    }

    /// Leave the table: discard the selection and go back to table choice
    pub fn go_back(&mut self) {
        self.generation += 1;
        self.selected_schema = None;
        self.selected_table = None;
        self.clear_selection();
        self.clear_messages();
        self.router.go_to(TABLE_SELECTION_ROUTE);
    }

    async fn finish_write(&mut self, outcome: &Outcome, success_msg: &str) {
        match outcome.error_message() {
            None => {
                self.message = Some(success_msg.to_string());
                // a failed reload leaves the error set but the write stands
                if let Err(e) = self.reload().await {
                    warn!(error = %e, "reload after write failed");
                }
            }
            Some(msg) => {
                self.error = Some(msg.to_string());
            }
        }
    }

    fn active(&self) -> Result<(String, String, u64)> {
        match (&self.selected_schema, &self.selected_table, &self.snapshot) {
            (Some(schema), Some(table), Some(_)) => Ok((schema.clone(), table.clone(), self.generation)),
            _ => Err(no_table()),
        }
    }
}

fn no_table() -> CrudError {
    CrudError::Validation("no table selected".to_string())
}
