//! Command-line front end for the CRUD engine
//!
//! Run with: cargo run --bin crud_export -- <command>
//!
//!   schemas                          list schema names
//!   tables <schema>                  list tables of a schema
//!   columns <schema> <table>         show column metadata
//!   export <schema> <table> [filter] write {table}_data.csv

use anyhow::{bail, Context, Result};
use dyn_crud::app::ExportScope;
use dyn_crud::config::AppConfig;
use dyn_crud::Session;

#[tokio::main]
async fn main() -> Result<()> {
    dyn_crud::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = AppConfig::load();
    let mut session = Session::connect(config)?;

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["schemas"] => {
            session.load_schemas().await?;
            for schema in &session.schemas {
                println!("{}", schema);
            }
        }
        ["tables", schema] => {
            session.select_schema(schema).await?;
            for table in &session.tables {
                println!("{}", table);
            }
        }
        ["columns", schema, table] => {
            session.select_table(schema, table).await?;
            let snapshot = session.snapshot.as_ref().context("table metadata missing")?;
            for col in &snapshot.columns {
                let flags = [
                    (col.is_primary_key, "pk"),
                    (col.is_auto_increment, "auto"),
                    (col.is_foreign_key, "fk"),
                    (col.has_check_constraint, "check"),
                    (!col.nullable, "required"),
                ]
                .iter()
                .filter(|(on, _)| *on)
                .map(|(_, name)| *name)
                .collect::<Vec<_>>()
                .join(",");
                println!("{:<30} {:<10} {:<24} {}", col.name, col.semantic_type, col.sql_type, flags);
            }
            for constraint in &snapshot.constraints {
                println!("constraint {} {}", constraint.name, constraint.definition);
            }
        }
        ["export", schema, table, rest @ ..] => {
            session.select_table(schema, table).await?;
            if let Some(filter) = rest.first() {
                session.grid.apply_filter(filter);
            }
            let path = session.export_csv(ExportScope::Filtered)?;
            println!("{}", path.display());
        }
        _ => bail!("usage: crud_export schemas | tables <schema> | columns <schema> <table> | export <schema> <table> [filter]"),
    }

    Ok(())
}
