//! Dynamic CRUD engine - Library
//! Browse any relational schema and edit any table from runtime metadata

pub mod app;
pub mod config;
pub mod db;
pub mod error;

#[cfg(test)]
mod testing;

pub use app::Session;
pub use error::{CrudError, Result};

/// Initialize logging based on `RUST_LOG`, falling back to `info`
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // A second call (tests, embedding apps) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
