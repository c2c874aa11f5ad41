//! Error taxonomy for the CRUD engine
//!
//! Local validation failures never reach the network. Remote failures are
//! folded into a single display message by the caller that issued the request.

use thiserror::Error;

/// Errors produced by the engine
#[derive(Debug, Error)]
pub enum CrudError {
    /// Local check failed before dispatch (required field empty, missing primary key)
    #[error("{0}")]
    Validation(String),

    /// Schema or table not present in the catalog
    #[error("not found: {0}")]
    NotFound(String),

    /// Network failure or non-2xx status
    #[error("{0}")]
    Transport(String),

    /// Response body did not match the expected shape
    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl CrudError {
    /// True for the errors raised before any request was sent
    pub fn is_local(&self) -> bool {
        matches!(self, CrudError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, CrudError>;
