//! Session state and logic

mod state;
mod actions;
mod export;
mod form;
mod grid;

pub use state::*;
pub use export::{to_csv, to_json};
pub use form::*;
pub use grid::*;

#[cfg(test)]
mod tests;
