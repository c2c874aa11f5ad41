//! Backend access: transport abstraction, metadata catalog and record repository

mod auth;
mod catalog;
mod coerce;
mod driver;
mod records;
mod schema;
pub mod http;

pub use auth::*;
pub use catalog::*;
pub use coerce::*;
pub use driver::*;
pub use records::*;
pub use schema::*;
