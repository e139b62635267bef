//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite statements (one connection per operation)
//! - Row models and write field sets

mod database;
mod models;

pub use database::{Database, StatementStats};
pub use models::*;
