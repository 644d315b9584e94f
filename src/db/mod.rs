//! Database module
//!
//! SQLite connection pooling and migrations for the SQLite reading medium.

pub mod connection;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
