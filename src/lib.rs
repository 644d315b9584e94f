//! Health Log Library
//!
//! Blood pressure and blood sugar logging with near-duplicate detection.

pub mod build_info;
pub mod config;
pub mod db;
pub mod duplicates;
pub mod mcp;
pub mod models;
pub mod store;
pub mod tools;
