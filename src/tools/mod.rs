//! Tool implementations
//!
//! Plain functions behind the MCP tools, usable without the server.

pub mod readings;
pub mod status;
