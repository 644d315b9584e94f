//! Health Log
//!
//! An MCP server for logging blood pressure and blood sugar readings.

use healthlog::build_info;
use healthlog::config::Config;
use healthlog::mcp::HealthLogService;
use healthlog::tools::status::StatusTracker;
use rmcp::ServiceExt;
use tokio::io::{stdin, stdout};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries the MCP protocol
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("healthlog=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    build_info::print_startup_banner();

    let config = Config::from_env();
    let store = config.open_store()?;
    info!(
        storage = %store.describe(),
        duplicate_window_minutes = config.duplicate_options.time_window_minutes,
        "Reading store ready"
    );

    let tracker = StatusTracker::new(config.database_path().cloned());
    let service = HealthLogService::new(store, config.duplicate_options, tracker);

    info!("Starting MCP server on stdio");
    let server = service.serve((stdin(), stdout())).await?;
    server.waiting().await?;

    Ok(())
}
