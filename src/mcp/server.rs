//! Health Log MCP Server Implementation
//!
//! Exposes the reading tools over MCP.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::duplicates::DuplicateCheckOptions;
use crate::models::{BloodPressureCreate, BloodSugarCreate, TestType};
use crate::store::ReadingStore;
use crate::tools::readings;
use crate::tools::status::{StatusTracker, READING_INSTRUCTIONS};

/// Health Log MCP Service
#[derive(Clone)]
pub struct HealthLogService {
    status_tracker: Arc<StatusTracker>,
    store: ReadingStore,
    options: DuplicateCheckOptions,
    /// Held across each read-check-write cycle so concurrent calls cannot
    /// interleave and lose a write
    write_lock: Arc<Mutex<()>>,
    tool_router: ToolRouter<HealthLogService>,
}

impl HealthLogService {
    pub fn new(
        store: ReadingStore,
        options: DuplicateCheckOptions,
        status_tracker: StatusTracker,
    ) -> Self {
        Self {
            status_tracker: Arc::new(status_tracker),
            store,
            options,
            write_lock: Arc::new(Mutex::new(())),
            tool_router: Self::tool_router(),
        }
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn parse_test_type(value: &str) -> Result<TestType, McpError> {
    TestType::from_str(value).ok_or_else(|| {
        McpError::invalid_params(
            format!(
                "Unknown test_type '{}'. Use fasting, random, post-meal, bedtime or pre-meal.",
                value
            ),
            None,
        )
    })
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BloodPressureParams {
    /// When the reading was taken, ISO-8601 (e.g., "2026-01-13T08:30:00-05:00")
    pub timestamp: String,
    /// Systolic pressure in mmHg
    pub systolic: u16,
    /// Diastolic pressure in mmHg
    pub diastolic: u16,
    /// Pulse in bpm
    pub pulse: Option<u16>,
    pub notes: Option<String>,
    pub medication: Option<String>,
    pub symptoms: Option<String>,
    pub location: Option<String>,
}

impl From<BloodPressureParams> for BloodPressureCreate {
    fn from(p: BloodPressureParams) -> Self {
        BloodPressureCreate {
            timestamp: p.timestamp,
            systolic: p.systolic,
            diastolic: p.diastolic,
            pulse: p.pulse,
            notes: p.notes,
            medication: p.medication,
            symptoms: p.symptoms,
            location: p.location,
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BloodSugarParams {
    /// When the reading was taken, ISO-8601 (e.g., "2026-01-13T07:00:00-05:00")
    pub timestamp: String,
    /// Glucose in mg/dL
    pub glucose: u16,
    /// fasting, random, post-meal, bedtime or pre-meal
    pub test_type: String,
    pub notes: Option<String>,
    pub medication: Option<String>,
    pub symptoms: Option<String>,
    pub location: Option<String>,
}

impl BloodSugarParams {
    fn into_create(self) -> Result<BloodSugarCreate, McpError> {
        Ok(BloodSugarCreate {
            test_type: parse_test_type(&self.test_type)?,
            timestamp: self.timestamp,
            glucose: self.glucose,
            notes: self.notes,
            medication: self.medication,
            symptoms: self.symptoms,
            location: self.location,
        })
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LogBloodPressureParams {
    #[serde(flatten)]
    pub reading: BloodPressureParams,
    /// Save even if the reading duplicates an existing one (default false)
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct LogBloodSugarParams {
    #[serde(flatten)]
    pub reading: BloodSugarParams,
    /// Save even if the reading duplicates an existing one (default false)
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportBloodPressureParams {
    /// Readings to import
    pub readings: Vec<BloodPressureParams>,
    /// Import duplicates too (default false: skip them)
    #[serde(default)]
    pub import_all: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportBloodSugarParams {
    /// Readings to import
    pub readings: Vec<BloodSugarParams>,
    /// Import duplicates too (default false: skip them)
    #[serde(default)]
    pub import_all: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListReadingsParams {
    /// Category: blood_pressure (bp) or blood_sugar (bs)
    pub category: String,
    /// Maximum results, newest first
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteReadingParams {
    /// Category: blood_pressure (bp) or blood_sugar (bs)
    pub category: String,
    /// Reading ID
    pub id: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ClearReadingsParams {
    /// Category: blood_pressure (bp) or blood_sugar (bs)
    pub category: String,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl HealthLogService {
    // --- Status ---

    #[tool(description = "Get the current status of the Health Log service including build info, storage, reading counts, and process information")]
    fn healthlog_status(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.status_tracker.get_status(&self.store, &self.options))
    }

    #[tool(description = "Get step-by-step instructions for logging readings and handling duplicates. Call this when starting a logging session.")]
    fn reading_instructions(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(READING_INSTRUCTIONS)]))
    }

    // --- Logging ---

    #[tool(description = "Log a blood pressure reading. If it duplicates an existing reading it is not saved unless force=true; relay the message to the user.")]
    async fn log_blood_pressure(
        &self,
        Parameters(p): Parameters<LogBloodPressureParams>,
    ) -> Result<CallToolResult, McpError> {
        let _guard = self.write_lock.lock().await;
        let data = p.reading.into();
        let result = readings::log_blood_pressure(&self.store, data, p.force, &self.options)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Log a blood sugar reading. If it duplicates an existing reading it is not saved unless force=true; relay the message to the user.")]
    async fn log_blood_sugar(
        &self,
        Parameters(p): Parameters<LogBloodSugarParams>,
    ) -> Result<CallToolResult, McpError> {
        let data = p.reading.into_create()?;
        let _guard = self.write_lock.lock().await;
        let result = readings::log_blood_sugar(&self.store, data, p.force, &self.options)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Check whether a blood pressure reading would be a duplicate, without saving it")]
    fn check_blood_pressure(
        &self,
        Parameters(p): Parameters<BloodPressureParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = readings::check_blood_pressure(&self.store, p.into(), &self.options)
            .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Check whether a blood sugar reading would be a duplicate, without saving it")]
    fn check_blood_sugar(
        &self,
        Parameters(p): Parameters<BloodSugarParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = readings::check_blood_sugar(&self.store, p.into_create()?, &self.options)
            .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    // --- Import ---

    #[tool(description = "Import many blood pressure readings in one call. Readings duplicating stored ones are skipped unless import_all=true.")]
    async fn import_blood_pressure(
        &self,
        Parameters(p): Parameters<ImportBloodPressureParams>,
    ) -> Result<CallToolResult, McpError> {
        let batch = p.readings.into_iter().map(BloodPressureCreate::from).collect();
        let _guard = self.write_lock.lock().await;
        let result =
            readings::import_blood_pressure(&self.store, batch, p.import_all, &self.options)
                .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Import many blood sugar readings in one call. Readings duplicating stored ones are skipped unless import_all=true.")]
    async fn import_blood_sugar(
        &self,
        Parameters(p): Parameters<ImportBloodSugarParams>,
    ) -> Result<CallToolResult, McpError> {
        let batch = p
            .readings
            .into_iter()
            .map(BloodSugarParams::into_create)
            .collect::<Result<Vec<_>, _>>()?;
        let _guard = self.write_lock.lock().await;
        let result = readings::import_blood_sugar(&self.store, batch, p.import_all, &self.options)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }

    // --- Review ---

    #[tool(description = "List readings of a category (blood_pressure or blood_sugar), newest first")]
    fn list_readings(
        &self,
        Parameters(p): Parameters<ListReadingsParams>,
    ) -> Result<CallToolResult, McpError> {
        let result = readings::list_readings(&self.store, &p.category, p.limit)
            .map_err(|e| McpError::invalid_params(e, None))?;
        json_result(&result)
    }

    #[tool(description = "Delete a reading by ID")]
    async fn delete_reading(
        &self,
        Parameters(p): Parameters<DeleteReadingParams>,
    ) -> Result<CallToolResult, McpError> {
        let _guard = self.write_lock.lock().await;
        let result = readings::delete_reading(&self.store, &p.category, &p.id)
            .map_err(|e| McpError::internal_error(e, None))?;
        match result {
            Some(resp) => json_result(&resp),
            None => json_result(&serde_json::json!({ "error": "Reading not found", "id": p.id })),
        }
    }

    #[tool(description = "Delete ALL readings of a category. Confirm with the user before calling.")]
    async fn clear_readings(
        &self,
        Parameters(p): Parameters<ClearReadingsParams>,
    ) -> Result<CallToolResult, McpError> {
        let _guard = self.write_lock.lock().await;
        let result = readings::clear_readings(&self.store, &p.category)
            .map_err(|e| McpError::internal_error(e, None))?;
        json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for HealthLogService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "healthlog".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Health Log".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Health Log - blood pressure and blood sugar logging with duplicate detection. \
                 Call reading_instructions first. \
                 Log: log_blood_pressure/log_blood_sugar (force=true to keep a duplicate). \
                 Preview: check_blood_pressure/check_blood_sugar. \
                 Bulk: import_blood_pressure/import_blood_sugar. \
                 Review: list_readings, delete_reading, clear_readings. \
                 Status: healthlog_status."
                    .into(),
            ),
        }
    }
}
