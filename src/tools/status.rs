//! Health Log Status Tool
//!
//! Runtime status of the service and usage instructions for assistants.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::duplicates::DuplicateCheckOptions;
use crate::models::{BloodPressureReading, BloodSugarReading};
use crate::store::ReadingStore;

/// Reading logging instructions for AI assistants
pub const READING_INSTRUCTIONS: &str = r#"
# Health Log Reading Instructions

Health Log keeps two histories: **blood pressure** and **blood sugar**.

## Logging a Reading

```
log_blood_pressure(timestamp: "2026-01-13T08:30:00-05:00", systolic: 120, diastolic: 80, pulse: 72)
log_blood_sugar(timestamp: "2026-01-13T07:00:00-05:00", glucose: 95, test_type: "fasting")
```

- `timestamp` is required and must be ISO-8601 with an offset. Use the
  time the reading was taken, not the time you are logging it.
- `test_type` is one of: fasting, random, post-meal, bedtime, pre-meal.
- Optional: notes, medication, symptoms, location. These are never used
  for duplicate detection.

## Duplicates

A reading is a duplicate when an existing reading has the **same values**
(systolic/diastolic/pulse, or glucose/test type) taken within the
duplicate time window (1 minute by default).

When `log_*` reports `saved: false`, show the user the message and ask:
- "Save anyway" → call the same tool again with `force: true`
- "Discard" → do nothing

Use `check_blood_pressure` / `check_blood_sugar` to preview without saving.

## Importing

`import_blood_pressure` / `import_blood_sugar` take a list of readings.
By default readings matching stored ones are skipped; pass
`import_all: true` to import everything. Readings in the same batch are
not compared with each other.

## Reviewing

- `list_readings(category: "bp" | "bs", limit)` - newest first
- `delete_reading(category, id)`
- `clear_readings(category)` - removes the whole history, confirm first
"#;

/// Status information
#[derive(Debug, Serialize)]
pub struct HealthLogStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,
    pub storage: String,
    pub database_size_bytes: Option<u64>,
    pub blood_pressure_readings: usize,
    pub blood_sugar_readings: usize,
    pub duplicate_window_minutes: f64,
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Tracks service uptime and reports status
pub struct StatusTracker {
    start_time: Instant,
    database_path: Option<PathBuf>,
}

impl StatusTracker {
    pub fn new(database_path: Option<PathBuf>) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    pub fn get_status(
        &self,
        store: &ReadingStore,
        options: &DuplicateCheckOptions,
    ) -> HealthLogStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = self
            .database_path
            .as_ref()
            .and_then(|path| std::fs::metadata(path).ok())
            .map(|m| m.len());

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));
        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        HealthLogStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            storage: store.describe(),
            database_size_bytes,
            blood_pressure_readings: store.get::<BloodPressureReading>().len(),
            blood_sugar_readings: store.get::<BloodSugarReading>().len(),
            duplicate_window_minutes: options.time_window_minutes,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}
