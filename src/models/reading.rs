//! Reading model
//!
//! Shared shape of a logged health reading: the category tag, the
//! `Reading` trait both record types implement, and timestamp handling.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::blood_sugar::TestType;

/// Reading category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BloodPressure,
    BloodSugar,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BloodPressure => "blood_pressure",
            Category::BloodSugar => "blood_sugar",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "blood_pressure" | "bp" => Some(Category::BloodPressure),
            "blood_sugar" | "bs" | "glucose" => Some(Category::BloodSugar),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Category::BloodPressure => "Blood Pressure",
            Category::BloodSugar => "Blood Sugar",
        }
    }

    /// Key the category's list is persisted under
    pub fn storage_key(&self) -> &'static str {
        match self {
            Category::BloodPressure => "bp_readings",
            Category::BloodSugar => "bs_readings",
        }
    }
}

/// Core values of a reading, the fields duplicate matching compares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreValues {
    BloodPressure {
        systolic: u16,
        diastolic: u16,
        pulse: Option<u16>,
    },
    BloodSugar {
        glucose: u16,
        test_type: TestType,
    },
}

/// A stored health reading of one category
pub trait Reading: Clone + Serialize + DeserializeOwned {
    const CATEGORY: Category;

    fn id(&self) -> &str;

    /// Raw ISO-8601 timestamp as recorded
    fn timestamp(&self) -> &str;

    fn core_values(&self) -> CoreValues;

    fn medication(&self) -> Option<&str>;

    /// Exact equality of core fields; descriptive fields never participate
    fn core_matches(&self, other: &Self) -> bool;

    fn parsed_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        parse_timestamp(self.timestamp())
    }
}

/// Validation errors for new readings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadingError {
    #[error("Invalid timestamp '{0}': expected an ISO-8601 date and time")]
    InvalidTimestamp(String),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: u16,
        min: u16,
        max: u16,
    },

    #[error("Invalid reading: {0}")]
    Invalid(String),
}

/// Offset-bearing layouts RFC 3339 rejects, such as `+0000` or `+05` offsets
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M%#z",
];

/// Offset-less layouts, read as UTC
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 timestamp.
///
/// Accepts RFC 3339 (`2024-05-01T08:30:00Z`, `2024-05-01T08:30:00-04:00`),
/// basic and hour-only offsets (`+0000`, `+05`), offset-less date-times,
/// and bare dates. Offset-less values are read as UTC; a bare date is
/// midnight UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
    {
        return Some(dt);
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Reject timestamps the detector could not compare
pub fn validate_timestamp(s: &str) -> Result<DateTime<FixedOffset>, ReadingError> {
    parse_timestamp(s).ok_or_else(|| ReadingError::InvalidTimestamp(s.to_string()))
}

pub(crate) fn check_range(
    field: &'static str,
    value: u16,
    min: u16,
    max: u16,
) -> Result<(), ReadingError> {
    if value < min || value > max {
        return Err(ReadingError::OutOfRange { field, value, min, max });
    }
    Ok(())
}
