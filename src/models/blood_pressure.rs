//! Blood pressure reading model

use serde::{Deserialize, Serialize};

use super::reading::{check_range, Category, CoreValues, Reading, ReadingError};

/// A blood pressure reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodPressureReading {
    pub id: String,
    pub timestamp: String,
    /// mmHg
    pub systolic: u16,
    /// mmHg
    pub diastolic: u16,
    /// bpm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Data for a new blood pressure reading, before an id is assigned
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodPressureCreate {
    pub timestamp: String,
    pub systolic: u16,
    pub diastolic: u16,
    #[serde(default)]
    pub pulse: Option<u16>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub medication: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl BloodPressureCreate {
    /// Check physiological bounds. Does not look at the timestamp.
    pub fn validate(&self) -> Result<(), ReadingError> {
        check_range("systolic", self.systolic, 40, 300)?;
        check_range("diastolic", self.diastolic, 20, 200)?;
        if let Some(pulse) = self.pulse {
            check_range("pulse", pulse, 20, 250)?;
        }
        if self.systolic <= self.diastolic {
            return Err(ReadingError::Invalid(format!(
                "systolic ({}) must be higher than diastolic ({})",
                self.systolic, self.diastolic
            )));
        }
        Ok(())
    }

    pub fn into_reading(self, id: String) -> BloodPressureReading {
        BloodPressureReading {
            id,
            timestamp: self.timestamp,
            systolic: self.systolic,
            diastolic: self.diastolic,
            pulse: self.pulse,
            notes: self.notes,
            medication: self.medication,
            symptoms: self.symptoms,
            location: self.location,
        }
    }
}

impl Reading for BloodPressureReading {
    const CATEGORY: Category = Category::BloodPressure;

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn core_values(&self) -> CoreValues {
        CoreValues::BloodPressure {
            systolic: self.systolic,
            diastolic: self.diastolic,
            pulse: self.pulse,
        }
    }

    fn medication(&self) -> Option<&str> {
        self.medication.as_deref()
    }

    fn core_matches(&self, other: &Self) -> bool {
        // A missing pulse compares as 0
        self.systolic == other.systolic
            && self.diastolic == other.diastolic
            && self.pulse.unwrap_or(0) == other.pulse.unwrap_or(0)
    }
}
