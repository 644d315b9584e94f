//! Blood sugar reading model

use serde::{Deserialize, Serialize};

use super::reading::{check_range, Category, CoreValues, Reading, ReadingError};

/// When the glucose test was taken relative to meals and sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestType {
    Fasting,
    Random,
    PostMeal,
    Bedtime,
    PreMeal,
}

impl TestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestType::Fasting => "fasting",
            TestType::Random => "random",
            TestType::PostMeal => "post-meal",
            TestType::Bedtime => "bedtime",
            TestType::PreMeal => "pre-meal",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "fasting" => Some(TestType::Fasting),
            "random" => Some(TestType::Random),
            "post-meal" | "after-meal" | "postprandial" => Some(TestType::PostMeal),
            "bedtime" => Some(TestType::Bedtime),
            "pre-meal" | "before-meal" => Some(TestType::PreMeal),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TestType::Fasting => "Fasting",
            TestType::Random => "Random",
            TestType::PostMeal => "Post-meal",
            TestType::Bedtime => "Bedtime",
            TestType::PreMeal => "Pre-meal",
        }
    }
}

/// A blood sugar reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodSugarReading {
    pub id: String,
    pub timestamp: String,
    /// mg/dL
    pub glucose: u16,
    pub test_type: TestType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Data for a new blood sugar reading, before an id is assigned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodSugarCreate {
    pub timestamp: String,
    pub glucose: u16,
    pub test_type: TestType,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub medication: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl BloodSugarCreate {
    pub fn validate(&self) -> Result<(), ReadingError> {
        check_range("glucose", self.glucose, 10, 1000)
    }

    pub fn into_reading(self, id: String) -> BloodSugarReading {
        BloodSugarReading {
            id,
            timestamp: self.timestamp,
            glucose: self.glucose,
            test_type: self.test_type,
            notes: self.notes,
            medication: self.medication,
            symptoms: self.symptoms,
            location: self.location,
        }
    }
}

impl Reading for BloodSugarReading {
    const CATEGORY: Category = Category::BloodSugar;

    fn id(&self) -> &str {
        &self.id
    }

    fn timestamp(&self) -> &str {
        &self.timestamp
    }

    fn core_values(&self) -> CoreValues {
        CoreValues::BloodSugar {
            glucose: self.glucose,
            test_type: self.test_type,
        }
    }

    fn medication(&self) -> Option<&str> {
        self.medication.as_deref()
    }

    fn core_matches(&self, other: &Self) -> bool {
        self.glucose == other.glucose && self.test_type == other.test_type
    }
}
