//! Human-readable rendering of readings for confirmation prompts

use crate::models::{parse_timestamp, CoreValues, Reading};

const DISPLAY_TIME_FORMAT: &str = "%b %-d, %Y at %-I:%M %p";

/// Render a timestamp in the offset it was recorded with.
/// Unparseable input is returned unchanged.
pub fn format_timestamp(timestamp: &str) -> String {
    match parse_timestamp(timestamp) {
        Some(dt) => dt.format(DISPLAY_TIME_FORMAT).to_string(),
        None => timestamp.to_string(),
    }
}

/// Core values on one line, e.g. `120/80 mmHg, pulse 72 bpm`
pub fn format_values<R: Reading>(reading: &R) -> String {
    match reading.core_values() {
        CoreValues::BloodPressure { systolic, diastolic, pulse: Some(pulse) } => {
            format!("{}/{} mmHg, pulse {} bpm", systolic, diastolic, pulse)
        }
        CoreValues::BloodPressure { systolic, diastolic, pulse: None } => {
            format!("{}/{} mmHg", systolic, diastolic)
        }
        CoreValues::BloodSugar { glucose, test_type } => {
            format!("{} mg/dL ({})", glucose, test_type.display_name())
        }
    }
}

/// One-line summary used in duplicate messages
pub fn describe_reading<R: Reading>(reading: &R) -> String {
    format!(
        "A {} reading of {} was already logged on {}.",
        R::CATEGORY.display_name().to_lowercase(),
        format_values(reading),
        format_timestamp(reading.timestamp())
    )
}

/// Multi-line details block. Optional fields that are absent are left out.
pub fn format_details<R: Reading>(reading: &R) -> String {
    let mut lines = vec![format!("Date: {}", format_timestamp(reading.timestamp()))];

    match reading.core_values() {
        CoreValues::BloodPressure { systolic, diastolic, pulse } => {
            lines.push(format!("Blood Pressure: {}/{} mmHg", systolic, diastolic));
            if let Some(pulse) = pulse {
                lines.push(format!("Pulse: {} bpm", pulse));
            }
        }
        CoreValues::BloodSugar { glucose, test_type } => {
            lines.push(format!("Glucose: {} mg/dL", glucose));
            lines.push(format!("Test Type: {}", test_type.display_name()));
        }
    }

    if let Some(medication) = reading.medication().filter(|m| !m.trim().is_empty()) {
        lines.push(format!("Medication: {}", medication));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BloodPressureReading, BloodSugarReading, TestType};

    fn bp(pulse: Option<u16>, medication: Option<&str>) -> BloodPressureReading {
        BloodPressureReading {
            id: "r1".into(),
            timestamp: "2024-05-01T08:30:00-04:00".into(),
            systolic: 120,
            diastolic: 80,
            pulse,
            notes: Some("ignored".into()),
            medication: medication.map(String::from),
            symptoms: None,
            location: None,
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2024-05-01T08:30:00-04:00"), "May 1, 2024 at 8:30 AM");
        assert_eq!(format_timestamp("2024-12-24T21:05:00Z"), "Dec 24, 2024 at 9:05 PM");
        assert_eq!(format_timestamp("garbage"), "garbage");
    }

    #[test]
    fn test_describe_blood_pressure() {
        assert_eq!(
            describe_reading(&bp(Some(72), None)),
            "A blood pressure reading of 120/80 mmHg, pulse 72 bpm \
             was already logged on May 1, 2024 at 8:30 AM."
        );
        assert_eq!(
            describe_reading(&bp(None, None)),
            "A blood pressure reading of 120/80 mmHg was already logged on May 1, 2024 at 8:30 AM."
        );
    }

    #[test]
    fn test_details_blood_pressure() {
        assert_eq!(
            format_details(&bp(Some(72), Some("Lisinopril 10mg"))),
            "Date: May 1, 2024 at 8:30 AM\n\
             Blood Pressure: 120/80 mmHg\n\
             Pulse: 72 bpm\n\
             Medication: Lisinopril 10mg"
        );
        assert_eq!(
            format_details(&bp(None, None)),
            "Date: May 1, 2024 at 8:30 AM\nBlood Pressure: 120/80 mmHg"
        );
    }

    #[test]
    fn test_details_blood_sugar() {
        let reading = BloodSugarReading {
            id: "s1".into(),
            timestamp: "2024-05-01T07:00:00Z".into(),
            glucose: 95,
            test_type: TestType::Fasting,
            notes: None,
            medication: Some("  ".into()),
            symptoms: None,
            location: None,
        };
        assert_eq!(
            format_details(&reading),
            "Date: May 1, 2024 at 7:00 AM\nGlucose: 95 mg/dL\nTest Type: Fasting"
        );
        assert!(describe_reading(&reading).contains("95 mg/dL (Fasting)"));
    }
}
