//! Near-duplicate detection
//!
//! A candidate is a duplicate of an existing reading when their core fields
//! are exactly equal and their timestamps lie within the time window. The
//! existing readings are scanned in the order given and the first match is
//! reported, so callers wanting stable results should pass the list as the
//! store returns it (newest first).

use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::format::describe_reading;
use crate::models::{BloodPressureReading, BloodSugarReading, Reading};

/// Prefix of every duplicate message
pub const DUPLICATE_MESSAGE_PREFIX: &str = "Duplicate entry detected! ";

/// Tuning for duplicate checks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheckOptions {
    /// Maximum distance between timestamps, inclusive. Fractions are
    /// allowed; `0.5` is a thirty-second window.
    #[serde(default = "default_time_window_minutes")]
    pub time_window_minutes: f64,
}

fn default_time_window_minutes() -> f64 {
    1.0
}

impl Default for DuplicateCheckOptions {
    fn default() -> Self {
        Self {
            time_window_minutes: default_time_window_minutes(),
        }
    }
}

impl DuplicateCheckOptions {
    pub fn with_time_window_minutes(minutes: f64) -> Self {
        Self {
            time_window_minutes: minutes,
        }
    }

    fn window_millis(&self) -> i64 {
        // NaN and negative windows collapse to exact-instant matching
        (self.time_window_minutes.max(0.0) * 60_000.0).round() as i64
    }
}

/// Outcome of checking one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateCheck<R> {
    Unique,
    Duplicate { entry: R, message: String },
}

impl<R> DuplicateCheck<R> {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DuplicateCheck::Duplicate { .. })
    }

    /// The existing reading the candidate matched
    pub fn entry(&self) -> Option<&R> {
        match self {
            DuplicateCheck::Duplicate { entry, .. } => Some(entry),
            DuplicateCheck::Unique => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            DuplicateCheck::Duplicate { message, .. } => Some(message),
            DuplicateCheck::Unique => None,
        }
    }
}

// { isDuplicate, duplicateEntry?, message? }
impl<R: Serialize> Serialize for DuplicateCheck<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DuplicateCheck::Unique => {
                let mut state = serializer.serialize_struct("DuplicateCheck", 1)?;
                state.serialize_field("isDuplicate", &false)?;
                state.end()
            }
            DuplicateCheck::Duplicate { entry, message } => {
                let mut state = serializer.serialize_struct("DuplicateCheck", 3)?;
                state.serialize_field("isDuplicate", &true)?;
                state.serialize_field("duplicateEntry", entry)?;
                state.serialize_field("message", message)?;
                state.end()
            }
        }
    }
}

/// Check a candidate against existing readings with caller-supplied rules.
///
/// `core_match` receives `(existing, candidate)`. `describe` renders the
/// matched existing reading for the message. Readings whose timestamps do
/// not parse, on either side, never match.
pub fn check_duplicate<R, M, D>(
    candidate: &R,
    existing: &[R],
    core_match: M,
    describe: D,
    options: &DuplicateCheckOptions,
) -> DuplicateCheck<R>
where
    R: Reading,
    M: Fn(&R, &R) -> bool,
    D: Fn(&R) -> String,
{
    let Some(candidate_time) = candidate.parsed_timestamp() else {
        debug!(
            timestamp = candidate.timestamp(),
            "Candidate timestamp does not parse; treating as unique"
        );
        return DuplicateCheck::Unique;
    };
    let window = options.window_millis();

    for entry in existing {
        let Some(entry_time) = entry.parsed_timestamp() else {
            continue;
        };
        let distance = (entry_time - candidate_time).num_milliseconds().abs();
        if distance <= window && core_match(entry, candidate) {
            debug!(
                category = R::CATEGORY.as_str(),
                matched_id = entry.id(),
                distance_ms = distance,
                "Duplicate reading detected"
            );
            return DuplicateCheck::Duplicate {
                entry: entry.clone(),
                message: format!("{}{}", DUPLICATE_MESSAGE_PREFIX, describe(entry)),
            };
        }
    }

    DuplicateCheck::Unique
}

/// Check a candidate using its category's own matching and description
pub fn check_reading<R: Reading>(
    candidate: &R,
    existing: &[R],
    options: &DuplicateCheckOptions,
) -> DuplicateCheck<R> {
    check_duplicate(
        candidate,
        existing,
        |entry, candidate| entry.core_matches(candidate),
        describe_reading::<R>,
        options,
    )
}

/// Blood pressure: systolic, diastolic and pulse (missing = 0) must be equal
pub fn check_for_bp_duplicate(
    candidate: &BloodPressureReading,
    existing: &[BloodPressureReading],
    options: &DuplicateCheckOptions,
) -> DuplicateCheck<BloodPressureReading> {
    check_reading(candidate, existing, options)
}

/// Blood sugar: glucose and test type must be equal
pub fn check_for_bs_duplicate(
    candidate: &BloodSugarReading,
    existing: &[BloodSugarReading],
    options: &DuplicateCheckOptions,
) -> DuplicateCheck<BloodSugarReading> {
    check_reading(candidate, existing, options)
}

/// A batch candidate that matched an existing reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDuplicate<R> {
    pub new_reading: R,
    pub duplicate_entry: R,
    pub message: String,
}

/// A batch split into duplicates and uniques, each in input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkPartition<R> {
    pub duplicates: Vec<BulkDuplicate<R>>,
    pub unique_readings: Vec<R>,
}

impl<R> Default for BulkPartition<R> {
    fn default() -> Self {
        Self {
            duplicates: Vec::new(),
            unique_readings: Vec::new(),
        }
    }
}

impl<R> BulkPartition<R> {
    pub fn len(&self) -> usize {
        self.duplicates.len() + self.unique_readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Partition a batch of candidates against the existing readings.
///
/// Every candidate is checked against `existing` only; candidates in the
/// same batch are not compared with each other.
pub fn find_bulk_duplicates<R: Reading>(
    candidates: &[R],
    existing: &[R],
    options: &DuplicateCheckOptions,
) -> BulkPartition<R> {
    let mut partition = BulkPartition::default();

    for candidate in candidates {
        match check_reading(candidate, existing, options) {
            DuplicateCheck::Duplicate { entry, message } => {
                partition.duplicates.push(BulkDuplicate {
                    new_reading: candidate.clone(),
                    duplicate_entry: entry,
                    message,
                });
            }
            DuplicateCheck::Unique => partition.unique_readings.push(candidate.clone()),
        }
    }

    debug!(
        category = R::CATEGORY.as_str(),
        candidates = candidates.len(),
        duplicates = partition.duplicates.len(),
        unique = partition.unique_readings.len(),
        "Bulk duplicate check complete"
    );

    partition
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestType;

    const T: &str = "2024-05-01T08:30:00Z";

    fn bp(
        id: &str,
        timestamp: &str,
        systolic: u16,
        diastolic: u16,
        pulse: Option<u16>,
    ) -> BloodPressureReading {
        BloodPressureReading {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            systolic,
            diastolic,
            pulse,
            notes: None,
            medication: None,
            symptoms: None,
            location: None,
        }
    }

    fn bs(id: &str, timestamp: &str, glucose: u16, test_type: TestType) -> BloodSugarReading {
        BloodSugarReading {
            id: id.to_string(),
            timestamp: timestamp.to_string(),
            glucose,
            test_type,
            notes: None,
            medication: None,
            symptoms: None,
            location: None,
        }
    }

    #[test]
    fn test_exact_match_within_window() {
        let candidate = bp("new", T, 120, 80, Some(72));
        let existing = vec![bp("old", "2024-05-01T08:30:30Z", 120, 80, Some(72))];

        let result =
            check_for_bp_duplicate(&candidate, &existing, &DuplicateCheckOptions::default());
        assert!(result.is_duplicate());
        assert_eq!(result.entry(), Some(&existing[0]));
        assert!(result.message().unwrap().starts_with(DUPLICATE_MESSAGE_PREFIX));
    }

    #[test]
    fn test_outside_window_is_unique() {
        let candidate = bp("new", T, 120, 80, Some(72));
        let existing = vec![bp("old", "2024-05-01T08:32:00Z", 120, 80, Some(72))];

        let result =
            check_for_bp_duplicate(&candidate, &existing, &DuplicateCheckOptions::default());
        assert_eq!(result, DuplicateCheck::Unique);
    }

    #[test]
    fn test_window_boundary_is_inclusive() {
        let candidate = bp("new", T, 120, 80, None);
        let existing = vec![bp("old", "2024-05-01T08:29:00Z", 120, 80, None)];

        let result =
            check_for_bp_duplicate(&candidate, &existing, &DuplicateCheckOptions::default());
        assert!(result.is_duplicate());
    }

    #[test]
    fn test_wider_window() {
        let candidate = bp("new", T, 120, 80, Some(72));
        let existing = vec![bp("old", "2024-05-01T08:32:00Z", 120, 80, Some(72))];

        let options = DuplicateCheckOptions::with_time_window_minutes(5.0);
        assert!(check_for_bp_duplicate(&candidate, &existing, &options).is_duplicate());
    }

    #[test]
    fn test_fractional_window() {
        let options = DuplicateCheckOptions::with_time_window_minutes(0.5);
        let candidate = bp("new", T, 120, 80, Some(72));

        let inside = vec![bp("old", "2024-05-01T08:30:30Z", 120, 80, Some(72))];
        assert!(check_for_bp_duplicate(&candidate, &inside, &options).is_duplicate());

        let outside = vec![bp("old", "2024-05-01T08:30:31Z", 120, 80, Some(72))];
        assert!(!check_for_bp_duplicate(&candidate, &outside, &options).is_duplicate());
    }

    #[test]
    fn test_core_field_mismatch_is_unique() {
        let candidate = bp("new", T, 120, 80, None);
        let existing = vec![bp("old", T, 121, 80, None)];

        let result =
            check_for_bp_duplicate(&candidate, &existing, &DuplicateCheckOptions::default());
        assert!(!result.is_duplicate());
    }

    #[test]
    fn test_missing_pulse_equals_zero() {
        let options = DuplicateCheckOptions::default();

        let candidate = bp("new", T, 120, 80, None);
        let existing = vec![bp("old", T, 120, 80, Some(0))];
        assert!(check_for_bp_duplicate(&candidate, &existing, &options).is_duplicate());

        let candidate = bp("new", T, 120, 80, Some(0));
        let existing = vec![bp("old", T, 120, 80, None)];
        assert!(check_for_bp_duplicate(&candidate, &existing, &options).is_duplicate());

        let candidate = bp("new", T, 120, 80, None);
        let existing = vec![bp("old", T, 120, 80, Some(72))];
        assert!(!check_for_bp_duplicate(&candidate, &existing, &options).is_duplicate());
    }

    #[test]
    fn test_first_match_wins() {
        let candidate = bp("new", T, 120, 80, None);
        let existing = vec![
            bp("first", "2024-05-01T08:30:40Z", 120, 80, None),
            bp("second", T, 120, 80, None),
        ];

        let result =
            check_for_bp_duplicate(&candidate, &existing, &DuplicateCheckOptions::default());
        assert_eq!(result.entry().map(|r| r.id.as_str()), Some("first"));
    }

    #[test]
    fn test_unparseable_timestamps_never_match() {
        let options = DuplicateCheckOptions::default();

        let candidate = bp("new", "not a date", 120, 80, None);
        let existing = vec![bp("old", T, 120, 80, None)];
        assert!(!check_for_bp_duplicate(&candidate, &existing, &options).is_duplicate());

        let candidate = bp("new", T, 120, 80, None);
        let existing = vec![bp("bad", "", 120, 80, None), bp("good", T, 120, 80, None)];
        let result = check_for_bp_duplicate(&candidate, &existing, &options);
        assert_eq!(result.entry().map(|r| r.id.as_str()), Some("good"));
    }

    #[test]
    fn test_offsets_are_compared_as_instants() {
        let candidate = bp("new", "2024-05-01T04:30:20-04:00", 120, 80, None);
        let existing = vec![bp("old", T, 120, 80, None)];

        let result =
            check_for_bp_duplicate(&candidate, &existing, &DuplicateCheckOptions::default());
        assert!(result.is_duplicate());
    }

    #[test]
    fn test_blood_sugar_matching() {
        let options = DuplicateCheckOptions::default();
        let mut candidate = bs("new", T, 95, TestType::Fasting);
        candidate.notes = Some("before breakfast".into());
        candidate.medication = Some("metformin".into());

        let mut stored = bs("old", "2024-05-01T08:30:10Z", 95, TestType::Fasting);
        stored.notes = Some("different note".into());
        let existing = vec![stored];
        assert!(check_for_bs_duplicate(&candidate, &existing, &options).is_duplicate());

        let existing = vec![bs("old", T, 95, TestType::Random)];
        assert!(!check_for_bs_duplicate(&candidate, &existing, &options).is_duplicate());
    }

    #[test]
    fn test_custom_rules() {
        let candidate = bp("new", T, 120, 80, Some(72));
        let existing = vec![bp("old", T, 120, 80, Some(90))];

        let result = check_duplicate(
            &candidate,
            &existing,
            |e, c| e.systolic == c.systolic && e.diastolic == c.diastolic,
            |e| format!("{} again", e.id),
            &DuplicateCheckOptions::default(),
        );
        assert_eq!(result.message(), Some("Duplicate entry detected! old again"));
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let candidate = bp("new", T, 120, 80, Some(72));
        let existing = vec![bp("old", T, 120, 80, Some(72))];
        let before = (candidate.clone(), existing.clone());

        let _ = check_for_bp_duplicate(&candidate, &existing, &DuplicateCheckOptions::default());
        assert_eq!((candidate, existing), before);
    }

    #[test]
    fn test_bulk_partition_is_exhaustive_and_ordered() {
        let existing = vec![bp("old", T, 120, 80, Some(72))];
        let candidates = vec![
            bp("c1", T, 120, 80, Some(72)),
            bp("c2", T, 130, 85, None),
            bp("c3", "2024-05-01T08:30:45Z", 120, 80, Some(72)),
            bp("c4", "2024-05-02T08:30:00Z", 120, 80, Some(72)),
        ];

        let partition =
            find_bulk_duplicates(&candidates, &existing, &DuplicateCheckOptions::default());
        assert_eq!(partition.len(), candidates.len());

        let dup_ids: Vec<&str> = partition
            .duplicates
            .iter()
            .map(|d| d.new_reading.id.as_str())
            .collect();
        let unique_ids: Vec<&str> =
            partition.unique_readings.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(dup_ids, vec!["c1", "c3"]);
        assert_eq!(unique_ids, vec!["c2", "c4"]);
        assert!(partition.duplicates.iter().all(|d| d.duplicate_entry.id == "old"));
    }

    #[test]
    fn test_bulk_ignores_duplicates_within_batch() {
        let candidates = vec![bs("a", T, 95, TestType::Fasting), bs("b", T, 95, TestType::Fasting)];

        let partition = find_bulk_duplicates(&candidates, &[], &DuplicateCheckOptions::default());
        assert!(partition.duplicates.is_empty());
        assert_eq!(partition.unique_readings, candidates);
    }

    #[test]
    fn test_result_json_shape() {
        let unique: DuplicateCheck<BloodPressureReading> = DuplicateCheck::Unique;
        assert_eq!(
            serde_json::to_value(&unique).unwrap(),
            serde_json::json!({ "isDuplicate": false })
        );

        let entry = bp("old", T, 120, 80, None);
        let dup = DuplicateCheck::Duplicate { entry, message: "m".to_string() };
        let json = serde_json::to_value(&dup).unwrap();
        assert_eq!(json["isDuplicate"], true);
        assert_eq!(json["duplicateEntry"]["id"], "old");
        assert_eq!(json["message"], "m");

        let partition: BulkPartition<BloodPressureReading> = BulkPartition::default();
        let json = serde_json::to_value(&partition).unwrap();
        assert!(json.get("uniqueReadings").is_some());
    }
}
