//! Reading Tools
//!
//! Log, check, import, list, delete and clear readings. Each operation
//! fetches the stored list, runs the duplicate detector where relevant and
//! writes the full list back through the store.

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::duplicates::{
    check_reading, find_bulk_duplicates, format_details, format_timestamp, format_values,
    BulkDuplicate, DuplicateCheck, DuplicateCheckOptions,
};
use crate::models::{
    validate_timestamp, BloodPressureCreate, BloodPressureReading, BloodSugarCreate,
    BloodSugarReading, Category, Reading, ReadingError,
};
use crate::store::ReadingStore;

/// Response for log_blood_pressure / log_blood_sugar
#[derive(Debug, Serialize)]
pub struct LogReadingResponse<R> {
    pub saved: bool,
    pub reading: R,
    pub duplicate_check: DuplicateCheck<R>,
    pub message: String,
}

/// Response for the dry-run checks
#[derive(Debug, Serialize)]
pub struct CheckReadingResponse<R> {
    pub duplicate_check: DuplicateCheck<R>,
    /// Details of the candidate, for a confirmation prompt
    pub details: String,
    /// Details of the matched reading, when there is one
    pub existing_details: Option<String>,
}

/// An import entry that failed validation
#[derive(Debug, Serialize)]
pub struct ImportError {
    pub index: usize,
    pub error: String,
}

/// Response for import_blood_pressure / import_blood_sugar
#[derive(Debug, Serialize)]
pub struct ImportReadingsResponse<R> {
    pub success: bool,
    pub total: usize,
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub duplicates: Vec<BulkDuplicate<R>>,
    pub errors: Vec<ImportError>,
    pub message: String,
}

/// Reading summary for listing
#[derive(Debug, Serialize)]
pub struct ReadingSummary {
    pub id: String,
    pub timestamp: String,
    pub timestamp_display: String,
    pub value: String,
    pub details: String,
}

impl ReadingSummary {
    fn from_reading<R: Reading>(reading: &R) -> Self {
        Self {
            id: reading.id().to_string(),
            timestamp: reading.timestamp().to_string(),
            timestamp_display: format_timestamp(reading.timestamp()),
            value: format_values(reading),
            details: format_details(reading),
        }
    }
}

/// Response for list_readings
#[derive(Debug, Serialize)]
pub struct ListReadingsResponse {
    pub category: String,
    pub readings: Vec<ReadingSummary>,
    pub total: usize,
}

/// Response for delete_reading
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub deleted_id: String,
}

/// Response for clear_readings
#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub category: String,
    pub removed: usize,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn parse_category(category: &str) -> Result<Category, String> {
    Category::from_str(category).ok_or_else(|| {
        format!(
            "Unknown category '{}'. Use 'blood_pressure' (bp) or 'blood_sugar' (bs).",
            category
        )
    })
}

fn validation_error(e: ReadingError) -> String {
    format!("Invalid reading: {}", e)
}

fn validate_bp(data: &BloodPressureCreate) -> Result<(), ReadingError> {
    data.validate()?;
    validate_timestamp(&data.timestamp)?;
    Ok(())
}

fn validate_bs(data: &BloodSugarCreate) -> Result<(), ReadingError> {
    data.validate()?;
    validate_timestamp(&data.timestamp)?;
    Ok(())
}

fn log_reading<R: Reading>(
    store: &ReadingStore,
    reading: R,
    force: bool,
    options: &DuplicateCheckOptions,
) -> Result<LogReadingResponse<R>, String> {
    // Strict load: corrupted history must not be overwritten by this save
    let existing = store
        .load::<R>()
        .map_err(|e| format!("Your reading was not saved: {}", e))?;
    let duplicate_check = check_reading(&reading, &existing, options);

    if duplicate_check.is_duplicate() && !force {
        let message = format!(
            "{} Not saved. Log again with force=true to keep both readings.",
            duplicate_check.message().unwrap_or_default()
        );
        return Ok(LogReadingResponse {
            saved: false,
            reading,
            duplicate_check,
            message,
        });
    }

    let mut readings = existing;
    readings.push(reading.clone());
    store
        .save(readings)
        .map_err(|e| format!("Your reading was not saved: {}", e))?;

    info!(
        category = R::CATEGORY.as_str(),
        id = reading.id(),
        forced = duplicate_check.is_duplicate(),
        "Logged reading"
    );

    let message = format!(
        "Saved {} reading {}.",
        R::CATEGORY.display_name().to_lowercase(),
        format_values(&reading)
    );
    Ok(LogReadingResponse {
        saved: true,
        reading,
        duplicate_check,
        message,
    })
}

/// Log a blood pressure reading. A near-duplicate is only saved with `force`.
pub fn log_blood_pressure(
    store: &ReadingStore,
    data: BloodPressureCreate,
    force: bool,
    options: &DuplicateCheckOptions,
) -> Result<LogReadingResponse<BloodPressureReading>, String> {
    validate_bp(&data).map_err(validation_error)?;
    log_reading(store, data.into_reading(new_id()), force, options)
}

/// Log a blood sugar reading. A near-duplicate is only saved with `force`.
pub fn log_blood_sugar(
    store: &ReadingStore,
    data: BloodSugarCreate,
    force: bool,
    options: &DuplicateCheckOptions,
) -> Result<LogReadingResponse<BloodSugarReading>, String> {
    validate_bs(&data).map_err(validation_error)?;
    log_reading(store, data.into_reading(new_id()), force, options)
}

fn check_candidate<R: Reading>(
    store: &ReadingStore,
    candidate: &R,
    options: &DuplicateCheckOptions,
) -> CheckReadingResponse<R> {
    let existing = store.get::<R>();
    let duplicate_check = check_reading(candidate, &existing, options);
    let existing_details = duplicate_check.entry().map(format_details::<R>);
    CheckReadingResponse {
        details: format_details(candidate),
        existing_details,
        duplicate_check,
    }
}

/// Check a blood pressure reading without saving it
pub fn check_blood_pressure(
    store: &ReadingStore,
    data: BloodPressureCreate,
    options: &DuplicateCheckOptions,
) -> Result<CheckReadingResponse<BloodPressureReading>, String> {
    validate_bp(&data).map_err(validation_error)?;
    Ok(check_candidate(store, &data.into_reading(new_id()), options))
}

/// Check a blood sugar reading without saving it
pub fn check_blood_sugar(
    store: &ReadingStore,
    data: BloodSugarCreate,
    options: &DuplicateCheckOptions,
) -> Result<CheckReadingResponse<BloodSugarReading>, String> {
    validate_bs(&data).map_err(validation_error)?;
    Ok(check_candidate(store, &data.into_reading(new_id()), options))
}

fn import_readings<R: Reading>(
    store: &ReadingStore,
    total: usize,
    candidates: Vec<R>,
    errors: Vec<ImportError>,
    import_all: bool,
    options: &DuplicateCheckOptions,
) -> Result<ImportReadingsResponse<R>, String> {
    let existing = store
        .load::<R>()
        .map_err(|e| format!("Cannot import: {}", e))?;
    let partition = find_bulk_duplicates(&candidates, &existing, options);

    let (to_import, skipped_duplicates) = if import_all {
        (candidates, 0)
    } else {
        let skipped = partition.duplicates.len();
        (partition.unique_readings, skipped)
    };
    let imported = to_import.len();

    if imported > 0 {
        let mut readings = existing;
        readings.extend(to_import);
        store
            .save(readings)
            .map_err(|e| format!("Import was not saved: {}", e))?;
    }

    info!(
        category = R::CATEGORY.as_str(),
        total,
        imported,
        skipped_duplicates,
        invalid = errors.len(),
        "Imported readings"
    );

    Ok(ImportReadingsResponse {
        success: true,
        total,
        imported,
        skipped_duplicates,
        message: format!(
            "Imported {} of {} {} readings ({} duplicates skipped, {} invalid)",
            imported,
            total,
            R::CATEGORY.display_name().to_lowercase(),
            skipped_duplicates,
            errors.len()
        ),
        duplicates: partition.duplicates,
        errors,
    })
}

/// Validate a batch, keeping valid entries and recording the rest by index
fn split_valid<C, R>(
    batch: Vec<C>,
    validate: impl Fn(&C) -> Result<(), ReadingError>,
    build: impl Fn(C) -> R,
) -> (Vec<R>, Vec<ImportError>) {
    let mut valid = Vec::with_capacity(batch.len());
    let mut errors = Vec::new();
    for (index, data) in batch.into_iter().enumerate() {
        match validate(&data) {
            Ok(()) => valid.push(build(data)),
            Err(e) => errors.push(ImportError {
                index,
                error: e.to_string(),
            }),
        }
    }
    (valid, errors)
}

/// Import a batch of blood pressure readings. Unless `import_all` is set,
/// readings that duplicate stored ones are skipped.
pub fn import_blood_pressure(
    store: &ReadingStore,
    batch: Vec<BloodPressureCreate>,
    import_all: bool,
    options: &DuplicateCheckOptions,
) -> Result<ImportReadingsResponse<BloodPressureReading>, String> {
    let total = batch.len();
    let (candidates, errors) = split_valid(batch, validate_bp, |d: BloodPressureCreate| {
        d.into_reading(new_id())
    });
    import_readings(store, total, candidates, errors, import_all, options)
}

/// Import a batch of blood sugar readings. Unless `import_all` is set,
/// readings that duplicate stored ones are skipped.
pub fn import_blood_sugar(
    store: &ReadingStore,
    batch: Vec<BloodSugarCreate>,
    import_all: bool,
    options: &DuplicateCheckOptions,
) -> Result<ImportReadingsResponse<BloodSugarReading>, String> {
    let total = batch.len();
    let (candidates, errors) = split_valid(batch, validate_bs, |d: BloodSugarCreate| {
        d.into_reading(new_id())
    });
    import_readings(store, total, candidates, errors, import_all, options)
}

fn summarize<R: Reading>(store: &ReadingStore, limit: Option<usize>) -> ListReadingsResponse {
    let readings = store.get::<R>();
    let total = readings.len();
    let summaries = readings
        .iter()
        .take(limit.unwrap_or(total))
        .map(ReadingSummary::from_reading)
        .collect();
    ListReadingsResponse {
        category: R::CATEGORY.as_str().to_string(),
        readings: summaries,
        total,
    }
}

/// List a category's readings, newest first
pub fn list_readings(
    store: &ReadingStore,
    category: &str,
    limit: Option<usize>,
) -> Result<ListReadingsResponse, String> {
    Ok(match parse_category(category)? {
        Category::BloodPressure => summarize::<BloodPressureReading>(store, limit),
        Category::BloodSugar => summarize::<BloodSugarReading>(store, limit),
    })
}

/// Delete one reading by id
pub fn delete_reading(
    store: &ReadingStore,
    category: &str,
    id: &str,
) -> Result<Option<DeleteResponse>, String> {
    let deleted = match parse_category(category)? {
        Category::BloodPressure => store.delete::<BloodPressureReading>(id),
        Category::BloodSugar => store.delete::<BloodSugarReading>(id),
    }
    .map_err(|e| format!("Failed to delete reading: {}", e))?;

    if !deleted {
        return Ok(None);
    }
    info!(category, id, "Deleted reading");
    Ok(Some(DeleteResponse {
        success: true,
        deleted_id: id.to_string(),
    }))
}

/// Remove every reading in a category
pub fn clear_readings(store: &ReadingStore, category: &str) -> Result<ClearResponse, String> {
    let category = parse_category(category)?;
    let removed = match category {
        Category::BloodPressure => store.get::<BloodPressureReading>().len(),
        Category::BloodSugar => store.get::<BloodSugarReading>().len(),
    };
    store
        .clear(category)
        .map_err(|e| format!("Failed to clear readings: {}", e))?;

    info!(category = category.as_str(), removed, "Cleared readings");
    Ok(ClearResponse {
        success: true,
        category: category.as_str().to_string(),
        removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TestType;
    use crate::store::MemoryMedium;

    fn store() -> ReadingStore {
        ReadingStore::new(MemoryMedium::new())
    }

    fn bp(
        timestamp: &str,
        systolic: u16,
        diastolic: u16,
        pulse: Option<u16>,
    ) -> BloodPressureCreate {
        BloodPressureCreate {
            timestamp: timestamp.to_string(),
            systolic,
            diastolic,
            pulse,
            ..Default::default()
        }
    }

    fn bs(timestamp: &str, glucose: u16, test_type: TestType) -> BloodSugarCreate {
        BloodSugarCreate {
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
    fn test_log_rejects_duplicate_unless_forced() {
        let store = store();
        let options = DuplicateCheckOptions::default();

        let reading = bp("2024-05-01T08:30:00Z", 120, 80, Some(72));
        let first = log_blood_pressure(&store, reading, false, &options).unwrap();
        assert!(first.saved);

        let repeat = bp("2024-05-01T08:30:30Z", 120, 80, Some(72));
        let second = log_blood_pressure(&store, repeat.clone(), false, &options).unwrap();
        assert!(!second.saved);
        assert_eq!(
            second.duplicate_check.entry().map(|r| r.id.as_str()),
            Some(first.reading.id.as_str())
        );
        assert_eq!(store.get::<BloodPressureReading>().len(), 1);

        let forced = log_blood_pressure(&store, repeat, true, &options).unwrap();
        assert!(forced.saved);
        assert!(forced.duplicate_check.is_duplicate());
        assert_eq!(store.get::<BloodPressureReading>().len(), 2);
    }

    #[test]
    fn test_log_rejects_bad_timestamp() {
        let options = DuplicateCheckOptions::default();
        let reading = bs("last tuesday", 95, TestType::Fasting);
        let err = log_blood_sugar(&store(), reading, false, &options).unwrap_err();
        assert!(err.contains("Invalid timestamp"));
    }

    #[test]
    fn test_check_does_not_save() {
        let store = store();
        let options = DuplicateCheckOptions::default();
        let reading = bs("2024-05-01T07:00:00Z", 95, TestType::Fasting);
        log_blood_sugar(&store, reading, false, &options).unwrap();

        let candidate = bs("2024-05-01T07:00:20Z", 95, TestType::Fasting);
        let check = check_blood_sugar(&store, candidate, &options).unwrap();
        assert!(check.duplicate_check.is_duplicate());
        assert!(check.details.contains("Glucose: 95 mg/dL"));
        assert!(check.existing_details.is_some());
        assert_eq!(store.get::<BloodSugarReading>().len(), 1);
    }

    #[test]
    fn test_import_skips_duplicates_and_invalid_entries() {
        let store = store();
        let options = DuplicateCheckOptions::default();
        let reading = bp("2024-05-01T08:30:00Z", 120, 80, None);
        log_blood_pressure(&store, reading, false, &options).unwrap();

        let batch = vec![
            bp("2024-05-01T08:30:10Z", 120, 80, None),
            bp("2024-05-02T08:30:00Z", 118, 79, None),
            bp("not a date", 118, 79, None),
            bp("2024-05-03T08:30:00Z", 118, 79, None),
        ];
        let result = import_blood_pressure(&store, batch, false, &options).unwrap();
        assert_eq!(result.total, 4);
        assert_eq!(result.imported, 2);
        assert_eq!(result.skipped_duplicates, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].index, 2);
        assert_eq!(store.get::<BloodPressureReading>().len(), 3);
    }

    #[test]
    fn test_import_all_keeps_duplicates() {
        let store = store();
        let options = DuplicateCheckOptions::default();
        let reading = bp("2024-05-01T08:30:00Z", 120, 80, None);
        log_blood_pressure(&store, reading, false, &options).unwrap();

        let batch = vec![bp("2024-05-01T08:30:10Z", 120, 80, None)];
        let result = import_blood_pressure(&store, batch, true, &options).unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.duplicates.len(), 1);
        assert_eq!(store.get::<BloodPressureReading>().len(), 2);
    }

    #[test]
    fn test_list_delete_clear() {
        let store = store();
        let options = DuplicateCheckOptions::default();
        let fasting = bs("2024-05-01T07:00:00Z", 95, TestType::Fasting);
        let a = log_blood_sugar(&store, fasting, false, &options).unwrap();
        let post_meal = bs("2024-05-01T13:00:00Z", 140, TestType::PostMeal);
        log_blood_sugar(&store, post_meal, false, &options).unwrap();

        let list = list_readings(&store, "bs", Some(1)).unwrap();
        assert_eq!(list.total, 2);
        assert_eq!(list.readings.len(), 1);
        assert_eq!(list.readings[0].value, "140 mg/dL (Post-meal)");

        assert!(delete_reading(&store, "blood_sugar", &a.reading.id).unwrap().is_some());
        assert!(delete_reading(&store, "blood_sugar", &a.reading.id).unwrap().is_none());

        let cleared = clear_readings(&store, "glucose").unwrap();
        assert_eq!(cleared.removed, 1);
        assert_eq!(clear_readings(&store, "glucose").unwrap().removed, 0);

        assert!(list_readings(&store, "weight", None).is_err());
    }

    #[test]
    fn test_failed_save_is_reported() {
        let medium = std::sync::Arc::new(MemoryMedium::new());
        let store = ReadingStore::from_medium(medium.clone());
        medium.fail_writes(true);

        let options = DuplicateCheckOptions::default();
        let reading = bp("2024-05-01T08:30:00Z", 120, 80, None);
        let err = log_blood_pressure(&store, reading, false, &options).unwrap_err();
        assert!(err.starts_with("Your reading was not saved"));
    }

    #[test]
    fn test_unreadable_history_is_not_overwritten() {
        let medium = std::sync::Arc::new(MemoryMedium::new());
        let store = ReadingStore::from_medium(medium.clone());
        let options = DuplicateCheckOptions::default();
        let reading = bp("2024-05-01T08:30:00Z", 120, 80, None);
        log_blood_pressure(&store, reading, false, &options).unwrap();

        medium.fail_reads(true);
        let reading = bp("2024-05-02T08:30:00Z", 118, 76, None);
        let err = log_blood_pressure(&store, reading, false, &options).unwrap_err();
        assert!(err.starts_with("Your reading was not saved"));
        let batch = vec![bp("2024-05-03T08:30:00Z", 118, 76, None)];
        assert!(import_blood_pressure(&store, batch, false, &options).is_err());

        medium.fail_reads(false);
        assert_eq!(store.get::<BloodPressureReading>().len(), 1);
    }
}
