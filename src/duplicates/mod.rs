//! Duplicate detection
//!
//! Pure functions deciding whether a new reading repeats one already logged.

mod detector;
mod format;

pub use detector::{
    check_duplicate, check_for_bp_duplicate, check_for_bs_duplicate, check_reading,
    find_bulk_duplicates, BulkDuplicate, BulkPartition, DuplicateCheck, DuplicateCheckOptions,
    DUPLICATE_MESSAGE_PREFIX,
};
pub use format::{describe_reading, format_details, format_timestamp, format_values};
