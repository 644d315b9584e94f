//! Data models
//!
//! Reading records for each category and the shared `Reading` trait.

mod blood_pressure;
mod blood_sugar;
mod reading;

pub use blood_pressure::{BloodPressureCreate, BloodPressureReading};
pub use blood_sugar::{BloodSugarCreate, BloodSugarReading, TestType};
pub use reading::{
    parse_timestamp, validate_timestamp, Category, CoreValues, Reading, ReadingError,
};
