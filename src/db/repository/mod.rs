pub mod conversation;
pub mod feedback;
pub mod message;

pub use conversation::*;
pub use feedback::*;
pub use message::*;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::DatabaseError;

/// Storage format for timestamps. Fixed-width and zero-padded so that
/// lexicographic ORDER BY on the text column matches chronological order.
pub(crate) const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub(crate) fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FMT).to_string()
}

pub(crate) fn parse_datetime(s: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad datetime '{s}': {e}")))
}

pub(crate) fn parse_uuid(s: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(s).map_err(|e| DatabaseError::ConstraintViolation(format!("bad uuid '{s}': {e}")))
}
