//! Repository layer: table-scoped database operations.
//!
//! Every function borrows a `Connection`; callers decide locking via
//! [`crate::db::Database::with_conn`].

mod adherence;
mod alert;
mod patient;
mod reminder;
mod scheduler_state;
mod subscription;

use chrono::NaiveDateTime;
use uuid::Uuid;

use super::DatabaseError;

pub use adherence::*;
pub use alert::*;
pub use patient::*;
pub use reminder::*;
pub use scheduler_state::*;
pub use subscription::*;

/// Storage format for timestamps (UTC or local, as documented per column).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, DatabaseError> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {raw}: {e}")))
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
