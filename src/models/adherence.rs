use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AdherenceMethod;

/// Append-only log entry for a confirmed-taken dose.
///
/// Stored encrypted inside the patient's profile; never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdherenceRecord {
    pub id: Uuid,
    pub reminder_id: Option<Uuid>,
    pub medication_name: String,
    /// Clock time the dose was scheduled for ("HH:MM").
    pub scheduled_time: String,
    /// UTC time the confirmation arrived.
    pub taken_at: NaiveDateTime,
    /// Calendar day the dose belongs to (may precede `taken_at` for late callbacks).
    pub dose_date: NaiveDate,
    pub method: AdherenceMethod,
    pub speech_text: Option<String>,
}
