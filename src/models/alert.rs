use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AlertKind;

/// Caregiver-facing alert raised when a follow-up call ends without a "taken".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaregiverAlert {
    pub id: Uuid,
    pub patient_ref: String,
    pub reminder_id: Uuid,
    pub medication_name: String,
    pub kind: AlertKind,
    pub detail: Option<String>,
    pub created_at: NaiveDateTime,
}
