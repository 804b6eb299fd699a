use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A browser/device push subscription registered by a patient's app.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: Uuid,
    pub patient_ref: String,
    pub endpoint: String,
    /// Opaque subscription object (keys etc.), forwarded to the push gateway.
    pub subscription: serde_json::Value,
    pub active: bool,
    pub created_at: NaiveDateTime,
}
