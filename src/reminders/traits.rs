//! Trait seams of the reminder core.
//!
//! - ReminderStore: the dose table, status written only by compare-and-swap
//! - PatientStore: contact lookup plus the append-only adherence log
//! - PushChannel / VoiceChannel: outbound notification adapters
//! - LlmClient: text generation used by the speech interpreter fallback

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use super::channels::ChannelError;
use super::error::ReminderError;
use super::llm::LlmError;
use super::types::*;
use crate::db::DatabaseError;
use crate::models::*;

pub trait ReminderStore: Send + Sync {
    /// Active PENDING rows whose scheduled time equals `now` (hour:minute).
    fn list_due_for_reminder(&self, now: NaiveTime) -> Result<Vec<DoseReminder>, DatabaseError>;

    /// Active REMINDED rows whose follow-up time equals `now` (hour:minute).
    fn list_due_for_followup(&self, now: NaiveTime) -> Result<Vec<DoseReminder>, DatabaseError>;

    /// Conditional status write. `false` means the row was not in `from`.
    fn transition_status(
        &self,
        id: &Uuid,
        from: DoseStatus,
        to: DoseStatus,
        notified_at: Option<NaiveDateTime>,
    ) -> Result<bool, DatabaseError>;

    /// Reset every row to PENDING and remember the day it happened.
    fn reset_all_to_pending(&self, day: NaiveDate) -> Result<usize, DatabaseError>;

    fn last_reset_date(&self) -> Result<Option<NaiveDate>, DatabaseError>;

    /// Record `day` as reset without touching any row.
    fn mark_reset(&self, day: NaiveDate) -> Result<(), DatabaseError>;

    fn get_reminder(&self, id: &Uuid) -> Result<Option<DoseReminder>, DatabaseError>;
}

pub trait PatientStore: Send + Sync {
    /// Phone number to call, if the patient has one.
    fn get_contact_info(&self, patient_ref: &str) -> Result<Option<String>, ReminderError>;

    /// Append to the patient's adherence log (never mutates earlier entries).
    ///
    /// `false` means the dose already has a record for `record.dose_date`.
    fn append_adherence_record(
        &self,
        patient_ref: &str,
        record: &AdherenceRecord,
    ) -> Result<bool, ReminderError>;

    fn raise_caregiver_alert(&self, alert: &CaregiverAlert) -> Result<(), ReminderError>;
}

pub trait PushChannel: Send + Sync {
    /// Deliver to every active subscription of the patient.
    fn send(&self, patient_ref: &str, message: &PushMessage) -> Result<DeliveryReport, ChannelError>;
}

pub trait VoiceChannel: Send + Sync {
    /// Place an outbound call; returns the provider's call id.
    fn place_call(
        &self,
        phone: &str,
        script: ScriptType,
        callback_url: &str,
    ) -> Result<String, ChannelError>;
}

pub trait LlmClient: Send + Sync {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify traits are object-safe (can be used as `dyn Trait`)
    #[test]
    fn traits_are_object_safe() {
        fn _assert_store(_: &dyn ReminderStore) {}
        fn _assert_patients(_: &dyn PatientStore) {}
        fn _assert_push(_: &dyn PushChannel) {}
        fn _assert_voice(_: &dyn VoiceChannel) {}
        fn _assert_llm(_: &dyn LlmClient) {}
    }
}
