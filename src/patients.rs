//! Patient-side collaborator: contact lookup, the encrypted adherence log
//! and caregiver alerts.
//!
//! Adherence records are sealed with the service data key before they reach
//! SQLite; only the patient reference and insert time are stored in clear.

use std::sync::Arc;

use crate::crypto::ProfileKey;
use crate::db::{self, Database};
use crate::models::{AdherenceRecord, CaregiverAlert};
use crate::reminders::{PatientStore, ReminderError};

pub struct SqlitePatientStore {
    db: Arc<Database>,
    key: ProfileKey,
    retention: usize,
}

impl SqlitePatientStore {
    pub fn new(db: Arc<Database>, key: ProfileKey, retention: usize) -> Self {
        Self { db, key, retention }
    }

    /// Decrypted adherence log, oldest first.
    pub fn list_adherence_records(&self, patient_ref: &str) -> Result<Vec<AdherenceRecord>, ReminderError> {
        let blobs = self
            .db
            .with_conn(|conn| db::list_adherence_blobs(conn, patient_ref))?;
        let mut records = Vec::with_capacity(blobs.len());
        for blob in blobs {
            records.push(self.key.open_json(&blob)?);
        }
        Ok(records)
    }

    pub fn list_caregiver_alerts(&self, patient_ref: &str) -> Result<Vec<CaregiverAlert>, ReminderError> {
        Ok(self
            .db
            .with_conn(|conn| db::list_caregiver_alerts(conn, patient_ref))?)
    }
}

impl PatientStore for SqlitePatientStore {
    fn get_contact_info(&self, patient_ref: &str) -> Result<Option<String>, ReminderError> {
        let phone = self
            .db
            .with_conn(|conn| db::get_contact_phone(conn, patient_ref))?;
        Ok(phone.filter(|p| !p.trim().is_empty()))
    }

    fn append_adherence_record(&self, patient_ref: &str, record: &AdherenceRecord) -> Result<bool, ReminderError> {
        let payload = self.key.seal_json(record)?;
        let retention = self.retention;
        let dose_key = record.reminder_id.as_ref().map(|id| (id, record.dose_date));
        let written = self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            if !db::insert_adherence_blob(&tx, &record.id, patient_ref, dose_key, &record.taken_at, &payload)? {
                return Ok(None);
            }
            let trimmed = db::trim_adherence(&tx, patient_ref, retention)?;
            tx.commit()?;
            Ok(Some(trimmed))
        })?;

        let Some(trimmed) = written else {
            tracing::info!(
                patient_ref,
                medication = %record.medication_name,
                dose_date = %record.dose_date,
                "Adherence already recorded for this dose"
            );
            return Ok(false);
        };

        tracing::info!(
            patient_ref,
            medication = %record.medication_name,
            method = %record.method,
            dose_date = %record.dose_date,
            "Adherence recorded"
        );
        if trimmed > 0 {
            tracing::debug!(patient_ref, trimmed, "Adherence log trimmed to retention window");
        }
        Ok(true)
    }

    fn raise_caregiver_alert(&self, alert: &CaregiverAlert) -> Result<(), ReminderError> {
        self.db
            .with_conn(|conn| db::insert_caregiver_alert(conn, alert))?;
        tracing::warn!(
            patient_ref = %alert.patient_ref,
            reminder_id = %alert.reminder_id,
            medication = %alert.medication_name,
            kind = %alert.kind,
            "Caregiver alert raised"
        );
        Ok(())
    }
}
