//! Shared fakes for reminder-core tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use super::channels::ChannelError;
use super::traits::*;
use super::types::*;
use super::ReminderError;
use crate::crypto::ProfileKey;
use crate::db::{self, Database, DatabaseError};
use crate::models::*;
use crate::patients::SqlitePatientStore;
use crate::reminders::store::SqliteReminderStore;

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

pub fn day_at(h: u32, m: u32) -> NaiveDateTime {
    day().and_hms_opt(h, m, 0).unwrap()
}

#[derive(Default)]
pub struct RecordingPush {
    messages: Mutex<Vec<(String, PushMessage)>>,
}

impl RecordingPush {
    pub fn messages(&self) -> Vec<(String, PushMessage)> {
        self.messages.lock().unwrap().clone()
    }
}

impl PushChannel for RecordingPush {
    fn send(&self, patient_ref: &str, message: &PushMessage) -> Result<DeliveryReport, ChannelError> {
        self.messages
            .lock()
            .unwrap()
            .push((patient_ref.to_string(), message.clone()));
        Ok(DeliveryReport {
            delivered: 1,
            ..Default::default()
        })
    }
}

/// Records successful calls; numbers registered with `fail_for` are refused.
#[derive(Default)]
pub struct RecordingVoice {
    calls: Mutex<Vec<(String, ScriptType, String)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingVoice {
    pub fn calls(&self) -> Vec<(String, ScriptType, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn fail_for(&self, phone: &str) {
        self.failing.lock().unwrap().insert(phone.to_string());
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }
}

impl VoiceChannel for RecordingVoice {
    fn place_call(&self, phone: &str, script: ScriptType, callback_url: &str) -> Result<String, ChannelError> {
        if self.failing.lock().unwrap().contains(phone) {
            return Err(ChannelError::Rejected {
                status: 503,
                body: "carrier unavailable".into(),
            });
        }
        let mut calls = self.calls.lock().unwrap();
        calls.push((phone.to_string(), script, callback_url.to_string()));
        Ok(format!("CA{:04}", calls.len()))
    }
}

/// Store whose every call fails, as if the database were unreachable.
pub struct FailingStore;

impl ReminderStore for FailingStore {
    fn list_due_for_reminder(&self, _now: NaiveTime) -> Result<Vec<DoseReminder>, DatabaseError> {
        Err(DatabaseError::LockPoisoned)
    }

    fn list_due_for_followup(&self, _now: NaiveTime) -> Result<Vec<DoseReminder>, DatabaseError> {
        Err(DatabaseError::LockPoisoned)
    }

    fn transition_status(
        &self,
        _id: &Uuid,
        _from: DoseStatus,
        _to: DoseStatus,
        _notified_at: Option<NaiveDateTime>,
    ) -> Result<bool, DatabaseError> {
        Err(DatabaseError::LockPoisoned)
    }

    fn reset_all_to_pending(&self, _day: NaiveDate) -> Result<usize, DatabaseError> {
        Err(DatabaseError::LockPoisoned)
    }

    fn last_reset_date(&self) -> Result<Option<NaiveDate>, DatabaseError> {
        Err(DatabaseError::LockPoisoned)
    }

    fn mark_reset(&self, _day: NaiveDate) -> Result<(), DatabaseError> {
        Err(DatabaseError::LockPoisoned)
    }

    fn get_reminder(&self, _id: &Uuid) -> Result<Option<DoseReminder>, DatabaseError> {
        Err(DatabaseError::LockPoisoned)
    }
}

/// Patient store that cannot write adherence; everything else is delegated.
pub struct ReadOnlyPatients(pub Arc<SqlitePatientStore>);

impl PatientStore for ReadOnlyPatients {
    fn get_contact_info(&self, patient_ref: &str) -> Result<Option<String>, ReminderError> {
        self.0.get_contact_info(patient_ref)
    }

    fn append_adherence_record(&self, _patient_ref: &str, _record: &AdherenceRecord) -> Result<bool, ReminderError> {
        Err(DatabaseError::LockPoisoned.into())
    }

    fn raise_caregiver_alert(&self, alert: &CaregiverAlert) -> Result<(), ReminderError> {
        self.0.raise_caregiver_alert(alert)
    }
}

/// In-memory database wired to the SQLite stores and recording channels.
pub struct Harness {
    pub db: Arc<Database>,
    pub store: Arc<SqliteReminderStore>,
    pub patients: Arc<SqlitePatientStore>,
    pub push: Arc<RecordingPush>,
    pub voice: Arc<RecordingVoice>,
}

impl Harness {
    pub fn new() -> Self {
        let db = Arc::new(Database::in_memory().unwrap());
        Self {
            store: Arc::new(SqliteReminderStore::new(db.clone())),
            patients: Arc::new(SqlitePatientStore::new(
                db.clone(),
                ProfileKey::from_bytes([3u8; 32]),
                270,
            )),
            push: Arc::new(RecordingPush::default()),
            voice: Arc::new(RecordingVoice::default()),
            db,
        }
    }

    pub fn add_dose(&self, patient: &str, medication: &str, h: u32, m: u32, phone: Option<&str>) -> DoseReminder {
        let dose = DoseReminder::new(
            patient,
            medication,
            Some("10mg".into()),
            NaiveTime::from_hms_opt(h, m, 0).unwrap(),
            phone.map(str::to_string),
            day_at(0, 0),
        );
        self.db.with_conn(|conn| db::insert_reminder(conn, &dose)).unwrap();
        dose
    }

    pub fn status(&self, id: &Uuid) -> DoseStatus {
        self.store.get_reminder(id).unwrap().unwrap().daily_status
    }

    pub fn deactivate(&self, id: &Uuid) {
        self.db
            .with_conn(|conn| db::set_reminder_active(conn, id, false))
            .unwrap();
    }

    pub fn set_patient_phone(&self, patient: &str, phone: &str) {
        self.db
            .with_conn(|conn| db::upsert_patient(conn, patient, Some(phone)))
            .unwrap();
    }

    pub fn adherence(&self, patient: &str) -> Vec<AdherenceRecord> {
        self.patients.list_adherence_records(patient).unwrap()
    }

    pub fn alerts(&self, patient: &str) -> Vec<CaregiverAlert> {
        self.patients.list_caregiver_alerts(patient).unwrap()
    }
}
