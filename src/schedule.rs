//! Medication schedule management.
//!
//! A saved schedule becomes one dose row per distinct time of day. Every
//! write here lands in the store before the next tick reads it, so a
//! deactivation at 08:59 suppresses the 09:00 reminder.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::db::{self, Database};
use crate::models::*;
use crate::reminders::ReminderError;

pub struct ScheduleService {
    db: Arc<Database>,
}

impl ScheduleService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Make the patient's rows for this medication match the schedule, one
    /// per time. Times already scheduled keep their row and today's status.
    pub fn save_schedule(&self, schedule: &DoseSchedule, now: NaiveDateTime) -> Result<Vec<DoseReminder>, ReminderError> {
        let patient_ref = schedule.patient_ref.trim();
        let medication = schedule.medication_name.trim();
        if patient_ref.is_empty() {
            return Err(ReminderError::InvalidSchedule("patient_ref is required".into()));
        }
        if medication.is_empty() {
            return Err(ReminderError::InvalidSchedule("medication_name is required".into()));
        }
        let times = parse_times(&schedule.times)?;
        let dosage = schedule
            .dosage
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        let doses = self.db.with_conn(|conn| {
            db::ensure_patient(conn, patient_ref)?;
            let phone = db::get_contact_phone(conn, patient_ref)?;
            db::sync_reminders_for_medication(
                conn,
                patient_ref,
                medication,
                dosage.as_deref(),
                phone.as_deref(),
                &times,
                now,
            )
        })?;

        tracing::info!(
            patient_ref,
            medication,
            doses = doses.len(),
            "Medication schedule saved"
        );
        Ok(doses)
    }

    pub fn delete_medication(&self, patient_ref: &str, medication_name: &str) -> Result<usize, ReminderError> {
        let removed = self
            .db
            .with_conn(|conn| db::delete_reminders_for_medication(conn, patient_ref, medication_name))?;
        tracing::info!(patient_ref, medication = medication_name, removed, "Medication deleted");
        Ok(removed)
    }

    pub fn set_active(&self, reminder_id: &Uuid, active: bool) -> Result<(), ReminderError> {
        let changed = self
            .db
            .with_conn(|conn| db::set_reminder_active(conn, reminder_id, active))?;
        if !changed {
            return Err(ReminderError::NotFound(*reminder_id));
        }
        tracing::info!(reminder_id = %reminder_id, active, "Dose activation changed");
        Ok(())
    }

    /// Move one dose to a new time of day. Refused when the same medication
    /// already has a dose at that time.
    pub fn retime(&self, reminder_id: &Uuid, time: NaiveTime) -> Result<DoseReminder, ReminderError> {
        let time = truncate_to_minute(time);
        let dose = self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let Some(dose) = db::get_reminder(&tx, reminder_id)? else {
                return Ok(None);
            };
            let siblings = db::list_reminders_for_medication(&tx, &dose.patient_ref, &dose.medication_name)?;
            if siblings.iter().any(|d| d.id != dose.id && d.scheduled_time == time) {
                return Ok(Some(Err(format_clock(time))));
            }
            db::retime_reminder(&tx, reminder_id, time)?;
            let moved = db::get_reminder(&tx, reminder_id)?;
            tx.commit()?;
            Ok(moved.map(Ok))
        })?;

        match dose {
            None => Err(ReminderError::NotFound(*reminder_id)),
            Some(Err(clock)) => Err(ReminderError::InvalidSchedule(format!(
                "medication already has a dose at {clock}"
            ))),
            Some(Ok(dose)) => {
                tracing::info!(
                    reminder_id = %dose.id,
                    scheduled = %format_clock(dose.scheduled_time),
                    followup = %format_clock(dose.followup_time),
                    "Dose retimed"
                );
                Ok(dose)
            }
        }
    }

    /// Store the patient's phone and copy it onto all of their dose rows.
    pub fn update_contact_phone(&self, patient_ref: &str, phone: Option<&str>) -> Result<usize, ReminderError> {
        let phone = phone.map(str::trim).filter(|p| !p.is_empty());
        let updated = self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            db::upsert_patient(&tx, patient_ref, phone)?;
            let updated = db::update_contact_phone_for_patient(&tx, patient_ref, phone)?;
            tx.commit()?;
            Ok(updated)
        })?;
        tracing::info!(patient_ref, updated, has_phone = phone.is_some(), "Contact phone updated");
        Ok(updated)
    }

    pub fn list_for_patient(&self, patient_ref: &str) -> Result<Vec<DoseReminder>, ReminderError> {
        Ok(self
            .db
            .with_conn(|conn| db::list_reminders_for_patient(conn, patient_ref))?)
    }
}

/// Parse and dedupe clock times ("HH:MM"), sorted.
fn parse_times(raw: &[String]) -> Result<Vec<NaiveTime>, ReminderError> {
    if raw.is_empty() {
        return Err(ReminderError::InvalidSchedule("at least one time is required".into()));
    }
    let mut times = BTreeSet::new();
    for value in raw {
        let time = parse_clock(value)
            .ok_or_else(|| ReminderError::InvalidSchedule(format!("invalid time: {value}")))?;
        times.insert(time);
    }
    Ok(times.into_iter().collect())
}
