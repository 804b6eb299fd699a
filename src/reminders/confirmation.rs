use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use super::state_machine::{next_status, DoseEvent};
use super::traits::{PatientStore, ReminderStore};
use super::types::{ConfirmationOutcome, Moment};
use super::ReminderError;
use crate::models::*;

/// Applies confirmed-taken events from any channel.
pub struct DoseConfirmer {
    store: Arc<dyn ReminderStore>,
    patients: Arc<dyn PatientStore>,
}

impl DoseConfirmer {
    pub fn new(store: Arc<dyn ReminderStore>, patients: Arc<dyn PatientStore>) -> Self {
        Self { store, patients }
    }

    /// Record that the dose of `dose_date` was taken.
    ///
    /// Same-day confirmations move REMINDED/FOLLOWUP to TAKEN with a single
    /// compare-and-swap; the adherence record is written only by the winner.
    /// If that write fails the status is swapped back so a retry can succeed.
    /// A confirmation for yesterday (arriving after the midnight reset) is
    /// recorded once without touching today's status. Older or future dates
    /// are refused.
    pub fn confirm(
        &self,
        reminder_id: &Uuid,
        method: AdherenceMethod,
        speech_text: Option<&str>,
        dose_date: NaiveDate,
        at: Moment,
    ) -> Result<ConfirmationOutcome, ReminderError> {
        let dose = self
            .store
            .get_reminder(reminder_id)?
            .ok_or(ReminderError::NotFound(*reminder_id))?;

        let today = at.local.date();
        if dose_date > today || dose_date < dose.created_at.date() {
            tracing::info!(reminder_id = %dose.id, %dose_date, "Confirmation outside the dose's range");
            return Ok(ConfirmationOutcome::OutOfRange);
        }

        if dose_date < today {
            if Some(dose_date) != today.pred_opt() {
                tracing::info!(reminder_id = %dose.id, %dose_date, "Late confirmation too old to record");
                return Ok(ConfirmationOutcome::OutOfRange);
            }
            if !self.append_record(&dose, method, speech_text, dose_date, at)? {
                return Ok(ConfirmationOutcome::AlreadyTaken);
            }
            tracing::info!(
                reminder_id = %dose.id,
                dose_date = %dose_date,
                "Late confirmation recorded after daily reset"
            );
            return Ok(ConfirmationOutcome::RecordedLate);
        }

        let from = dose.daily_status;
        let Some(to) = next_status(from, DoseEvent::ConfirmedTaken) else {
            return Ok(match from {
                DoseStatus::Taken => ConfirmationOutcome::AlreadyTaken,
                _ => ConfirmationOutcome::NotYetReminded,
            });
        };

        if !self.store.transition_status(&dose.id, from, to, None)? {
            tracing::info!(reminder_id = %dose.id, %from, "Confirmation lost to a concurrent transition");
            return Ok(ConfirmationOutcome::Conflict);
        }

        match self.append_record(&dose, method, speech_text, dose_date, at) {
            Ok(true) => Ok(ConfirmationOutcome::Recorded),
            Ok(false) => Ok(ConfirmationOutcome::AlreadyTaken),
            Err(e) => {
                tracing::error!(reminder_id = %dose.id, error = %e, "Adherence write failed, restoring status");
                match self.store.transition_status(&dose.id, to, from, None) {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!(reminder_id = %dose.id, %from, "Status moved on before it could be restored")
                    }
                    Err(restore) => {
                        tracing::error!(reminder_id = %dose.id, error = %restore, "Status restore failed")
                    }
                }
                Err(e)
            }
        }
    }

    fn append_record(
        &self,
        dose: &DoseReminder,
        method: AdherenceMethod,
        speech_text: Option<&str>,
        dose_date: NaiveDate,
        at: Moment,
    ) -> Result<bool, ReminderError> {
        let record = AdherenceRecord {
            id: Uuid::new_v4(),
            reminder_id: Some(dose.id),
            medication_name: dose.medication_name.clone(),
            scheduled_time: format_clock(dose.scheduled_time),
            taken_at: at.utc,
            dose_date,
            method,
            speech_text: speech_text.map(str::to_string),
        };
        self.patients.append_adherence_record(&dose.patient_ref, &record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::scheduler::ReminderTicker;
    use crate::reminders::testing::*;

    fn confirmer(h: &Harness) -> DoseConfirmer {
        DoseConfirmer::new(h.store.clone(), h.patients.clone())
    }

    fn ticker(h: &Harness) -> ReminderTicker {
        ReminderTicker::new(h.store.clone(), h.patients.clone(), h.push.clone(), h.voice.clone(), "https://dw.example")
    }

    #[test]
    fn reminded_dose_confirms_once() {
        let h = Harness::new();
        let dose = h.add_dose("p-1", "Donepezil", 9, 0, None);
        ticker(&h).tick(day_at(9, 0)).unwrap();

        let c = confirmer(&h);
        let first = c
            .confirm(&dose.id, AdherenceMethod::PushSelfReport, None, day(), Moment::at(day_at(9, 2)))
            .unwrap();
        assert_eq!(first, ConfirmationOutcome::Recorded);
        assert_eq!(h.status(&dose.id), DoseStatus::Taken);

        let second = c
            .confirm(&dose.id, AdherenceMethod::PushSelfReport, None, day(), Moment::at(day_at(9, 3)))
            .unwrap();
        assert_eq!(second, ConfirmationOutcome::AlreadyTaken);

        let records = h.adherence("p-1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].method, AdherenceMethod::PushSelfReport);
        assert_eq!(records[0].scheduled_time, "09:00");
        assert_eq!(records[0].taken_at, day_at(9, 2));
    }

    #[test]
    fn taken_stops_followup() {
        let h = Harness::new();
        let dose = h.add_dose("p-1", "Donepezil", 9, 0, Some("+15550100"));
        let ticker = ticker(&h);
        ticker.tick(day_at(9, 0)).unwrap();
        confirmer(&h)
            .confirm(&dose.id, AdherenceMethod::PhoneReminder, Some("yes"), day(), Moment::at(day_at(9, 1)))
            .unwrap();

        assert!(ticker.tick(day_at(9, 10)).unwrap().is_idle());
        assert_eq!(h.voice.calls().len(), 1);
    }

    #[test]
    fn pending_dose_is_not_confirmed() {
        let h = Harness::new();
        let dose = h.add_dose("p-1", "Donepezil", 9, 0, None);
        let outcome = confirmer(&h)
            .confirm(&dose.id, AdherenceMethod::ManualEntry, None, day(), Moment::at(day_at(8, 0)))
            .unwrap();
        assert_eq!(outcome, ConfirmationOutcome::NotYetReminded);
        assert_eq!(h.status(&dose.id), DoseStatus::Pending);
        assert!(h.adherence("p-1").is_empty());
    }

    #[test]
    fn confirm_racing_followup_has_one_winner() {
        let h = Harness::new();
        let dose = h.add_dose("p-1", "Donepezil", 9, 0, None);
        ticker(&h).tick(day_at(9, 0)).unwrap();

        // Follow-up wins: the row moves to FOLLOWUP between the confirmer's
        // read and its write. Simulated with a store that advances the row
        // right after it is read.
        struct RacingStore {
            inner: Arc<crate::reminders::store::SqliteReminderStore>,
        }
        impl ReminderStore for RacingStore {
            fn list_due_for_reminder(&self, now: chrono::NaiveTime) -> Result<Vec<DoseReminder>, crate::db::DatabaseError> {
                self.inner.list_due_for_reminder(now)
            }
            fn list_due_for_followup(&self, now: chrono::NaiveTime) -> Result<Vec<DoseReminder>, crate::db::DatabaseError> {
                self.inner.list_due_for_followup(now)
            }
            fn transition_status(
                &self,
                id: &Uuid,
                from: DoseStatus,
                to: DoseStatus,
                notified_at: Option<chrono::NaiveDateTime>,
            ) -> Result<bool, crate::db::DatabaseError> {
                self.inner.transition_status(id, from, to, notified_at)
            }
            fn reset_all_to_pending(&self, day: NaiveDate) -> Result<usize, crate::db::DatabaseError> {
                self.inner.reset_all_to_pending(day)
            }
            fn last_reset_date(&self) -> Result<Option<NaiveDate>, crate::db::DatabaseError> {
                self.inner.last_reset_date()
            }
            fn mark_reset(&self, day: NaiveDate) -> Result<(), crate::db::DatabaseError> {
                self.inner.mark_reset(day)
            }
            fn get_reminder(&self, id: &Uuid) -> Result<Option<DoseReminder>, crate::db::DatabaseError> {
                let dose = self.inner.get_reminder(id)?;
                self.inner
                    .transition_status(id, DoseStatus::Reminded, DoseStatus::Followup, None)?;
                Ok(dose)
            }
        }

        let racing = DoseConfirmer::new(Arc::new(RacingStore { inner: h.store.clone() }), h.patients.clone());
        let outcome = racing
            .confirm(&dose.id, AdherenceMethod::PushSelfReport, None, day(), Moment::at(day_at(9, 10)))
            .unwrap();
        assert_eq!(outcome, ConfirmationOutcome::Conflict);
        assert_eq!(h.status(&dose.id), DoseStatus::Followup);
        assert!(h.adherence("p-1").is_empty());
    }

    #[test]
    fn concurrent_confirmations_record_once() {
        let h = Harness::new();
        let dose = h.add_dose("p-1", "Donepezil", 9, 0, None);
        ticker(&h).tick(day_at(9, 0)).unwrap();
        let c = confirmer(&h);

        let outcomes: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        c.confirm(&dose.id, AdherenceMethod::PushSelfReport, None, day(), Moment::at(day_at(9, 5)))
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let recorded = outcomes.iter().filter(|o| **o == ConfirmationOutcome::Recorded).count();
        assert_eq!(recorded, 1);
        assert_eq!(h.adherence("p-1").len(), 1);
    }

    #[test]
    fn late_confirmation_after_reset_is_recorded() {
        let h = Harness::new();
        let dose = h.add_dose("p-1", "Donepezil", 23, 50, None);
        ticker(&h).tick(day_at(23, 50)).unwrap();
        h.store.reset_all_to_pending(day().succ_opt().unwrap()).unwrap();

        let after_midnight = day().succ_opt().unwrap().and_hms_opt(0, 2, 0).unwrap();
        let outcome = confirmer(&h)
            .confirm(&dose.id, AdherenceMethod::PhoneFollowup, Some("yes"), day(), Moment::at(after_midnight))
            .unwrap();
        assert_eq!(outcome, ConfirmationOutcome::RecordedLate);
        // Today's dose is untouched
        assert_eq!(h.status(&dose.id), DoseStatus::Pending);
        let records = h.adherence("p-1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].dose_date, day());
    }

    #[test]
    fn repeated_late_confirmation_is_recorded_once() {
        let h = Harness::new();
        let dose = h.add_dose("p-1", "Donepezil", 21, 0, None);
        let next_morning = Moment::at(day().succ_opt().unwrap().and_hms_opt(8, 0, 0).unwrap());
        let c = confirmer(&h);

        let outcomes: Vec<_> = (0..5)
            .map(|_| c.confirm(&dose.id, AdherenceMethod::ManualEntry, None, day(), next_morning).unwrap())
            .collect();
        assert_eq!(outcomes[0], ConfirmationOutcome::RecordedLate);
        assert!(outcomes[1..].iter().all(|o| *o == ConfirmationOutcome::AlreadyTaken));
        assert_eq!(h.adherence("p-1").len(), 1);
    }

    #[test]
    fn dates_outside_yesterday_and_today_are_refused() {
        let h = Harness::new();
        let dose = h.add_dose("p-1", "Donepezil", 21, 0, None);
        let c = confirmer(&h);
        let two_days_later = Moment::at(day().succ_opt().unwrap().succ_opt().unwrap().and_hms_opt(8, 0, 0).unwrap());

        let ancient = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        for (dose_date, at) in [
            (ancient, Moment::at(day_at(22, 0))),
            (day(), two_days_later),
            (day().succ_opt().unwrap(), Moment::at(day_at(22, 0))),
            // The dose did not exist the day before it was created
            (day().pred_opt().unwrap(), Moment::at(day_at(22, 0))),
        ] {
            let outcome = c.confirm(&dose.id, AdherenceMethod::ManualEntry, None, dose_date, at).unwrap();
            assert_eq!(outcome, ConfirmationOutcome::OutOfRange, "{dose_date}");
        }
        assert!(h.adherence("p-1").is_empty());
    }

    #[test]
    fn failed_record_write_restores_status() {
        let h = Harness::new();
        let dose = h.add_dose("p-1", "Donepezil", 9, 0, None);
        ticker(&h).tick(day_at(9, 0)).unwrap();

        let broken = DoseConfirmer::new(h.store.clone(), Arc::new(ReadOnlyPatients(h.patients.clone())));
        let err = broken.confirm(&dose.id, AdherenceMethod::PushSelfReport, None, day(), Moment::at(day_at(9, 2)));
        assert!(err.is_err());
        assert_eq!(h.status(&dose.id), DoseStatus::Reminded);
        assert!(h.adherence("p-1").is_empty());

        let retry = confirmer(&h)
            .confirm(&dose.id, AdherenceMethod::PushSelfReport, None, day(), Moment::at(day_at(9, 3)))
            .unwrap();
        assert_eq!(retry, ConfirmationOutcome::Recorded);
        assert_eq!(h.status(&dose.id), DoseStatus::Taken);
        assert_eq!(h.adherence("p-1").len(), 1);
    }

    #[test]
    fn unknown_reminder_is_not_found() {
        let h = Harness::new();
        let err = confirmer(&h)
            .confirm(&Uuid::new_v4(), AdherenceMethod::ManualEntry, None, day(), Moment::at(day_at(9, 0)))
            .unwrap_err();
        assert!(matches!(err, ReminderError::NotFound(_)));
    }
}
