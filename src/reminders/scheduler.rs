//! Tick-and-scan scheduler.
//!
//! Each tick lists the rows due at the current hour:minute and dispatches
//! them. A row is claimed with a compare-and-swap before any channel is
//! touched, so a second tick in the same minute finds nothing to do.

use std::sync::Arc;

use chrono::NaiveDateTime;

use super::channels::{redact_phone, twiml::CallLink, ChannelError};
use super::state_machine::{followup_window_open, next_status, DoseEvent};
use super::traits::*;
use super::types::*;
use super::ReminderError;
use crate::db::DatabaseError;
use crate::models::*;

/// Rows dispatched concurrently within one tick.
const MAX_PARALLEL_DISPATCH: usize = 16;

pub struct ReminderTicker {
    store: Arc<dyn ReminderStore>,
    patients: Arc<dyn PatientStore>,
    push: Arc<dyn PushChannel>,
    voice: Arc<dyn VoiceChannel>,
    public_url: String,
}

impl ReminderTicker {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        patients: Arc<dyn PatientStore>,
        push: Arc<dyn PushChannel>,
        voice: Arc<dyn VoiceChannel>,
        public_url: &str,
    ) -> Self {
        Self {
            store,
            patients,
            push,
            voice,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Run one scan at local time `now`.
    ///
    /// Fails only if the store is unavailable; channel failures are logged
    /// and counted in the report.
    pub fn tick(&self, now: NaiveDateTime) -> Result<TickReport, ReminderError> {
        let clock = truncate_to_minute(now.time());
        let due_reminders = self.store.list_due_for_reminder(clock)?;
        let due_followups = self.store.list_due_for_followup(clock)?;

        let mut report = TickReport::default();
        if due_reminders.is_empty() && due_followups.is_empty() {
            return Ok(report);
        }

        tracing::debug!(
            reminders = due_reminders.len(),
            followups = due_followups.len(),
            at = %format_clock(clock),
            "Dispatching due doses"
        );

        let jobs: Vec<(ScriptType, DoseReminder)> = due_reminders
            .into_iter()
            .map(|d| (ScriptType::Reminder, d))
            .chain(due_followups.into_iter().map(|d| (ScriptType::Followup, d)))
            .collect();

        let mut store_error = None;
        for chunk in jobs.chunks(MAX_PARALLEL_DISPATCH) {
            let results: Vec<(ScriptType, Result<DispatchOutcome, DatabaseError>)> =
                std::thread::scope(|scope| {
                    let handles: Vec<_> = chunk
                        .iter()
                        .map(|(script, dose)| {
                            let script = *script;
                            let handle = scope.spawn(move || self.dispatch(script, dose, now));
                            (script, dose.id, handle)
                        })
                        .collect();
                    handles
                        .into_iter()
                        .filter_map(|(script, reminder_id, handle)| match handle.join() {
                            Ok(result) => Some((script, result)),
                            Err(_) => {
                                tracing::error!(%reminder_id, %script, "Dispatch thread panicked");
                                None
                            }
                        })
                        .collect()
                });

            for (script, result) in results {
                match result {
                    Ok(DispatchOutcome::Notified { channel_failures }) => {
                        match script {
                            ScriptType::Reminder => report.reminders_sent += 1,
                            ScriptType::Followup => report.followups_sent += 1,
                        }
                        report.channel_failures += channel_failures;
                    }
                    Ok(DispatchOutcome::Conflict) => report.conflicts += 1,
                    Ok(DispatchOutcome::OutsideWindow) => report.skipped += 1,
                    Err(e) => store_error = Some(e),
                }
            }
            // Remaining chunks wait for the next tick
            if store_error.is_some() {
                break;
            }
        }

        if let Some(e) = store_error {
            tracing::error!(error = %e, "Reminder store failed during tick");
            return Err(e.into());
        }

        tracing::info!(
            reminders = report.reminders_sent,
            followups = report.followups_sent,
            conflicts = report.conflicts,
            skipped = report.skipped,
            channel_failures = report.channel_failures,
            "Tick complete"
        );
        Ok(report)
    }

    fn dispatch(
        &self,
        script: ScriptType,
        dose: &DoseReminder,
        now: NaiveDateTime,
    ) -> Result<DispatchOutcome, DatabaseError> {
        let (from, event) = match script {
            ScriptType::Reminder => (DoseStatus::Pending, DoseEvent::ReminderDue),
            ScriptType::Followup => (DoseStatus::Reminded, DoseEvent::FollowupDue),
        };

        if script == ScriptType::Followup && !followup_window_open(dose.last_notified_at, now) {
            tracing::debug!(
                reminder_id = %dose.id,
                last_notified_at = ?dose.last_notified_at,
                "Follow-up skipped: last notification outside window"
            );
            return Ok(DispatchOutcome::OutsideWindow);
        }

        let Some(to) = next_status(from, event) else {
            return Ok(DispatchOutcome::Conflict);
        };
        if !self.store.transition_status(&dose.id, from, to, Some(now))? {
            tracing::debug!(reminder_id = %dose.id, %from, %to, "Transition lost to a concurrent writer");
            return Ok(DispatchOutcome::Conflict);
        }

        tracing::info!(
            reminder_id = %dose.id,
            patient_ref = %dose.patient_ref,
            medication = %dose.medication_name,
            %from,
            %to,
            "Dose notified"
        );

        let mut channel_failures = 0;

        let message = match script {
            ScriptType::Reminder => PushMessage::medication_alarm(dose),
            ScriptType::Followup => PushMessage::followup_nudge(dose),
        };
        match self.push.send(&dose.patient_ref, &message) {
            Ok(report) => {
                tracing::debug!(
                    reminder_id = %dose.id,
                    delivered = report.delivered,
                    expired = report.expired,
                    failed = report.failed,
                    "Push sent"
                );
            }
            Err(e) => channel_failures += log_channel_failure(dose, "push", &e),
        }

        match self.resolve_phone(dose) {
            Some(phone) => {
                let link = CallLink {
                    reminder_id: dose.id,
                    script,
                    dose_date: now.date(),
                    attempt: 0,
                };
                let url = link.script_url(&self.public_url);
                if let Err(e) = self.voice.place_call(&phone, script, &url) {
                    tracing::debug!(phone = %redact_phone(&phone), "Call not placed");
                    channel_failures += log_channel_failure(dose, "voice", &e);
                }
            }
            None => {
                tracing::debug!(reminder_id = %dose.id, "No contact phone, push only");
            }
        }

        Ok(DispatchOutcome::Notified { channel_failures })
    }

    /// Phone cached on the row, else the patient's number on file.
    fn resolve_phone(&self, dose: &DoseReminder) -> Option<String> {
        if dose.has_phone() {
            return dose.contact_phone.clone();
        }
        match self.patients.get_contact_info(&dose.patient_ref) {
            Ok(phone) => phone,
            Err(e) => {
                tracing::warn!(patient_ref = %dose.patient_ref, error = %e, "Contact lookup failed");
                None
            }
        }
    }
}

/// Returns the failure count to add (disabled channels do not count).
fn log_channel_failure(dose: &DoseReminder, channel: &str, error: &ChannelError) -> usize {
    if error.is_not_configured() {
        tracing::debug!(reminder_id = %dose.id, channel, "Channel disabled");
        return 0;
    }
    tracing::warn!(reminder_id = %dose.id, channel, error = %error, "Channel send failed");
    1
}
