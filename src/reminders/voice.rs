//! Inbound side of reminder and follow-up calls.
//!
//! The telephony webhook hands over the transcript; the interpreter
//! classifies it and the outcome drives the dose state machine. The reply is
//! the TwiML spoken back to the patient.

use std::sync::Arc;

use uuid::Uuid;

use super::channels::twiml::{self, CallLink};
use super::confirmation::DoseConfirmer;
use super::interpreter::SpeechInterpreter;
use super::traits::{PatientStore, ReminderStore};
use super::types::{ConfirmationOutcome, Moment};
use super::ReminderError;
use crate::config::VOICE_MAX_RETRIES;
use crate::models::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceOutcome {
    Confirmed(ConfirmationOutcome),
    /// Patient said no. `alerted` when a caregiver alert was raised.
    Declined { alerted: bool },
    /// Unclear answer with retries left; ask again with this link.
    Reprompt { next: CallLink },
    /// Unclear after the last retry; the call ends unresolved.
    Unresolved { alerted: bool },
}

#[derive(Debug, Clone)]
pub struct VoiceReply {
    pub dose: DoseReminder,
    pub link: CallLink,
    pub classification: Classification,
    pub outcome: VoiceOutcome,
}

impl VoiceReply {
    /// TwiML answering the patient's utterance.
    pub fn to_twiml(&self, public_url: &str) -> String {
        let script = self.link.script;
        match &self.outcome {
            VoiceOutcome::Confirmed(outcome) => twiml::say(confirmed_message(script, *outcome)),
            VoiceOutcome::Declined { .. } => twiml::say(match script {
                ScriptType::Reminder => {
                    "Okay. Please take your medication as soon as possible. We'll check back with you soon. Goodbye."
                }
                ScriptType::Followup => {
                    "Please take your medication as soon as you can. We'll notify your caregiver. Take care."
                }
            }),
            VoiceOutcome::Reprompt { next } => twiml::gather(
                &twiml::reprompt(&self.dose.medication_name),
                &next.callback_url(public_url),
                twiml::no_input_message(script),
            ),
            VoiceOutcome::Unresolved { .. } => twiml::say(match script {
                ScriptType::Reminder => {
                    "I didn't quite understand. If you've taken your medication, you're all set. If not, please take it soon. Goodbye."
                }
                ScriptType::Followup => {
                    "I couldn't understand your response. Please make sure to take your medication. Goodbye."
                }
            }),
        }
    }
}

fn confirmed_message(script: ScriptType, outcome: ConfirmationOutcome) -> &'static str {
    match outcome {
        ConfirmationOutcome::Recorded | ConfirmationOutcome::RecordedLate => match script {
            ScriptType::Reminder => "Wonderful! Your medication has been recorded. Have a great day!",
            ScriptType::Followup => "Thank you for confirming! Your medication has been recorded.",
        },
        ConfirmationOutcome::AlreadyTaken => "Thank you! Your medication was already recorded for today.",
        ConfirmationOutcome::Conflict
        | ConfirmationOutcome::NotYetReminded
        | ConfirmationOutcome::OutOfRange => {
            "Thank you. We could not record your answer right now. Goodbye."
        }
    }
}

/// Opening TwiML of a call, served when the provider fetches the script.
pub fn opening_twiml(dose: &DoseReminder, link: &CallLink, public_url: &str) -> String {
    twiml::gather(
        &twiml::script_prompt(link.script, &dose.medication_name, dose.dosage.as_deref()),
        &link.callback_url(public_url),
        twiml::no_input_message(link.script),
    )
}

pub struct VoiceResponseHandler {
    store: Arc<dyn ReminderStore>,
    patients: Arc<dyn PatientStore>,
    confirmer: DoseConfirmer,
    interpreter: Arc<SpeechInterpreter>,
}

impl VoiceResponseHandler {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        patients: Arc<dyn PatientStore>,
        interpreter: Arc<SpeechInterpreter>,
    ) -> Self {
        Self {
            confirmer: DoseConfirmer::new(store.clone(), patients.clone()),
            store,
            patients,
            interpreter,
        }
    }

    pub fn load_dose(&self, reminder_id: &Uuid) -> Result<DoseReminder, ReminderError> {
        self.store
            .get_reminder(reminder_id)?
            .ok_or(ReminderError::NotFound(*reminder_id))
    }

    /// Handle one transcript posted back by the telephony provider.
    pub fn handle(&self, link: CallLink, speech: &str, at: Moment) -> Result<VoiceReply, ReminderError> {
        let dose = self.load_dose(&link.reminder_id)?;
        let question = twiml::script_prompt(link.script, &dose.medication_name, dose.dosage.as_deref());
        let classification = self.interpreter.interpret(speech, &question);

        tracing::info!(
            reminder_id = %dose.id,
            script = %link.script,
            attempt = link.attempt,
            classification = %classification,
            "Voice response received"
        );

        let outcome = match classification {
            Classification::Confirmed => {
                let outcome = self.confirmer.confirm(
                    &dose.id,
                    link.script.adherence_method(),
                    Some(speech),
                    link.dose_date,
                    at,
                )?;
                VoiceOutcome::Confirmed(outcome)
            }
            Classification::Declined => {
                let alerted = self.alert_if_followup(&dose, &link, AlertKind::FollowupDeclined, speech, at)?;
                VoiceOutcome::Declined { alerted }
            }
            Classification::Unclear if link.attempt < VOICE_MAX_RETRIES => VoiceOutcome::Reprompt {
                next: link.next_attempt(),
            },
            Classification::Unclear => {
                let alerted = self.alert_if_followup(&dose, &link, AlertKind::FollowupUnresolved, speech, at)?;
                VoiceOutcome::Unresolved { alerted }
            }
        };

        Ok(VoiceReply {
            dose,
            link,
            classification,
            outcome,
        })
    }

    /// FOLLOWUP rows stay FOLLOWUP; the caregiver is told instead.
    /// Nothing is raised once today's dose is already TAKEN.
    fn alert_if_followup(
        &self,
        dose: &DoseReminder,
        link: &CallLink,
        kind: AlertKind,
        speech: &str,
        at: Moment,
    ) -> Result<bool, ReminderError> {
        if link.script != ScriptType::Followup {
            return Ok(false);
        }
        if dose.daily_status == DoseStatus::Taken && link.dose_date == at.local.date() {
            tracing::info!(reminder_id = %dose.id, kind = %kind, "Dose already taken, caregiver alert skipped");
            return Ok(false);
        }
        let speech = speech.trim();
        let alert = CaregiverAlert {
            id: Uuid::new_v4(),
            patient_ref: dose.patient_ref.clone(),
            reminder_id: dose.id,
            medication_name: dose.medication_name.clone(),
            kind,
            detail: (!speech.is_empty()).then(|| speech.to_string()),
            created_at: at.utc,
        };
        self.patients.raise_caregiver_alert(&alert)?;
        Ok(true)
    }
}
