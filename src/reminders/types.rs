use chrono::{Local, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::models::DoseReminder;

/// A point in time as both the local wall clock (scheduling, daily
/// boundaries) and UTC (adherence timestamps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Moment {
    pub local: NaiveDateTime,
    pub utc: NaiveDateTime,
}

impl Moment {
    pub fn now() -> Self {
        Self {
            local: Local::now().naive_local(),
            utc: Utc::now().naive_utc(),
        }
    }

    /// Same instant on both clocks. Used where the offset is irrelevant.
    pub fn at(local: NaiveDateTime) -> Self {
        Self { local, utc: local }
    }
}

/// Notification payload forwarded to the push gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub tag: String,
    pub require_interaction: bool,
    pub data: serde_json::Value,
}

impl PushMessage {
    pub fn medication_alarm(dose: &DoseReminder) -> Self {
        Self {
            title: "MEDICATION TIME".into(),
            body: format!("Time to take: {}", dose.medication_name),
            tag: "medication-alarm".into(),
            require_interaction: true,
            data: json!({
                "reminderId": dose.id,
                "medication": dose.medication_name,
                "kind": "reminder",
            }),
        }
    }

    pub fn followup_nudge(dose: &DoseReminder) -> Self {
        Self {
            title: "MEDICATION CHECK".into(),
            body: format!("Did you take your {}?", dose.medication_name),
            tag: "medication-alarm".into(),
            require_interaction: true,
            data: json!({
                "reminderId": dose.id,
                "medication": dose.medication_name,
                "kind": "followup",
            }),
        }
    }
}

/// Per-send push result across all of a patient's subscriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Subscriptions the gateway reported gone; deactivated, not failures.
    pub expired: usize,
    pub failed: usize,
}

/// What happened to one due row during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Status advanced; `channel_failures` counts push/voice sends that failed.
    Notified { channel_failures: usize },
    /// Another writer moved the row first.
    Conflict,
    /// Follow-up guard rejected the row (no prior notification in window).
    OutsideWindow,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub reminders_sent: usize,
    pub followups_sent: usize,
    pub conflicts: usize,
    pub skipped: usize,
    pub channel_failures: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of a confirmed-taken event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    /// Status moved to TAKEN and an adherence record was appended.
    Recorded,
    /// Confirmation for a previous day; record appended, status untouched.
    RecordedLate,
    AlreadyTaken,
    /// Lost the compare-and-swap to a concurrent transition.
    Conflict,
    /// Dose has not been reminded yet today.
    NotYetReminded,
    /// Dose date is before yesterday, in the future, or before the dose existed.
    OutOfRange,
}

impl ConfirmationOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, Self::Recorded | Self::RecordedLate)
    }
}
