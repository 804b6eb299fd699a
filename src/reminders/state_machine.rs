//! Dose lifecycle: PENDING → REMINDED → FOLLOWUP → TAKEN, reset nightly.
//!
//! Pure transition rules. Persistence goes through
//! [`ReminderStore::transition_status`](super::traits::ReminderStore), which
//! applies a rule only if the row is still in the expected prior status.

use chrono::{Duration, NaiveDateTime};

use crate::config::FOLLOWUP_OFFSET_MINUTES;
use crate::models::DoseStatus;

/// Slack on either side of the follow-up offset, absorbing tick jitter.
const FOLLOWUP_WINDOW_SLACK_MINUTES: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseEvent {
    ReminderDue,
    FollowupDue,
    ConfirmedTaken,
    MidnightReset,
}

/// Target status for `event` from `from`, or `None` if the event does not
/// apply in that status.
pub fn next_status(from: DoseStatus, event: DoseEvent) -> Option<DoseStatus> {
    use DoseEvent::*;
    use DoseStatus::*;

    match (from, event) {
        (_, MidnightReset) => Some(Pending),
        (Pending, ReminderDue) => Some(Reminded),
        (Reminded, FollowupDue) => Some(Followup),
        (Reminded | Followup, ConfirmedTaken) => Some(Taken),
        _ => None,
    }
}

pub fn can_transition(from: DoseStatus, to: DoseStatus) -> bool {
    [
        DoseEvent::ReminderDue,
        DoseEvent::FollowupDue,
        DoseEvent::ConfirmedTaken,
        DoseEvent::MidnightReset,
    ]
    .into_iter()
    .any(|event| next_status(from, event) == Some(to))
}

/// REMINDED → FOLLOWUP guard: the last notification must lie roughly one
/// follow-up offset before `now`.
pub fn followup_window_open(last_notified_at: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    let Some(notified) = last_notified_at else {
        return false;
    };
    let elapsed = now - notified;
    let offset = Duration::minutes(FOLLOWUP_OFFSET_MINUTES);
    let slack = Duration::minutes(FOLLOWUP_WINDOW_SLACK_MINUTES);
    elapsed >= offset - slack && elapsed <= offset + slack
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use DoseStatus::*;

    const ALL: [DoseStatus; 4] = [Pending, Reminded, Followup, Taken];
    const TIME_EVENTS: [DoseEvent; 2] = [DoseEvent::ReminderDue, DoseEvent::FollowupDue];

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap().and_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn happy_path() {
        assert_eq!(next_status(Pending, DoseEvent::ReminderDue), Some(Reminded));
        assert_eq!(next_status(Reminded, DoseEvent::FollowupDue), Some(Followup));
        assert_eq!(next_status(Followup, DoseEvent::ConfirmedTaken), Some(Taken));
    }

    #[test]
    fn pending_never_jumps_to_followup() {
        assert!(!can_transition(Pending, Followup));
        assert_eq!(next_status(Pending, DoseEvent::FollowupDue), None);
    }

    #[test]
    fn followup_never_returns_to_reminded() {
        assert!(!can_transition(Followup, Reminded));
        for event in TIME_EVENTS {
            assert_ne!(next_status(Followup, event), Some(Reminded));
        }
    }

    #[test]
    fn time_events_never_move_backwards() {
        // Any sequence of ticks only advances along the chain
        let rank = |s: DoseStatus| ALL.iter().position(|x| *x == s).unwrap();
        for from in ALL {
            for event in TIME_EVENTS {
                if let Some(to) = next_status(from, event) {
                    assert!(rank(to) > rank(from), "{from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn taken_is_terminal_until_reset() {
        for event in [DoseEvent::ReminderDue, DoseEvent::FollowupDue, DoseEvent::ConfirmedTaken] {
            assert_eq!(next_status(Taken, event), None);
        }
        assert_eq!(next_status(Taken, DoseEvent::MidnightReset), Some(Pending));
    }

    #[test]
    fn reset_applies_from_every_status() {
        for from in ALL {
            assert_eq!(next_status(from, DoseEvent::MidnightReset), Some(Pending));
        }
    }

    #[test]
    fn confirmation_needs_a_prior_reminder() {
        assert_eq!(next_status(Pending, DoseEvent::ConfirmedTaken), None);
        assert_eq!(next_status(Reminded, DoseEvent::ConfirmedTaken), Some(Taken));
    }

    #[test]
    fn followup_window_bounds() {
        let notified = Some(at(9, 0));
        assert!(followup_window_open(notified, at(9, 10)));
        assert!(followup_window_open(notified, at(9, 9)));
        assert!(followup_window_open(notified, at(9, 11)));
        assert!(!followup_window_open(notified, at(9, 8)));
        assert!(!followup_window_open(notified, at(9, 12)));
        assert!(!followup_window_open(None, at(9, 10)));
    }

    #[test]
    fn followup_window_spans_midnight() {
        let notified = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap().and_hms_opt(23, 55, 0).unwrap();
        assert!(followup_window_open(Some(notified), at(0, 5)));
    }
}
