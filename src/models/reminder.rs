use chrono::{Duration, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::DoseStatus;
use crate::config::FOLLOWUP_OFFSET_MINUTES;

/// Wire and storage format for clock times.
pub const CLOCK_FORMAT: &str = "%H:%M";

/// One scheduled dose: a (patient, medication, time-of-day) row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseReminder {
    pub id: Uuid,
    pub patient_ref: String,
    pub medication_name: String,
    pub dosage: Option<String>,
    #[serde(with = "clock")]
    pub scheduled_time: NaiveTime,
    /// Always `scheduled_time + FOLLOWUP_OFFSET_MINUTES`; set by `new`/`retime`.
    #[serde(with = "clock")]
    pub followup_time: NaiveTime,
    pub contact_phone: Option<String>,
    pub active: bool,
    pub daily_status: DoseStatus,
    pub last_notified_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl DoseReminder {
    pub fn new(
        patient_ref: &str,
        medication_name: &str,
        dosage: Option<String>,
        scheduled_time: NaiveTime,
        contact_phone: Option<String>,
        now: NaiveDateTime,
    ) -> Self {
        let scheduled_time = truncate_to_minute(scheduled_time);
        Self {
            id: Uuid::new_v4(),
            patient_ref: patient_ref.to_string(),
            medication_name: medication_name.to_string(),
            dosage,
            scheduled_time,
            followup_time: followup_time_for(scheduled_time),
            contact_phone,
            active: true,
            daily_status: DoseStatus::Pending,
            last_notified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_phone(&self) -> bool {
        self.contact_phone.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// Follow-up anchor for a scheduled clock time. Wraps past midnight.
pub fn followup_time_for(scheduled_time: NaiveTime) -> NaiveTime {
    truncate_to_minute(scheduled_time) + Duration::minutes(FOLLOWUP_OFFSET_MINUTES)
}

/// Drop seconds and sub-second precision; scheduling works on hour:minute.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// Parse "HH:MM" (also accepts "HH:MM:SS", seconds are dropped).
pub fn parse_clock(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, CLOCK_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
        .map(truncate_to_minute)
}

pub fn format_clock(time: NaiveTime) -> String {
    time.format(CLOCK_FORMAT).to_string()
}

/// A medication schedule as saved by the caregiver: one row per time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoseSchedule {
    pub patient_ref: String,
    pub medication_name: String,
    pub dosage: Option<String>,
    pub times: Vec<String>,
}

mod clock {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_clock(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_clock(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid clock time: {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap().and_hms_opt(8, 0, 0).unwrap()
    }

    #[test]
    fn followup_is_ten_minutes_after_schedule() {
        assert_eq!(followup_time_for(at(9, 0)), at(9, 10));
        assert_eq!(followup_time_for(at(13, 55)), at(14, 5));
    }

    #[test]
    fn followup_wraps_past_midnight() {
        assert_eq!(followup_time_for(at(23, 55)), at(0, 5));
    }

    #[test]
    fn new_reminder_starts_pending_and_active() {
        let dose = DoseReminder::new("p-1", "Donepezil", None, at(9, 0), None, now());
        assert_eq!(dose.daily_status, DoseStatus::Pending);
        assert!(dose.active);
        assert!(dose.last_notified_at.is_none());
        assert_eq!(dose.followup_time, at(9, 10));
    }

    #[test]
    fn seconds_are_dropped() {
        let dose = DoseReminder::new(
            "p-1",
            "Donepezil",
            None,
            NaiveTime::from_hms_opt(9, 0, 42).unwrap(),
            None,
            now(),
        );
        assert_eq!(dose.scheduled_time, at(9, 0));
    }

    #[test]
    fn parse_clock_accepts_both_forms() {
        assert_eq!(parse_clock("07:30"), Some(at(7, 30)));
        assert_eq!(parse_clock(" 07:30:15 "), Some(at(7, 30)));
        assert_eq!(parse_clock("7.30"), None);
        assert_eq!(parse_clock("25:00"), None);
    }

    #[test]
    fn blank_phone_counts_as_absent() {
        let mut dose = DoseReminder::new("p-1", "Donepezil", None, at(9, 0), Some("  ".into()), now());
        assert!(!dose.has_phone());
        dose.contact_phone = Some("+447700900123".into());
        assert!(dose.has_phone());
    }

    #[test]
    fn clock_fields_serialize_as_hh_mm() {
        let dose = DoseReminder::new("p-1", "Donepezil", None, at(9, 5), None, now());
        let json = serde_json::to_value(&dose).unwrap();
        assert_eq!(json["scheduled_time"], "09:05");
        assert_eq!(json["followup_time"], "09:15");
        assert_eq!(json["daily_status"], "PENDING");
    }
}
