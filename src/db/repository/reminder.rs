use std::str::FromStr;

use chrono::{NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

const REMINDER_COLUMNS: &str = "id, patient_ref, medication_name, dosage, scheduled_time,
     followup_time, contact_phone, active, daily_status, last_notified_at, created_at, updated_at";

pub fn insert_reminder(conn: &Connection, dose: &DoseReminder) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO dose_reminders (id, patient_ref, medication_name, dosage, scheduled_time,
         followup_time, contact_phone, active, daily_status, last_notified_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            dose.id.to_string(),
            dose.patient_ref,
            dose.medication_name,
            dose.dosage,
            format_clock(dose.scheduled_time),
            format_clock(dose.followup_time),
            dose.contact_phone,
            dose.active as i32,
            dose.daily_status.as_str(),
            dose.last_notified_at.as_ref().map(format_timestamp),
            format_timestamp(&dose.created_at),
            format_timestamp(&dose.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_reminder(conn: &Connection, id: &Uuid) -> Result<Option<DoseReminder>, DatabaseError> {
    let sql = format!("SELECT {REMINDER_COLUMNS} FROM dose_reminders WHERE id = ?1");
    let row = conn
        .query_row(&sql, params![id.to_string()], reminder_row_from_rusqlite)
        .optional()?;
    row.map(reminder_from_row).transpose()
}

pub fn list_reminders_for_patient(
    conn: &Connection,
    patient_ref: &str,
) -> Result<Vec<DoseReminder>, DatabaseError> {
    query_reminders(
        conn,
        "WHERE patient_ref = ?1 ORDER BY scheduled_time, medication_name",
        params![patient_ref],
    )
}

/// Active, PENDING rows whose reminder anchor equals `now` (hour:minute).
pub fn list_due_for_reminder(
    conn: &Connection,
    now: NaiveTime,
) -> Result<Vec<DoseReminder>, DatabaseError> {
    query_reminders(
        conn,
        "WHERE active = 1 AND daily_status = ?1 AND scheduled_time = ?2",
        params![DoseStatus::Pending.as_str(), format_clock(now)],
    )
}

/// Active, REMINDED rows whose follow-up anchor equals `now` (hour:minute).
pub fn list_due_for_followup(
    conn: &Connection,
    now: NaiveTime,
) -> Result<Vec<DoseReminder>, DatabaseError> {
    query_reminders(
        conn,
        "WHERE active = 1 AND daily_status = ?1 AND followup_time = ?2",
        params![DoseStatus::Reminded.as_str(), format_clock(now)],
    )
}

/// Compare-and-swap on `daily_status`. Returns `false` when the row is
/// missing or its status no longer equals `from`.
///
/// `notified_at`, when given, replaces `last_notified_at` in the same write.
pub fn transition_status(
    conn: &Connection,
    id: &Uuid,
    from: DoseStatus,
    to: DoseStatus,
    notified_at: Option<NaiveDateTime>,
) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE dose_reminders
         SET daily_status = ?3,
             last_notified_at = COALESCE(?4, last_notified_at),
             updated_at = datetime('now')
         WHERE id = ?1 AND daily_status = ?2",
        params![
            id.to_string(),
            from.as_str(),
            to.as_str(),
            notified_at.as_ref().map(format_timestamp),
        ],
    )?;
    Ok(changed == 1)
}

/// Nightly reset: every row back to PENDING, whatever its current status.
pub fn reset_all_to_pending(conn: &Connection) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE dose_reminders SET daily_status = ?1, updated_at = datetime('now')",
        params![DoseStatus::Pending.as_str()],
    )?;
    Ok(affected)
}

pub fn set_reminder_active(conn: &Connection, id: &Uuid, active: bool) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE dose_reminders SET active = ?2, updated_at = datetime('now') WHERE id = ?1",
        params![id.to_string(), active as i32],
    )?;
    Ok(changed == 1)
}

/// Move a dose to a new clock time. The follow-up anchor is recomputed here,
/// never left to the caller.
pub fn retime_reminder(conn: &Connection, id: &Uuid, scheduled_time: NaiveTime) -> Result<bool, DatabaseError> {
    let scheduled_time = truncate_to_minute(scheduled_time);
    let changed = conn.execute(
        "UPDATE dose_reminders
         SET scheduled_time = ?2, followup_time = ?3, updated_at = datetime('now')
         WHERE id = ?1",
        params![
            id.to_string(),
            format_clock(scheduled_time),
            format_clock(followup_time_for(scheduled_time)),
        ],
    )?;
    Ok(changed == 1)
}

pub fn update_contact_phone_for_patient(
    conn: &Connection,
    patient_ref: &str,
    phone: Option<&str>,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "UPDATE dose_reminders SET contact_phone = ?2, updated_at = datetime('now')
         WHERE patient_ref = ?1",
        params![patient_ref, phone],
    )?;
    Ok(affected)
}

pub fn delete_reminders_for_medication(
    conn: &Connection,
    patient_ref: &str,
    medication_name: &str,
) -> Result<usize, DatabaseError> {
    let affected = conn.execute(
        "DELETE FROM dose_reminders WHERE patient_ref = ?1 AND medication_name = ?2",
        params![patient_ref, medication_name],
    )?;
    Ok(affected)
}

pub fn list_reminders_for_medication(
    conn: &Connection,
    patient_ref: &str,
    medication_name: &str,
) -> Result<Vec<DoseReminder>, DatabaseError> {
    query_reminders(
        conn,
        "WHERE patient_ref = ?1 AND medication_name = ?2 ORDER BY scheduled_time",
        params![patient_ref, medication_name],
    )
}

/// Bring one medication's rows in line with `times` (transactional).
///
/// Rows whose time is kept retain their id, status and last notification;
/// only dosage and contact phone are rewritten. Rows for dropped times are
/// deleted and new times get fresh PENDING rows. Returns the resulting rows
/// ordered by time.
pub fn sync_reminders_for_medication(
    conn: &Connection,
    patient_ref: &str,
    medication_name: &str,
    dosage: Option<&str>,
    contact_phone: Option<&str>,
    times: &[NaiveTime],
    now: NaiveDateTime,
) -> Result<Vec<DoseReminder>, DatabaseError> {
    let tx = conn.unchecked_transaction()?;
    let existing = list_reminders_for_medication(&tx, patient_ref, medication_name)?;

    for dose in &existing {
        if times.contains(&dose.scheduled_time) {
            tx.execute(
                "UPDATE dose_reminders SET dosage = ?2, contact_phone = ?3, updated_at = ?4 WHERE id = ?1",
                params![dose.id.to_string(), dosage, contact_phone, format_timestamp(&now)],
            )?;
        } else {
            tx.execute("DELETE FROM dose_reminders WHERE id = ?1", params![dose.id.to_string()])?;
        }
    }

    for time in times {
        if !existing.iter().any(|d| d.scheduled_time == *time) {
            let dose = DoseReminder::new(
                patient_ref,
                medication_name,
                dosage.map(str::to_string),
                *time,
                contact_phone.map(str::to_string),
                now,
            );
            insert_reminder(&tx, &dose)?;
        }
    }

    let synced = list_reminders_for_medication(&tx, patient_ref, medication_name)?;
    tx.commit()?;
    Ok(synced)
}

fn query_reminders(
    conn: &Connection,
    clause: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<DoseReminder>, DatabaseError> {
    let sql = format!("SELECT {REMINDER_COLUMNS} FROM dose_reminders {clause}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, reminder_row_from_rusqlite)?;

    let mut reminders = Vec::new();
    for row in rows {
        reminders.push(reminder_from_row(row?)?);
    }
    Ok(reminders)
}

// Internal row type for DoseReminder mapping
struct ReminderRow {
    id: String,
    patient_ref: String,
    medication_name: String,
    dosage: Option<String>,
    scheduled_time: String,
    followup_time: String,
    contact_phone: Option<String>,
    active: i32,
    daily_status: String,
    last_notified_at: Option<String>,
    created_at: String,
    updated_at: String,
}

fn reminder_row_from_rusqlite(row: &rusqlite::Row<'_>) -> Result<ReminderRow, rusqlite::Error> {
    Ok(ReminderRow {
        id: row.get(0)?,
        patient_ref: row.get(1)?,
        medication_name: row.get(2)?,
        dosage: row.get(3)?,
        scheduled_time: row.get(4)?,
        followup_time: row.get(5)?,
        contact_phone: row.get(6)?,
        active: row.get(7)?,
        daily_status: row.get(8)?,
        last_notified_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn reminder_from_row(row: ReminderRow) -> Result<DoseReminder, DatabaseError> {
    let clock = |raw: &str| {
        parse_clock(raw).ok_or_else(|| DatabaseError::ConstraintViolation(format!("bad clock time {raw}")))
    };
    Ok(DoseReminder {
        id: parse_uuid(&row.id)?,
        patient_ref: row.patient_ref,
        medication_name: row.medication_name,
        dosage: row.dosage,
        scheduled_time: clock(&row.scheduled_time)?,
        followup_time: clock(&row.followup_time)?,
        contact_phone: row.contact_phone,
        active: row.active != 0,
        daily_status: DoseStatus::from_str(&row.daily_status)?,
        last_notified_at: row.last_notified_at.as_deref().map(parse_timestamp).transpose()?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}
