use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::format_timestamp;
use crate::db::DatabaseError;

/// Append one sealed adherence record. The payload is opaque to this layer.
///
/// Returns `false` without writing when a record for the same dose and day
/// already exists.
pub fn insert_adherence_blob(
    conn: &Connection,
    id: &Uuid,
    patient_ref: &str,
    dose_key: Option<(&Uuid, NaiveDate)>,
    recorded_at: &NaiveDateTime,
    payload: &[u8],
) -> Result<bool, DatabaseError> {
    let (reminder_id, dose_date) = match dose_key {
        Some((reminder_id, day)) => (Some(reminder_id.to_string()), Some(day.format("%Y-%m-%d").to_string())),
        None => (None, None),
    };
    let inserted = conn.execute(
        "INSERT INTO adherence_records (id, patient_ref, reminder_id, dose_date, recorded_at, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(reminder_id, dose_date) DO NOTHING",
        params![
            id.to_string(),
            patient_ref,
            reminder_id,
            dose_date,
            format_timestamp(recorded_at),
            payload
        ],
    )?;
    Ok(inserted > 0)
}

/// Drop everything but the newest `keep` records for a patient.
pub fn trim_adherence(conn: &Connection, patient_ref: &str, keep: usize) -> Result<usize, DatabaseError> {
    let removed = conn.execute(
        "DELETE FROM adherence_records
         WHERE patient_ref = ?1 AND seq NOT IN (
             SELECT seq FROM adherence_records WHERE patient_ref = ?1
             ORDER BY seq DESC LIMIT ?2
         )",
        params![patient_ref, keep as i64],
    )?;
    Ok(removed)
}

/// Sealed payloads for a patient, oldest first.
pub fn list_adherence_blobs(conn: &Connection, patient_ref: &str) -> Result<Vec<Vec<u8>>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT payload FROM adherence_records WHERE patient_ref = ?1 ORDER BY seq ASC",
    )?;
    let rows = stmt.query_map(params![patient_ref], |row| row.get::<_, Vec<u8>>(0))?;

    let mut blobs = Vec::new();
    for row in rows {
        blobs.push(row?);
    }
    Ok(blobs)
}
