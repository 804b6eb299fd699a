use std::str::FromStr;

use rusqlite::{params, Connection};

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

pub fn insert_caregiver_alert(conn: &Connection, alert: &CaregiverAlert) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO caregiver_alerts (id, patient_ref, reminder_id, medication_name, kind, detail, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            alert.id.to_string(),
            alert.patient_ref,
            alert.reminder_id.to_string(),
            alert.medication_name,
            alert.kind.as_str(),
            alert.detail,
            format_timestamp(&alert.created_at),
        ],
    )?;
    Ok(())
}

/// Alerts for a patient, newest first.
pub fn list_caregiver_alerts(conn: &Connection, patient_ref: &str) -> Result<Vec<CaregiverAlert>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_ref, reminder_id, medication_name, kind, detail, created_at
         FROM caregiver_alerts WHERE patient_ref = ?1
         ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![patient_ref], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, String>(6)?,
        ))
    })?;

    let mut alerts = Vec::new();
    for row in rows {
        let (id, patient_ref, reminder_id, medication_name, kind, detail, created_at) = row?;
        alerts.push(CaregiverAlert {
            id: parse_uuid(&id)?,
            patient_ref,
            reminder_id: parse_uuid(&reminder_id)?,
            medication_name,
            kind: AlertKind::from_str(&kind)?,
            detail,
            created_at: parse_timestamp(&created_at)?,
        });
    }
    Ok(alerts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn make_alert(patient: &str, kind: AlertKind, minute: u32) -> CaregiverAlert {
        CaregiverAlert {
            id: Uuid::new_v4(),
            patient_ref: patient.into(),
            reminder_id: Uuid::new_v4(),
            medication_name: "Donepezil".into(),
            kind,
            detail: Some("no".into()),
            created_at: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap().and_hms_opt(9, minute, 0).unwrap(),
        }
    }

    #[test]
    fn alerts_listed_newest_first() {
        let conn = open_memory_database().unwrap();
        let older = make_alert("p-1", AlertKind::FollowupDeclined, 10);
        let newer = make_alert("p-1", AlertKind::FollowupUnresolved, 12);
        insert_caregiver_alert(&conn, &older).unwrap();
        insert_caregiver_alert(&conn, &newer).unwrap();
        insert_caregiver_alert(&conn, &make_alert("p-2", AlertKind::FollowupDeclined, 11)).unwrap();

        let alerts = list_caregiver_alerts(&conn, "p-1").unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].id, newer.id);
        assert_eq!(alerts[0].kind, AlertKind::FollowupUnresolved);
        assert_eq!(alerts[1].reminder_id, older.reminder_id);
    }
}
