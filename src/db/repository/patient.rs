use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;

/// Create the patient row if missing and set its contact phone.
pub fn upsert_patient(
    conn: &Connection,
    patient_ref: &str,
    phone_number: Option<&str>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO patients (patient_ref, phone_number, created_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(patient_ref) DO UPDATE SET phone_number = excluded.phone_number",
        params![patient_ref, phone_number],
    )?;
    Ok(())
}

/// Register the patient without touching an existing phone number.
pub fn ensure_patient(conn: &Connection, patient_ref: &str) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO patients (patient_ref, created_at) VALUES (?1, datetime('now'))",
        params![patient_ref],
    )?;
    Ok(())
}

/// Phone number on file. `None` when the patient is unknown or has no phone.
pub fn get_contact_phone(conn: &Connection, patient_ref: &str) -> Result<Option<String>, DatabaseError> {
    let phone = conn
        .query_row(
            "SELECT phone_number FROM patients WHERE patient_ref = ?1",
            params![patient_ref],
            |row| row.get::<_, Option<String>>(0),
        )
        .optional()?
        .flatten();
    Ok(phone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn unknown_patient_has_no_phone() {
        let conn = open_memory_database().unwrap();
        assert_eq!(get_contact_phone(&conn, "nobody").unwrap(), None);
    }

    #[test]
    fn upsert_overwrites_phone() {
        let conn = open_memory_database().unwrap();
        upsert_patient(&conn, "p-1", Some("+15550100")).unwrap();
        upsert_patient(&conn, "p-1", Some("+15550199")).unwrap();
        assert_eq!(get_contact_phone(&conn, "p-1").unwrap().as_deref(), Some("+15550199"));

        upsert_patient(&conn, "p-1", None).unwrap();
        assert_eq!(get_contact_phone(&conn, "p-1").unwrap(), None);
    }

    #[test]
    fn ensure_keeps_existing_phone() {
        let conn = open_memory_database().unwrap();
        upsert_patient(&conn, "p-1", Some("+15550100")).unwrap();
        ensure_patient(&conn, "p-1").unwrap();
        assert_eq!(get_contact_phone(&conn, "p-1").unwrap().as_deref(), Some("+15550100"));
    }
}
