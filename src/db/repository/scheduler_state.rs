use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;

const LAST_RESET_KEY: &str = "last_reset_date";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Local date of the most recent daily reset, if one ever ran.
pub fn get_last_reset_date(conn: &Connection) -> Result<Option<NaiveDate>, DatabaseError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM scheduler_state WHERE key = ?1",
            params![LAST_RESET_KEY],
            |row| row.get(0),
        )
        .optional()?;

    raw.map(|value| {
        NaiveDate::parse_from_str(&value, DATE_FORMAT)
            .map_err(|e| DatabaseError::ConstraintViolation(format!("bad reset date {value}: {e}")))
    })
    .transpose()
}

pub fn set_last_reset_date(conn: &Connection, date: NaiveDate) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO scheduler_state (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![LAST_RESET_KEY, date.format(DATE_FORMAT).to_string()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn reset_date_absent_on_fresh_database() {
        let conn = open_memory_database().unwrap();
        assert_eq!(get_last_reset_date(&conn).unwrap(), None);
    }

    #[test]
    fn reset_date_overwrites() {
        let conn = open_memory_database().unwrap();
        let first = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let second = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        set_last_reset_date(&conn, first).unwrap();
        set_last_reset_date(&conn, second).unwrap();
        assert_eq!(get_last_reset_date(&conn).unwrap(), Some(second));
    }
}
