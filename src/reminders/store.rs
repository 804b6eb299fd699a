use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use super::traits::ReminderStore;
use crate::db::{self, Database, DatabaseError};
use crate::models::{DoseReminder, DoseStatus};

/// SQLite-backed ReminderStore.
pub struct SqliteReminderStore {
    db: Arc<Database>,
}

impl SqliteReminderStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl ReminderStore for SqliteReminderStore {
    fn list_due_for_reminder(&self, now: NaiveTime) -> Result<Vec<DoseReminder>, DatabaseError> {
        self.db.with_conn(|conn| db::list_due_for_reminder(conn, now))
    }

    fn list_due_for_followup(&self, now: NaiveTime) -> Result<Vec<DoseReminder>, DatabaseError> {
        self.db.with_conn(|conn| db::list_due_for_followup(conn, now))
    }

    fn transition_status(
        &self,
        id: &Uuid,
        from: DoseStatus,
        to: DoseStatus,
        notified_at: Option<NaiveDateTime>,
    ) -> Result<bool, DatabaseError> {
        self.db
            .with_conn(|conn| db::transition_status(conn, id, from, to, notified_at))
    }

    fn reset_all_to_pending(&self, day: NaiveDate) -> Result<usize, DatabaseError> {
        self.db.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let affected = db::reset_all_to_pending(&tx)?;
            db::set_last_reset_date(&tx, day)?;
            tx.commit()?;
            Ok(affected)
        })
    }

    fn last_reset_date(&self) -> Result<Option<NaiveDate>, DatabaseError> {
        self.db.with_conn(db::get_last_reset_date)
    }

    fn mark_reset(&self, day: NaiveDate) -> Result<(), DatabaseError> {
        self.db.with_conn(|conn| db::set_last_reset_date(conn, day))
    }

    fn get_reminder(&self, id: &Uuid) -> Result<Option<DoseReminder>, DatabaseError> {
        self.db.with_conn(|conn| db::get_reminder(conn, id))
    }
}
