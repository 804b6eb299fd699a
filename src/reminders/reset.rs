use std::sync::Arc;

use chrono::NaiveDate;

use super::traits::ReminderStore;
use super::ReminderError;

/// Midnight reset with catch-up: runs once for every local date that has
/// not been reset yet, whether the process was up at midnight or not.
pub struct DailyReset {
    store: Arc<dyn ReminderStore>,
}

impl DailyReset {
    pub fn new(store: Arc<dyn ReminderStore>) -> Self {
        Self { store }
    }

    /// Reset all rows to PENDING if `today` is past the last recorded reset.
    /// Returns the number of rows reset, or `None` if today is already done.
    ///
    /// A database that has never recorded a reset only has `today` marked,
    /// so doses already handled today are not re-sent.
    pub fn run_if_due(&self, today: NaiveDate) -> Result<Option<usize>, ReminderError> {
        match self.store.last_reset_date()? {
            Some(last) if last >= today => Ok(None),
            Some(last) => {
                let affected = self.store.reset_all_to_pending(today)?;
                tracing::info!(
                    affected,
                    previous = %last,
                    today = %today,
                    "Daily reset: all doses set to PENDING"
                );
                Ok(Some(affected))
            }
            None => {
                self.store.mark_reset(today)?;
                tracing::info!(today = %today, "Daily reset initialized");
                Ok(None)
            }
        }
    }
}
