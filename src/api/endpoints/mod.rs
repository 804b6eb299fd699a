//! API endpoint handlers, one module per resource.
//!
//! Handlers stay thin: they parse the request and hand off to the schedule
//! service, the patient store or the reminder core. That work is synchronous
//! (SQLite behind a mutex, AES, LLM calls) and runs through [`blocking`].

pub mod adherence;
pub mod health;
pub mod reminders;
pub mod schedules;
pub mod subscriptions;
pub mod voice;

use crate::api::error::ApiError;

/// Run synchronous store work on tokio's blocking pool.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))?
}
