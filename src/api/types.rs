//! Shared state for the HTTP layer.

use std::sync::Arc;

use serde::Serialize;

use crate::db::Database;
use crate::patients::SqlitePatientStore;
use crate::reminders::{DoseConfirmer, SpeechInterpreter, SqliteReminderStore, VoiceResponseHandler};
use crate::schedule::ScheduleService;

/// Which optional collaborators are wired in.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ChannelStatus {
    pub push: bool,
    pub voice: bool,
    pub llm: bool,
}

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub db: Arc<Database>,
    pub schedules: Arc<ScheduleService>,
    pub patients: Arc<SqlitePatientStore>,
    pub confirmer: Arc<DoseConfirmer>,
    pub voice: Arc<VoiceResponseHandler>,
    pub public_url: String,
    pub channels: ChannelStatus,
}

impl ApiContext {
    /// Wire the inbound-side services over the shared stores.
    pub fn new(
        db: Arc<Database>,
        store: Arc<SqliteReminderStore>,
        patients: Arc<SqlitePatientStore>,
        interpreter: Arc<SpeechInterpreter>,
        public_url: &str,
        channels: ChannelStatus,
    ) -> Self {
        Self {
            schedules: Arc::new(ScheduleService::new(db.clone())),
            confirmer: Arc::new(DoseConfirmer::new(store.clone(), patients.clone())),
            voice: Arc::new(VoiceResponseHandler::new(store, patients.clone(), interpreter)),
            db,
            patients,
            public_url: public_url.trim_end_matches('/').to_string(),
            channels,
        }
    }
}
