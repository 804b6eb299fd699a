//! Error types for the reminder core.

use thiserror::Error;
use uuid::Uuid;

use super::channels::ChannelError;
use super::llm::LlmError;
use crate::crypto::CryptoError;
use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Encryption error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Dose reminder not found: {0}")]
    NotFound(Uuid),

    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),
}
