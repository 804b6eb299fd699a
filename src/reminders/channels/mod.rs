//! Outbound notification adapters.
//!
//! Channels are invoked by the scheduler and by nothing else; they never call
//! each other.

mod push;
pub mod twiml;
mod voice;

pub use push::*;
pub use voice::*;

use thiserror::Error;

use super::traits::{PushChannel, VoiceChannel};
use super::types::{DeliveryReport, PushMessage};
use crate::db::DatabaseError;
use crate::models::ScriptType;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("{0} channel is not configured")]
    NotConfigured(&'static str),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Provider rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Push delivery failed for all {0} subscriptions")]
    Undelivered(usize),

    #[error("Unexpected provider response: {0}")]
    ResponseParsing(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ChannelError {
    /// A disabled channel is a degraded mode, not a delivery failure.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, Self::NotConfigured(_))
    }
}

/// Stand-in for a channel whose credentials are absent.
pub struct DisabledChannel {
    name: &'static str,
}

impl DisabledChannel {
    pub fn push() -> Self {
        Self { name: "push" }
    }

    pub fn voice() -> Self {
        Self { name: "voice" }
    }
}

impl PushChannel for DisabledChannel {
    fn send(&self, _patient_ref: &str, _message: &PushMessage) -> Result<DeliveryReport, ChannelError> {
        Err(ChannelError::NotConfigured(self.name))
    }
}

impl VoiceChannel for DisabledChannel {
    fn place_call(&self, _phone: &str, _script: ScriptType, _callback_url: &str) -> Result<String, ChannelError> {
        Err(ChannelError::NotConfigured(self.name))
    }
}

/// Phone numbers are logged only by their last four digits.
pub fn redact_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() <= 4 {
        return "***".to_string();
    }
    let tail: String = digits[digits.len() - 4..].iter().collect();
    format!("***{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_last_four_digits() {
        assert_eq!(redact_phone("+1 (555) 010-4321"), "***4321");
        assert_eq!(redact_phone("123"), "***");
    }

    #[test]
    fn disabled_channels_report_not_configured() {
        let push = DisabledChannel::push();
        let msg = PushMessage {
            title: "t".into(),
            body: "b".into(),
            tag: "x".into(),
            require_interaction: false,
            data: serde_json::Value::Null,
        };
        let err = push.send("p-1", &msg).unwrap_err();
        assert!(err.is_not_configured());

        let voice = DisabledChannel::voice();
        let err = voice.place_call("+15550100", ScriptType::Reminder, "http://x").unwrap_err();
        assert_eq!(err.to_string(), "voice channel is not configured");
    }
}
