use std::time::Duration;

use serde::Deserialize;

use super::{redact_phone, ChannelError};
use crate::config::TwilioConfig;
use crate::models::ScriptType;
use crate::reminders::traits::VoiceChannel;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Outbound calls through the Twilio REST API. Twilio fetches the call
/// script from `callback_url` once the patient picks up.
pub struct TwilioVoiceChannel {
    config: TwilioConfig,
    api_base: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct TwilioCallResponse {
    sid: String,
}

impl TwilioVoiceChannel {
    pub fn new(config: TwilioConfig, timeout_secs: u64) -> Result<Self, ChannelError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChannelError::HttpClient(e.to_string()))?;
        Ok(Self {
            config,
            api_base: TWILIO_API_BASE.to_string(),
            client,
        })
    }

    fn calls_url(&self) -> String {
        format!("{}/Accounts/{}/Calls.json", self.api_base, self.config.account_sid)
    }

    fn call_form(&self, phone: &str, callback_url: &str) -> [(&'static str, String); 4] {
        [
            ("To", phone.to_string()),
            ("From", self.config.from_number.clone()),
            ("Url", callback_url.to_string()),
            ("Method", "POST".to_string()),
        ]
    }
}

impl VoiceChannel for TwilioVoiceChannel {
    fn place_call(&self, phone: &str, script: ScriptType, callback_url: &str) -> Result<String, ChannelError> {
        let response = self
            .client
            .post(self.calls_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&self.call_form(phone, callback_url))
            .send()
            .map_err(|e| ChannelError::HttpClient(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ChannelError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TwilioCallResponse = response
            .json()
            .map_err(|e| ChannelError::ResponseParsing(e.to_string()))?;

        tracing::info!(
            call_sid = %parsed.sid,
            script = %script,
            phone = %redact_phone(phone),
            "Outbound call placed"
        );
        Ok(parsed.sid)
    }
}
