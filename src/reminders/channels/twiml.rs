//! TwiML documents for reminder and follow-up calls.

use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::ScriptType;

const VOICE: &str = "alice";
const LANGUAGE: &str = "en-US";
const GATHER_TIMEOUT_SECS: u32 = 5;

/// Query parameters identifying a dose across the call's HTTP round trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallLink {
    pub reminder_id: Uuid,
    pub script: ScriptType,
    pub dose_date: NaiveDate,
    pub attempt: u32,
}

impl CallLink {
    fn query(&self) -> String {
        format!(
            "reminder_id={}&date={}&attempt={}",
            self.reminder_id,
            self.dose_date.format("%Y-%m-%d"),
            self.attempt
        )
    }

    /// URL Twilio fetches the opening script from.
    pub fn script_url(&self, public_url: &str) -> String {
        format!(
            "{}/api/voice/twiml/{}?{}",
            public_url.trim_end_matches('/'),
            self.script,
            self.query()
        )
    }

    /// URL Twilio posts the speech result to.
    pub fn callback_url(&self, public_url: &str) -> String {
        format!(
            "{}/api/voice/callback/{}?{}",
            public_url.trim_end_matches('/'),
            self.script,
            self.query()
        )
    }

    pub fn next_attempt(&self) -> Self {
        Self {
            attempt: self.attempt + 1,
            ..*self
        }
    }
}

/// Opening question of a call.
pub fn script_prompt(script: ScriptType, medication: &str, dosage: Option<&str>) -> String {
    match script {
        ScriptType::Reminder => {
            let mut message =
                format!("Hello! This is your medication reminder. It's time to take your {medication}");
            if let Some(dosage) = dosage.filter(|d| !d.trim().is_empty()) {
                message.push_str(", ");
                message.push_str(dosage);
            }
            message.push_str(". Have you taken it? Just say yes or no.");
            message
        }
        ScriptType::Followup => {
            format!("Hello, this is a follow-up. Did you take your {medication}? Please say yes or no.")
        }
    }
}

/// Question repeated after an unclear answer.
pub fn reprompt(medication: &str) -> String {
    format!("Sorry, I didn't catch that. Did you take your {medication}? Please say yes or no.")
}

/// Spoken when the patient says nothing at all.
pub fn no_input_message(script: ScriptType) -> &'static str {
    match script {
        ScriptType::Reminder => {
            "I didn't hear you. Please call back when you take your medication. Goodbye."
        }
        ScriptType::Followup => "I didn't hear you. Goodbye.",
    }
}

/// Speech `<Gather>` posting to `action_url`, followed by a closing line
/// when nothing is heard.
pub fn gather(prompt: &str, action_url: &str, no_input: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response>\
         <Gather input=\"speech\" action=\"{action}\" method=\"POST\" timeout=\"{timeout}\" speechTimeout=\"auto\" language=\"{lang}\">\
         <Say voice=\"{voice}\" language=\"{lang}\">{prompt}</Say>\
         </Gather>\
         <Say voice=\"{voice}\">{no_input}</Say>\
         </Response>",
        action = escape_xml(action_url),
        timeout = GATHER_TIMEOUT_SECS,
        lang = LANGUAGE,
        voice = VOICE,
        prompt = escape_xml(prompt),
        no_input = escape_xml(no_input),
    )
}

/// A single closing statement; the call ends after it.
pub fn say(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <Response><Say voice=\"{VOICE}\">{}</Say></Response>",
        escape_xml(message)
    )
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
