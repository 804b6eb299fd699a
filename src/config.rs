use std::net::SocketAddr;
use std::path::PathBuf;

use base64::Engine;
use thiserror::Error;

use crate::crypto::{ProfileKey, KEY_LENGTH};

/// Application-level constants
pub const APP_NAME: &str = "Dosewatch";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minutes between the reminder and the follow-up escalation.
pub const FOLLOWUP_OFFSET_MINUTES: i64 = 10;

/// Re-prompts allowed after an unclear spoken answer.
pub const VOICE_MAX_RETRIES: u32 = 2;

/// Trailing window of adherence records kept per patient.
pub const DEFAULT_ADHERENCE_RETENTION: usize = 270;

/// Reference scan interval for the reminder ticker.
pub const DEFAULT_TICK_SECS: u64 = 60;

/// Per-call timeout for outbound push, telephony and LLM requests.
pub const DEFAULT_CHANNEL_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";
pub const DEFAULT_OLLAMA_MODEL: &str = "medgemma:4b";

/// Default `EnvFilter` directive when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "dosewatch=info,dosewatch_lib=info,tower_http=warn"
}

/// Get the application data directory
/// ~/Dosewatch/ on all platforms; falls back to the working directory
/// when no home directory can be determined (containers).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default location of the reminder database.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("dosewatch.db")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Twilio credentials for outbound reminder calls.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

/// Ollama endpoint used by the speech interpreter fallback.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// Public base URL the telephony provider calls back into.
    pub public_url: String,
    pub data_key: ProfileKey,
    pub adherence_retention: usize,
    pub tick_secs: u64,
    pub channel_timeout_secs: u64,
    pub twilio: Option<TwilioConfig>,
    pub push_gateway_url: Option<String>,
    pub ollama: Option<OllamaConfig>,
}

impl ServiceConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db_path = get("DOSEWATCH_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let bind_raw = get("DOSEWATCH_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|e| ConfigError::Invalid {
            key: "DOSEWATCH_BIND_ADDR",
            reason: e.to_string(),
        })?;

        let public_url = get("DOSEWATCH_PUBLIC_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let key_b64 = get("DOSEWATCH_DATA_KEY").ok_or(ConfigError::Missing("DOSEWATCH_DATA_KEY"))?;
        let data_key = parse_data_key(&key_b64)?;

        let adherence_retention = parse_number(
            get("DOSEWATCH_ADHERENCE_RETENTION"),
            "DOSEWATCH_ADHERENCE_RETENTION",
            DEFAULT_ADHERENCE_RETENTION,
        )?;
        let tick_secs = parse_number(get("DOSEWATCH_TICK_SECS"), "DOSEWATCH_TICK_SECS", DEFAULT_TICK_SECS)?;
        let channel_timeout_secs = parse_number(
            get("DOSEWATCH_CHANNEL_TIMEOUT_SECS"),
            "DOSEWATCH_CHANNEL_TIMEOUT_SECS",
            DEFAULT_CHANNEL_TIMEOUT_SECS,
        )?;

        let twilio = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(TwilioConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        let ollama = get("OLLAMA_URL").map(|base_url| OllamaConfig {
            base_url,
            model: get("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        });

        Ok(Self {
            db_path,
            bind_addr,
            public_url,
            data_key,
            adherence_retention,
            tick_secs,
            channel_timeout_secs,
            twilio,
            push_gateway_url: get("DOSEWATCH_PUSH_GATEWAY_URL"),
            ollama,
        })
    }
}

fn parse_data_key(encoded: &str) -> Result<ProfileKey, ConfigError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| ConfigError::Invalid {
            key: "DOSEWATCH_DATA_KEY",
            reason: e.to_string(),
        })?;
    let raw: [u8; KEY_LENGTH] = bytes.as_slice().try_into().map_err(|_| ConfigError::Invalid {
        key: "DOSEWATCH_DATA_KEY",
        reason: format!("expected {KEY_LENGTH} bytes, got {}", bytes.len()),
    })?;
    Ok(ProfileKey::from_bytes(raw))
}

fn parse_number<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}
