use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::traits::LlmClient;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Cannot connect to Ollama at {0}")]
    Connection(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Ollama returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Failed to parse LLM response: {0}")]
    ResponseParsing(String),
}

/// Ollama HTTP client for local LLM inference.
pub struct OllamaClient {
    base_url: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

impl LlmClient for OllamaClient {
    fn generate(&self, model: &str, prompt: &str, system: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model,
            prompt,
            system,
            stream: false,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_connect() {
                LlmError::Connection(self.base_url.clone())
            } else if e.is_timeout() {
                LlmError::HttpClient(format!("Request timed out after {}s", self.timeout_secs))
            } else {
                LlmError::HttpClient(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(LlmError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response
            .json()
            .map_err(|e| LlmError::ResponseParsing(e.to_string()))?;

        Ok(parsed.response)
    }
}

const CLASSIFIER_SYSTEM: &str = "You classify short spoken answers from medication reminder calls. \
Answer with exactly one word and nothing else.";

/// Single-word label classification on top of an [`LlmClient`].
#[derive(Clone)]
pub struct LlmClassifier {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl LlmClassifier {
    pub fn new(client: Arc<dyn LlmClient>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }

    /// Ask the model to pick one of `allowed`. Returns the raw answer,
    /// trimmed and lowercased; the caller decides whether it is allowed.
    pub fn classify(&self, utterance: &str, question: &str, allowed: &[&str]) -> Result<String, LlmError> {
        let prompt = build_classification_prompt(utterance, question, allowed);
        let answer = self.client.generate(&self.model, &prompt, CLASSIFIER_SYSTEM)?;
        Ok(answer.trim().to_lowercase())
    }
}

fn build_classification_prompt(utterance: &str, question: &str, allowed: &[&str]) -> String {
    let options = allowed
        .iter()
        .map(|label| format!("- \"{label}\""))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "The patient was asked: \"{question}\"\n\
         They said: \"{utterance}\"\n\n\
         Respond with ONLY ONE WORD from this list:\n\
         {options}\n\n\
         \"yes\" means they confirmed taking it, \"no\" means they did not, \
         \"unclear\" means you cannot determine.\n\n\
         Response:"
    )
}
