//! Telephony webhooks.
//!
//! The provider fetches the opening script from `/api/voice/twiml/:script`
//! when the patient picks up, then posts each speech result to
//! `/api/voice/callback/:script`. Both answer with TwiML.

use std::str::FromStr;

use axum::extract::{Form, Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;

use super::blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::ScriptType;
use crate::reminders::channels::twiml::CallLink;
use crate::reminders::voice::opening_twiml;
use crate::reminders::Moment;

#[derive(Deserialize)]
pub struct CallQuery {
    pub reminder_id: Uuid,
    pub date: Option<NaiveDate>,
    pub attempt: Option<u32>,
}

/// Form fields posted by the provider; everything else is ignored.
#[derive(Deserialize, Default)]
pub struct SpeechForm {
    #[serde(rename = "SpeechResult")]
    pub speech_result: Option<String>,
}

fn call_link(script: &str, query: &CallQuery) -> Result<CallLink, ApiError> {
    let script = ScriptType::from_str(script)
        .map_err(|_| ApiError::BadRequest(format!("unknown call script: {script}")))?;
    Ok(CallLink {
        reminder_id: query.reminder_id,
        script,
        dose_date: query.date.unwrap_or_else(|| Local::now().date_naive()),
        attempt: query.attempt.unwrap_or(0),
    })
}

fn twiml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], body).into_response()
}

/// `GET|POST /api/voice/twiml/:script`: opening prompt with a speech gather.
pub async fn script(
    State(ctx): State<ApiContext>,
    Path(script): Path<String>,
    Query(query): Query<CallQuery>,
) -> Result<Response, ApiError> {
    let link = call_link(&script, &query)?;
    let handler = ctx.voice.clone();
    let reminder_id = link.reminder_id;
    let dose = blocking(move || Ok(handler.load_dose(&reminder_id)?)).await?;
    Ok(twiml_response(opening_twiml(&dose, &link, &ctx.public_url)))
}

/// `POST /api/voice/callback/:script`: classify the answer and reply.
pub async fn callback(
    State(ctx): State<ApiContext>,
    Path(script): Path<String>,
    Query(query): Query<CallQuery>,
    Form(form): Form<SpeechForm>,
) -> Result<Response, ApiError> {
    let link = call_link(&script, &query)?;
    let speech = form.speech_result.unwrap_or_default();

    // The interpreter may block on the LLM
    let handler = ctx.voice.clone();
    let reply = blocking(move || Ok(handler.handle(link, &speech, Moment::now())?)).await?;

    Ok(twiml_response(reply.to_twiml(&ctx.public_url)))
}
