//! Per-dose endpoints: activation, retiming and self-reported intake.

use axum::extract::{Path, State};
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{parse_clock, AdherenceMethod, DoseReminder};
use crate::reminders::{ConfirmationOutcome, Moment};

#[derive(Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

#[derive(Serialize)]
pub struct ActiveResponse {
    pub id: Uuid,
    pub active: bool,
}

/// `POST /api/reminders/:id/active`
pub async fn set_active(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<ActiveRequest>,
) -> Result<Json<ActiveResponse>, ApiError> {
    let schedules = ctx.schedules.clone();
    blocking(move || Ok(schedules.set_active(&id, body.active)?)).await?;
    Ok(Json(ActiveResponse {
        id,
        active: body.active,
    }))
}

#[derive(Deserialize)]
pub struct RetimeRequest {
    /// New time of day, `HH:MM`.
    pub time: String,
}

/// `PUT /api/reminders/:id/time`: move one dose; the follow-up moves with it.
pub async fn retime(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<RetimeRequest>,
) -> Result<Json<DoseReminder>, ApiError> {
    let time = parse_clock(&body.time)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid time: {}", body.time)))?;
    let schedules = ctx.schedules.clone();
    let dose = blocking(move || Ok(schedules.retime(&id, time)?)).await?;
    Ok(Json(dose))
}

#[derive(Deserialize, Default)]
pub struct TakenRequest {
    /// `push_self_report` (default) or `manual_entry`.
    pub method: Option<AdherenceMethod>,
    /// Day the dose belongs to; defaults to today.
    pub date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct TakenResponse {
    pub id: Uuid,
    pub outcome: ConfirmationOutcome,
    pub recorded: bool,
}

/// `POST /api/reminders/:id/taken`: push "I took it" or caregiver entry.
pub async fn mark_taken(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    body: Option<Json<TakenRequest>>,
) -> Result<Json<TakenResponse>, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let method = body.method.unwrap_or(AdherenceMethod::PushSelfReport);
    if !matches!(method, AdherenceMethod::PushSelfReport | AdherenceMethod::ManualEntry) {
        return Err(ApiError::BadRequest(format!(
            "method {method} is reserved for voice calls"
        )));
    }

    let at = Moment::now();
    let dose_date = body.date.unwrap_or_else(|| at.local.date());
    if dose_date > at.local.date() {
        return Err(ApiError::BadRequest("date is in the future".into()));
    }

    let confirmer = ctx.confirmer.clone();
    let outcome = blocking(move || Ok(confirmer.confirm(&id, method, None, dose_date, at)?)).await?;
    Ok(Json(TakenResponse {
        id,
        outcome,
        recorded: outcome.is_recorded(),
    }))
}
