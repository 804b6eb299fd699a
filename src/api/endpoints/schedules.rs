//! Medication schedule endpoints.
//!
//! - `POST /api/schedules`: save a medication's dose times
//! - `GET /api/patients/:patient_ref/reminders`
//! - `DELETE /api/patients/:patient_ref/medications/:name`
//! - `PUT /api/patients/:patient_ref/phone`

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Local;
use serde::{Deserialize, Serialize};

use super::blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{DoseReminder, DoseSchedule};

#[derive(Serialize)]
pub struct RemindersResponse {
    pub patient_ref: String,
    pub reminders: Vec<DoseReminder>,
}

pub async fn save(
    State(ctx): State<ApiContext>,
    Json(schedule): Json<DoseSchedule>,
) -> Result<(StatusCode, Json<RemindersResponse>), ApiError> {
    let patient_ref = schedule.patient_ref.trim().to_string();
    let schedules = ctx.schedules.clone();
    let reminders =
        blocking(move || Ok(schedules.save_schedule(&schedule, Local::now().naive_local())?)).await?;
    Ok((
        StatusCode::CREATED,
        Json(RemindersResponse {
            patient_ref,
            reminders,
        }),
    ))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    Path(patient_ref): Path<String>,
) -> Result<Json<RemindersResponse>, ApiError> {
    let schedules = ctx.schedules.clone();
    let key = patient_ref.clone();
    let reminders = blocking(move || Ok(schedules.list_for_patient(&key)?)).await?;
    Ok(Json(RemindersResponse {
        patient_ref,
        reminders,
    }))
}

#[derive(Serialize)]
pub struct DeletedResponse {
    pub removed: usize,
}

pub async fn delete_medication(
    State(ctx): State<ApiContext>,
    Path((patient_ref, name)): Path<(String, String)>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let schedules = ctx.schedules.clone();
    let medication = name.clone();
    let removed = blocking(move || Ok(schedules.delete_medication(&patient_ref, &medication)?)).await?;
    if removed == 0 {
        return Err(ApiError::NotFound(format!("Medication {name} not scheduled")));
    }
    Ok(Json(DeletedResponse { removed }))
}

#[derive(Deserialize)]
pub struct PhoneRequest {
    pub phone_number: Option<String>,
}

#[derive(Serialize)]
pub struct PhoneResponse {
    pub updated_reminders: usize,
}

/// Setting `null` or an empty string clears the number.
pub async fn update_phone(
    State(ctx): State<ApiContext>,
    Path(patient_ref): Path<String>,
    Json(body): Json<PhoneRequest>,
) -> Result<Json<PhoneResponse>, ApiError> {
    let schedules = ctx.schedules.clone();
    let updated_reminders = blocking(move || {
        Ok(schedules.update_contact_phone(&patient_ref, body.phone_number.as_deref())?)
    })
    .await?;
    Ok(Json(PhoneResponse { updated_reminders }))
}
