//! Read-only patient history: the adherence log and caregiver alerts.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use super::blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::{AdherenceRecord, CaregiverAlert};

#[derive(Serialize)]
pub struct AdherenceResponse {
    pub patient_ref: String,
    pub records: Vec<AdherenceRecord>,
}

/// `GET /api/patients/:patient_ref/adherence`, oldest first.
pub async fn list_records(
    State(ctx): State<ApiContext>,
    Path(patient_ref): Path<String>,
) -> Result<Json<AdherenceResponse>, ApiError> {
    let patients = ctx.patients.clone();
    let key = patient_ref.clone();
    let records = blocking(move || Ok(patients.list_adherence_records(&key)?)).await?;
    Ok(Json(AdherenceResponse {
        patient_ref,
        records,
    }))
}

#[derive(Serialize)]
pub struct AlertsResponse {
    pub patient_ref: String,
    pub alerts: Vec<CaregiverAlert>,
}

/// `GET /api/patients/:patient_ref/alerts`, newest first.
pub async fn list_alerts(
    State(ctx): State<ApiContext>,
    Path(patient_ref): Path<String>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let patients = ctx.patients.clone();
    let key = patient_ref.clone();
    let alerts = blocking(move || Ok(patients.list_caregiver_alerts(&key)?)).await?;
    Ok(Json(AlertsResponse { patient_ref, alerts }))
}
