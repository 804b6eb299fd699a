use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;
use crate::models::PushSubscription;

#[derive(Deserialize)]
pub struct SubscribeRequest {
    pub patient_ref: String,
    /// Browser `PushSubscription.toJSON()`; must carry an `endpoint`.
    pub subscription: serde_json::Value,
}

#[derive(Serialize)]
pub struct SubscribeResponse {
    pub patient_ref: String,
    pub endpoint: String,
}

/// `POST /api/push/subscriptions`: register or refresh a device.
pub async fn subscribe(
    State(ctx): State<ApiContext>,
    Json(body): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<SubscribeResponse>), ApiError> {
    let patient_ref = body.patient_ref.trim();
    if patient_ref.is_empty() {
        return Err(ApiError::BadRequest("patient_ref is required".into()));
    }
    let endpoint = body
        .subscription
        .get("endpoint")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::BadRequest("subscription.endpoint is required".into()))?
        .to_string();

    let subscription = PushSubscription {
        id: Uuid::new_v4(),
        patient_ref: patient_ref.to_string(),
        endpoint: endpoint.clone(),
        subscription: body.subscription,
        active: true,
        created_at: Utc::now().naive_utc(),
    };
    let database = ctx.db.clone();
    let subscription = blocking(move || {
        database.with_conn(|conn| {
            db::ensure_patient(conn, &subscription.patient_ref)?;
            db::upsert_subscription(conn, &subscription)
        })?;
        Ok(subscription)
    })
    .await?;

    tracing::info!(patient_ref = %subscription.patient_ref, "Push subscription registered");
    Ok((
        StatusCode::CREATED,
        Json(SubscribeResponse {
            patient_ref: subscription.patient_ref,
            endpoint,
        }),
    ))
}
