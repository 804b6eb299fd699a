use rusqlite::{params, Connection};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::PushSubscription;

/// Insert or reactivate a subscription. Re-registering the same endpoint
/// refreshes its keys instead of creating a duplicate.
pub fn upsert_subscription(conn: &Connection, sub: &PushSubscription) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO push_subscriptions (id, patient_ref, endpoint, subscription_json, active, created_at)
         VALUES (?1, ?2, ?3, ?4, 1, ?5)
         ON CONFLICT(patient_ref, endpoint) DO UPDATE SET
             subscription_json = excluded.subscription_json,
             active = 1",
        params![
            sub.id.to_string(),
            sub.patient_ref,
            sub.endpoint,
            sub.subscription.to_string(),
            format_timestamp(&sub.created_at),
        ],
    )?;
    Ok(())
}

pub fn list_active_subscriptions(
    conn: &Connection,
    patient_ref: &str,
) -> Result<Vec<PushSubscription>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, patient_ref, endpoint, subscription_json, active, created_at
         FROM push_subscriptions WHERE patient_ref = ?1 AND active = 1
         ORDER BY created_at",
    )?;

    let rows = stmt.query_map(params![patient_ref], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, i32>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut subs = Vec::new();
    for row in rows {
        let (id, patient_ref, endpoint, json, active, created_at) = row?;
        subs.push(PushSubscription {
            id: parse_uuid(&id)?,
            patient_ref,
            endpoint,
            subscription: serde_json::from_str(&json)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            active: active != 0,
            created_at: parse_timestamp(&created_at)?,
        });
    }
    Ok(subs)
}

/// Mark a subscription dead (gateway reported it gone).
pub fn deactivate_subscription(conn: &Connection, id: &Uuid) -> Result<bool, DatabaseError> {
    let changed = conn.execute(
        "UPDATE push_subscriptions SET active = 0 WHERE id = ?1",
        params![id.to_string()],
    )?;
    Ok(changed == 1)
}
