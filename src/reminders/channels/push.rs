use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use super::ChannelError;
use crate::db::{self, Database};
use crate::models::PushSubscription;
use crate::reminders::traits::PushChannel;
use crate::reminders::types::{DeliveryReport, PushMessage};

/// Status codes meaning the subscription no longer exists.
const GONE_STATUSES: [u16; 2] = [404, 410];

/// Hands one (subscription, payload) pair to the push relay and returns the
/// relay's HTTP status.
pub trait PushGateway: Send + Sync {
    fn deliver(&self, subscription: &PushSubscription, message: &PushMessage) -> Result<u16, ChannelError>;
}

/// Relay reachable over HTTP; it performs the Web Push encryption and
/// forwards the upstream push service status.
pub struct HttpPushGateway {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpPushGateway {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, ChannelError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChannelError::HttpClient(e.to_string()))?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

impl PushGateway for HttpPushGateway {
    fn deliver(&self, subscription: &PushSubscription, message: &PushMessage) -> Result<u16, ChannelError> {
        let body = json!({
            "subscription": subscription.subscription,
            "payload": message,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .map_err(|e| ChannelError::HttpClient(e.to_string()))?;
        Ok(response.status().as_u16())
    }
}

/// Push channel over the patient's stored subscriptions.
pub struct GatewayPushChannel {
    db: Arc<Database>,
    gateway: Box<dyn PushGateway>,
}

impl GatewayPushChannel {
    pub fn new(db: Arc<Database>, gateway: Box<dyn PushGateway>) -> Self {
        Self { db, gateway }
    }
}

impl PushChannel for GatewayPushChannel {
    fn send(&self, patient_ref: &str, message: &PushMessage) -> Result<DeliveryReport, ChannelError> {
        let subscriptions = self
            .db
            .with_conn(|conn| db::list_active_subscriptions(conn, patient_ref))?;

        if subscriptions.is_empty() {
            tracing::debug!(patient_ref, "No active push subscriptions");
            return Ok(DeliveryReport::default());
        }

        let mut report = DeliveryReport::default();
        for sub in &subscriptions {
            match self.gateway.deliver(sub, message) {
                Ok(status) if (200..300).contains(&status) => report.delivered += 1,
                Ok(status) if GONE_STATUSES.contains(&status) => {
                    tracing::info!(subscription_id = %sub.id, status, "Push subscription expired, deactivating");
                    self.db.with_conn(|conn| db::deactivate_subscription(conn, &sub.id))?;
                    report.expired += 1;
                }
                Ok(status) => {
                    tracing::warn!(subscription_id = %sub.id, status, "Push gateway rejected notification");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::warn!(subscription_id = %sub.id, error = %e, "Push delivery failed");
                    report.failed += 1;
                }
            }
        }

        if report.delivered == 0 && report.failed > 0 {
            return Err(ChannelError::Undelivered(report.failed));
        }
        Ok(report)
    }
}
