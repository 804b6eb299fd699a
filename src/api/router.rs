//! HTTP router for the reminder service.
//!
//! Returns a composable `Router` with every route nested under `/api/`.
//! Responses carry `Cache-Control: no-store`; requests are traced.

use axum::http::{header, HeaderValue};
use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;

/// Build the API router.
///
/// NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
pub fn api_router(ctx: ApiContext) -> Router {
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/schedules", post(endpoints::schedules::save))
        .route(
            "/patients/:patient_ref/reminders",
            get(endpoints::schedules::list),
        )
        .route(
            "/patients/:patient_ref/medications/:name",
            delete(endpoints::schedules::delete_medication),
        )
        .route(
            "/patients/:patient_ref/phone",
            put(endpoints::schedules::update_phone),
        )
        .route(
            "/patients/:patient_ref/adherence",
            get(endpoints::adherence::list_records),
        )
        .route(
            "/patients/:patient_ref/alerts",
            get(endpoints::adherence::list_alerts),
        )
        .route("/reminders/:id/active", post(endpoints::reminders::set_active))
        .route("/reminders/:id/time", put(endpoints::reminders::retime))
        .route("/reminders/:id/taken", post(endpoints::reminders::mark_taken))
        .route("/push/subscriptions", post(endpoints::subscriptions::subscribe))
        .route(
            "/voice/twiml/:script",
            get(endpoints::voice::script).post(endpoints::voice::script),
        )
        .route(
            "/voice/callback/:script",
            post(endpoints::voice::callback),
        )
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
}
