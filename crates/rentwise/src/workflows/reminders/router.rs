use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::error::error_response;

use super::service::RentReminderService;

pub fn reminder_router(service: Arc<RentReminderService>) -> Router {
    Router::new()
        .route("/api/v1/reminders/run", post(run_handler))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
struct RunRequest {
    /// Defaults to the current UTC date.
    #[serde(default)]
    today: Option<NaiveDate>,
}

async fn run_handler(
    State(service): State<Arc<RentReminderService>>,
    request: Option<Json<RunRequest>>,
) -> Response {
    let now = Utc::now();
    let today = request
        .and_then(|Json(request)| request.today)
        .unwrap_or_else(|| now.date_naive());
    match service.run(today, now) {
        Ok(summary) => Json(summary).into_response(),
        Err(error) => error_response(StatusCode::INTERNAL_SERVER_ERROR, error),
    }
}
