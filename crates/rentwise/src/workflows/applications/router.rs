use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::error_response;
use crate::portfolio::UnitId;
use crate::store::RepositoryError;
use crate::workflows::leasing::document::DocumentError;
use crate::workflows::leasing::signatures::SigningError;

use super::domain::{ApplicationId, ApplicationSubmission, ApprovalRequest};
use super::service::{ApplicationError, ApplicationService};

/// Router exposing intake and the approval decisions.
pub fn application_router(service: Arc<ApplicationService>) -> Router {
    Router::new()
        .route("/api/v1/applications", post(submit_handler))
        .route("/api/v1/applications/:application_id", get(status_handler))
        .route(
            "/api/v1/applications/:application_id/approve",
            post(approve_handler),
        )
        .route(
            "/api/v1/applications/:application_id/reject",
            post(reject_handler),
        )
        .route(
            "/api/v1/applications/:application_id/withdraw",
            post(withdraw_handler),
        )
        .route(
            "/api/v1/units/:unit_id/applications",
            get(pending_for_unit_handler),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    reason: String,
}

pub(crate) fn failure(error: ApplicationError) -> Response {
    let status = match &error {
        ApplicationError::NotFound(_)
        | ApplicationError::UnitNotFound(_)
        | ApplicationError::TenantNotFound(_)
        | ApplicationError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ApplicationError::UnitUnavailable { .. }
        | ApplicationError::InvalidTransition { .. }
        | ApplicationError::Repository(RepositoryError::Conflict)
        | ApplicationError::Signing(SigningError::Lease(_)) => StatusCode::CONFLICT,
        ApplicationError::Validation(_)
        | ApplicationError::Document(DocumentError::Build(_))
        | ApplicationError::Document(DocumentError::Validation(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ApplicationError::Document(DocumentError::Render(_))
        | ApplicationError::Document(DocumentError::Store(_)) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error)
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<ApplicationService>>,
    Json(submission): Json<ApplicationSubmission>,
) -> Response {
    match service.submit(submission, Utc::now()) {
        Ok(application) => (StatusCode::CREATED, Json(application)).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn status_handler(
    State(service): State<Arc<ApplicationService>>,
    Path(application_id): Path<String>,
) -> Response {
    match service.get(&ApplicationId(application_id)) {
        Ok(application) => Json(application).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn approve_handler(
    State(service): State<Arc<ApplicationService>>,
    Path(application_id): Path<String>,
    Json(request): Json<ApprovalRequest>,
) -> Response {
    match service.approve(&ApplicationId(application_id), request, Utc::now()) {
        Ok(outcome) => Json(outcome).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn reject_handler(
    State(service): State<Arc<ApplicationService>>,
    Path(application_id): Path<String>,
    Json(request): Json<RejectRequest>,
) -> Response {
    match service.reject(&ApplicationId(application_id), &request.reason, Utc::now()) {
        Ok(application) => Json(application).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn withdraw_handler(
    State(service): State<Arc<ApplicationService>>,
    Path(application_id): Path<String>,
) -> Response {
    match service.withdraw(&ApplicationId(application_id), Utc::now()) {
        Ok(application) => Json(application).into_response(),
        Err(error) => failure(error),
    }
}

pub(crate) async fn pending_for_unit_handler(
    State(service): State<Arc<ApplicationService>>,
    Path(unit_id): Path<String>,
) -> Response {
    match service.pending_for_unit(&UnitId(unit_id)) {
        Ok(applications) => Json(applications).into_response(),
        Err(error) => failure(error),
    }
}
