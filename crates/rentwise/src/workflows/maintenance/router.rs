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
use crate::money::Cents;
use crate::store::RepositoryError;
use crate::workflows::marketplace::{BookingId, ContractorId};

use super::domain::{MaintenanceTicket, NewTicket, TicketId};
use super::service::{MaintenanceError, MaintenanceService};

pub fn maintenance_router(service: Arc<MaintenanceService>) -> Router {
    Router::new()
        .route("/api/v1/maintenance/tickets", post(open_handler))
        .route("/api/v1/maintenance/overdue", get(overdue_handler))
        .route("/api/v1/maintenance/tickets/:ticket_id", get(ticket_handler))
        .route(
            "/api/v1/maintenance/tickets/:ticket_id/assign",
            post(assign_handler),
        )
        .route(
            "/api/v1/maintenance/tickets/:ticket_id/start",
            post(start_handler),
        )
        .route(
            "/api/v1/maintenance/tickets/:ticket_id/resolve",
            post(resolve_handler),
        )
        .route(
            "/api/v1/maintenance/tickets/:ticket_id/reopen",
            post(reopen_handler),
        )
        .route(
            "/api/v1/maintenance/tickets/:ticket_id/close",
            post(close_handler),
        )
        .route(
            "/api/v1/maintenance/tickets/:ticket_id/cancel",
            post(cancel_handler),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct AssignRequest {
    contractor_id: ContractorId,
    #[serde(default)]
    booking_id: Option<BookingId>,
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    cost: Cents,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReasonRequest {
    reason: String,
}

fn failure(error: MaintenanceError) -> Response {
    let status = match &error {
        MaintenanceError::NotFound(_)
        | MaintenanceError::PropertyNotFound(_)
        | MaintenanceError::UnitNotFound(_)
        | MaintenanceError::ContractorNotFound(_)
        | MaintenanceError::BookingNotFound(_)
        | MaintenanceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        MaintenanceError::InvalidTransition { .. }
        | MaintenanceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        MaintenanceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MaintenanceError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, error)
}

fn reply(result: Result<MaintenanceTicket, MaintenanceError>) -> Response {
    match result {
        Ok(ticket) => Json(ticket).into_response(),
        Err(error) => failure(error),
    }
}

async fn open_handler(
    State(service): State<Arc<MaintenanceService>>,
    Json(request): Json<NewTicket>,
) -> Response {
    match service.open(request, Utc::now()) {
        Ok(ticket) => (StatusCode::CREATED, Json(ticket)).into_response(),
        Err(error) => failure(error),
    }
}

async fn ticket_handler(
    State(service): State<Arc<MaintenanceService>>,
    Path(ticket_id): Path<String>,
) -> Response {
    reply(service.ticket(&TicketId(ticket_id)))
}

async fn overdue_handler(State(service): State<Arc<MaintenanceService>>) -> Response {
    match service.overdue(Utc::now()) {
        Ok(tickets) => Json(tickets).into_response(),
        Err(error) => failure(error),
    }
}

async fn assign_handler(
    State(service): State<Arc<MaintenanceService>>,
    Path(ticket_id): Path<String>,
    Json(request): Json<AssignRequest>,
) -> Response {
    reply(service.assign(
        &TicketId(ticket_id),
        &request.contractor_id,
        request.booking_id,
        Utc::now(),
    ))
}

async fn start_handler(
    State(service): State<Arc<MaintenanceService>>,
    Path(ticket_id): Path<String>,
) -> Response {
    reply(service.start(&TicketId(ticket_id), Utc::now()))
}

async fn resolve_handler(
    State(service): State<Arc<MaintenanceService>>,
    Path(ticket_id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> Response {
    reply(service.resolve(
        &TicketId(ticket_id),
        request.cost,
        request.note,
        Utc::now(),
    ))
}

async fn reopen_handler(
    State(service): State<Arc<MaintenanceService>>,
    Path(ticket_id): Path<String>,
    Json(request): Json<ReasonRequest>,
) -> Response {
    reply(service.reopen(&TicketId(ticket_id), &request.reason, Utc::now()))
}

async fn close_handler(
    State(service): State<Arc<MaintenanceService>>,
    Path(ticket_id): Path<String>,
) -> Response {
    reply(service.close(&TicketId(ticket_id), Utc::now()))
}

async fn cancel_handler(
    State(service): State<Arc<MaintenanceService>>,
    Path(ticket_id): Path<String>,
    Json(request): Json<ReasonRequest>,
) -> Response {
    reply(service.cancel(&TicketId(ticket_id), &request.reason, Utc::now()))
}
