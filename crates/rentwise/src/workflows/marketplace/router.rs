use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::error_response;
use crate::store::RepositoryError;

use super::domain::{BookingId, BookingRequest, CancelledBy, ContractorId, NewContractor};
use super::payments::PaymentError;
use super::service::{BookingError, BookingService};

pub fn marketplace_router(service: Arc<BookingService>) -> Router {
    Router::new()
        .route(
            "/api/v1/contractors",
            get(list_contractors_handler).post(register_contractor_handler),
        )
        .route(
            "/api/v1/contractors/:contractor_id/availability",
            post(availability_handler),
        )
        .route("/api/v1/bookings", post(book_handler))
        .route("/api/v1/bookings/:booking_id", get(booking_handler))
        .route("/api/v1/bookings/:booking_id/cancel", post(cancel_handler))
        .route(
            "/api/v1/bookings/:booking_id/complete",
            post(complete_handler),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct AvailabilityRequest {
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CancelRequest {
    cancelled_by: CancelledBy,
}

fn failure(error: BookingError) -> Response {
    let status = match &error {
        BookingError::ContractorNotFound(_)
        | BookingError::NotFound(_)
        | BookingError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        BookingError::SlotTaken(_)
        | BookingError::InvalidTransition { .. }
        | BookingError::NotStarted(_)
        | BookingError::InstantBookingDisabled(_)
        | BookingError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        BookingError::InvalidSlot(_)
        | BookingError::OutsideAvailability
        | BookingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::Payment(PaymentError::Declined(_)) => StatusCode::PAYMENT_REQUIRED,
        BookingError::Payment(_) => StatusCode::BAD_GATEWAY,
        BookingError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, error)
}

async fn register_contractor_handler(
    State(service): State<Arc<BookingService>>,
    Json(request): Json<NewContractor>,
) -> Response {
    match service.register_contractor(request) {
        Ok(contractor) => (StatusCode::CREATED, Json(contractor)).into_response(),
        Err(error) => failure(error),
    }
}

async fn list_contractors_handler(State(service): State<Arc<BookingService>>) -> Response {
    match service.contractors() {
        Ok(contractors) => Json(contractors).into_response(),
        Err(error) => failure(error),
    }
}

async fn availability_handler(
    State(service): State<Arc<BookingService>>,
    Path(contractor_id): Path<String>,
    Json(request): Json<AvailabilityRequest>,
) -> Response {
    match service.add_availability(
        &ContractorId(contractor_id),
        request.starts_at,
        request.ends_at,
    ) {
        Ok(window) => (StatusCode::CREATED, Json(window)).into_response(),
        Err(error) => failure(error),
    }
}

async fn book_handler(
    State(service): State<Arc<BookingService>>,
    Json(request): Json<BookingRequest>,
) -> Response {
    match service.book_instant(request, Utc::now()) {
        Ok(booking) => (StatusCode::CREATED, Json(booking)).into_response(),
        Err(error) => failure(error),
    }
}

async fn booking_handler(
    State(service): State<Arc<BookingService>>,
    Path(booking_id): Path<String>,
) -> Response {
    match service.booking(&BookingId(booking_id)) {
        Ok(booking) => Json(booking).into_response(),
        Err(error) => failure(error),
    }
}

async fn cancel_handler(
    State(service): State<Arc<BookingService>>,
    Path(booking_id): Path<String>,
    Json(request): Json<CancelRequest>,
) -> Response {
    match service.cancel(&BookingId(booking_id), request.cancelled_by, Utc::now()) {
        Ok(booking) => Json(booking).into_response(),
        Err(error) => failure(error),
    }
}

async fn complete_handler(
    State(service): State<Arc<BookingService>>,
    Path(booking_id): Path<String>,
) -> Response {
    match service.complete(&BookingId(booking_id), Utc::now()) {
        Ok(booking) => Json(booking).into_response(),
        Err(error) => failure(error),
    }
}
