use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::error::error_response;
use crate::store::RepositoryError;
use crate::workflows::leasing::document::DocumentId;

use super::domain::{LandlordId, NewLandlord, NewProperty, NewTenant, NewUnit, PropertyId, UnitId};
use super::service::{PortfolioError, PortfolioService};

/// Router exposing registration and lookup of portfolio records.
pub fn portfolio_router(service: Arc<PortfolioService>) -> Router {
    Router::new()
        .route("/api/v1/landlords", post(register_landlord_handler))
        .route("/api/v1/landlords/:landlord_id", get(landlord_handler))
        .route("/api/v1/properties", post(add_property_handler))
        .route("/api/v1/properties/:property_id", get(property_handler))
        .route(
            "/api/v1/properties/:property_id/units",
            get(property_units_handler),
        )
        .route(
            "/api/v1/properties/:property_id/default-lease",
            put(default_lease_handler),
        )
        .route("/api/v1/units", post(add_unit_handler))
        .route("/api/v1/units/:unit_id", get(unit_handler))
        .route("/api/v1/units/:unit_id/availability", put(availability_handler))
        .route("/api/v1/tenants", post(add_tenant_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct DefaultLeaseRequest {
    document_id: DocumentId,
}

#[derive(Debug, Deserialize)]
struct AvailabilityRequest {
    available: bool,
}

fn failure(error: PortfolioError) -> Response {
    let status = match &error {
        PortfolioError::Validation(_) | PortfolioError::DocumentOwnership { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PortfolioError::LandlordNotFound(_)
        | PortfolioError::PropertyNotFound(_)
        | PortfolioError::UnitNotFound(_)
        | PortfolioError::TenantNotFound(_)
        | PortfolioError::DocumentNotFound(_)
        | PortfolioError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        PortfolioError::UnitInUse { .. } | PortfolioError::Repository(RepositoryError::Conflict) => {
            StatusCode::CONFLICT
        }
        PortfolioError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, error)
}

async fn register_landlord_handler(
    State(service): State<Arc<PortfolioService>>,
    Json(request): Json<NewLandlord>,
) -> Response {
    match service.register_landlord(request) {
        Ok(landlord) => (StatusCode::CREATED, Json(landlord)).into_response(),
        Err(error) => failure(error),
    }
}

async fn landlord_handler(
    State(service): State<Arc<PortfolioService>>,
    Path(landlord_id): Path<String>,
) -> Response {
    match service.landlord(&LandlordId(landlord_id)) {
        Ok(landlord) => Json(landlord).into_response(),
        Err(error) => failure(error),
    }
}

async fn add_property_handler(
    State(service): State<Arc<PortfolioService>>,
    Json(request): Json<NewProperty>,
) -> Response {
    match service.add_property(request) {
        Ok(property) => (StatusCode::CREATED, Json(property)).into_response(),
        Err(error) => failure(error),
    }
}

async fn property_handler(
    State(service): State<Arc<PortfolioService>>,
    Path(property_id): Path<String>,
) -> Response {
    match service.property(&PropertyId(property_id)) {
        Ok(property) => Json(property).into_response(),
        Err(error) => failure(error),
    }
}

async fn property_units_handler(
    State(service): State<Arc<PortfolioService>>,
    Path(property_id): Path<String>,
) -> Response {
    match service.units_for_property(&PropertyId(property_id)) {
        Ok(units) => Json(units).into_response(),
        Err(error) => failure(error),
    }
}

async fn default_lease_handler(
    State(service): State<Arc<PortfolioService>>,
    Path(property_id): Path<String>,
    Json(request): Json<DefaultLeaseRequest>,
) -> Response {
    match service.assign_default_lease(&PropertyId(property_id), &request.document_id) {
        Ok(property) => Json(property).into_response(),
        Err(error) => failure(error),
    }
}

async fn add_unit_handler(
    State(service): State<Arc<PortfolioService>>,
    Json(request): Json<NewUnit>,
) -> Response {
    match service.add_unit(request) {
        Ok(unit) => (StatusCode::CREATED, Json(unit)).into_response(),
        Err(error) => failure(error),
    }
}

async fn unit_handler(
    State(service): State<Arc<PortfolioService>>,
    Path(unit_id): Path<String>,
) -> Response {
    match service.unit(&UnitId(unit_id)) {
        Ok(unit) => Json(unit).into_response(),
        Err(error) => failure(error),
    }
}

async fn availability_handler(
    State(service): State<Arc<PortfolioService>>,
    Path(unit_id): Path<String>,
    Json(request): Json<AvailabilityRequest>,
) -> Response {
    match service.set_availability(&UnitId(unit_id), request.available) {
        Ok(unit) => Json(unit).into_response(),
        Err(error) => failure(error),
    }
}

async fn add_tenant_handler(
    State(service): State<Arc<PortfolioService>>,
    Json(request): Json<NewTenant>,
) -> Response {
    match service.add_tenant(request) {
        Ok(tenant) => (StatusCode::CREATED, Json(tenant)).into_response(),
        Err(error) => failure(error),
    }
}
