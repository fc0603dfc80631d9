use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use crate::error::error_response;
use crate::money::Cents;
use crate::portfolio::{LandlordId, PortfolioError, PortfolioService, PropertyId, TenantId, UnitId};
use crate::store::RepositoryError;

use super::agreement::LeaseId;
use super::builder::{LateFee, LeaseTerms};
use super::document::{DocumentError, DocumentId, LeaseDocumentService};
use super::signatures::{SignatureRequestId, SigningError, SigningService};

/// Services shared by the lease and signature endpoints.
#[derive(Clone)]
pub struct LeasingState {
    pub documents: Arc<LeaseDocumentService>,
    pub signing: Arc<SigningService>,
    pub portfolio: Arc<PortfolioService>,
}

pub fn leasing_router(state: LeasingState) -> Router {
    Router::new()
        .route("/api/v1/leases/preview", post(preview_handler))
        .route("/api/v1/leases/:lease_id", get(lease_handler))
        .route("/api/v1/leases/:lease_id/send", post(send_handler))
        .route("/api/v1/leases/:lease_id/void", post(void_handler))
        .route(
            "/api/v1/leases/:lease_id/signatures",
            get(lease_signatures_handler),
        )
        .route("/api/v1/leases/:lease_id/audit", get(audit_handler))
        .route("/api/v1/documents", post(upload_handler))
        .route("/api/v1/documents/:document_id", get(document_handler))
        .route("/api/v1/signatures/:request_id", get(signature_handler))
        .route("/api/v1/signatures/:request_id/view", post(view_handler))
        .route("/api/v1/signatures/:request_id/sign", post(sign_handler))
        .route(
            "/api/v1/signatures/:request_id/decline",
            post(decline_handler),
        )
        .with_state(state)
}

/// Lease terms expressed with record ids, resolved against the portfolio before building.
#[derive(Debug, Deserialize)]
pub struct LeaseTermsRequest {
    pub property_id: PropertyId,
    pub unit_id: UnitId,
    pub tenant_ids: Vec<TenantId>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub monthly_rent: Option<Cents>,
    #[serde(default)]
    pub security_deposit: Option<Cents>,
    #[serde(default = "default_due_day")]
    pub rent_due_day: u8,
    #[serde(default)]
    pub late_fee: Option<LateFee>,
    #[serde(default)]
    pub pets_allowed: bool,
    #[serde(default)]
    pub utilities_included: Vec<String>,
    #[serde(default)]
    pub additional_terms: Vec<String>,
}

fn default_due_day() -> u8 {
    1
}

impl LeaseTermsRequest {
    fn resolve(self, portfolio: &PortfolioService) -> Result<LeaseTerms, PortfolioError> {
        let property = portfolio.property(&self.property_id)?;
        let landlord = portfolio.landlord(&property.landlord_id)?;
        let unit = portfolio.unit(&self.unit_id)?;
        let tenants = self
            .tenant_ids
            .iter()
            .map(|id| portfolio.tenant(id))
            .collect::<Result<Vec<_>, _>>()?;
        let monthly_rent = self.monthly_rent.unwrap_or(unit.market_rent);

        Ok(LeaseTerms {
            landlord,
            property,
            unit,
            tenants,
            start_date: self.start_date,
            end_date: self.end_date,
            monthly_rent,
            security_deposit: self.security_deposit.unwrap_or(monthly_rent),
            rent_due_day: self.rent_due_day,
            late_fee: self.late_fee,
            pets_allowed: self.pets_allowed,
            utilities_included: self.utilities_included,
            additional_terms: self.additional_terms,
        })
    }
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    landlord_id: LandlordId,
    title: String,
    content_type: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ReasonRequest {
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct SignRequest {
    signed_name: String,
    document_digest: String,
}

fn repository_status(error: &RepositoryError) -> StatusCode {
    match error {
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Conflict => StatusCode::CONFLICT,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn portfolio_failure(error: PortfolioError) -> Response {
    let status = match &error {
        PortfolioError::Validation(_) | PortfolioError::DocumentOwnership { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PortfolioError::Repository(inner) => repository_status(inner),
        PortfolioError::UnitInUse { .. } => StatusCode::CONFLICT,
        _ => StatusCode::NOT_FOUND,
    };
    error_response(status, error)
}

fn document_failure(error: DocumentError) -> Response {
    let status = match &error {
        DocumentError::Build(_) | DocumentError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DocumentError::Render(_) | DocumentError::Store(_) => StatusCode::BAD_GATEWAY,
        DocumentError::Repository(inner) => repository_status(inner),
    };
    error_response(status, error)
}

fn signing_failure(error: SigningError) -> Response {
    let status = match &error {
        SigningError::LeaseNotFound(_) | SigningError::RequestNotFound(_) => StatusCode::NOT_FOUND,
        SigningError::Lease(_)
        | SigningError::LeaseClosed { .. }
        | SigningError::RequestClosed { .. }
        | SigningError::CountersignatureTooEarly => StatusCode::CONFLICT,
        SigningError::DocumentMismatch | SigningError::MissingSignature => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SigningError::PartyNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SigningError::Repository(inner) => repository_status(inner),
    };
    error_response(status, error)
}

async fn preview_handler(
    State(state): State<LeasingState>,
    Json(request): Json<LeaseTermsRequest>,
) -> Response {
    let terms = match request.resolve(&state.portfolio) {
        Ok(terms) => terms,
        Err(error) => return portfolio_failure(error),
    };
    match state.documents.preview(&terms, Utc::now()) {
        Ok(html) => (
            [(header::CONTENT_TYPE, mime::TEXT_HTML_UTF_8.as_ref())],
            html,
        )
            .into_response(),
        Err(error) => document_failure(error),
    }
}

async fn upload_handler(
    State(state): State<LeasingState>,
    Json(request): Json<UploadRequest>,
) -> Response {
    if let Err(error) = state.portfolio.landlord(&request.landlord_id) {
        return portfolio_failure(error);
    }
    match state.documents.register_upload(
        &request.landlord_id,
        &request.title,
        request.content.as_bytes(),
        &request.content_type,
        Utc::now(),
    ) {
        Ok(document) => (StatusCode::CREATED, Json(document)).into_response(),
        Err(error) => document_failure(error),
    }
}

async fn document_handler(
    State(state): State<LeasingState>,
    Path(document_id): Path<String>,
) -> Response {
    let id = DocumentId(document_id);
    match state.documents.document(&id) {
        Ok(Some(document)) => Json(document).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("document {id} not found")),
        Err(error) => document_failure(error),
    }
}

async fn lease_handler(
    State(state): State<LeasingState>,
    Path(lease_id): Path<String>,
) -> Response {
    match state.signing.lease(&LeaseId(lease_id)) {
        Ok(lease) => Json(lease).into_response(),
        Err(error) => signing_failure(error),
    }
}

async fn send_handler(
    State(state): State<LeasingState>,
    Path(lease_id): Path<String>,
) -> Response {
    match state
        .signing
        .send_for_signature(&LeaseId(lease_id), Utc::now())
    {
        Ok(requests) => (StatusCode::ACCEPTED, Json(requests)).into_response(),
        Err(error) => signing_failure(error),
    }
}

async fn void_handler(
    State(state): State<LeasingState>,
    Path(lease_id): Path<String>,
    Json(request): Json<ReasonRequest>,
) -> Response {
    match state
        .signing
        .void(&LeaseId(lease_id), &request.reason, Utc::now())
    {
        Ok(lease) => Json(lease).into_response(),
        Err(error) => signing_failure(error),
    }
}

async fn lease_signatures_handler(
    State(state): State<LeasingState>,
    Path(lease_id): Path<String>,
) -> Response {
    match state.signing.requests_for_lease(&LeaseId(lease_id)) {
        Ok(requests) => Json(requests).into_response(),
        Err(error) => signing_failure(error),
    }
}

async fn audit_handler(
    State(state): State<LeasingState>,
    Path(lease_id): Path<String>,
) -> Response {
    match state.signing.audit_trail(&LeaseId(lease_id)) {
        Ok(trail) => {
            let verification = trail.verify();
            Json(json!({
                "events": trail.events(),
                "head_hash": trail.head_hash(),
                "verified": verification.is_ok(),
                "error": verification.err().map(|err| err.to_string()),
            }))
            .into_response()
        }
        Err(error) => signing_failure(error),
    }
}

async fn signature_handler(
    State(state): State<LeasingState>,
    Path(request_id): Path<String>,
) -> Response {
    match state.signing.request(&SignatureRequestId(request_id)) {
        Ok(request) => Json(request).into_response(),
        Err(error) => signing_failure(error),
    }
}

async fn view_handler(
    State(state): State<LeasingState>,
    Path(request_id): Path<String>,
) -> Response {
    match state
        .signing
        .record_view(&SignatureRequestId(request_id), Utc::now())
    {
        Ok(request) => Json(request).into_response(),
        Err(error) => signing_failure(error),
    }
}

async fn sign_handler(
    State(state): State<LeasingState>,
    Path(request_id): Path<String>,
    Json(request): Json<SignRequest>,
) -> Response {
    match state.signing.sign(
        &SignatureRequestId(request_id),
        &request.signed_name,
        &request.document_digest,
        Utc::now(),
    ) {
        Ok(outcome) => Json(outcome).into_response(),
        Err(error) => signing_failure(error),
    }
}

async fn decline_handler(
    State(state): State<LeasingState>,
    Path(request_id): Path<String>,
    Json(request): Json<ReasonRequest>,
) -> Response {
    match state
        .signing
        .decline(&SignatureRequestId(request_id), &request.reason, Utc::now())
    {
        Ok(lease) => Json(lease).into_response(),
        Err(error) => signing_failure(error),
    }
}
