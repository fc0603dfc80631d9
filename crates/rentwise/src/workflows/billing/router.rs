use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::error::error_response;
use crate::money::Cents;
use crate::portfolio::LandlordId;
use crate::store::RepositoryError;

use super::domain::{Invoice, InvoiceId, InvoiceView, LineItem, NewInvoice};
use super::service::{BillingError, BillingService};

pub fn billing_router(service: Arc<BillingService>) -> Router {
    Router::new()
        .route("/api/v1/invoices", post(create_handler))
        .route("/api/v1/invoices/:invoice_id", get(invoice_handler))
        .route("/api/v1/invoices/:invoice_id/items", post(add_item_handler))
        .route("/api/v1/invoices/:invoice_id/issue", post(issue_handler))
        .route(
            "/api/v1/invoices/:invoice_id/payments",
            post(payment_handler),
        )
        .route("/api/v1/invoices/:invoice_id/void", post(void_handler))
        .route(
            "/api/v1/landlords/:landlord_id/invoices",
            get(landlord_invoices_handler),
        )
        .route("/api/v1/billing/rent-run", post(rent_run_handler))
        .route("/api/v1/billing/late-fees", post(late_fees_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct PaymentRequest {
    amount: Cents,
    method: String,
    #[serde(default)]
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RentRunRequest {
    period: NaiveDate,
}

fn failure(error: BillingError) -> Response {
    let status = match &error {
        BillingError::NotFound(_)
        | BillingError::LandlordNotFound(_)
        | BillingError::TenantNotFound(_)
        | BillingError::LeaseNotFound(_)
        | BillingError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        BillingError::NotDraft { .. }
        | BillingError::InvalidTransition { .. }
        | BillingError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        BillingError::Overpayment { .. } | BillingError::Validation(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        BillingError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, error)
}

fn reply(result: Result<Invoice, BillingError>) -> Response {
    match result {
        Ok(invoice) => Json(InvoiceView::from(invoice)).into_response(),
        Err(error) => failure(error),
    }
}

fn reply_many(result: Result<Vec<Invoice>, BillingError>) -> Response {
    match result {
        Ok(invoices) => Json(
            invoices
                .into_iter()
                .map(InvoiceView::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(error) => failure(error),
    }
}

async fn create_handler(
    State(service): State<Arc<BillingService>>,
    Json(request): Json<NewInvoice>,
) -> Response {
    match service.create_draft(request) {
        Ok(invoice) => (StatusCode::CREATED, Json(InvoiceView::from(invoice))).into_response(),
        Err(error) => failure(error),
    }
}

async fn invoice_handler(
    State(service): State<Arc<BillingService>>,
    Path(invoice_id): Path<String>,
) -> Response {
    reply(service.invoice(&InvoiceId(invoice_id)))
}

async fn add_item_handler(
    State(service): State<Arc<BillingService>>,
    Path(invoice_id): Path<String>,
    Json(item): Json<LineItem>,
) -> Response {
    reply(service.add_line_item(&InvoiceId(invoice_id), item))
}

async fn issue_handler(
    State(service): State<Arc<BillingService>>,
    Path(invoice_id): Path<String>,
) -> Response {
    reply(service.issue(&InvoiceId(invoice_id), Utc::now()))
}

async fn payment_handler(
    State(service): State<Arc<BillingService>>,
    Path(invoice_id): Path<String>,
    Json(request): Json<PaymentRequest>,
) -> Response {
    reply(service.record_payment(
        &InvoiceId(invoice_id),
        request.amount,
        Utc::now(),
        &request.method,
        request.reference,
    ))
}

async fn void_handler(
    State(service): State<Arc<BillingService>>,
    Path(invoice_id): Path<String>,
) -> Response {
    reply(service.void(&InvoiceId(invoice_id)))
}

async fn landlord_invoices_handler(
    State(service): State<Arc<BillingService>>,
    Path(landlord_id): Path<String>,
) -> Response {
    reply_many(service.invoices_for_landlord(&LandlordId(landlord_id)))
}

async fn rent_run_handler(
    State(service): State<Arc<BillingService>>,
    Json(request): Json<RentRunRequest>,
) -> Response {
    let now = Utc::now();
    reply_many(service.generate_rent_invoices(request.period, now.date_naive(), now))
}

async fn late_fees_handler(State(service): State<Arc<BillingService>>) -> Response {
    reply_many(service.apply_late_fees(Utc::now().date_naive()))
}
