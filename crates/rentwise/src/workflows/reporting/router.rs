use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::error_response;
use crate::portfolio::LandlordId;
use crate::workflows::team::router::{actor, failure as team_failure};
use crate::workflows::team::{Permission, TeamService};

use super::financial::{ReportError, ReportingService};

/// Reports are scoped to one account and need a member holding `ViewReports`.
#[derive(Clone)]
pub struct ReportingState {
    pub reports: Arc<ReportingService>,
    pub team: Arc<TeamService>,
}

pub fn reporting_router(state: ReportingState) -> Router {
    Router::new()
        .route("/api/v1/reports/financial", get(financial_handler))
        .with_state(state)
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ReportFormat {
    #[default]
    Json,
    Csv,
}

#[derive(Debug, Deserialize)]
struct FinancialQuery {
    landlord_id: LandlordId,
    from: NaiveDate,
    to: NaiveDate,
    #[serde(default)]
    format: ReportFormat,
}

fn failure(error: ReportError) -> Response {
    let status = match &error {
        ReportError::LandlordNotFound(_) => StatusCode::NOT_FOUND,
        ReportError::InvalidRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, error)
}

async fn financial_handler(
    State(state): State<ReportingState>,
    headers: HeaderMap,
    Query(query): Query<FinancialQuery>,
) -> Response {
    let actor = match actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    if let Err(error) = state
        .team
        .authorize(&query.landlord_id, &actor, Permission::ViewReports)
    {
        return team_failure(error);
    }
    let report = match state.reports.financial_report(&query.landlord_id, query.from, query.to) {
        Ok(report) => report,
        Err(error) => return failure(error),
    };
    match query.format {
        ReportFormat::Json => Json(report).into_response(),
        ReportFormat::Csv => match report.to_csv() {
            Ok(body) => (
                [(header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.as_ref())],
                body,
            )
                .into_response(),
            Err(error) => failure(error),
        },
    }
}
