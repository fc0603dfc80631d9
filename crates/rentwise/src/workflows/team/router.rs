use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::error_response;
use crate::portfolio::LandlordId;
use crate::store::RepositoryError;

use super::domain::{normalize_email, TeamMember, TeamRole};
use super::service::{TeamError, TeamService};

/// Header naming the signed-in team member acting on the account.
pub const ACTOR_HEADER: &str = "x-actor-email";

pub fn team_router(service: Arc<TeamService>) -> Router {
    Router::new()
        .route("/api/v1/team/:landlord_id/members", get(members_handler))
        .route(
            "/api/v1/team/:landlord_id/invitations",
            post(invite_handler),
        )
        .route(
            "/api/v1/team/:landlord_id/members/:email/accept",
            post(accept_handler),
        )
        .route(
            "/api/v1/team/:landlord_id/members/:email/role",
            put(role_handler),
        )
        .route(
            "/api/v1/team/:landlord_id/members/:email",
            delete(remove_handler),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct InviteRequest {
    email: String,
    role: TeamRole,
}

#[derive(Debug, Deserialize)]
struct RoleRequest {
    role: TeamRole,
}

pub(crate) fn failure(error: TeamError) -> Response {
    let status = match &error {
        TeamError::AccountNotFound(_)
        | TeamError::NotFound(_)
        | TeamError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        TeamError::Forbidden { .. } => StatusCode::FORBIDDEN,
        TeamError::AlreadyMember { .. }
        | TeamError::NotInvited { .. }
        | TeamError::LastOwner(_)
        | TeamError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        TeamError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        TeamError::Repository(RepositoryError::Unavailable(_)) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, error)
}

/// Normalized email from the actor header, or a 401 response.
pub(crate) fn actor(headers: &HeaderMap) -> Result<String, Response> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(normalize_email)
        .filter(|email| !email.is_empty())
        .ok_or_else(|| {
            error_response(
                StatusCode::UNAUTHORIZED,
                format!("missing {ACTOR_HEADER} header"),
            )
        })
}

fn reply(result: Result<TeamMember, TeamError>) -> Response {
    match result {
        Ok(member) => Json(member).into_response(),
        Err(error) => failure(error),
    }
}

async fn members_handler(
    State(service): State<Arc<TeamService>>,
    Path(landlord_id): Path<String>,
) -> Response {
    match service.members(&LandlordId(landlord_id)) {
        Ok(members) => Json(members).into_response(),
        Err(error) => failure(error),
    }
}

async fn invite_handler(
    State(service): State<Arc<TeamService>>,
    Path(landlord_id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<InviteRequest>,
) -> Response {
    let actor = match actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    match service.invite(
        &LandlordId(landlord_id),
        &actor,
        &request.email,
        request.role,
        Utc::now(),
    ) {
        Ok(member) => (StatusCode::CREATED, Json(member)).into_response(),
        Err(error) => failure(error),
    }
}

async fn accept_handler(
    State(service): State<Arc<TeamService>>,
    Path((landlord_id, email)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    // Only the invitee can accept their own invitation.
    if actor != normalize_email(&email) {
        return error_response(
            StatusCode::FORBIDDEN,
            format!("{actor} cannot accept an invitation for {email}"),
        );
    }
    reply(service.accept(&LandlordId(landlord_id), &email, Utc::now()))
}

async fn role_handler(
    State(service): State<Arc<TeamService>>,
    Path((landlord_id, email)): Path<(String, String)>,
    headers: HeaderMap,
    Json(request): Json<RoleRequest>,
) -> Response {
    let actor = match actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    reply(service.change_role(&LandlordId(landlord_id), &actor, &email, request.role))
}

async fn remove_handler(
    State(service): State<Arc<TeamService>>,
    Path((landlord_id, email)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let actor = match actor(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    reply(service.remove(&LandlordId(landlord_id), &actor, &email))
}
