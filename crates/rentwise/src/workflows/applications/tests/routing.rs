use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;
use crate::workflows::applications::application_router;
use crate::workflows::applications::router::submit_handler;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn submit_handler_returns_created() {
    let world = world();
    let response =
        submit_handler(State(world.service.clone()), Json(submission(&world))).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = read_json_body(response).await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["screening"]["recommendation"]["kind"], "recommend");
}

#[tokio::test]
async fn submit_route_reports_unknown_unit() {
    let world = world();
    let router = application_router(Arc::clone(&world.service));
    let mut payload = serde_json::to_value(submission(&world)).expect("json");
    payload["unit_id"] = json!("unit-missing");

    let response = router
        .oneshot(post_json("/api/v1/applications", payload))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn approve_route_returns_lease_and_requests() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    let router = application_router(Arc::clone(&world.service));

    let response = router
        .oneshot(post_json(
            &format!("/api/v1/applications/{}/approve", application.id),
            json!({ "month_to_month": true, "note": "great references" }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json_body(response).await;
    assert_eq!(body["application"]["status"], "approved");
    assert_eq!(body["application"]["decision_note"], "great references");
    assert_eq!(body["lease"]["status"], "awaiting_signatures");
    assert_eq!(body["lease"]["end_date"], Value::Null);
    assert_eq!(
        body["signature_requests"]
            .as_array()
            .map(Vec::len)
            .unwrap_or_default(),
        3
    );
}

#[tokio::test]
async fn reject_after_withdraw_is_conflict() {
    let world = world();
    let application = world
        .service
        .submit(submission(&world), submitted_at())
        .expect("submitted");
    let router = application_router(Arc::clone(&world.service));

    let withdrawn = router
        .clone()
        .oneshot(post_json(
            &format!("/api/v1/applications/{}/withdraw", application.id),
            json!({}),
        ))
        .await
        .expect("response");
    assert_eq!(withdrawn.status(), StatusCode::OK);

    let rejected = router
        .oneshot(post_json(
            &format!("/api/v1/applications/{}/reject", application.id),
            json!({ "reason": "incomplete" }),
        ))
        .await
        .expect("response");
    assert_eq!(rejected.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn status_route_returns_not_found_for_unknown_id() {
    let world = world();
    let router = application_router(Arc::clone(&world.service));
    let response = router
        .oneshot(
            Request::get("/api/v1/applications/app-missing")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "application app-missing not found");
}
