//! API endpoint integration tests

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use alexa_fhem_gateway::api::{self, ApiState};

mod common;
use common::{MockHub, dispatcher, lamp_row};

/// Build a test API router
fn build_test_router(hub: &Arc<MockHub>, api_key: Option<&str>) -> axum::Router {
    api::router(Arc::new(ApiState {
        dispatcher: dispatcher(hub),
        api_key: api_key.map(str::to_string),
    }))
}

fn directive_request(body: &Value, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/alexa")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn report_state() -> Value {
    json!({
        "directive": {
            "header": {
                "namespace": "Alexa",
                "name": "ReportState",
                "payloadVersion": "3",
                "messageId": "abc",
                "correlationToken": "corr"
            },
            "endpoint": { "endpointId": "Stehlampe", "cookie": { "power": "lamp" } },
            "payload": {}
        }
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = build_test_router(&MockHub::new(), None);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_directive_endpoint() {
    let hub = MockHub::new();
    hub.reply_json("jsonlist2 lamp", json!([lamp_row("lamp", "on", "100")]));
    let app = build_test_router(&hub, Some("secret"));

    let response = app
        .oneshot(directive_request(&report_state(), Some("secret")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["event"]["header"]["name"], "StateReport");
    assert_eq!(body["event"]["header"]["correlationToken"], "corr");
    assert_eq!(body["event"]["endpoint"]["endpointId"], "Stehlampe");
    assert_eq!(body["context"]["properties"][0]["value"], "ON");
    assert_eq!(
        body["context"]["properties"][0]["uncertaintyInMilliseconds"],
        1000
    );
}

#[tokio::test]
async fn test_directive_errors_are_ok_responses() {
    let hub = MockHub::new();
    let app = build_test_router(&hub, None);

    let response = app
        .oneshot(directive_request(&report_state(), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["event"]["header"]["name"], "ErrorResponse");
    assert_eq!(body["event"]["payload"]["type"], "BRIDGE_UNREACHABLE");
}

#[tokio::test]
async fn test_directive_requires_api_key() {
    let hub = MockHub::new();

    let missing = build_test_router(&hub, Some("secret"))
        .oneshot(directive_request(&report_state(), None))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let wrong = build_test_router(&hub, Some("secret"))
        .oneshot(directive_request(&report_state(), Some("guess")))
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(wrong).await;
    assert_eq!(body["event"]["header"]["name"], "ErrorResponse");
    assert_eq!(body["event"]["header"]["correlationToken"], "corr");
    assert_eq!(
        body["event"]["payload"]["type"],
        "INVALID_AUTHORIZATION_CREDENTIAL"
    );

    assert!(hub.sent().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let hub = MockHub::new();
    let response = build_test_router(&hub, None)
        .oneshot(directive_request(&json!({ "nope": true }), None))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
    assert!(hub.sent().is_empty());
}
