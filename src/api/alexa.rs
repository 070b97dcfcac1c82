//! Directive endpoint

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};

use super::{ApiState, auth::check_api_key};
use crate::alexa::{DirectiveEnvelope, ResponseBuilder, ResponseEnvelope};

/// Handle one directive
///
/// Directive failures are reported inside the envelope, the status is
/// always 200 once the body parsed and the caller's key was accepted. A
/// rejected key answers 401 with an error envelope for the directive.
async fn handle_directive(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(envelope): Json<DirectiveEnvelope>,
) -> (StatusCode, Json<ResponseEnvelope>) {
    if let Err(err) = check_api_key(state.api_key.as_deref(), &headers) {
        let response = ResponseBuilder::for_directive(&envelope.directive).error(&err);
        return (StatusCode::UNAUTHORIZED, Json(response));
    }

    (StatusCode::OK, Json(state.dispatcher.respond(envelope).await))
}

/// Build the directive router
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/alexa", post(handle_directive))
        .with_state(state)
}
