//! API key check for the directive endpoint
//!
//! The key is compared in constant time. A rejected caller still gets a
//! regular Alexa error envelope, typed `INVALID_AUTHORIZATION_CREDENTIAL`.

use axum::http::{HeaderMap, header};

use crate::alexa::DirectiveError;

/// Key from an `Authorization: Bearer <key>` header
fn bearer_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
}

/// Check the caller's key against the configured one
///
/// Without a configured key every caller passes.
///
/// # Errors
///
/// Returns `InvalidCredential` if the key is missing or wrong
pub fn check_api_key(expected: Option<&str>, headers: &HeaderMap) -> Result<(), DirectiveError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let Some(key) = bearer_key(headers) else {
        tracing::debug!("rejected directive without API key");
        return Err(DirectiveError::InvalidCredential(
            "missing bearer key".to_string(),
        ));
    };

    if constant_time_eq(expected.as_bytes(), key.as_bytes()) {
        Ok(())
    } else {
        tracing::warn!("rejected directive with wrong API key");
        Err(DirectiveError::InvalidCredential(
            "API key does not match".to_string(),
        ))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
