//! # Authentication Module
//!
//! Two layers identify a caller:
//!
//! 1. The service API key (`[security] api_key` or `NGAO_API_KEY`). When set,
//!    every request except `/health` must carry it:
//!    ```text
//!    Authorization: Bearer <your-api-key>
//!    ```
//! 2. The acting officer, named by the `X-Officer-Id` header. The engine
//!    checks that the officer exists, is active and holds the permission.

use super::types::ApiError;
use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{Request, StatusCode, header, request::Parts},
    middleware::Next,
    response::Response,
};
use ngao_core::{NgaoError, UserId};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Header naming the acting officer.
pub const OFFICER_HEADER: &str = "x-officer-id";

// =============================================================================
// API KEY AUTHENTICATION
// =============================================================================

/// Constant-time key comparison that does not leak the key length.
#[must_use]
pub fn keys_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// API key middleware. `/health` is always allowed for load balancer checks.
pub async fn api_key_auth_middleware(
    State(expected): State<Arc<str>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) => {
            // Both "Bearer <key>" and a raw "<key>" are accepted.
            let provided = value.strip_prefix("Bearer ").unwrap_or(value);
            if keys_match(provided, &expected) {
                Ok(next.run(request).await)
            } else {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "invalid_api_key",
                    "Authentication failed: invalid API key"
                );
                Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
            }
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// ACTING OFFICER
// =============================================================================

/// The officer a request acts as, from `X-Officer-Id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OFFICER_HEADER)
            .ok_or_else(|| NgaoError::Validation("missing X-Officer-Id header".to_string()))?;
        let id = value
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| NgaoError::Validation("X-Officer-Id must be a number".to_string()))?;
        Ok(Self(UserId(id)))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_match_requires_exact_key() {
        assert!(keys_match("secret-key", "secret-key"));
        assert!(!keys_match("secret-ke", "secret-key"));
        assert!(!keys_match("secret-key-2", "secret-key"));
        assert!(!keys_match("", "secret-key"));
    }
}
