//! API key checks
//!
//! Keys arrive in the `X-API-Key` header. A key that is not configured
//! locks its endpoints: every request to them is refused.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::state::AppState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Compare two secrets without leaking the position of the first mismatch
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    let max_len = a.len().max(b.len());

    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);
    (lengths_equal & contents_equal).into()
}

fn presented_key(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Outcome of comparing a presented key with the configured one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCheck {
    Accepted,
    /// No key configured. Every request is refused.
    NotConfigured,
    Missing,
    Mismatch,
}

pub fn check_key(expected: Option<&str>, presented: Option<&str>) -> KeyCheck {
    let Some(expected) = expected else {
        return KeyCheck::NotConfigured;
    };
    match presented {
        None => KeyCheck::Missing,
        Some(key) if constant_time_compare(key, expected) => KeyCheck::Accepted,
        Some(_) => KeyCheck::Mismatch,
    }
}

/// Guard for general endpoints (upload, create-pdf)
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state.config().security.api_key.as_deref();
    match check_key(expected, presented_key(&request)) {
        KeyCheck::Accepted => Ok(next.run(request).await),
        KeyCheck::NotConfigured => {
            tracing::warn!(
                path = %request.uri().path(),
                "Rejected request, API_KEY is not set"
            );
            Err(AppError::Unauthorized(
                "API key authentication is not configured".into(),
            ))
        }
        KeyCheck::Missing => Err(AppError::Unauthorized(
            "API key required. Include X-API-Key header.".into(),
        )),
        KeyCheck::Mismatch => Err(AppError::Unauthorized("Invalid API key".into())),
    }
}

/// Guard for admin endpoints (cleanup stats, sweep, purge)
pub async fn require_admin_key(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state.config().security.admin_api_key.as_deref();
    match check_key(expected, presented_key(&request)) {
        KeyCheck::Accepted => Ok(next.run(request).await),
        KeyCheck::NotConfigured => {
            tracing::warn!(
                path = %request.uri().path(),
                "Rejected request, ADMIN_API_KEY is not set"
            );
            Err(AppError::Unauthorized("Admin authentication is not configured".into()))
        }
        KeyCheck::Missing => Err(AppError::Unauthorized(
            "Admin API key required. Include X-API-Key header.".into(),
        )),
        KeyCheck::Mismatch => Err(AppError::Forbidden(
            "Admin access required. Invalid admin API key.".into(),
        )),
    }
}
