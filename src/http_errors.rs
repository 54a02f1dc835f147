// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP error code mapping to Kubernetes status condition reasons.
//!
//! This module maps HTTP status codes returned by the Cloudflare API to
//! standardized Kubernetes condition reasons, so every controller reports
//! API failures the same way.
//!
//! # Usage
//!
//! ```rust
//! use cloudflare_operator::http_errors::map_http_error_to_reason;
//!
//! let (reason, _message) = map_http_error_to_reason(404);
//! assert_eq!(reason, "ExternalResourceNotFound");
//!
//! let (reason, _message) = map_http_error_to_reason(429);
//! assert_eq!(reason, "CloudflareRateLimited");
//! ```

use crate::cloudflare_errors::CloudflareError;
use crate::status_reasons::{
    REASON_CLOUDFLARE_AUTH_FAILED, REASON_CLOUDFLARE_BAD_REQUEST, REASON_CLOUDFLARE_RATE_LIMITED,
    REASON_CLOUDFLARE_UNAVAILABLE, REASON_CLOUDFLARE_UNREACHABLE, REASON_EXTERNAL_NOT_FOUND,
    REASON_INVALID_CREDENTIALS, REASON_RECONCILE_ERROR, REASON_ZONE_NOT_FOUND,
};

/// Map HTTP status code to condition reason and message.
///
/// # HTTP Code Mapping
///
/// | HTTP Code | Reason | Meaning |
/// |-----------|--------|---------|
/// | 400 | `CloudflareBadRequest` | Invalid request |
/// | 401, 403 | `CloudflareAuthFailed` | Token missing a permission or revoked |
/// | 404 | `ExternalResourceNotFound` | Object deleted outside the operator |
/// | 429 | `CloudflareRateLimited` | Too many requests |
/// | 5xx | `CloudflareUnavailable` | Cloudflare-side failure |
/// | Other | `CloudflareUnreachable` | Unexpected response |
#[must_use]
pub fn map_http_error_to_reason(status_code: u16) -> (&'static str, String) {
    match status_code {
        400 => (
            REASON_CLOUDFLARE_BAD_REQUEST,
            "Invalid request to the Cloudflare API (400)".into(),
        ),
        401 => (
            REASON_CLOUDFLARE_AUTH_FAILED,
            "Cloudflare authentication failed (401)".into(),
        ),
        403 => (
            REASON_CLOUDFLARE_AUTH_FAILED,
            "Cloudflare token lacks the required permission (403)".into(),
        ),
        404 => (
            REASON_EXTERNAL_NOT_FOUND,
            "Cloudflare object not found (404)".into(),
        ),
        429 => (
            REASON_CLOUDFLARE_RATE_LIMITED,
            "Cloudflare API rate limit exceeded (429)".into(),
        ),
        500..=599 => (
            REASON_CLOUDFLARE_UNAVAILABLE,
            format!("Cloudflare API unavailable ({status_code})"),
        ),
        _ => (
            REASON_CLOUDFLARE_UNREACHABLE,
            format!("Unexpected HTTP status from the Cloudflare API ({status_code})"),
        ),
    }
}

/// Map connection error to condition reason and message.
///
/// Use this when the HTTP client cannot reach Cloudflare before receiving any
/// HTTP status code (DNS failure, egress network policy, proxy misconfiguration).
#[must_use]
pub fn map_connection_error() -> (&'static str, String) {
    (
        REASON_CLOUDFLARE_UNREACHABLE,
        "Cannot connect to the Cloudflare API".into(),
    )
}

/// Map any [`CloudflareError`] to a condition reason and message.
#[must_use]
pub fn map_cloudflare_error(error: &CloudflareError) -> (&'static str, String) {
    match error {
        CloudflareError::InvalidCredentials { .. } => {
            (REASON_INVALID_CREDENTIALS, error.to_string())
        }
        CloudflareError::Transport { .. } => {
            let (reason, _) = map_connection_error();
            (reason, error.to_string())
        }
        CloudflareError::Decode { .. } => (REASON_RECONCILE_ERROR, error.to_string()),
        // Zone lookups by name report a missing zone, not a deleted object
        CloudflareError::NotFound { path } if path.starts_with("/zones?") => {
            (REASON_ZONE_NOT_FOUND, error.to_string())
        }
        other => match other.status() {
            Some(status) => {
                let (reason, _) = map_http_error_to_reason(status);
                (reason, error.to_string())
            }
            None => (REASON_RECONCILE_ERROR, error.to_string()),
        },
    }
}

#[cfg(test)]
#[path = "http_errors_tests.rs"]
mod http_errors_tests;
