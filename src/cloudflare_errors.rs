// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare API error types.
//!
//! Every call made through [`crate::cloudflare::CloudflareClient`] fails with a
//! [`CloudflareError`]. The variants separate the cases controllers branch on:
//! a missing object (recreate or treat cleanup as done), an already existing
//! object (adopt), retryable failures (rate limits, 5xx, transport) and
//! everything else.

use reqwest::StatusCode;
use thiserror::Error;

/// Cloudflare error codes meaning "an object with this identity already exists".
///
/// - `81053`: DNS record with the same name already exists
/// - `81057`: identical DNS record already exists
/// - `81058`: identical record already exists (CNAME variant)
/// - `1013`: tunnel name already in use
pub const ALREADY_EXISTS_CODES: [i64; 4] = [81053, 81057, 81058, 1013];

/// 429 and every 5xx are transient. Cloudflare reports edge and origin
/// failures in the 52x range, so the whole class is retried.
#[must_use]
pub(crate) fn is_retryable_http_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Errors returned by the Cloudflare REST client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CloudflareError {
    /// The requested object does not exist (HTTP 404).
    ///
    /// Returned when the object was deleted outside of the operator, or when an
    /// id recorded in a status is stale.
    #[error("Cloudflare object not found: {path}")]
    NotFound {
        /// API path that returned 404
        path: String,
    },

    /// Credentials were rejected (HTTP 401 or 403).
    #[error("Cloudflare rejected the credentials (HTTP {status}): {message}")]
    Unauthorized {
        /// HTTP status code
        status: u16,
        /// First error message of the envelope
        message: String,
    },

    /// Too many requests (HTTP 429).
    #[error("Cloudflare API rate limit exceeded")]
    RateLimited {
        /// Value of the `Retry-After` header in seconds, if present
        retry_after: Option<u64>,
    },

    /// Any other unsuccessful response.
    #[error("Cloudflare API error (HTTP {status}, code {code}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Cloudflare error code of the first envelope error, `0` when absent
        code: i64,
        /// Cloudflare error message(s)
        message: String,
    },

    /// The request never produced an HTTP response.
    #[error("Failed to reach the Cloudflare API: {message}")]
    Transport {
        /// Underlying transport error
        message: String,
    },

    /// The response body was not the expected JSON.
    #[error("Failed to decode Cloudflare API response: {message}")]
    Decode {
        /// Underlying decode error
        message: String,
    },

    /// The credentials Secret is missing or incomplete.
    #[error("Invalid Cloudflare credentials in Secret '{secret}': {reason}")]
    InvalidCredentials {
        /// `namespace/name` of the Secret
        secret: String,
        /// What is missing
        reason: String,
    },
}

impl CloudflareError {
    /// HTTP status code carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            CloudflareError::NotFound { .. } => Some(404),
            CloudflareError::Unauthorized { status, .. } | CloudflareError::Api { status, .. } => {
                Some(*status)
            }
            CloudflareError::RateLimited { .. } => Some(429),
            CloudflareError::Transport { .. }
            | CloudflareError::Decode { .. }
            | CloudflareError::InvalidCredentials { .. } => None,
        }
    }

    /// The object does not exist remotely.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudflareError::NotFound { .. })
    }

    /// Retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CloudflareError::RateLimited { .. } | CloudflareError::Transport { .. } => true,
            CloudflareError::Api { status, .. } => {
                StatusCode::from_u16(*status).is_ok_and(is_retryable_http_status)
            }
            _ => false,
        }
    }

    /// An object with the same identity already exists remotely.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        match self {
            CloudflareError::Api { status, code, .. } => {
                *status == 409 || ALREADY_EXISTS_CODES.contains(code)
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CloudflareError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CloudflareError::Decode {
                message: err.to_string(),
            }
        } else {
            CloudflareError::Transport {
                message: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for CloudflareError {
    fn from(err: serde_json::Error) -> Self {
        CloudflareError::Decode {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
#[path = "cloudflare_errors_tests.rs"]
mod cloudflare_errors_tests;
