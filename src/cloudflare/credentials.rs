// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Loading Cloudflare API credentials from Kubernetes Secrets.
//!
//! A scoped API token is preferred. A global API key is only used when the
//! token key is absent, and then requires the account e-mail as well.

use crate::cloudflare_errors::CloudflareError;
use crate::constants::{DEFAULT_API_EMAIL_KEY, DEFAULT_API_KEY_KEY, DEFAULT_API_TOKEN_KEY};
use crate::crd::CloudflareDetails;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use tracing::debug;

/// How requests are authenticated.
#[derive(Clone, PartialEq, Eq)]
pub enum ApiCredentials {
    /// `Authorization: Bearer <token>`
    ApiToken(String),
    /// `X-Auth-Email` / `X-Auth-Key`
    ApiKey { email: String, key: String },
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiCredentials::ApiToken(_) => f.write_str("ApiToken(<redacted>)"),
            ApiCredentials::ApiKey { email, .. } => f
                .debug_struct("ApiKey")
                .field("email", email)
                .field("key", &"<redacted>")
                .finish(),
        }
    }
}

/// Extract credentials from an already fetched Secret.
///
/// # Errors
///
/// Returns [`CloudflareError::InvalidCredentials`] when neither a token nor a
/// key with its e-mail is present.
pub fn credentials_from_secret(
    secret: &Secret,
    details: &CloudflareDetails,
) -> Result<ApiCredentials, CloudflareError> {
    let secret_id = format!(
        "{}/{}",
        secret.metadata.namespace.as_deref().unwrap_or_default(),
        secret.metadata.name.as_deref().unwrap_or(&details.secret)
    );

    let token_key = details
        .api_token_key
        .as_deref()
        .unwrap_or(DEFAULT_API_TOKEN_KEY);
    if let Some(token) = secret_value(secret, token_key) {
        return Ok(ApiCredentials::ApiToken(token));
    }

    let key_key = details.api_key_key.as_deref().unwrap_or(DEFAULT_API_KEY_KEY);
    let email_key = details.email_key.as_deref().unwrap_or(DEFAULT_API_EMAIL_KEY);
    match (secret_value(secret, key_key), secret_value(secret, email_key)) {
        (Some(key), Some(email)) => Ok(ApiCredentials::ApiKey { email, key }),
        (Some(_), None) => Err(CloudflareError::InvalidCredentials {
            secret: secret_id,
            reason: format!("key '{key_key}' is set but '{email_key}' is missing"),
        }),
        _ => Err(CloudflareError::InvalidCredentials {
            secret: secret_id,
            reason: format!("neither '{token_key}' nor '{key_key}' is set"),
        }),
    }
}

/// Fetch the Secret named by `details.secret` in `namespace` and extract credentials.
///
/// # Errors
///
/// A missing Secret is reported as [`CloudflareError::InvalidCredentials`];
/// other Kubernetes API errors are returned as-is.
pub async fn load_credentials(
    client: &Client,
    namespace: &str,
    details: &CloudflareDetails,
) -> anyhow::Result<ApiCredentials> {
    let api: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = api.get_opt(&details.secret).await?.ok_or_else(|| {
        CloudflareError::InvalidCredentials {
            secret: format!("{namespace}/{}", details.secret),
            reason: "Secret not found".to_string(),
        }
    })?;

    let credentials = credentials_from_secret(&secret, details)?;
    debug!(namespace = %namespace, secret = %details.secret, credentials = ?credentials, "Loaded Cloudflare credentials");
    Ok(credentials)
}

fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    let from_data = secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .and_then(|bytes| String::from_utf8(bytes.0.clone()).ok());
    let from_string_data = || {
        secret
            .string_data
            .as_ref()
            .and_then(|data| data.get(key))
            .cloned()
    };

    from_data
        .or_else(from_string_data)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod credentials_tests;
