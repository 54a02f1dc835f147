// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Low-level request execution against the Cloudflare API.
//!
//! Every call goes through [`CloudflareClient::request`], which unwraps the
//! Cloudflare envelope, maps failures to [`CloudflareError`] and retries
//! transient failures on the [`CLOUDFLARE_BACKOFF`] schedule.
//!
//! # Retry Behavior
//! - Retries on HTTP 429, 5xx and transport errors
//! - Honors `Retry-After` on 429 when it is longer than the backoff interval
//! - Fails immediately on other 4xx errors
//! - Max 2 minutes total retry time

use super::types::{ApiEnvelope, ResultInfo};
use super::{ApiCredentials, CloudflareClient};
use crate::cloudflare_errors::CloudflareError;
use crate::constants::CLOUDFLARE_PAGE_SIZE;
use crate::metrics;
use crate::reconcilers::retry::CLOUDFLARE_BACKOFF;
use reqwest::header::RETRY_AFTER;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};
use url::Url;

impl CloudflareClient {
    /// Execute a request and return the decoded envelope, retrying transient failures.
    ///
    /// # Errors
    ///
    /// Returns the last [`CloudflareError`] when it is not retryable or when
    /// the backoff is exhausted.
    pub async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<ApiEnvelope<T>, CloudflareError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut backoff = CLOUDFLARE_BACKOFF.start();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.request_once(method.clone(), path, query, body).await {
                Ok(envelope) => {
                    if attempt > 1 {
                        debug!(
                            method = %method,
                            path = %path,
                            attempt = attempt,
                            elapsed = ?backoff.elapsed(),
                            "Cloudflare API call succeeded after retries"
                        );
                    }
                    return Ok(envelope);
                }
                Err(e) => {
                    if !e.is_retryable() {
                        return Err(e);
                    }

                    let Some(mut duration) = backoff.next_backoff() else {
                        error!(
                            method = %method,
                            path = %path,
                            attempt = attempt,
                            elapsed = ?backoff.elapsed(),
                            error = %e,
                            "Backoff exhausted, giving up"
                        );
                        return Err(e);
                    };

                    if let CloudflareError::RateLimited {
                        retry_after: Some(secs),
                    } = &e
                    {
                        duration = duration.max(Duration::from_secs(*secs));
                    }

                    warn!(
                        method = %method,
                        path = %path,
                        attempt = attempt,
                        retry_after = ?duration,
                        error = %e,
                        "Retryable Cloudflare API error, will retry"
                    );
                    tokio::time::sleep(duration).await;
                }
            }
        }
    }

    /// GET a single object.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the envelope carries no `result`.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CloudflareError> {
        let envelope = self
            .request::<(), T>(Method::GET, path, query, None)
            .await?;
        require_result(envelope, path)
    }

    /// Send `body` with `method` (POST, PUT, PATCH) and decode the result.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the envelope carries no `result`.
    pub async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, CloudflareError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let envelope = self.request::<B, T>(method, path, &[], Some(body)).await?;
        require_result(envelope, path)
    }

    /// DELETE an object, discarding the result.
    ///
    /// # Errors
    ///
    /// Fails when the request fails; a missing object is [`CloudflareError::NotFound`].
    pub async fn delete(&self, path: &str) -> Result<(), CloudflareError> {
        self.request::<(), serde_json::Value>(Method::DELETE, path, &[], None)
            .await
            .map(|_| ())
    }

    /// GET every page of a list endpoint.
    ///
    /// Pages of [`CLOUDFLARE_PAGE_SIZE`] items are fetched until
    /// `result_info.total_pages` is reached. Responses without `result_info`
    /// are treated as a single page.
    ///
    /// # Errors
    ///
    /// Fails as soon as any page fails.
    pub async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, CloudflareError> {
        let mut items = Vec::new();
        let mut page: u32 = 1;

        loop {
            let mut paged: Vec<(&str, String)> = query.to_vec();
            paged.push(("page", page.to_string()));
            paged.push(("per_page", CLOUDFLARE_PAGE_SIZE.to_string()));

            let envelope = self
                .request::<(), Vec<T>>(Method::GET, path, &paged, None)
                .await?;
            let batch = envelope.result.unwrap_or_default();
            let batch_len = batch.len();
            items.extend(batch);

            if !has_more_pages(envelope.result_info.as_ref(), page, batch_len) {
                break;
            }
            page += 1;
        }

        debug!(path = %path, count = items.len(), pages = page, "Listed Cloudflare objects");
        Ok(items)
    }

    async fn request_once<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<ApiEnvelope<T>, CloudflareError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path, query)?;
        debug!(method = %method, url = %url, "Cloudflare API request");

        let mut request = self.http.request(method.clone(), url);
        request = match self.credentials.as_ref() {
            ApiCredentials::ApiToken(token) => request.bearer_auth(token),
            ApiCredentials::ApiKey { email, key } => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
        };
        if let Some(body) = body {
            request = request.json(body);
        }

        let started = Instant::now();
        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_cloudflare_request(
                    method.as_str(),
                    "transport_error",
                    started.elapsed(),
                );
                return Err(e.into());
            }
        };

        let status = response.status();
        metrics::record_cloudflare_request(method.as_str(), status.as_str(), started.elapsed());

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = response.text().await?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(CloudflareError::RateLimited { retry_after });
        }

        if status.is_success() {
            let envelope: ApiEnvelope<T> = serde_json::from_str(&text)?;
            if envelope.success {
                return Ok(envelope);
            }
            return Err(api_error(status, path, &envelope.errors, &text));
        }

        // Error bodies are decoded without the typed result so a partial body still yields a message.
        let errors = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&text)
            .map(|e| e.errors)
            .unwrap_or_default();

        debug!(status = %status, path = %path, body = %text, "Cloudflare API returned an error");
        Err(api_error(status, path, &errors, &text))
    }

    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, CloudflareError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|e| CloudflareError::Transport {
            message: format!("invalid Cloudflare API URL '{raw}': {e}"),
        })?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

fn require_result<T>(envelope: ApiEnvelope<T>, path: &str) -> Result<T, CloudflareError> {
    envelope.result.ok_or_else(|| CloudflareError::Decode {
        message: format!("response for {path} has no result"),
    })
}

/// Whether another page should be fetched after `page`.
pub(crate) fn has_more_pages(info: Option<&ResultInfo>, page: u32, batch_len: usize) -> bool {
    if batch_len == 0 {
        return false;
    }
    matches!(info, Some(info) if page < info.total_pages)
}

/// Build the error for an unsuccessful response.
pub(crate) fn api_error(
    status: StatusCode,
    path: &str,
    errors: &[super::types::ApiMessage],
    body: &str,
) -> CloudflareError {
    let message = if errors.is_empty() {
        body.chars().take(512).collect()
    } else {
        errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ")
    };

    match status {
        StatusCode::NOT_FOUND => CloudflareError::NotFound {
            path: path.to_string(),
        },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CloudflareError::Unauthorized {
            status: status.as_u16(),
            message,
        },
        _ => CloudflareError::Api {
            status: status.as_u16(),
            code: errors.first().map_or(0, |e| e.code),
            message,
        },
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod request_tests;
