// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Cloudflare v4 REST API client.
//!
//! [`CloudflareClient`] wraps a shared `reqwest::Client` together with the
//! credentials of one Secret. Cloning is cheap; controllers build one client
//! per reconcile from the resource's `cloudflare` details.
//!
//! # Modules
//!
//! - [`request`] - Envelope handling, retries and pagination
//! - [`zones`] - Zone lookup
//! - [`tunnels`] - Tunnel lifecycle, connector tokens and remote configuration
//! - [`dns`] - DNS record CRUD
//! - [`access`] - Access application CRUD
//! - [`credentials`] - Loading API credentials from Kubernetes Secrets
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudflare_operator::cloudflare::{ApiCredentials, CloudflareClient};
//!
//! # async fn example() -> Result<(), cloudflare_operator::cloudflare_errors::CloudflareError> {
//! let client = CloudflareClient::new(
//!     reqwest::Client::new(),
//!     "https://api.cloudflare.com/client/v4",
//!     ApiCredentials::ApiToken("token".to_string()),
//! );
//! let zone_id = client.find_zone_id("example.com").await?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod credentials;
pub mod dns;
pub mod request;
pub mod tunnels;
pub mod types;
pub mod zones;

pub use credentials::{credentials_from_secret, load_credentials, ApiCredentials};
pub use types::{
    AccessApp, AccessAppRequest, CloudflareTunnel, DnsRecord, DnsRecordRequest, IngressRule,
    TunnelConfiguration, Zone,
};

use std::sync::Arc;

/// Client for one set of Cloudflare credentials.
#[derive(Clone)]
pub struct CloudflareClient {
    http: reqwest::Client,
    base_url: Arc<str>,
    credentials: Arc<ApiCredentials>,
}

impl CloudflareClient {
    /// Build a client. A trailing `/` on `base_url` is ignored.
    #[must_use]
    pub fn new(http: reqwest::Client, base_url: &str, credentials: ApiCredentials) -> Self {
        Self {
            http,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            credentials: Arc::new(credentials),
        }
    }

    /// Base URL requests are made against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("base_url", &self.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}
