// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone lookup by name and by id.

use super::types::Zone;
use super::CloudflareClient;
use crate::cloudflare_errors::CloudflareError;

impl CloudflareClient {
    /// Get a zone by id.
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the id is unknown.
    pub async fn get_zone(&self, zone_id: &str) -> Result<Zone, CloudflareError> {
        self.get(&format!("/zones/{zone_id}"), &[]).await
    }

    /// Resolve a zone name (e.g. `example.com`) to its zone id.
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when no zone has that name.
    pub async fn find_zone_id(&self, domain: &str) -> Result<String, CloudflareError> {
        let domain = domain.trim_end_matches('.');
        let zones: Vec<Zone> = self
            .get("/zones", &[("name", domain.to_string())])
            .await?;

        zones
            .into_iter()
            .find(|z| z.name.eq_ignore_ascii_case(domain))
            .map(|z| z.id)
            .ok_or_else(|| CloudflareError::NotFound {
                path: format!("/zones?name={domain}"),
            })
    }
}

#[cfg(test)]
#[path = "zones_tests.rs"]
mod zones_tests;
