// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS record CRUD.

use super::types::{DnsRecord, DnsRecordRequest};
use super::CloudflareClient;
use crate::cloudflare_errors::CloudflareError;
use reqwest::Method;
use tracing::info;

fn records_path(zone_id: &str) -> String {
    format!("/zones/{zone_id}/dns_records")
}

fn record_path(zone_id: &str, record_id: &str) -> String {
    format!("/zones/{zone_id}/dns_records/{record_id}")
}

impl CloudflareClient {
    /// Records in `zone_id` with the exact `name`, optionally restricted to one type.
    ///
    /// # Errors
    ///
    /// Fails when the list call fails.
    pub async fn find_dns_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: Option<&str>,
    ) -> Result<Vec<DnsRecord>, CloudflareError> {
        let mut query = vec![("name", name.to_string())];
        if let Some(record_type) = record_type {
            query.push(("type", record_type.to_string()));
        }
        let records: Vec<DnsRecord> = self.get_all(&records_path(zone_id), &query).await?;
        Ok(records
            .into_iter()
            .filter(|r| r.name.eq_ignore_ascii_case(name))
            .collect())
    }

    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the record no longer exists.
    pub async fn get_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
    ) -> Result<DnsRecord, CloudflareError> {
        self.get(&record_path(zone_id, record_id), &[]).await
    }

    /// # Errors
    ///
    /// A conflicting record satisfies [`CloudflareError::is_already_exists`].
    pub async fn create_dns_record(
        &self,
        zone_id: &str,
        record: &DnsRecordRequest,
    ) -> Result<DnsRecord, CloudflareError> {
        let created: DnsRecord = self
            .send(Method::POST, &records_path(zone_id), record)
            .await?;
        info!(zone = %zone_id, name = %created.name, record_type = %created.record_type, record_id = %created.id, "Created DNS record");
        Ok(created)
    }

    /// Overwrite an existing record.
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the record no longer exists.
    pub async fn update_dns_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecordRequest,
    ) -> Result<DnsRecord, CloudflareError> {
        let updated: DnsRecord = self
            .send(Method::PUT, &record_path(zone_id, record_id), record)
            .await?;
        info!(zone = %zone_id, name = %updated.name, record_id = %record_id, "Updated DNS record");
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the record no longer exists.
    pub async fn delete_dns_record(&self, zone_id: &str, record_id: &str) -> Result<(), CloudflareError> {
        self.delete(&record_path(zone_id, record_id)).await?;
        info!(zone = %zone_id, record_id = %record_id, "Deleted DNS record");
        Ok(())
    }
}

#[cfg(test)]
#[path = "dns_tests.rs"]
mod dns_tests;
