// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `DNSRecord` reconciliation logic.
//!
//! Each `DNSRecord` owns exactly one Cloudflare record and writes it directly.
//! Records are marked with the owner's `Kind/namespace/name` in the comment so
//! that records managed by someone else are never overwritten.

use crate::cloudflare::types::{DnsRecord, DnsRecordRequest};
use crate::cloudflare::CloudflareClient;
use crate::constants::{DNS_TTL_AUTO, KIND_DNS_RECORD};
use crate::context::Context;
use crate::crd::{DNSRecord, DNSRecordSpec, DNSRecordStatus, SourceRef};
use crate::metrics;
use crate::reconcilers::finalizers::FinalizerCleanup;
use crate::reconcilers::status::StatusUpdater;
use crate::reconcilers::{failure_reason, requeue_based_on_readiness};
use crate::status_reasons::{REASON_READY, REASON_RECORD_CONFLICT};
use crate::sync::adopt::{owner_of, select_existing, with_marker};
use crate::sync::hash::hash_of;
use crate::sync::{decide, AdoptionDecision};
use anyhow::{anyhow, Result};
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fully qualified record name inside `zone`.
///
/// `@` (or an empty name) is the zone apex. A name that is neither the zone
/// nor inside it is relative to the zone.
#[must_use]
pub fn fqdn(name: &str, zone: &str) -> String {
    let name = name.trim().trim_end_matches('.').to_ascii_lowercase();
    let zone = zone.trim().trim_end_matches('.').to_ascii_lowercase();

    if name.is_empty() || name == "@" {
        zone
    } else if name == zone || name.ends_with(&format!(".{zone}")) {
        name
    } else {
        format!("{name}.{zone}")
    }
}

/// Ownership marker owner of a `DNSRecord`.
#[must_use]
pub fn record_owner(namespace: &str, name: &str) -> String {
    SourceRef::new(KIND_DNS_RECORD, namespace, name).key()
}

/// Cloudflare request for `spec` under `fqdn`, carrying the ownership marker.
#[must_use]
pub fn desired_record(spec: &DNSRecordSpec, fqdn: &str, owner: &str) -> DnsRecordRequest {
    let proxiable = spec.r#type.proxiable();
    let proxied = proxiable && spec.proxied.unwrap_or(false);
    DnsRecordRequest {
        record_type: spec.r#type.as_str().to_string(),
        name: fqdn.to_string(),
        content: spec.content.clone(),
        ttl: if proxied {
            DNS_TTL_AUTO
        } else {
            spec.ttl.unwrap_or(DNS_TTL_AUTO)
        },
        proxied: proxiable.then_some(proxied),
        priority: spec.priority,
        comment: Some(with_marker(spec.comment.as_deref(), owner)),
    }
}

/// Reconciles a `DNSRecord` resource.
///
/// # Errors
///
/// Returns an error when Cloudflare or Kubernetes calls fail.
pub async fn reconcile_dns_record(ctx: Arc<Context>, record: Arc<DNSRecord>) -> Result<Action> {
    let name = record.name_any();
    let namespace = record
        .namespace()
        .ok_or_else(|| anyhow!("DNSRecord {name} has no namespace"))?;
    let api: Api<DNSRecord> = Api::namespaced(ctx.client.clone(), &namespace);

    debug!(record = %name, namespace = %namespace, "Reconciling DNSRecord");

    let mut status = StatusUpdater::new(record.status.as_ref());
    status.set_observed_generation(record.metadata.generation);

    match sync_record(&ctx, &record, &namespace, &mut status).await {
        Ok(ready) => {
            status.apply(&api, &name).await?;
            Ok(requeue_based_on_readiness(ready))
        }
        Err(e) => {
            let (reason, message) = failure_reason(&e);
            status.set_not_ready(reason, &message);
            status.apply(&api, &name).await?;
            Err(e)
        }
    }
}

async fn sync_record(
    ctx: &Context,
    record: &DNSRecord,
    namespace: &str,
    status: &mut StatusUpdater<DNSRecordStatus>,
) -> Result<bool> {
    let name = record.name_any();
    let spec = &record.spec;
    let cf = ctx.cloudflare_client(namespace, &spec.cloudflare).await?;

    let (zone_id, zone_name) = resolve_zone(&cf, spec)
        .await?
        .ok_or_else(|| anyhow!("DNSRecord {namespace}/{name} needs cloudflare.zoneId or cloudflare.domain"))?;
    let fqdn = fqdn(&spec.name, &zone_name);
    let owner = record_owner(namespace, &name);
    let desired = desired_record(spec, &fqdn, &owner);
    let spec_hash = hash_of(&(&zone_id, &desired));

    let previous = status.status().clone();
    let known_id = previous
        .record_id
        .as_deref()
        .filter(|_| previous.zone_id.as_deref() == Some(zone_id.as_str()));

    let known = match known_id {
        Some(id) => fetch_record(&cf, &zone_id, id).await?,
        None => None,
    };

    if known.is_some() && previous.spec_hash.as_deref() == Some(spec_hash.as_str()) {
        debug!(record = %name, fqdn = %fqdn, "DNS record unchanged");
        status.set_ready(REASON_READY, &format!("{} {fqdn} is up to date", desired.record_type));
        return Ok(true);
    }

    let candidates;
    let existing = match known.as_ref() {
        Some(record) => Some(record),
        None => {
            candidates = cf
                .find_dns_records(&zone_id, &fqdn, Some(&desired.record_type))
                .await?;
            select_existing(&candidates, &owner)
        }
    };

    let mut adopted = previous.adopted && known.is_some();
    let record_id = match decide(existing, &desired, &owner, spec.adopt_policy) {
        AdoptionDecision::Create => {
            let created = cf.create_dns_record(&zone_id, &desired).await?;
            metrics::record_resource_created(KIND_DNS_RECORD);
            created.id
        }
        AdoptionDecision::Update { id } => {
            cf.update_dns_record(&zone_id, &id, &desired).await?;
            metrics::record_resource_updated(KIND_DNS_RECORD);
            id
        }
        AdoptionDecision::InSync { id } => id,
        AdoptionDecision::Adopt { id } => {
            info!(record = %name, fqdn = %fqdn, record_id = %id, "Adopting existing DNS record");
            cf.update_dns_record(&zone_id, &id, &desired).await?;
            metrics::record_resource_adopted(KIND_DNS_RECORD);
            adopted = true;
            id
        }
        AdoptionDecision::Conflict { reason } => {
            warn!(record = %name, fqdn = %fqdn, reason = %reason, "DNS record conflict");
            status.status_mut().fqdn = Some(fqdn);
            status.set_not_ready(REASON_RECORD_CONFLICT, &reason);
            return Ok(false);
        }
    };

    let new_status = status.status_mut();
    new_status.record_id = Some(record_id);
    new_status.zone_id = Some(zone_id);
    new_status.fqdn = Some(fqdn.clone());
    new_status.adopted = adopted;
    new_status.spec_hash = Some(spec_hash);

    status.set_ready(REASON_READY, &format!("{} {fqdn} is up to date", desired.record_type));
    Ok(true)
}

/// Zone id and zone name of `spec`, looking up whichever one is missing.
/// `None` when neither is set.
async fn resolve_zone(
    cf: &CloudflareClient,
    spec: &DNSRecordSpec,
) -> Result<Option<(String, String)>> {
    let zone = match (&spec.cloudflare.zone_id, &spec.cloudflare.domain) {
        (Some(zone_id), Some(domain)) => Some((zone_id.clone(), domain.clone())),
        (Some(zone_id), None) => {
            let zone = cf.get_zone(zone_id).await?;
            debug!(zone_id = %zone_id, zone = %zone.name, "Resolved zone name");
            Some((zone.id, zone.name))
        }
        (None, Some(domain)) => Some((cf.find_zone_id(domain).await?, domain.clone())),
        (None, None) => None,
    };
    Ok(zone)
}

/// The record with `record_id`, or `None` when it no longer exists.
async fn fetch_record(
    cf: &CloudflareClient,
    zone_id: &str,
    record_id: &str,
) -> Result<Option<DnsRecord>> {
    match cf.get_dns_record(zone_id, record_id).await {
        Ok(record) => Ok(Some(record)),
        Err(e) if e.is_not_found() => {
            warn!(zone_id = %zone_id, record_id = %record_id, "DNS record was deleted externally, recreating");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait::async_trait]
impl FinalizerCleanup for DNSRecord {
    async fn cleanup(&self, ctx: &Context) -> Result<()> {
        let Some(status) = self.status.as_ref() else {
            return Ok(());
        };
        let (Some(zone_id), Some(record_id)) = (status.zone_id.as_deref(), status.record_id.as_deref())
        else {
            return Ok(());
        };

        let name = self.name_any();
        let namespace = self.namespace().unwrap_or_default();
        let owner = record_owner(&namespace, &name);
        let cf = ctx.cloudflare_client(&namespace, &self.spec.cloudflare).await?;

        let Some(existing) = fetch_record(&cf, zone_id, record_id).await? else {
            return Ok(());
        };
        if let Some(other) = owner_of(existing.comment.as_deref()).filter(|o| *o != owner) {
            warn!(record = %name, record_id = %record_id, owner = %other, "DNS record now belongs to another owner, leaving it");
            return Ok(());
        }

        match cf.delete_dns_record(zone_id, record_id).await {
            Ok(()) => metrics::record_resource_deleted(KIND_DNS_RECORD),
            Err(e) if e.is_not_found() => debug!(record_id = %record_id, "DNS record already gone"),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "dnsrecord_tests.rs"]
mod dnsrecord_tests;
