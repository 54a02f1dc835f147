// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `CloudflareSyncState` reconciliation logic.
//!
//! This is the only place that writes shared Cloudflare objects. Each
//! reconciliation aggregates the registered sources, skips the API call when
//! the aggregate hash was already pushed, debounces bursts of changes and then
//! writes the tunnel configuration or DNS record.
//!
//! A SyncState without sources deletes itself. Its finalizer resets the tunnel
//! to a fallback-only configuration or removes the DNS record it owns.

use crate::cloudflare::types::{DnsRecordRequest, TunnelConfiguration};
use crate::cloudflare::CloudflareClient;
use crate::constants::{DEFAULT_FALLBACK_SERVICE, KIND_SYNC_STATE, REQUEUE_WHEN_READY_SECS};
use crate::context::Context;
use crate::crd::{
    AdoptPolicy, CloudflareSyncState, CloudflareSyncStateSpec, CloudflareSyncStateStatus,
    DnsRecordType, SyncResourceType, SyncStatus,
};
use crate::labels::FINALIZER_SYNC_STATE;
use crate::metrics::{
    self, SYNC_OUTCOME_CONFLICT, SYNC_OUTCOME_DEBOUNCED, SYNC_OUTCOME_ERROR, SYNC_OUTCOME_SKIPPED,
    SYNC_OUTCOME_SYNCED,
};
use crate::reconcilers::finalizers::{
    ensure_cluster_finalizer, handle_cluster_deletion, FinalizerCleanup,
};
use crate::reconcilers::retry::retry_api_call;
use crate::reconcilers::status::StatusUpdater;
use crate::reconcilers::{failure_reason, requeue_based_on_readiness};
use crate::status_reasons::{
    CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_SYNCED,
    REASON_EXTERNAL_NOT_FOUND, REASON_SOURCE_CONFLICT, REASON_SYNCED, REASON_SYNC_FAILED,
};
use crate::sync::adopt::{owner_of, ownership_marker, select_existing};
use crate::sync::hash::hash_of;
use crate::sync::{
    aggregate_dns_record, aggregate_tunnel_configuration, decide, AdoptionDecision,
    DebounceDecision, SyncError,
};
use anyhow::{anyhow, Result};
use chrono::Utc;
use kube::api::DeleteParams;
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What a SyncState wants the external object to look like.
#[derive(Debug, Clone, PartialEq)]
pub enum DesiredState {
    Tunnel(TunnelConfiguration),
    Dns {
        request: DnsRecordRequest,
        adopt_policy: AdoptPolicy,
    },
}

impl DesiredState {
    /// Change-detection hash of the desired state.
    #[must_use]
    pub fn hash(&self, spec: &CloudflareSyncStateSpec) -> String {
        match self {
            DesiredState::Tunnel(config) => hash_of(&(&spec.cloudflare_id, config)),
            DesiredState::Dns { request, .. } => hash_of(&(&spec.zone_id, request)),
        }
    }
}

/// Outcome of pushing the desired state.
enum SyncOutcome {
    Synced { external_id: String },
    Conflict(String),
    ExternalNotFound(String),
}

/// Ownership marker owner of records written by the SyncState `name`.
#[must_use]
pub fn sync_state_owner(name: &str) -> String {
    format!("{KIND_SYNC_STATE}/{name}")
}

/// Aggregate the sources of `spec`.
///
/// Returns the desired state and the conflicts found between sources.
///
/// # Errors
///
/// Returns [`SyncError::NoSources`] when no DNS source can be decoded.
pub fn desired_state(
    spec: &CloudflareSyncStateSpec,
    owner: &str,
) -> Result<(DesiredState, Vec<String>), SyncError> {
    match spec.resource_type {
        SyncResourceType::TunnelConfiguration => {
            let (config, conflicts) = aggregate_tunnel_configuration(&spec.sources);
            Ok((DesiredState::Tunnel(config), conflicts))
        }
        SyncResourceType::DnsRecord => {
            let (desired, conflicts) = aggregate_dns_record(&spec.sources)?;
            let request = desired.to_request(Some(ownership_marker(owner)));
            Ok((
                DesiredState::Dns {
                    request,
                    adopt_policy: desired.config.adopt_policy,
                },
                conflicts,
            ))
        }
    }
}

/// Whether `hash` was already pushed successfully.
#[must_use]
pub fn already_synced(status: Option<&CloudflareSyncStateStatus>, hash: &str) -> bool {
    status.is_some_and(|s| {
        s.sync_status == SyncStatus::Synced && s.config_hash.as_deref() == Some(hash)
    })
}

/// Record type filter for the existing-record lookup.
///
/// A CNAME cannot coexist with any other record of the same name, so every
/// type is considered.
#[must_use]
pub fn lookup_type(request: &DnsRecordRequest) -> Option<&str> {
    (request.record_type != DnsRecordType::CNAME.as_str()).then_some(request.record_type.as_str())
}

/// Reconciles a `CloudflareSyncState` resource.
///
/// # Errors
///
/// Returns an error when the Cloudflare write or a Kubernetes call fails.
pub async fn reconcile_sync_state(
    ctx: Arc<Context>,
    sync_state: Arc<CloudflareSyncState>,
) -> Result<Action> {
    let name = sync_state.name_any();
    let api: Api<CloudflareSyncState> = Api::all(ctx.client.clone());
    let sync_type = sync_state.spec.resource_type.as_str();

    if sync_state.metadata.deletion_timestamp.is_some() {
        handle_cluster_deletion(ctx.as_ref(), sync_state.as_ref(), FINALIZER_SYNC_STATE).await?;
        return Ok(Action::await_change());
    }

    if sync_state.spec.sources.is_empty() {
        info!(sync_state = %name, "No sources left, deleting CloudflareSyncState");
        match retry_api_call(
            || async { api.delete(&name, &DeleteParams::default()).await },
            "delete CloudflareSyncState",
        )
        .await
        {
            Ok(_) => {}
            Err(e) if is_not_found(&e) => {}
            Err(e) => return Err(e),
        }
        return Ok(Action::await_change());
    }

    ensure_cluster_finalizer(&ctx.client, sync_state.as_ref(), FINALIZER_SYNC_STATE).await?;
    metrics::record_sync_sources(&name, sync_state.spec.sources.len());

    let owner = sync_state_owner(&name);
    let (desired, conflicts) = desired_state(&sync_state.spec, &owner)?;
    let hash = desired.hash(&sync_state.spec);

    if already_synced(sync_state.status.as_ref(), &hash) {
        debug!(sync_state = %name, "Aggregated configuration unchanged, skipping Cloudflare call");
        metrics::record_sync_outcome(sync_type, SYNC_OUTCOME_SKIPPED);
        // Sources may have flipped back to the pushed state while debounced
        ctx.debouncer.complete(&name);
        return Ok(Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)));
    }

    if let DebounceDecision::Wait(delay) = ctx.debouncer.observe(&name, &hash, Instant::now()) {
        debug!(sync_state = %name, delay = ?delay, "Debouncing CloudflareSyncState");
        metrics::record_sync_outcome(sync_type, SYNC_OUTCOME_DEBOUNCED);
        return Ok(Action::requeue(delay));
    }

    let mut status = StatusUpdater::new(sync_state.status.as_ref());
    status.set_observed_generation(sync_state.metadata.generation);
    {
        let new_status = status.status_mut();
        new_status.aggregated_sources = i32::try_from(sync_state.spec.sources.len()).unwrap_or(i32::MAX);
        new_status.conflicts.clone_from(&conflicts);
    }

    let result = push(&ctx, &sync_state.spec, &desired, &owner).await;
    ctx.debouncer.complete(&name);

    match result {
        Ok(SyncOutcome::Synced { external_id }) => {
            info!(sync_state = %name, external_id = %external_id, "Synced CloudflareSyncState");
            metrics::record_sync_outcome(sync_type, SYNC_OUTCOME_SYNCED);

            let new_status = status.status_mut();
            new_status.sync_status = SyncStatus::Synced;
            new_status.config_hash = Some(hash);
            new_status.last_sync_time = Some(Utc::now().to_rfc3339());
            new_status.external_id = Some(external_id);
            new_status.error = None;

            if conflicts.is_empty() {
                status.set_condition(
                    CONDITION_TYPE_SYNCED,
                    CONDITION_STATUS_TRUE,
                    REASON_SYNCED,
                    "Aggregated configuration pushed to Cloudflare",
                );
            } else {
                status.set_condition(
                    CONDITION_TYPE_SYNCED,
                    CONDITION_STATUS_TRUE,
                    REASON_SOURCE_CONFLICT,
                    &format!("Pushed with {} conflict(s) between sources", conflicts.len()),
                );
            }
            status.set_ready(REASON_SYNCED, "Cloudflare is in sync");
            status.apply(&api, &name).await?;
            Ok(requeue_based_on_readiness(true))
        }
        Ok(SyncOutcome::Conflict(reason)) => {
            warn!(sync_state = %name, reason = %reason, "CloudflareSyncState conflicts with an existing object");
            metrics::record_sync_outcome(sync_type, SYNC_OUTCOME_CONFLICT);

            let new_status = status.status_mut();
            new_status.sync_status = SyncStatus::Conflict;
            new_status.error = Some(reason.clone());
            status.set_condition(
                CONDITION_TYPE_SYNCED,
                CONDITION_STATUS_FALSE,
                REASON_SOURCE_CONFLICT,
                &reason,
            );
            status.set_not_ready(REASON_SOURCE_CONFLICT, &reason);
            status.apply(&api, &name).await?;
            Ok(requeue_based_on_readiness(false))
        }
        Ok(SyncOutcome::ExternalNotFound(message)) => {
            warn!(sync_state = %name, "{message}");
            metrics::record_sync_outcome(sync_type, SYNC_OUTCOME_ERROR);

            let new_status = status.status_mut();
            new_status.sync_status = SyncStatus::Error;
            new_status.error = Some(message.clone());
            status.set_condition(
                CONDITION_TYPE_SYNCED,
                CONDITION_STATUS_FALSE,
                REASON_EXTERNAL_NOT_FOUND,
                &message,
            );
            status.set_not_ready(REASON_EXTERNAL_NOT_FOUND, &message);
            status.apply(&api, &name).await?;
            Ok(requeue_based_on_readiness(false))
        }
        Err(e) => {
            metrics::record_sync_outcome(sync_type, SYNC_OUTCOME_ERROR);
            let (reason, message) = failure_reason(&e);

            let new_status = status.status_mut();
            new_status.sync_status = SyncStatus::Error;
            new_status.error = Some(message.clone());
            status.set_condition(
                CONDITION_TYPE_SYNCED,
                CONDITION_STATUS_FALSE,
                REASON_SYNC_FAILED,
                &message,
            );
            status.set_not_ready(reason, &message);
            status.apply(&api, &name).await?;
            Err(e)
        }
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<kube::Error>(), Some(kube::Error::Api(ae)) if ae.code == 404)
}

async fn client_for(ctx: &Context, spec: &CloudflareSyncStateSpec) -> Result<CloudflareClient> {
    ctx.cloudflare_client(&spec.credentials_ref.namespace, &spec.credentials_ref.details)
        .await
}

async fn push(
    ctx: &Context,
    spec: &CloudflareSyncStateSpec,
    desired: &DesiredState,
    owner: &str,
) -> Result<SyncOutcome> {
    let cf = client_for(ctx, spec).await?;

    match desired {
        DesiredState::Tunnel(config) => {
            let pushed = match cf
                .get_tunnel_configuration(&spec.account_id, &spec.cloudflare_id)
                .await
            {
                Ok(current) if current.config.as_ref() == Some(config) => {
                    debug!(tunnel_id = %spec.cloudflare_id, version = ?current.version, "Remote tunnel configuration already matches");
                    Ok(current.version)
                }
                Ok(_) => {
                    cf.put_tunnel_configuration(&spec.account_id, &spec.cloudflare_id, config)
                        .await
                }
                Err(e) => Err(e),
            };
            match pushed {
                Ok(version) => {
                    debug!(tunnel_id = %spec.cloudflare_id, version = ?version, "Pushed tunnel configuration");
                    Ok(SyncOutcome::Synced {
                        external_id: spec.cloudflare_id.clone(),
                    })
                }
                Err(e) if e.is_not_found() => Ok(SyncOutcome::ExternalNotFound(format!(
                    "Cloudflare tunnel {} no longer exists; waiting for the Tunnel to recreate it",
                    spec.cloudflare_id
                ))),
                Err(e) => Err(SyncError::from(e).into()),
            }
        }
        DesiredState::Dns {
            request,
            adopt_policy,
        } => {
            let zone_id = spec
                .zone_id
                .as_deref()
                .ok_or_else(|| anyhow!("DNS CloudflareSyncState for {} has no zoneId", spec.cloudflare_id))?;

            let records = cf
                .find_dns_records(zone_id, &request.name, lookup_type(request))
                .await
                .map_err(SyncError::from)?;
            let existing = select_existing(&records, owner);

            let id = match decide(existing, request, owner, *adopt_policy) {
                AdoptionDecision::Create => {
                    cf.create_dns_record(zone_id, request)
                        .await
                        .map_err(SyncError::from)?
                        .id
                }
                AdoptionDecision::Update { id } => {
                    cf.update_dns_record(zone_id, &id, request)
                        .await
                        .map_err(SyncError::from)?;
                    id
                }
                AdoptionDecision::InSync { id } => id,
                AdoptionDecision::Adopt { id } => {
                    info!(record = %request.name, record_id = %id, "Adopting existing DNS record");
                    cf.update_dns_record(zone_id, &id, request)
                        .await
                        .map_err(SyncError::from)?;
                    metrics::record_resource_adopted(KIND_SYNC_STATE);
                    id
                }
                AdoptionDecision::Conflict { reason } => return Ok(SyncOutcome::Conflict(reason)),
            };
            Ok(SyncOutcome::Synced { external_id: id })
        }
    }
}

#[async_trait::async_trait]
impl FinalizerCleanup for CloudflareSyncState {
    async fn cleanup(&self, ctx: &Context) -> Result<()> {
        let name = self.name_any();
        ctx.debouncer.forget(&name);
        metrics::forget_sync_state(&name);

        let Some(external_id) = self.status.as_ref().and_then(|s| s.external_id.as_deref()) else {
            debug!(sync_state = %name, "Never synced, nothing to clean up in Cloudflare");
            return Ok(());
        };

        let spec = &self.spec;
        let cf = client_for(ctx, spec).await?;

        match spec.resource_type {
            SyncResourceType::TunnelConfiguration => {
                let fallback = TunnelConfiguration::fallback_only(DEFAULT_FALLBACK_SERVICE);
                match cf
                    .put_tunnel_configuration(&spec.account_id, external_id, &fallback)
                    .await
                {
                    Ok(_) => info!(tunnel_id = %external_id, "Reset tunnel to fallback-only configuration"),
                    Err(e) if e.is_not_found() => debug!(tunnel_id = %external_id, "Tunnel already gone"),
                    Err(e) => return Err(e.into()),
                }
            }
            SyncResourceType::DnsRecord => {
                let Some(zone_id) = spec.zone_id.as_deref() else {
                    return Ok(());
                };
                let record = match cf.get_dns_record(zone_id, external_id).await {
                    Ok(record) => record,
                    Err(e) if e.is_not_found() => return Ok(()),
                    Err(e) => return Err(e.into()),
                };
                if owner_of(record.comment.as_deref()) != Some(sync_state_owner(&name).as_str()) {
                    warn!(record = %record.name, record_id = %external_id, "DNS record is not owned by this SyncState, leaving it");
                    return Ok(());
                }
                match cf.delete_dns_record(zone_id, external_id).await {
                    Ok(()) => metrics::record_resource_deleted(KIND_SYNC_STATE),
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "syncstate_tests.rs"]
mod syncstate_tests;
