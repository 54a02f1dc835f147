// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Source registration on `CloudflareSyncState` objects.
//!
//! Controllers never call Cloudflare for shared objects. They register (or
//! unregister) their contribution here and the SyncState controller does the
//! rest. Writes use optimistic concurrency on `resourceVersion`: a 409 from a
//! racing writer is retried against a fresh copy.

use super::SyncError;
use crate::constants::{MAX_OBJECT_NAME_LEN, SYNC_STATE_UPDATE_ATTEMPTS};
use crate::crd::{
    CloudflareSyncState, CloudflareSyncStateSpec, ConfigSource, CredentialsRef, SourceRef,
    SyncResourceType,
};
use crate::labels::{
    COMPONENT_SYNC_STATE, K8S_COMPONENT, K8S_MANAGED_BY, PART_OF_OPERATOR,
    SYNC_RESOURCE_TYPE_LABEL, TUNNEL_ID_LABEL,
};
use chrono::Utc;
use kube::api::{Api, PostParams};
use kube::Client;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Length of the hash suffix appended to truncated names.
const NAME_HASH_SUFFIX_LEN: usize = 16;

/// Identity of the SyncState a source is registered on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncTarget {
    pub resource_type: SyncResourceType,
    /// Tunnel id, or the record FQDN.
    pub cloudflare_id: String,
    pub account_id: String,
    pub zone_id: Option<String>,
    pub credentials_ref: CredentialsRef,
}

impl SyncTarget {
    /// Name of the SyncState object for this target.
    #[must_use]
    pub fn name(&self) -> String {
        sync_state_name(self.resource_type, &self.cloudflare_id)
    }

    fn labels(&self) -> BTreeMap<String, String> {
        let mut labels = BTreeMap::from([
            (K8S_MANAGED_BY.to_string(), PART_OF_OPERATOR.to_string()),
            (K8S_COMPONENT.to_string(), COMPONENT_SYNC_STATE.to_string()),
            (
                SYNC_RESOURCE_TYPE_LABEL.to_string(),
                self.resource_type.as_str().to_ascii_lowercase(),
            ),
        ]);
        if self.resource_type == SyncResourceType::TunnelConfiguration {
            labels.insert(TUNNEL_ID_LABEL.to_string(), self.cloudflare_id.clone());
        }
        labels
    }

    fn spec(&self, sources: Vec<ConfigSource>) -> CloudflareSyncStateSpec {
        CloudflareSyncStateSpec {
            resource_type: self.resource_type,
            cloudflare_id: self.cloudflare_id.clone(),
            account_id: self.account_id.clone(),
            zone_id: self.zone_id.clone(),
            credentials_ref: self.credentials_ref.clone(),
            sources,
        }
    }

    /// Copy identity fields into `spec`; returns whether anything changed.
    fn apply_identity(&self, spec: &mut CloudflareSyncStateSpec) -> bool {
        let mut changed = false;
        if spec.account_id != self.account_id {
            spec.account_id.clone_from(&self.account_id);
            changed = true;
        }
        if spec.zone_id != self.zone_id {
            spec.zone_id.clone_from(&self.zone_id);
            changed = true;
        }
        if spec.credentials_ref != self.credentials_ref {
            spec.credentials_ref = self.credentials_ref.clone();
            changed = true;
        }
        changed
    }
}

/// DNS-1123 safe SyncState name for `key` (tunnel id or hostname).
///
/// `tunnelconfiguration-<id>` or `dnsrecord-<hostname>` with `*` spelled
/// `wildcard`. Characters outside `[a-z0-9]` become `-`, and labels are
/// trimmed of leading and trailing `-`; labels left empty are dropped. Names longer than 253 characters are truncated and suffixed
/// with a hash of the full name so distinct keys stay distinct.
#[must_use]
pub fn sync_state_name(resource_type: SyncResourceType, key: &str) -> String {
    let key = key.trim_end_matches('.').replace('*', "wildcard");
    let raw = format!("{}-{key}", resource_type.as_str().to_ascii_lowercase());

    // Every dot-separated label must start and end alphanumeric
    let sanitized = raw
        .to_ascii_lowercase()
        .split('.')
        .map(|label| {
            label
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
                .collect::<String>()
                .trim_matches('-')
                .to_string()
        })
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(".");

    if sanitized.len() <= MAX_OBJECT_NAME_LEN {
        return sanitized;
    }

    let digest = format!("{:x}", Sha256::digest(sanitized.as_bytes()));
    let keep = MAX_OBJECT_NAME_LEN - NAME_HASH_SUFFIX_LEN - 1;
    let prefix = sanitized[..keep].trim_end_matches(|c| c == '-' || c == '.');
    format!("{prefix}-{}", &digest[..NAME_HASH_SUFFIX_LEN])
}

/// Build a source stamped with the current time.
///
/// # Errors
///
/// Fails when `config` cannot be serialized to JSON.
pub fn new_source<T: Serialize>(
    source_ref: SourceRef,
    priority: i32,
    config: &T,
) -> Result<ConfigSource, SyncError> {
    Ok(ConfigSource {
        source_ref,
        priority,
        config: serde_json::to_value(config)?,
        last_updated: Some(Utc::now().to_rfc3339()),
    })
}

/// Insert or replace the source with the same ref. `lastUpdated` is ignored
/// when comparing; returns whether the list changed.
pub fn upsert_source(sources: &mut Vec<ConfigSource>, source: ConfigSource) -> bool {
    match sources
        .iter_mut()
        .find(|s| s.source_ref == source.source_ref)
    {
        Some(existing) => {
            if existing.priority == source.priority && existing.config == source.config {
                return false;
            }
            *existing = source;
            true
        }
        None => {
            sources.push(source);
            sources.sort_by(|a, b| a.source_ref.cmp(&b.source_ref));
            true
        }
    }
}

/// Remove the source with `source_ref`; returns whether it was present.
pub fn remove_source(sources: &mut Vec<ConfigSource>, source_ref: &SourceRef) -> bool {
    let before = sources.len();
    sources.retain(|s| &s.source_ref != source_ref);
    sources.len() != before
}

fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// Register `source` on the SyncState of `target`, creating it when missing.
///
/// # Errors
///
/// Returns [`SyncError::Terminating`] when the SyncState is being deleted,
/// [`SyncError::TooManyConflicts`] when every attempt raced with another
/// writer, and Kubernetes errors otherwise.
pub async fn register_source(
    client: &Client,
    target: &SyncTarget,
    source: ConfigSource,
) -> Result<(), SyncError> {
    let api: Api<CloudflareSyncState> = Api::all(client.clone());
    let name = target.name();

    for attempt in 1..=SYNC_STATE_UPDATE_ATTEMPTS {
        let result = match api.get_opt(&name).await? {
            None => {
                let mut sync_state = CloudflareSyncState::new(&name, target.spec(vec![source.clone()]));
                sync_state.metadata.labels = Some(target.labels());
                api.create(&PostParams::default(), &sync_state)
                    .await
                    .map(|_| info!(sync_state = %name, source = %source.source_ref, "Created CloudflareSyncState"))
            }
            Some(mut existing) => {
                if existing.metadata.deletion_timestamp.is_some() {
                    return Err(SyncError::Terminating { name });
                }
                let identity_changed = target.apply_identity(&mut existing.spec);
                let sources_changed = upsert_source(&mut existing.spec.sources, source.clone());
                if !identity_changed && !sources_changed {
                    debug!(sync_state = %name, source = %source.source_ref, "Source already registered");
                    return Ok(());
                }
                api.replace(&name, &PostParams::default(), &existing)
                    .await
                    .map(|_| debug!(sync_state = %name, source = %source.source_ref, "Registered source"))
            }
        };

        match result {
            Ok(()) => return Ok(()),
            Err(e) if is_conflict(&e) => {
                warn!(sync_state = %name, attempt = attempt, "CloudflareSyncState changed concurrently, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(SyncError::TooManyConflicts {
        name,
        attempts: SYNC_STATE_UPDATE_ATTEMPTS,
    })
}

/// Remove the source `source_ref` from SyncState `name`.
///
/// A missing SyncState or source is success. The SyncState controller deletes
/// SyncStates left without sources.
///
/// # Errors
///
/// Returns [`SyncError::TooManyConflicts`] when every attempt raced with
/// another writer, and Kubernetes errors otherwise.
pub async fn unregister_source(
    client: &Client,
    name: &str,
    source_ref: &SourceRef,
) -> Result<(), SyncError> {
    let api: Api<CloudflareSyncState> = Api::all(client.clone());

    for attempt in 1..=SYNC_STATE_UPDATE_ATTEMPTS {
        let Some(mut existing) = api.get_opt(name).await? else {
            return Ok(());
        };
        if !remove_source(&mut existing.spec.sources, source_ref) {
            return Ok(());
        }

        match api.replace(name, &PostParams::default(), &existing).await {
            Ok(_) => {
                debug!(sync_state = %name, source = %source_ref, "Unregistered source");
                return Ok(());
            }
            Err(e) if is_not_found(&e) => return Ok(()),
            Err(e) if is_conflict(&e) => {
                warn!(sync_state = %name, attempt = attempt, "CloudflareSyncState changed concurrently, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(SyncError::TooManyConflicts {
        name: name.to_string(),
        attempts: SYNC_STATE_UPDATE_ATTEMPTS,
    })
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod service_tests;
