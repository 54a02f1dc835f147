// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `TunnelBinding` reconciliation logic.
//!
//! A binding routes hostnames through a `Tunnel`. It contributes its ingress
//! rules to the tunnel's configuration SyncState and, with `manageDns`, one
//! proxied CNAME per hostname to `dnsrecord-<hostname>`. The binding itself
//! never calls Cloudflare except to resolve a zone id.

use crate::constants::{
    DEFAULT_BINDING_PRIORITY, DEPENDENCY_WAIT_REQUEUE_SECS, KIND_TUNNEL_BINDING,
    TUNNEL_CNAME_SUFFIX,
};
use crate::context::Context;
use crate::crd::{
    CredentialsRef, DnsRecordType, SourceRef, SyncResourceType, Tunnel, TunnelBinding,
    TunnelBindingStatus, TunnelIngressRule,
};
use crate::reconcilers::finalizers::FinalizerCleanup;
use crate::reconcilers::status::StatusUpdater;
use crate::reconcilers::tunnel::configuration_target;
use crate::reconcilers::{failure_reason, requeue_based_on_readiness};
use crate::status_reasons::{REASON_READY, REASON_TUNNEL_NOT_READY};
use crate::sync::{
    new_source, register_source, sync_state_name, unregister_source, DnsSourceConfig, SyncTarget,
    TunnelSourceConfig,
};
use anyhow::{anyhow, Result};
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

enum BindingOutcome {
    Ready,
    WaitingForTunnel,
}

/// Namespace of the tunnel a binding points at.
#[must_use]
pub fn tunnel_namespace(binding: &TunnelBinding) -> String {
    binding
        .spec
        .tunnel_ref
        .namespace
        .clone()
        .or_else(|| binding.namespace())
        .unwrap_or_default()
}

/// Precedence of the binding's sources.
#[must_use]
pub fn binding_priority(binding: &TunnelBinding) -> i32 {
    binding.spec.priority.unwrap_or(DEFAULT_BINDING_PRIORITY)
}

/// The binding's ingress rules as a tunnel configuration fragment.
#[must_use]
pub fn binding_source_config(binding: &TunnelBinding) -> TunnelSourceConfig {
    TunnelSourceConfig {
        ingress: binding
            .spec
            .subjects
            .iter()
            .map(|subject| TunnelIngressRule {
                hostname: subject.hostname.clone(),
                service: subject.service.clone(),
                path: subject.path.clone(),
                origin_request: subject.origin_request.clone(),
            })
            .collect(),
        fallback_service: None,
        origin_request: None,
    }
}

/// Hostnames the binding manages DNS for, normalized and deduplicated.
#[must_use]
pub fn managed_hostnames(binding: &TunnelBinding) -> Vec<String> {
    if !binding.spec.manage_dns {
        return Vec::new();
    }
    binding
        .spec
        .subjects
        .iter()
        .map(|subject| normalize_hostname(&subject.hostname))
        .filter(|hostname| !hostname.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn normalize_hostname(hostname: &str) -> String {
    hostname.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// CNAME fragment pointing `hostname` at the tunnel.
#[must_use]
pub fn cname_source_config(binding: &TunnelBinding, hostname: &str, tunnel_id: &str) -> DnsSourceConfig {
    DnsSourceConfig {
        name: hostname.to_string(),
        r#type: DnsRecordType::CNAME,
        content: format!("{tunnel_id}.{TUNNEL_CNAME_SUFFIX}"),
        proxied: true,
        ttl: None,
        adopt_policy: binding.spec.adopt_policy,
    }
}

/// Hostnames recorded in status that are no longer managed.
#[must_use]
pub fn removed_hostnames(previous: &[String], current: &[String]) -> Vec<String> {
    previous
        .iter()
        .filter(|hostname| !current.contains(hostname))
        .cloned()
        .collect()
}

/// Reconciles a `TunnelBinding` resource.
///
/// # Errors
///
/// Returns an error when source registration or zone resolution fails.
pub async fn reconcile_tunnel_binding(
    ctx: Arc<Context>,
    binding: Arc<TunnelBinding>,
) -> Result<Action> {
    let name = binding.name_any();
    let namespace = binding
        .namespace()
        .ok_or_else(|| anyhow!("TunnelBinding {name} has no namespace"))?;
    let api: Api<TunnelBinding> = Api::namespaced(ctx.client.clone(), &namespace);

    debug!(binding = %name, namespace = %namespace, "Reconciling TunnelBinding");

    let mut status = StatusUpdater::new(binding.status.as_ref());
    status.set_observed_generation(binding.metadata.generation);

    match sync_binding(&ctx, &binding, &namespace, &mut status).await {
        Ok(BindingOutcome::Ready) => {
            status.apply(&api, &name).await?;
            Ok(requeue_based_on_readiness(true))
        }
        Ok(BindingOutcome::WaitingForTunnel) => {
            status.apply(&api, &name).await?;
            Ok(Action::requeue(Duration::from_secs(DEPENDENCY_WAIT_REQUEUE_SECS)))
        }
        Err(e) => {
            let (reason, message) = failure_reason(&e);
            status.set_not_ready(reason, &message);
            status.apply(&api, &name).await?;
            Err(e)
        }
    }
}

async fn sync_binding(
    ctx: &Context,
    binding: &TunnelBinding,
    namespace: &str,
    status: &mut StatusUpdater<TunnelBindingStatus>,
) -> Result<BindingOutcome> {
    let name = binding.name_any();
    let tunnel_ref = &binding.spec.tunnel_ref;
    let tunnel_ns = tunnel_namespace(binding);

    let tunnel = ctx
        .stores
        .get_tunnel(&tunnel_ref.name, &tunnel_ns)
        .filter(|tunnel| tunnel.metadata.deletion_timestamp.is_none());
    let Some((tunnel, tunnel_id)) = tunnel.and_then(|tunnel| {
        let id = tunnel.tunnel_id()?.to_string();
        Some((tunnel, id))
    }) else {
        debug!(binding = %name, tunnel = %tunnel_ref.name, "Tunnel not ready yet");
        status.set_not_ready(
            REASON_TUNNEL_NOT_READY,
            &format!("Tunnel {tunnel_ns}/{} does not exist or has no tunnel id yet", tunnel_ref.name),
        );
        return Ok(BindingOutcome::WaitingForTunnel);
    };

    let source_ref = SourceRef::new(KIND_TUNNEL_BINDING, namespace, &name);
    let priority = binding_priority(binding);
    let previous = status.status().clone();

    let target = configuration_target(&tunnel, &tunnel_ns, &tunnel_id);
    let source = new_source(source_ref.clone(), priority, &binding_source_config(binding))?;
    register_source(&ctx.client, &target, source).await?;

    let sync_state = target.name();
    if let Some(old) = previous.sync_state.as_deref().filter(|old| *old != sync_state) {
        info!(binding = %name, old_sync_state = %old, sync_state = %sync_state, "Tunnel changed, leaving previous SyncState");
        unregister_source(&ctx.client, old, &source_ref).await?;
    }

    let hostnames = managed_hostnames(binding);
    if !hostnames.is_empty() {
        let zone_id = resolve_zone_id(ctx, &tunnel, &tunnel_ns).await?;
        for hostname in &hostnames {
            let dns_target = SyncTarget {
                resource_type: SyncResourceType::DnsRecord,
                cloudflare_id: hostname.clone(),
                account_id: tunnel.spec.cloudflare.account_id.clone(),
                zone_id: Some(zone_id.clone()),
                credentials_ref: CredentialsRef {
                    namespace: tunnel_ns.clone(),
                    details: tunnel.spec.cloudflare.clone(),
                },
            };
            let dns_source = new_source(
                source_ref.clone(),
                priority,
                &cname_source_config(binding, hostname, &tunnel_id),
            )?;
            register_source(&ctx.client, &dns_target, dns_source).await?;
        }
    }

    for hostname in removed_hostnames(&previous.hostnames, &hostnames) {
        debug!(binding = %name, hostname = %hostname, "Releasing DNS record");
        unregister_source(
            &ctx.client,
            &sync_state_name(SyncResourceType::DnsRecord, &hostname),
            &source_ref,
        )
        .await?;
    }

    let new_status = status.status_mut();
    new_status.tunnel_id = Some(tunnel_id.clone());
    new_status.sync_state = Some(sync_state);
    new_status.hostnames = hostnames;

    status.set_ready(
        REASON_READY,
        &format!(
            "{} hostname(s) routed through tunnel {tunnel_id}",
            binding.spec.subjects.len()
        ),
    );
    Ok(BindingOutcome::Ready)
}

/// Zone of the tunnel's domain: the configured id, or a lookup by domain.
async fn resolve_zone_id(ctx: &Context, tunnel: &Tunnel, namespace: &str) -> Result<String> {
    let details = &tunnel.spec.cloudflare;
    if let Some(zone_id) = details.zone_id.as_ref() {
        return Ok(zone_id.clone());
    }
    let domain = details.domain.as_deref().ok_or_else(|| {
        anyhow!(
            "Tunnel {namespace}/{} needs cloudflare.zoneId or cloudflare.domain to manage DNS",
            tunnel.name_any()
        )
    })?;
    let cf = ctx.cloudflare_client(namespace, details).await?;
    Ok(cf.find_zone_id(domain).await?)
}

#[async_trait::async_trait]
impl FinalizerCleanup for TunnelBinding {
    async fn cleanup(&self, ctx: &Context) -> Result<()> {
        let name = self.name_any();
        let namespace = self.namespace().unwrap_or_default();
        let source_ref = SourceRef::new(KIND_TUNNEL_BINDING, &namespace, &name);

        let mut sync_states: BTreeSet<String> = ctx
            .stores
            .sync_states_with_source(&source_ref)
            .into_iter()
            .collect();
        if let Some(status) = self.status.as_ref() {
            sync_states.extend(status.sync_state.clone());
            sync_states.extend(
                status
                    .hostnames
                    .iter()
                    .map(|hostname| sync_state_name(SyncResourceType::DnsRecord, hostname)),
            );
        }

        for sync_state in &sync_states {
            unregister_source(&ctx.client, sync_state, &source_ref).await?;
        }
        info!(binding = %name, namespace = %namespace, released = sync_states.len(), "Released TunnelBinding sources");
        Ok(())
    }
}

#[cfg(test)]
#[path = "tunnelbinding_tests.rs"]
mod tunnelbinding_tests;
