// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `Tunnel` reconciliation logic.
//!
//! A `Tunnel` owns one remotely-managed Cloudflare tunnel. The reconciler
//! creates (or adopts) it, keeps the connector token in a Secret and registers
//! the tunnel's own ingress rules, fallback and origin settings as the
//! highest-precedence source of the `tunnelconfiguration-<id>` SyncState. It
//! never writes the tunnel configuration itself.
//!
//! A tunnel deleted outside of Kubernetes is recreated on the next
//! reconciliation; its bindings follow through the `Tunnel` watch.

use crate::cloudflare::types::CloudflareTunnel;
use crate::cloudflare::CloudflareClient;
use crate::constants::{
    KIND_TUNNEL, TUNNEL_SOURCE_PRIORITY, TUNNEL_TOKEN_SECRET_KEY, TUNNEL_TOKEN_SECRET_SUFFIX,
};
use crate::context::Context;
use crate::crd::{CredentialsRef, SourceRef, SyncResourceType, Tunnel, TunnelStatus};
use crate::labels::{
    COMPONENT_TUNNEL_TOKEN, K8S_COMPONENT, K8S_MANAGED_BY, K8S_PART_OF, PART_OF_OPERATOR,
    TUNNEL_ID_LABEL,
};
use crate::metrics;
use crate::reconcilers::finalizers::FinalizerCleanup;
use crate::reconcilers::resources::{create_or_apply, owner_reference, FIELD_MANAGER};
use crate::reconcilers::status::StatusUpdater;
use crate::reconcilers::{failure_reason, requeue_based_on_readiness};
use crate::status_reasons::{REASON_READY, REASON_TUNNEL_ADOPTED, REASON_TUNNEL_CONFLICT};
use crate::sync::{
    new_source, register_source, sync_state_name, unregister_source, SyncTarget, TunnelSourceConfig,
};
use anyhow::{anyhow, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name of the Secret holding the connector token of `tunnel_name`.
#[must_use]
pub fn token_secret_name(tunnel_name: &str) -> String {
    format!("{tunnel_name}{TUNNEL_TOKEN_SECRET_SUFFIX}")
}

/// Secret carrying the `cloudflared` connector token, owned by the `Tunnel`.
///
/// # Errors
///
/// Returns an error if the tunnel has no uid.
pub fn build_token_secret(tunnel: &Tunnel, tunnel_id: &str, token: &str) -> Result<Secret> {
    let labels = BTreeMap::from([
        (K8S_MANAGED_BY.to_string(), PART_OF_OPERATOR.to_string()),
        (K8S_PART_OF.to_string(), PART_OF_OPERATOR.to_string()),
        (K8S_COMPONENT.to_string(), COMPONENT_TUNNEL_TOKEN.to_string()),
        (TUNNEL_ID_LABEL.to_string(), tunnel_id.to_string()),
    ]);

    Ok(Secret {
        metadata: ObjectMeta {
            name: Some(token_secret_name(&tunnel.name_any())),
            namespace: tunnel.namespace(),
            labels: Some(labels),
            owner_references: Some(vec![owner_reference(tunnel)?]),
            ..Default::default()
        },
        string_data: Some(BTreeMap::from([(
            TUNNEL_TOKEN_SECRET_KEY.to_string(),
            token.to_string(),
        )])),
        type_: Some("Opaque".to_string()),
        ..Default::default()
    })
}

/// The tunnel's own contribution to its configuration SyncState.
#[must_use]
pub fn tunnel_source_config(tunnel: &Tunnel) -> TunnelSourceConfig {
    TunnelSourceConfig {
        ingress: tunnel.spec.ingress.clone(),
        fallback_service: tunnel.spec.fallback_service.clone(),
        origin_request: tunnel.spec.origin_request.clone(),
    }
}

/// SyncState target for the configuration of `tunnel_id`.
#[must_use]
pub fn configuration_target(tunnel: &Tunnel, namespace: &str, tunnel_id: &str) -> SyncTarget {
    SyncTarget {
        resource_type: SyncResourceType::TunnelConfiguration,
        cloudflare_id: tunnel_id.to_string(),
        account_id: tunnel.spec.cloudflare.account_id.clone(),
        zone_id: None,
        credentials_ref: CredentialsRef {
            namespace: namespace.to_string(),
            details: tunnel.spec.cloudflare.clone(),
        },
    }
}

/// Reconciles a `Tunnel` resource.
///
/// # Errors
///
/// Returns an error when Cloudflare or Kubernetes calls fail; the failure is
/// also recorded in the `Ready` condition.
pub async fn reconcile_tunnel(ctx: Arc<Context>, tunnel: Arc<Tunnel>) -> Result<Action> {
    let name = tunnel.name_any();
    let namespace = tunnel
        .namespace()
        .ok_or_else(|| anyhow!("Tunnel {name} has no namespace"))?;
    let api: Api<Tunnel> = Api::namespaced(ctx.client.clone(), &namespace);

    debug!(tunnel = %name, namespace = %namespace, "Reconciling Tunnel");

    let mut status = StatusUpdater::new(tunnel.status.as_ref());
    status.set_observed_generation(tunnel.metadata.generation);

    match sync_tunnel(&ctx, &tunnel, &namespace, &mut status).await {
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

/// Returns whether the tunnel ended up ready.
async fn sync_tunnel(
    ctx: &Context,
    tunnel: &Tunnel,
    namespace: &str,
    status: &mut StatusUpdater<TunnelStatus>,
) -> Result<bool> {
    let name = tunnel.name_any();
    let cf = ctx.cloudflare_client(namespace, &tunnel.spec.cloudflare).await?;
    let account_id = tunnel.spec.cloudflare.account_id.as_str();
    let cloudflare_name = tunnel.cloudflare_name();
    let previous_id = tunnel.tunnel_id().map(str::to_string);

    let known = match &previous_id {
        Some(id) => verify_known_tunnel(&cf, account_id, id).await?,
        None => None,
    };

    let (remote, adopted) = match known {
        Some(remote) => (remote, status.status().adopted),
        None => match cf.find_tunnel_by_name(account_id, &cloudflare_name).await? {
            Some(existing) if tunnel.spec.adopt_existing => {
                info!(tunnel = %name, tunnel_id = %existing.id, "Adopting existing Cloudflare tunnel");
                metrics::record_resource_adopted(KIND_TUNNEL);
                (existing, true)
            }
            Some(existing) => {
                warn!(tunnel = %name, tunnel_id = %existing.id, "Cloudflare tunnel name already taken");
                status.set_not_ready(
                    REASON_TUNNEL_CONFLICT,
                    &format!(
                        "A Cloudflare tunnel named {cloudflare_name} already exists ({}) and adoptExisting is false",
                        existing.id
                    ),
                );
                return Ok(false);
            }
            None => match cf.create_tunnel(account_id, &cloudflare_name).await {
                Ok(created) => {
                    metrics::record_resource_created(KIND_TUNNEL);
                    (created, false)
                }
                Err(e) if e.is_already_exists() => {
                    warn!(tunnel = %name, "Cloudflare tunnel was created concurrently, retrying lookup");
                    status.set_not_ready(
                        REASON_TUNNEL_CONFLICT,
                        &format!("A Cloudflare tunnel named {cloudflare_name} appeared while creating it"),
                    );
                    return Ok(false);
                }
                Err(e) => return Err(e.into()),
            },
        },
    };
    let tunnel_id = remote.id.clone();

    // Recorded before anything else can fail, so the error path persists it
    // and the next reconciliation finds this tunnel instead of a name clash.
    {
        let new_status = status.status_mut();
        new_status.tunnel_id = Some(tunnel_id.clone());
        new_status.tunnel_name = Some(remote.name.clone());
        new_status.account_id = Some(account_id.to_string());
        new_status.adopted = adopted;
    }

    let token = cf.get_tunnel_token(account_id, &tunnel_id).await?;
    let secret = build_token_secret(tunnel, &tunnel_id, &token)?;
    create_or_apply(&ctx.client, namespace, &secret, FIELD_MANAGER).await?;

    let source_ref = SourceRef::new(KIND_TUNNEL, namespace, &name);
    let target = configuration_target(tunnel, namespace, &tunnel_id);
    let source = new_source(source_ref.clone(), TUNNEL_SOURCE_PRIORITY, &tunnel_source_config(tunnel))?;
    register_source(&ctx.client, &target, source).await?;

    if let Some(old_id) = previous_id.as_deref().filter(|old| *old != tunnel_id) {
        info!(tunnel = %name, old_tunnel_id = %old_id, tunnel_id = %tunnel_id, "Tunnel id changed, leaving previous SyncState");
        unregister_source(
            &ctx.client,
            &sync_state_name(SyncResourceType::TunnelConfiguration, old_id),
            &source_ref,
        )
        .await?;
    }

    let new_status = status.status_mut();
    new_status.token_secret = secret.metadata.name;
    new_status.sync_state = Some(target.name());

    let reason = if adopted { REASON_TUNNEL_ADOPTED } else { REASON_READY };
    status.set_ready(reason, &format!("Tunnel {cloudflare_name} ({tunnel_id}) is ready"));
    Ok(true)
}

/// The tunnel recorded in status, or `None` when it was deleted outside of
/// Kubernetes and must be recreated.
async fn verify_known_tunnel(
    cf: &CloudflareClient,
    account_id: &str,
    tunnel_id: &str,
) -> Result<Option<CloudflareTunnel>> {
    match cf.get_tunnel(account_id, tunnel_id).await {
        Ok(remote) if !remote.is_deleted() => Ok(Some(remote)),
        Ok(_) => {
            warn!(tunnel_id = %tunnel_id, "Cloudflare tunnel was deleted externally, recreating");
            Ok(None)
        }
        Err(e) if e.is_not_found() => {
            warn!(tunnel_id = %tunnel_id, "Cloudflare tunnel no longer exists, recreating");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait::async_trait]
impl FinalizerCleanup for Tunnel {
    async fn cleanup(&self, ctx: &Context) -> Result<()> {
        let name = self.name_any();
        let namespace = self.namespace().unwrap_or_default();
        let source_ref = SourceRef::new(KIND_TUNNEL, &namespace, &name);

        if let Some(sync_state) = self.status.as_ref().and_then(|s| s.sync_state.as_deref()) {
            unregister_source(&ctx.client, sync_state, &source_ref).await?;
        }

        let Some(tunnel_id) = self.tunnel_id() else {
            debug!(tunnel = %name, "Tunnel was never created, nothing to clean up");
            return Ok(());
        };

        if self.status.as_ref().is_some_and(|s| s.adopted) {
            info!(tunnel = %name, tunnel_id = %tunnel_id, "Leaving adopted Cloudflare tunnel in place");
            return Ok(());
        }

        let account_id = &self.spec.cloudflare.account_id;
        let cf = ctx.cloudflare_client(&namespace, &self.spec.cloudflare).await?;

        match cf.cleanup_tunnel_connections(account_id, tunnel_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(tunnel_id = %tunnel_id, "Cloudflare tunnel already gone");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }

        match cf.delete_tunnel(account_id, tunnel_id).await {
            Ok(()) => metrics::record_resource_deleted(KIND_TUNNEL),
            Err(e) if e.is_not_found() => debug!(tunnel_id = %tunnel_id, "Cloudflare tunnel already gone"),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tunnel_tests.rs"]
mod tunnel_tests;
