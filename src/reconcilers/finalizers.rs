// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for operator resources.
//!
//! Namespaced resources go through `kube::runtime::finalizer` in
//! [`run_controller`](crate::controller::run_controller), which calls
//! [`FinalizerCleanup::cleanup`] on deletion. The cluster-scoped
//! `CloudflareSyncState` also deletes itself once its last source is gone, so
//! its reconciler drives the finalizer directly with the functions below.
//!
//! # Example
//!
//! ```rust,ignore
//! use cloudflare_operator::reconcilers::finalizers::{
//!     ensure_cluster_finalizer, handle_cluster_deletion,
//! };
//!
//! async fn reconcile(ctx: &Context, sync_state: &CloudflareSyncState) -> Result<()> {
//!     if sync_state.metadata.deletion_timestamp.is_some() {
//!         return handle_cluster_deletion(ctx, sync_state, FINALIZER_SYNC_STATE).await;
//!     }
//!     ensure_cluster_finalizer(&ctx.client, sync_state, FINALIZER_SYNC_STATE).await?;
//!     // Normal reconciliation logic...
//!     Ok(())
//! }
//! ```

use crate::context::Context;
use anyhow::Result;
use kube::api::{Patch, PatchParams};
use kube::core::ClusterResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::json;
use tracing::info;

/// Trait for resources that require cleanup operations when being deleted.
///
/// Implement this trait to define the external cleanup that must run before
/// the finalizer is removed. An error keeps the finalizer in place and blocks
/// deletion until cleanup succeeds on a later reconciliation.
#[async_trait::async_trait]
pub trait FinalizerCleanup: Resource + ResourceExt + Clone {
    /// Perform cleanup operations before the finalizer is removed.
    ///
    /// # Errors
    ///
    /// Should return an error if external objects could not be cleaned up.
    async fn cleanup(&self, ctx: &Context) -> Result<()>;
}

fn has_finalizer<T: Resource>(resource: &T, finalizer: &str) -> bool {
    resource
        .meta()
        .finalizers
        .as_ref()
        .is_some_and(|f| f.iter().any(|existing| existing == finalizer))
}

/// Add a finalizer to a cluster-scoped resource if not already present.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn ensure_cluster_finalizer<T>(
    client: &Client,
    resource: &T,
    finalizer: &str,
) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let name = resource.name_any();
    info!("Adding finalizer {} to {} {}", finalizer, T::kind(&()), name);

    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.push(finalizer.to_string());

    let api: Api<T> = Api::all(client.clone());
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await?;

    Ok(())
}

/// Remove a finalizer from a cluster-scoped resource.
///
/// Prefer [`handle_cluster_deletion`], which runs cleanup first.
///
/// # Errors
///
/// Returns an error if the API patch operation fails.
pub async fn remove_cluster_finalizer<T>(
    client: &Client,
    resource: &T,
    finalizer: &str,
) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let name = resource.name_any();
    info!("Removing finalizer {} from {} {}", finalizer, T::kind(&()), name);

    let mut finalizers = resource.meta().finalizers.clone().unwrap_or_default();
    finalizers.retain(|f| f != finalizer);

    let api: Api<T> = Api::all(client.clone());
    let patch = json!({ "metadata": { "finalizers": finalizers } });
    match api
        .patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
    {
        Ok(_) => Ok(()),
        // Already gone
        Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Run cleanup for a deleted cluster-scoped resource, then remove its finalizer.
///
/// Does nothing when the finalizer is already gone. If cleanup fails the
/// finalizer stays and deletion is retried on the next reconciliation.
///
/// # Errors
///
/// Returns an error if cleanup or finalizer removal fails.
pub async fn handle_cluster_deletion<T>(ctx: &Context, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + ResourceExt
        + FinalizerCleanup
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>
        + Sync,
{
    let name = resource.name_any();
    info!("{} {} is being deleted", T::kind(&()), name);

    if has_finalizer(resource, finalizer) {
        info!("Running cleanup for {} {}", T::kind(&()), name);
        resource.cleanup(ctx).await?;
        remove_cluster_finalizer(&ctx.client, resource, finalizer).await?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
