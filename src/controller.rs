// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller wiring for the operator's Custom Resources.
//!
//! The four namespaced resources share one generic controller that handles
//! the finalizer, metrics and error policy; each resource only supplies its
//! reconcile function and [`FinalizerCleanup`] implementation. The
//! cluster-scoped `CloudflareSyncState` manages its own finalizer and runs on
//! a dedicated controller.

use crate::constants::{
    ERROR_REQUEUE_DURATION_SECS, KIND_ACCESS_APPLICATION, KIND_DNS_RECORD, KIND_SYNC_STATE,
    KIND_TUNNEL, KIND_TUNNEL_BINDING,
};
use crate::context::Context;
use crate::crd::{
    AccessApplication, CloudflareSyncState, DNSRecord, SyncResourceType, SyncStatus, Tunnel,
    TunnelBinding,
};
use crate::labels::{
    FINALIZER_ACCESS_APPLICATION, FINALIZER_DNS_RECORD, FINALIZER_TUNNEL, FINALIZER_TUNNEL_BINDING,
};
use crate::metrics;
use crate::reconcilers::finalizers::FinalizerCleanup;
use crate::reconcilers::{
    reconcile_access_application, reconcile_dns_record, reconcile_sync_state, reconcile_tunnel,
    reconcile_tunnel_binding,
};
use crate::status_reasons::REASON_EXTERNAL_NOT_FOUND;
use anyhow::{anyhow, Result};
use futures::StreamExt;
use kube::api::Api;
use kube::core::NamespaceResourceScope;
use kube::runtime::controller::Action;
use kube::runtime::reflector::{self, ObjectRef};
use kube::runtime::watcher::{watcher, Config as WatcherConfig};
use kube::runtime::{finalizer, Controller, WatchStreamExt};
use kube::{Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Reconciliation error wrapper
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct ReconcileError(#[from] anyhow::Error);

/// Error policy shared by all controllers.
///
/// Returns an action to requeue the resource after a delay when reconciliation fails.
#[allow(clippy::needless_pass_by_value)] // Signature required by kube::runtime::Controller
fn error_policy<T>(resource: Arc<T>, err: &ReconcileError, _ctx: Arc<Context>) -> Action
where
    T: Resource<DynamicType = ()> + ResourceExt,
{
    let kind = T::kind(&());
    error!(
        error = %err,
        kind = %kind,
        resource = %resource.name_any(),
        namespace = ?resource.namespace(),
        "Reconciliation error - will retry in {}s",
        ERROR_REQUEUE_DURATION_SECS
    );
    metrics::record_reconciliation_requeue(&kind, "error");
    Action::requeue(Duration::from_secs(ERROR_REQUEUE_DURATION_SECS))
}

/// A namespaced resource reconciled by [`run_controller`].
pub trait ManagedResource:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + FinalizerCleanup
    + Clone
    + Debug
    + DeserializeOwned
    + Serialize
    + Send
    + Sync
    + 'static
{
    /// Kind used in logs and metric labels
    const KIND: &'static str;

    /// Finalizer guarding the resource's external objects
    const FINALIZER: &'static str;

    /// Create or update the resource's external state.
    fn reconcile(
        ctx: Arc<Context>,
        resource: Arc<Self>,
    ) -> impl Future<Output = Result<Action>> + Send;
}

impl ManagedResource for Tunnel {
    const KIND: &'static str = KIND_TUNNEL;
    const FINALIZER: &'static str = FINALIZER_TUNNEL;

    fn reconcile(ctx: Arc<Context>, resource: Arc<Self>) -> impl Future<Output = Result<Action>> + Send {
        reconcile_tunnel(ctx, resource)
    }
}

impl ManagedResource for TunnelBinding {
    const KIND: &'static str = KIND_TUNNEL_BINDING;
    const FINALIZER: &'static str = FINALIZER_TUNNEL_BINDING;

    fn reconcile(ctx: Arc<Context>, resource: Arc<Self>) -> impl Future<Output = Result<Action>> + Send {
        reconcile_tunnel_binding(ctx, resource)
    }
}

impl ManagedResource for DNSRecord {
    const KIND: &'static str = KIND_DNS_RECORD;
    const FINALIZER: &'static str = FINALIZER_DNS_RECORD;

    fn reconcile(ctx: Arc<Context>, resource: Arc<Self>) -> impl Future<Output = Result<Action>> + Send {
        reconcile_dns_record(ctx, resource)
    }
}

impl ManagedResource for AccessApplication {
    const KIND: &'static str = KIND_ACCESS_APPLICATION;
    const FINALIZER: &'static str = FINALIZER_ACCESS_APPLICATION;

    fn reconcile(ctx: Arc<Context>, resource: Arc<Self>) -> impl Future<Output = Result<Action>> + Send {
        reconcile_access_application(ctx, resource)
    }
}

/// Run a prepared controller for a namespaced resource until its stream ends.
///
/// # Errors
///
/// Never fails today; the signature leaves room for startup checks.
pub async fn run_controller<T>(context: Arc<Context>, controller: Controller<T>) -> Result<()>
where
    T: ManagedResource,
{
    info!("Starting {} controller", T::KIND);

    controller
        .run(reconcile_wrapper::<T>, error_policy::<T>, context)
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

/// Generic reconciliation wrapper with finalizer support.
///
/// 1. Finalizer management (add on apply, cleanup then remove on deletion)
/// 2. Reconciliation logic
/// 3. Metrics recording
async fn reconcile_wrapper<T>(resource: Arc<T>, ctx: Arc<Context>) -> Result<Action, ReconcileError>
where
    T: ManagedResource,
{
    let start = Instant::now();
    let namespace = resource
        .meta()
        .namespace
        .clone()
        .ok_or_else(|| ReconcileError::from(anyhow!("{} has no namespace", T::KIND)))?;
    let api: Api<T> = Api::namespaced(ctx.client.clone(), &namespace);

    let result = finalizer(&api, T::FINALIZER, resource, |event| async {
        match event {
            finalizer::Event::Apply(res) => T::reconcile(ctx.clone(), res)
                .await
                .map_err(ReconcileError::from),
            finalizer::Event::Cleanup(res) => {
                res.cleanup(&ctx).await.map_err(ReconcileError::from)?;
                info!(
                    "Cleaned up {} {}/{}",
                    T::KIND,
                    namespace,
                    res.name_any()
                );
                Ok(Action::await_change())
            }
        }
    })
    .await;

    let duration = start.elapsed();
    if result.is_ok() {
        metrics::record_reconciliation_success(T::KIND, duration);
    } else {
        metrics::record_reconciliation_error(T::KIND, duration);
        metrics::record_error(T::KIND, "reconcile_error");
    }

    result.map_err(|e: finalizer::Error<ReconcileError>| match e {
        finalizer::Error::ApplyFailed(err) | finalizer::Error::CleanupFailed(err) => err,
        finalizer::Error::AddFinalizer(err) | finalizer::Error::RemoveFinalizer(err) => {
            ReconcileError::from(anyhow!("Finalizer error: {err}"))
        }
        finalizer::Error::UnnamedObject => ReconcileError::from(anyhow!("{} has no name", T::KIND)),
        finalizer::Error::InvalidFinalizer => {
            ReconcileError::from(anyhow!("Invalid finalizer for {}", T::KIND))
        }
    })
}

/// `Tunnel`s to requeue when a tunnel configuration SyncState reports that the
/// Cloudflare tunnel is gone.
#[must_use]
pub fn tunnels_to_recover(sync_state: &CloudflareSyncState) -> Vec<ObjectRef<Tunnel>> {
    let lost = sync_state.spec.resource_type == SyncResourceType::TunnelConfiguration
        && sync_state
            .status
            .as_ref()
            .is_some_and(|s| {
                s.sync_status == SyncStatus::Error
                    && s.conditions
                        .iter()
                        .any(|c| c.reason.as_deref() == Some(REASON_EXTERNAL_NOT_FOUND))
            });
    if !lost {
        return Vec::new();
    }
    sync_state
        .spec
        .sources
        .iter()
        .filter(|source| source.source_ref.kind == KIND_TUNNEL)
        .map(|source| ObjectRef::new(&source.source_ref.name).within(&source.source_ref.namespace))
        .collect()
}

/// Run the `Tunnel` controller.
///
/// Also watches tunnel configuration SyncStates so a tunnel deleted outside of
/// Kubernetes is recreated as soon as the push fails.
///
/// # Errors
///
/// See [`run_controller`].
pub async fn run_tunnel_controller(context: Arc<Context>) -> Result<()> {
    let client = context.client.clone();
    let controller = Controller::new(Api::<Tunnel>::all(client.clone()), WatcherConfig::default())
        .watches(
            Api::<CloudflareSyncState>::all(client),
            WatcherConfig::default(),
            |sync_state| tunnels_to_recover(&sync_state),
        );
    run_controller(context, controller).await
}

/// Run the `TunnelBinding` controller.
///
/// Any change to a `Tunnel` (typically its id appearing in status) requeues
/// the bindings pointing at it.
///
/// # Errors
///
/// See [`run_controller`].
pub async fn run_tunnel_binding_controller(context: Arc<Context>) -> Result<()> {
    let client = context.client.clone();
    let stores = context.stores.clone();
    let controller = Controller::new(
        Api::<TunnelBinding>::all(client.clone()),
        WatcherConfig::default(),
    )
    .watches(
        Api::<Tunnel>::all(client),
        WatcherConfig::default(),
        move |tunnel| {
            let namespace = tunnel.namespace().unwrap_or_default();
            let bindings = stores.bindings_for_tunnel(&tunnel.name_any(), &namespace);
            debug!(
                tunnel = %tunnel.name_any(),
                namespace = %namespace,
                bindings = bindings.len(),
                "Tunnel changed, requeueing bindings"
            );
            bindings
        },
    );
    run_controller(context, controller).await
}

/// Run the `DNSRecord` controller.
///
/// # Errors
///
/// See [`run_controller`].
pub async fn run_dns_record_controller(context: Arc<Context>) -> Result<()> {
    let api = Api::<DNSRecord>::all(context.client.clone());
    run_controller(context, Controller::new(api, WatcherConfig::default())).await
}

/// Run the `AccessApplication` controller.
///
/// # Errors
///
/// See [`run_controller`].
pub async fn run_access_application_controller(context: Arc<Context>) -> Result<()> {
    let api = Api::<AccessApplication>::all(context.client.clone());
    run_controller(context, Controller::new(api, WatcherConfig::default())).await
}

/// Run the `CloudflareSyncState` controller.
///
/// # Errors
///
/// Never fails today; the signature matches the other controllers.
pub async fn run_sync_state_controller(context: Arc<Context>) -> Result<()> {
    info!("Starting {} controller", KIND_SYNC_STATE);

    let api = Api::<CloudflareSyncState>::all(context.client.clone());
    Controller::new(api, WatcherConfig::default())
        .run(
            reconcile_sync_state_wrapper,
            error_policy::<CloudflareSyncState>,
            context,
        )
        .for_each(|_| futures::future::ready(()))
        .await;

    Ok(())
}

async fn reconcile_sync_state_wrapper(
    sync_state: Arc<CloudflareSyncState>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let result = reconcile_sync_state(ctx, sync_state).await;

    let duration = start.elapsed();
    match &result {
        Ok(_) => metrics::record_reconciliation_success(KIND_SYNC_STATE, duration),
        Err(_) => {
            metrics::record_reconciliation_error(KIND_SYNC_STATE, duration);
            metrics::record_error(KIND_SYNC_STATE, "sync_error");
        }
    }
    result.map_err(ReconcileError::from)
}

/// Keep `writer` in sync with `api` until the watch stream ends.
pub async fn run_reflector<K>(api: Api<K>, writer: reflector::store::Writer<K>)
where
    K: Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned + Send + Sync + 'static,
    K::DynamicType: Eq + Hash + Clone,
{
    debug!("Starting {} reflector", K::kind(&()));
    watcher(api, WatcherConfig::default())
        .default_backoff()
        .reflect(writer)
        .applied_objects()
        .for_each(|_| futures::future::ready(()))
        .await;
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
