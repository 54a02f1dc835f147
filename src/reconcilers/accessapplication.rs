// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! `AccessApplication` reconciliation logic.
//!
//! Applications are matched to existing ones by protected domain. An existing
//! application the operator did not create is taken over according to the
//! resource's `adoptPolicy`, and left in place when the resource is deleted.

use crate::cloudflare::types::{AccessApp, AccessAppRequest};
use crate::cloudflare::CloudflareClient;
use crate::constants::{DEFAULT_ACCESS_APP_TYPE, KIND_ACCESS_APPLICATION};
use crate::context::Context;
use crate::crd::{AccessApplication, AccessApplicationSpec, AccessApplicationStatus, AdoptPolicy};
use crate::metrics;
use crate::reconcilers::finalizers::FinalizerCleanup;
use crate::reconcilers::status::StatusUpdater;
use crate::reconcilers::{failure_reason, requeue_based_on_readiness};
use crate::status_reasons::{REASON_APPLICATION_CONFLICT, REASON_READY};
use crate::sync::adopt::policy_allows;
use crate::sync::hash::hash_of;
use anyhow::{anyhow, Result};
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Request body for `spec`.
#[must_use]
pub fn desired_application(spec: &AccessApplicationSpec) -> AccessAppRequest {
    AccessAppRequest {
        name: spec.name.clone(),
        domain: spec.domain.clone(),
        app_type: spec
            .r#type
            .clone()
            .unwrap_or_else(|| DEFAULT_ACCESS_APP_TYPE.to_string()),
        session_duration: spec.session_duration.clone(),
        allowed_idps: spec.allowed_idps.clone(),
        auto_redirect_to_identity: spec.auto_redirect_to_identity,
        app_launcher_visible: spec.app_launcher_visible,
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// The application protecting the same domain as `desired`, if any.
#[must_use]
pub fn find_by_domain<'a>(apps: &'a [AccessApp], desired: &AccessAppRequest) -> Option<&'a AccessApp> {
    let domain = normalize_domain(&desired.domain);
    apps.iter().find(|app| normalize_domain(&app.domain) == domain)
}

/// Same name and type; the bar for `IfIdentical` adoption.
#[must_use]
pub fn same_identity(existing: &AccessApp, desired: &AccessAppRequest) -> bool {
    existing.name == desired.name
        && existing.app_type.as_deref().unwrap_or(DEFAULT_ACCESS_APP_TYPE) == desired.app_type
}

/// Whether `policy` allows taking over `existing`.
#[must_use]
pub fn may_adopt(policy: AdoptPolicy, existing: &AccessApp, desired: &AccessAppRequest) -> bool {
    policy_allows(policy, same_identity(existing, desired))
}

/// Reconciles an `AccessApplication` resource.
///
/// # Errors
///
/// Returns an error when Cloudflare or Kubernetes calls fail.
pub async fn reconcile_access_application(
    ctx: Arc<Context>,
    app: Arc<AccessApplication>,
) -> Result<Action> {
    let name = app.name_any();
    let namespace = app
        .namespace()
        .ok_or_else(|| anyhow!("AccessApplication {name} has no namespace"))?;
    let api: Api<AccessApplication> = Api::namespaced(ctx.client.clone(), &namespace);

    debug!(application = %name, namespace = %namespace, "Reconciling AccessApplication");

    let mut status = StatusUpdater::new(app.status.as_ref());
    status.set_observed_generation(app.metadata.generation);

    match sync_application(&ctx, &app, &namespace, &api, &mut status).await {
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

async fn sync_application(
    ctx: &Context,
    app: &AccessApplication,
    namespace: &str,
    api: &Api<AccessApplication>,
    status: &mut StatusUpdater<AccessApplicationStatus>,
) -> Result<bool> {
    let name = app.name_any();
    let account_id = app.spec.cloudflare.account_id.as_str();
    let cf = ctx.cloudflare_client(namespace, &app.spec.cloudflare).await?;

    let desired = desired_application(&app.spec);
    let spec_hash = hash_of(&desired);
    let previous = status.status().clone();

    let known = match previous.application_id.as_deref() {
        Some(id) => fetch_application(&cf, account_id, id).await?,
        None => None,
    };

    let (current, adopted) = match known {
        Some(existing) if previous.spec_hash.as_deref() == Some(spec_hash.as_str()) => {
            debug!(application = %name, app_id = %existing.id, "Access application unchanged");
            (existing, previous.adopted)
        }
        Some(existing) => {
            let updated = cf
                .update_access_application(account_id, &existing.id, &desired)
                .await?;
            metrics::record_resource_updated(KIND_ACCESS_APPLICATION);
            (updated, previous.adopted)
        }
        None => {
            let apps = cf.list_access_applications(account_id).await?;
            match find_by_domain(&apps, &desired) {
                Some(existing) if may_adopt(app.spec.adopt_policy, existing, &desired) => {
                    info!(application = %name, app_id = %existing.id, domain = %desired.domain, "Adopting existing Access application");
                    let updated = cf
                        .update_access_application(account_id, &existing.id, &desired)
                        .await?;
                    metrics::record_resource_adopted(KIND_ACCESS_APPLICATION);
                    (updated, true)
                }
                Some(existing) => {
                    warn!(application = %name, app_id = %existing.id, domain = %desired.domain, "Access application conflict");
                    status.set_not_ready(
                        REASON_APPLICATION_CONFLICT,
                        &format!(
                            "Access application {} ({}) already protects {} and adoptPolicy {:?} does not allow taking it over",
                            existing.name, existing.id, existing.domain, app.spec.adopt_policy
                        ),
                    );
                    return Ok(false);
                }
                None => {
                    let created = cf.create_access_application(account_id, &desired).await?;
                    metrics::record_resource_created(KIND_ACCESS_APPLICATION);
                    // Without the id in status the next run would find this
                    // application by domain and take it for someone else's.
                    record_application(status, &created, false, &spec_hash);
                    status.apply(api, &name).await?;
                    (created, false)
                }
            }
        }
    };

    record_application(status, &current, adopted, &spec_hash);
    status.set_ready(
        REASON_READY,
        &format!("Access application {} protects {}", desired.name, desired.domain),
    );
    Ok(true)
}

fn record_application(
    status: &mut StatusUpdater<AccessApplicationStatus>,
    app: &AccessApp,
    adopted: bool,
    spec_hash: &str,
) {
    let new_status = status.status_mut();
    new_status.application_id = Some(app.id.clone());
    new_status.aud.clone_from(&app.aud);
    new_status.adopted = adopted;
    new_status.spec_hash = Some(spec_hash.to_string());
}

/// The application with `app_id`, or `None` when it no longer exists.
async fn fetch_application(
    cf: &CloudflareClient,
    account_id: &str,
    app_id: &str,
) -> Result<Option<AccessApp>> {
    match cf.get_access_application(account_id, app_id).await {
        Ok(app) => Ok(Some(app)),
        Err(e) if e.is_not_found() => {
            warn!(app_id = %app_id, "Access application was deleted externally, recreating");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait::async_trait]
impl FinalizerCleanup for AccessApplication {
    async fn cleanup(&self, ctx: &Context) -> Result<()> {
        let name = self.name_any();
        let Some(status) = self.status.as_ref() else {
            return Ok(());
        };
        let Some(app_id) = status.application_id.as_deref() else {
            return Ok(());
        };
        if status.adopted {
            info!(application = %name, app_id = %app_id, "Leaving adopted Access application in place");
            return Ok(());
        }

        let namespace = self.namespace().unwrap_or_default();
        let cf = ctx.cloudflare_client(&namespace, &self.spec.cloudflare).await?;
        match cf
            .delete_access_application(&self.spec.cloudflare.account_id, app_id)
            .await
        {
            Ok(()) => metrics::record_resource_deleted(KIND_ACCESS_APPLICATION),
            Err(e) if e.is_not_found() => debug!(app_id = %app_id, "Access application already gone"),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "accessapplication_tests.rs"]
mod accessapplication_tests;
