// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes reconciliation logic for the operator's Custom Resources.
//!
//! # Reconciliation Architecture
//!
//! Two styles coexist:
//!
//! 1. **Direct** - `DNSRecord` and `AccessApplication` call the Cloudflare API
//!    themselves, one Kubernetes object per Cloudflare object.
//! 2. **Unified Sync** - `Tunnel` and `TunnelBinding` never write shared
//!    Cloudflare objects. They register sources on a `CloudflareSyncState`
//!    and [`reconcile_sync_state`] aggregates them and makes the API call.
//!
//! # Available Reconcilers
//!
//! - [`reconcile_tunnel`] - Creates or adopts a Cloudflare tunnel and its token Secret
//! - [`reconcile_tunnel_binding`] - Registers ingress rules and DNS CNAMEs for a tunnel
//! - [`reconcile_dns_record`] - Manages one DNS record directly
//! - [`reconcile_access_application`] - Manages one Access application directly
//! - [`reconcile_sync_state`] - Pushes the aggregate of a `CloudflareSyncState`

pub mod accessapplication;
pub mod dnsrecord;
pub mod finalizers;
pub mod resources;
pub mod retry;
pub mod status;
pub mod syncstate;
pub mod tunnel;
pub mod tunnelbinding;

pub use accessapplication::reconcile_access_application;
pub use dnsrecord::reconcile_dns_record;
pub use syncstate::reconcile_sync_state;
pub use tunnel::reconcile_tunnel;
pub use tunnelbinding::reconcile_tunnel_binding;

use crate::cloudflare_errors::CloudflareError;
use crate::constants::{REQUEUE_WHEN_NOT_READY_SECS, REQUEUE_WHEN_READY_SECS};
use crate::http_errors::map_cloudflare_error;
use crate::status_reasons::REASON_RECONCILE_ERROR;
use crate::sync::SyncError;
use kube::runtime::controller::Action;
use std::time::Duration;

/// Requeue interval depending on whether the resource ended up `Ready`.
///
/// Ready resources are re-checked every 5 minutes to catch drift made outside
/// of Kubernetes; not-ready ones every 30 seconds.
#[must_use]
pub fn requeue_based_on_readiness(is_ready: bool) -> Action {
    if is_ready {
        Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS))
    } else {
        Action::requeue(Duration::from_secs(REQUEUE_WHEN_NOT_READY_SECS))
    }
}

/// Condition reason and message describing a failed reconciliation.
///
/// Cloudflare failures (including those wrapped in a [`SyncError`]) map to a
/// specific reason; anything else is a generic reconcile error.
#[must_use]
pub fn failure_reason(err: &anyhow::Error) -> (&'static str, String) {
    let cloudflare = err.downcast_ref::<CloudflareError>().or_else(|| {
        err.downcast_ref::<SyncError>().and_then(|e| match e {
            SyncError::Cloudflare(inner) => Some(inner),
            _ => None,
        })
    });

    match cloudflare {
        Some(cloudflare) => map_cloudflare_error(cloudflare),
        None => (REASON_RECONCILE_ERROR, format!("{err:#}")),
    }
}
