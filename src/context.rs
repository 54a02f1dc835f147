// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for all controllers with reflector stores.
//!
//! All controllers receive an `Arc<Context>` that contains:
//! - Kubernetes client
//! - Reflector stores for the CRD types other controllers need to look up
//! - The shared HTTP client every [`CloudflareClient`] is built on
//! - The SyncState debouncer
//! - Operator settings
//!
//! The stores enable in-memory lookups in watch mappers, avoiding API queries.

use crate::cloudflare::{load_credentials, CloudflareClient};
use crate::config::OperatorConfig;
use crate::crd::{CloudflareDetails, CloudflareSyncState, SourceRef, Tunnel, TunnelBinding};
use crate::sync::Debouncer;
use anyhow::Result;
use kube::runtime::reflector::{ObjectRef, Store};
use kube::{Client, ResourceExt};
use std::sync::Arc;

/// Shared context passed to all controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Reflector stores for cross-controller lookups
    pub stores: Stores,

    /// HTTP client shared by all Cloudflare API clients (connection pooling)
    pub http_client: reqwest::Client,

    /// Debouncer for `CloudflareSyncState` writes, shared by all workers
    pub debouncer: Arc<Debouncer>,

    /// Operator settings
    pub config: OperatorConfig,
}

impl Context {
    /// Build the context from a client, stores and settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(client: Client, stores: Stores, config: OperatorConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("cloudflare-operator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            stores,
            http_client,
            debouncer: Arc::new(Debouncer::new(config.sync_debounce(), config.sync_max_wait())),
            config,
        })
    }

    /// Cloudflare API client for the credentials referenced by `details`,
    /// read from a Secret in `namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error if the Secret is missing or holds no usable credentials.
    pub async fn cloudflare_client(
        &self,
        namespace: &str,
        details: &CloudflareDetails,
    ) -> Result<CloudflareClient> {
        let credentials = load_credentials(&self.client, namespace, details).await?;
        Ok(CloudflareClient::new(
            self.http_client.clone(),
            &self.config.cloudflare_api_url,
            credentials,
        ))
    }
}

/// Collection of reflector stores for cross-controller queries.
///
/// Each store is populated by a dedicated reflector task and provides
/// in-memory access to resources without API calls.
#[derive(Clone)]
pub struct Stores {
    pub tunnels: Store<Tunnel>,
    pub tunnel_bindings: Store<TunnelBinding>,

    // Cluster-scoped
    pub sync_states: Store<CloudflareSyncState>,
}

impl Stores {
    /// Get a `Tunnel` by name and namespace from the store.
    #[must_use]
    pub fn get_tunnel(&self, name: &str, namespace: &str) -> Option<Arc<Tunnel>> {
        self.tunnels.get(&ObjectRef::new(name).within(namespace))
    }

    /// `TunnelBinding`s whose `tunnelRef` resolves to the given tunnel.
    ///
    /// A binding without `tunnelRef.namespace` refers to a tunnel in its own
    /// namespace.
    #[must_use]
    pub fn bindings_for_tunnel(
        &self,
        tunnel_name: &str,
        tunnel_namespace: &str,
    ) -> Vec<ObjectRef<TunnelBinding>> {
        self.tunnel_bindings
            .state()
            .iter()
            .filter(|binding| {
                let binding_namespace = binding.namespace().unwrap_or_default();
                let target_namespace = binding
                    .spec
                    .tunnel_ref
                    .namespace
                    .as_deref()
                    .unwrap_or(&binding_namespace);
                binding.spec.tunnel_ref.name == tunnel_name && target_namespace == tunnel_namespace
            })
            .map(|binding| ObjectRef::from_obj(binding.as_ref()))
            .collect()
    }

    /// Names of the SyncStates that currently carry a source with `source_ref`.
    #[must_use]
    pub fn sync_states_with_source(&self, source_ref: &SourceRef) -> Vec<String> {
        self.sync_states
            .state()
            .iter()
            .filter(|sync_state| {
                sync_state
                    .spec
                    .sources
                    .iter()
                    .any(|source| &source.source_ref == source_ref)
            })
            .map(|sync_state| sync_state.name_any())
            .collect()
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
