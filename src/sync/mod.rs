// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unified Sync engine.
//!
//! Several Kubernetes objects can write into ONE external Cloudflare object: a
//! tunnel's remote ingress configuration is contributed by the `Tunnel` and by
//! every `TunnelBinding` pointing at it, and a tunnel hostname's CNAME can be
//! claimed by more than one binding. Instead of letting each controller call
//! Cloudflare directly (last writer wins), controllers register *sources* on a
//! cluster-scoped [`CloudflareSyncState`](crate::crd::CloudflareSyncState) and
//! a single controller pushes the aggregate.
//!
//! # Modules
//!
//! - [`service`] - Source registration on SyncState objects
//! - [`aggregate`] - Merging sources into one desired configuration
//! - [`hash`] - Change detection on the aggregate
//! - [`debounce`] - Holding back bursts of writes
//! - [`adopt`] - Ownership markers and adopt-vs-conflict decisions

pub mod adopt;
pub mod aggregate;
pub mod debounce;
pub mod hash;
pub mod service;

pub use adopt::{decide, AdoptionDecision};
pub use aggregate::{
    aggregate_dns_record, aggregate_tunnel_configuration, DesiredDnsRecord, DnsSourceConfig,
    TunnelSourceConfig,
};
pub use debounce::{DebounceDecision, Debouncer};
pub use hash::config_hash;
pub use service::{
    new_source, register_source, remove_source, sync_state_name, unregister_source, upsert_source,
    SyncTarget,
};

use crate::cloudflare_errors::CloudflareError;
use thiserror::Error;

/// Errors raised by the sync engine.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Aggregation was asked for a result with nothing to aggregate.
    #[error("no sources registered")]
    NoSources,

    /// A source's `config` does not match the shape its resource type expects.
    #[error("invalid configuration from source {source_ref}: {reason}")]
    InvalidSource {
        /// `Kind/namespace/name` of the source
        source_ref: String,
        /// Decode error
        reason: String,
    },

    /// Optimistic-concurrency retries on a SyncState were exhausted.
    #[error("gave up writing CloudflareSyncState {name} after {attempts} conflicting attempts")]
    TooManyConflicts {
        /// SyncState name
        name: String,
        /// Attempts made
        attempts: u32,
    },

    /// The SyncState is being deleted; the source must be registered again later.
    #[error("CloudflareSyncState {name} is terminating")]
    Terminating {
        /// SyncState name
        name: String,
    },

    /// Kubernetes API failure.
    #[error(transparent)]
    Kube(#[from] kube::Error),

    /// Cloudflare API failure.
    #[error(transparent)]
    Cloudflare(#[from] CloudflareError),

    /// Source configuration could not be serialized.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
