// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for the Cloudflare operator.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// API Constants
// ============================================================================

/// Kind name for `Tunnel` resource
pub const KIND_TUNNEL: &str = "Tunnel";

/// Kind name for `TunnelBinding` resource
pub const KIND_TUNNEL_BINDING: &str = "TunnelBinding";

/// Kind name for `DNSRecord` resource
pub const KIND_DNS_RECORD: &str = "DNSRecord";

/// Kind name for `AccessApplication` resource
pub const KIND_ACCESS_APPLICATION: &str = "AccessApplication";

/// Kind name for `CloudflareSyncState` resource
pub const KIND_SYNC_STATE: &str = "CloudflareSyncState";

// ============================================================================
// Cloudflare API Constants
// ============================================================================

/// Default Cloudflare v4 REST API base URL
pub const DEFAULT_CLOUDFLARE_API_URL: &str = "https://api.cloudflare.com/client/v4";

/// Page size used for paginated Cloudflare list calls
pub const CLOUDFLARE_PAGE_SIZE: u32 = 50;

/// Default HTTP timeout for Cloudflare API calls
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Secret key holding a scoped API token
pub const DEFAULT_API_TOKEN_KEY: &str = "CLOUDFLARE_API_TOKEN";

/// Secret key holding a global API key
pub const DEFAULT_API_KEY_KEY: &str = "CLOUDFLARE_API_KEY";

/// Secret key holding the e-mail that goes with a global API key
pub const DEFAULT_API_EMAIL_KEY: &str = "CLOUDFLARE_API_EMAIL";

/// Domain suffix tunnel CNAME records point at
pub const TUNNEL_CNAME_SUFFIX: &str = "cfargotunnel.com";

/// Catch-all service appended when no source supplies a fallback
pub const DEFAULT_FALLBACK_SERVICE: &str = "http_status:404";

/// Configuration source for remotely-managed tunnels
pub const TUNNEL_CONFIG_SRC_CLOUDFLARE: &str = "cloudflare";

/// Length in bytes of generated tunnel secrets
pub const TUNNEL_SECRET_BYTES: usize = 32;

/// Key of the connector token inside the generated tunnel Secret
pub const TUNNEL_TOKEN_SECRET_KEY: &str = "TUNNEL_TOKEN";

/// Suffix of the Secret holding the tunnel connector token
pub const TUNNEL_TOKEN_SECRET_SUFFIX: &str = "-tunnel-token";

/// TTL value Cloudflare interprets as "automatic"
pub const DNS_TTL_AUTO: u32 = 1;

/// Default Access application type
pub const DEFAULT_ACCESS_APP_TYPE: &str = "self_hosted";

// ============================================================================
// Unified Sync Constants
// ============================================================================

/// Priority of the source a `Tunnel` contributes to its own configuration
pub const TUNNEL_SOURCE_PRIORITY: i32 = 10;

/// Default priority of `TunnelBinding` sources (lower value wins)
pub const DEFAULT_BINDING_PRIORITY: i32 = 100;

/// Default quiet period before a SyncState is pushed to Cloudflare
pub const DEFAULT_SYNC_DEBOUNCE_MILLIS: u64 = 500;

/// Default upper bound on how long a burst of writes can postpone a sync
pub const DEFAULT_SYNC_MAX_WAIT_MILLIS: u64 = 5_000;

/// Maximum attempts for SyncState create/update races
pub const SYNC_STATE_UPDATE_ATTEMPTS: u32 = 5;

/// Kubernetes object names are limited to 253 characters
pub const MAX_OBJECT_NAME_LEN: usize = 253;

// ============================================================================
// Controller Error Handling Constants
// ============================================================================

/// Requeue duration for controller errors (30 seconds)
pub const ERROR_REQUEUE_DURATION_SECS: u64 = 30;

/// Requeue interval for resources that are ready (5 minutes)
pub const REQUEUE_WHEN_READY_SECS: u64 = 300;

/// Requeue interval for resources that are not ready (30 seconds)
pub const REQUEUE_WHEN_NOT_READY_SECS: u64 = 30;

/// Requeue interval while waiting for a referenced resource
pub const DEPENDENCY_WAIT_REQUEUE_SECS: u64 = 30;

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Default bind address for the metrics HTTP server
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint
pub const HEALTH_SERVER_PATH: &str = "/healthz";
