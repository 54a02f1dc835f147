// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Standard Kubernetes status condition reasons for operator resources.
//!
//! This module defines constants for condition reasons following Kubernetes conventions.
//! Reasons are programmatic identifiers in CamelCase that explain why a condition has
//! a particular status.
//!
//! # Condition Types
//!
//! Every resource carries a single encompassing `type: Ready` condition.
//! `CloudflareSyncState` additionally carries `type: Synced`, which mirrors
//! `status.syncStatus`.
//!
//! # Example Status
//!
//! ```yaml
//! status:
//!   syncStatus: Conflict
//!   conditions:
//!     - type: Ready
//!       status: "False"
//!       reason: RecordConflict
//!       message: "DNS record app.example.com is owned by TunnelBinding/apps/other"
//! ```

// ============================================================================
// Condition Types
// ============================================================================

/// Overall readiness of a resource.
pub const CONDITION_TYPE_READY: &str = "Ready";

/// Whether a `CloudflareSyncState` has been pushed to Cloudflare.
pub const CONDITION_TYPE_SYNCED: &str = "Synced";

/// Condition status values.
pub const CONDITION_STATUS_TRUE: &str = "True";
pub const CONDITION_STATUS_FALSE: &str = "False";

// ============================================================================
// Common Reasons (All Resources)
// ============================================================================

/// Resource is reconciled and its Cloudflare counterpart matches the desired state.
pub const REASON_READY: &str = "Ready";

/// Reconciliation failed for a reason not covered by a more specific constant.
pub const REASON_RECONCILE_ERROR: &str = "ReconcileError";

/// The credentials Secret is missing or has no usable keys.
pub const REASON_INVALID_CREDENTIALS: &str = "InvalidCredentials";

/// The zone named by `cloudflare.domain` could not be found.
pub const REASON_ZONE_NOT_FOUND: &str = "ZoneNotFound";

// ============================================================================
// Cloudflare API Reasons
// ============================================================================

/// Cloudflare rejected the request as malformed (HTTP 400).
pub const REASON_CLOUDFLARE_BAD_REQUEST: &str = "CloudflareBadRequest";

/// Cloudflare rejected the credentials (HTTP 401/403).
pub const REASON_CLOUDFLARE_AUTH_FAILED: &str = "CloudflareAuthFailed";

/// Cloudflare rate limited the operator (HTTP 429).
pub const REASON_CLOUDFLARE_RATE_LIMITED: &str = "CloudflareRateLimited";

/// Cloudflare returned a server-side error (HTTP 5xx).
pub const REASON_CLOUDFLARE_UNAVAILABLE: &str = "CloudflareUnavailable";

/// The Cloudflare API could not be reached at all.
pub const REASON_CLOUDFLARE_UNREACHABLE: &str = "CloudflareUnreachable";

/// The external object was deleted outside of the operator (HTTP 404).
///
/// For tunnels the `Tunnel` controller recovers by creating a new tunnel.
pub const REASON_EXTERNAL_NOT_FOUND: &str = "ExternalResourceNotFound";

// ============================================================================
// Tunnel Reasons
// ============================================================================

/// A tunnel with the same name exists and `adoptExisting` is false.
pub const REASON_TUNNEL_CONFLICT: &str = "TunnelConflict";

/// The referenced `Tunnel` does not exist or has no tunnel id yet.
pub const REASON_TUNNEL_NOT_READY: &str = "TunnelNotReady";

/// The tunnel was adopted rather than created.
pub const REASON_TUNNEL_ADOPTED: &str = "TunnelAdopted";

// ============================================================================
// Record / Application Reasons
// ============================================================================

/// An existing DNS record blocks the desired one.
pub const REASON_RECORD_CONFLICT: &str = "RecordConflict";

/// An existing Access application blocks the desired one.
pub const REASON_APPLICATION_CONFLICT: &str = "ApplicationConflict";

// ============================================================================
// Sync Reasons
// ============================================================================

/// Aggregated configuration was pushed to Cloudflare.
pub const REASON_SYNCED: &str = "Synced";

/// Sources disagree, or the remote object belongs to someone else.
pub const REASON_SOURCE_CONFLICT: &str = "SourceConflict";

/// Pushing the aggregated configuration failed.
pub const REASON_SYNC_FAILED: &str = "SyncFailed";

#[cfg(test)]
#[path = "status_reasons_tests.rs"]
mod status_reasons_tests;
