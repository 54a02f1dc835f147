// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label, annotation and finalizer constants used across all reconcilers.
//!
//! This module defines standard Kubernetes labels and operator-specific labels/annotations
//! to ensure consistency across all resources created by the controller.

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the component name within the architecture
pub const K8S_COMPONENT: &str = "app.kubernetes.io/component";

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

// ============================================================================
// Kubernetes Standard Label Values
// ============================================================================

/// Value for `app.kubernetes.io/part-of` and `app.kubernetes.io/managed-by`
pub const PART_OF_OPERATOR: &str = "cloudflare-operator";

/// Component value for tunnel connector secrets
pub const COMPONENT_TUNNEL_TOKEN: &str = "tunnel-token";

/// Component value for sync state objects
pub const COMPONENT_SYNC_STATE: &str = "sync-state";

// ============================================================================
// Operator-Specific Labels
// ============================================================================

/// Label carrying the Cloudflare tunnel id on generated objects
pub const TUNNEL_ID_LABEL: &str = "networking.cloudflare-operator.io/tunnel-id";

/// Label carrying the SyncState resource type
pub const SYNC_RESOURCE_TYPE_LABEL: &str = "networking.cloudflare-operator.io/resource-type";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer for `Tunnel` resources
pub const FINALIZER_TUNNEL: &str = "networking.cloudflare-operator.io/tunnel-finalizer";

/// Finalizer for `TunnelBinding` resources
pub const FINALIZER_TUNNEL_BINDING: &str =
    "networking.cloudflare-operator.io/tunnelbinding-finalizer";

/// Finalizer for `DNSRecord` resources
pub const FINALIZER_DNS_RECORD: &str = "networking.cloudflare-operator.io/dnsrecord-finalizer";

/// Finalizer for `AccessApplication` resources
pub const FINALIZER_ACCESS_APPLICATION: &str =
    "networking.cloudflare-operator.io/accessapplication-finalizer";

/// Finalizer for `CloudflareSyncState` resources
pub const FINALIZER_SYNC_STATE: &str = "networking.cloudflare-operator.io/syncstate-finalizer";

// ============================================================================
// Ownership Marker
// ============================================================================

/// Prefix of the marker the operator writes into remote comments it owns
pub const OWNERSHIP_MARKER_PREFIX: &str = "managed-by:cloudflare-operator/";
