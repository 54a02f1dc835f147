// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions (CRDs) for Cloudflare resources.
//!
//! This module defines all Kubernetes Custom Resource Definitions used by the
//! operator to manage Cloudflare objects declaratively.
//!
//! # Resource Types
//!
//! ## Tunnels
//!
//! - [`Tunnel`] - A remotely-managed Cloudflare tunnel
//! - [`TunnelBinding`] - Routes hostnames through a [`Tunnel`] to in-cluster services
//!
//! ## Direct resources
//!
//! - [`DNSRecord`] - A single DNS record in a Cloudflare zone
//! - [`AccessApplication`] - A Cloudflare Access application
//!
//! ## Unified Sync
//!
//! - [`CloudflareSyncState`] - Aggregates several Kubernetes sources writing into
//!   one external Cloudflare object
//!
//! # Example: Binding a hostname to a tunnel
//!
//! ```rust,no_run
//! use cloudflare_operator::crd::{AdoptPolicy, BindingSubject, TunnelBindingSpec, TunnelRef};
//!
//! let spec = TunnelBindingSpec {
//!     tunnel_ref: TunnelRef { name: "edge".to_string(), namespace: None },
//!     subjects: vec![BindingSubject {
//!         hostname: "app.example.com".to_string(),
//!         service: "http://app.web.svc:8080".to_string(),
//!         path: None,
//!         origin_request: None,
//!     }],
//!     priority: None,
//!     manage_dns: true,
//!     adopt_policy: AdoptPolicy::IfIdentical,
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the Cloudflare credentials live and which account / zone to target.
///
/// The referenced Secret must be in the same namespace as the resource.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CloudflareDetails {
    /// Cloudflare account identifier.
    pub account_id: String,

    /// Zone (domain) name used for DNS operations, e.g. `example.com`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Zone identifier. Skips the zone lookup by `domain` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,

    /// Name of the Secret holding the API credentials.
    pub secret: String,

    /// Secret key of the API token. Defaults to `CLOUDFLARE_API_TOKEN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token_key: Option<String>,

    /// Secret key of the global API key. Defaults to `CLOUDFLARE_API_KEY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_key: Option<String>,

    /// Secret key of the e-mail used with a global API key. Defaults to `CLOUDFLARE_API_EMAIL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_key: Option<String>,
}

/// Condition represents an observation of a resource's current state.
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition. Common types include: Ready, Synced.
    pub r#type: String,

    /// Status of the condition: True, False, or Unknown.
    pub status: String,

    /// Brief CamelCase reason for the condition's last transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human-readable message indicating details about the transition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Last time the condition transitioned from one status to another (RFC3339 format).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

/// What to do when an object with the same identity already exists in Cloudflare
/// and the operator does not own it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum AdoptPolicy {
    /// Never take over an existing object; report a conflict instead.
    Never,
    /// Take over the object only when it already matches the desired state.
    #[default]
    IfIdentical,
    /// Always take over the object and overwrite it.
    Always,
}

/// Origin connection settings applied by cloudflared to proxied requests.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub struct OriginRequest {
    /// Disable TLS verification of the origin certificate.
    #[serde(rename = "noTLSVerify", skip_serializing_if = "Option::is_none")]
    pub no_tls_verify: Option<bool>,

    /// Host header sent to the origin.
    #[serde(rename = "httpHostHeader", skip_serializing_if = "Option::is_none")]
    pub http_host_header: Option<String>,

    /// Hostname expected on the origin server certificate.
    #[serde(rename = "originServerName", skip_serializing_if = "Option::is_none")]
    pub origin_server_name: Option<String>,

    /// Timeout for establishing a connection to the origin, in seconds.
    #[serde(rename = "connectTimeout", skip_serializing_if = "Option::is_none")]
    pub connect_timeout: Option<u32>,

    /// Connect to the origin with HTTP/2.
    #[serde(rename = "http2Origin", skip_serializing_if = "Option::is_none")]
    pub http2_origin: Option<bool>,

    /// Path to a CA bundle used to verify the origin.
    #[serde(rename = "caPool", skip_serializing_if = "Option::is_none")]
    pub ca_pool: Option<String>,
}

/// A single hostname routed through a tunnel.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TunnelIngressRule {
    /// Public hostname, e.g. `app.example.com` or `*.example.com`.
    pub hostname: String,

    /// Origin service, e.g. `http://app.web.svc:8080` or `http_status:404`.
    pub service: String,

    /// Optional path regular expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Per-rule origin settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_request: Option<OriginRequest>,
}

// ============================================================================
// Tunnel
// ============================================================================

/// `Tunnel` manages a remotely-configured Cloudflare tunnel.
///
/// The operator creates (or adopts) the tunnel, stores the connector token in a
/// Secret and contributes the tunnel's own ingress rules to the tunnel's
/// configuration `CloudflareSyncState`.
///
/// # Example
///
/// ```yaml
/// apiVersion: networking.cloudflare-operator.io/v1alpha2
/// kind: Tunnel
/// metadata:
///   name: edge
///   namespace: ingress
/// spec:
///   cloudflare:
///     accountId: 0123456789abcdef
///     domain: example.com
///     secret: cloudflare-credentials
///   fallbackService: http_status:404
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "networking.cloudflare-operator.io",
    version = "v1alpha2",
    kind = "Tunnel",
    namespaced,
    shortname = "tun",
    doc = "Tunnel manages a remotely-configured Cloudflare tunnel and its connector token."
)]
#[kube(status = "TunnelStatus")]
#[kube(printcolumn = r#"{"name":"TunnelID","type":"string","jsonPath":".status.tunnelId"}"#)]
#[serde(rename_all = "camelCase")]
pub struct TunnelSpec {
    /// Cloudflare account and credentials.
    pub cloudflare: CloudflareDetails,

    /// Name of the tunnel in Cloudflare. Defaults to `metadata.name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_name: Option<String>,

    /// Adopt a tunnel with the same name if one already exists.
    #[serde(default)]
    pub adopt_existing: bool,

    /// Service answering requests no rule matches. Defaults to `http_status:404`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_service: Option<String>,

    /// Origin settings applied to every rule of the tunnel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_request: Option<OriginRequest>,

    /// Static ingress rules owned by the tunnel itself.
    #[serde(default)]
    pub ingress: Vec<TunnelIngressRule>,
}

/// `Tunnel` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TunnelStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// The tunnel existed before the operator and was adopted; it is not deleted on cleanup.
    #[serde(default)]
    pub adopted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Tunnel {
    /// Name of the tunnel in Cloudflare.
    #[must_use]
    pub fn cloudflare_name(&self) -> String {
        self.spec
            .tunnel_name
            .clone()
            .or_else(|| self.metadata.name.clone())
            .unwrap_or_default()
    }

    /// Tunnel id recorded in status, if the tunnel has been created or adopted.
    #[must_use]
    pub fn tunnel_id(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.tunnel_id.as_deref())
    }
}

// ============================================================================
// TunnelBinding
// ============================================================================

/// Reference to a `Tunnel`.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TunnelRef {
    /// Name of the `Tunnel`.
    pub name: String,

    /// Namespace of the `Tunnel`. Defaults to the binding's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// One hostname routed to an in-cluster service.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BindingSubject {
    /// Public hostname.
    pub hostname: String,

    /// Origin service URL.
    pub service: String,

    /// Optional path regular expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Per-rule origin settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_request: Option<OriginRequest>,
}

/// `TunnelBinding` routes hostnames through a `Tunnel`.
///
/// Every binding is a source of the tunnel's configuration `CloudflareSyncState`
/// and, when `manageDns` is set, of one DNS `CloudflareSyncState` per hostname.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "networking.cloudflare-operator.io",
    version = "v1alpha2",
    kind = "TunnelBinding",
    namespaced,
    shortname = "tb",
    doc = "TunnelBinding routes public hostnames through a Tunnel to in-cluster services."
)]
#[kube(status = "TunnelBindingStatus")]
#[serde(rename_all = "camelCase")]
pub struct TunnelBindingSpec {
    /// The tunnel the hostnames are routed through.
    pub tunnel_ref: TunnelRef,

    /// Hostnames to route.
    pub subjects: Vec<BindingSubject>,

    /// Precedence of this binding's rules. Lower value wins. Defaults to 100.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,

    /// Create proxied CNAME records pointing the hostnames at the tunnel.
    #[serde(default = "default_true")]
    pub manage_dns: bool,

    /// How to treat DNS records that already exist for the hostnames.
    #[serde(default)]
    pub adopt_policy: AdoptPolicy,
}

fn default_true() -> bool {
    true
}

/// `TunnelBinding` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TunnelBindingStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tunnel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_state: Option<String>,
    /// Hostnames with a registered DNS source.
    #[serde(default)]
    pub hostnames: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// ============================================================================
// DNSRecord
// ============================================================================

/// DNS record types the operator manages.
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum DnsRecordType {
    A,
    AAAA,
    CNAME,
    TXT,
    MX,
    NS,
    SRV,
    CAA,
}

impl DnsRecordType {
    /// Wire name of the record type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DnsRecordType::A => "A",
            DnsRecordType::AAAA => "AAAA",
            DnsRecordType::CNAME => "CNAME",
            DnsRecordType::TXT => "TXT",
            DnsRecordType::MX => "MX",
            DnsRecordType::NS => "NS",
            DnsRecordType::SRV => "SRV",
            DnsRecordType::CAA => "CAA",
        }
    }

    /// Whether Cloudflare can proxy records of this type.
    #[must_use]
    pub fn proxiable(&self) -> bool {
        matches!(
            self,
            DnsRecordType::A | DnsRecordType::AAAA | DnsRecordType::CNAME
        )
    }
}

impl fmt::Display for DnsRecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `DNSRecord` manages a single record in a Cloudflare zone.
///
/// # Example
///
/// ```yaml
/// apiVersion: networking.cloudflare-operator.io/v1alpha2
/// kind: DNSRecord
/// metadata:
///   name: www
/// spec:
///   cloudflare:
///     accountId: 0123456789abcdef
///     domain: example.com
///     secret: cloudflare-credentials
///   name: www
///   type: A
///   content: 192.0.2.1
///   proxied: true
/// ```
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "networking.cloudflare-operator.io",
    version = "v1alpha2",
    kind = "DNSRecord",
    namespaced,
    shortname = "dnsr",
    doc = "DNSRecord manages a single DNS record in a Cloudflare zone."
)]
#[kube(status = "DNSRecordStatus")]
#[kube(printcolumn = r#"{"name":"FQDN","type":"string","jsonPath":".status.fqdn"}"#)]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordSpec {
    /// Cloudflare account, zone and credentials.
    pub cloudflare: CloudflareDetails,

    /// Record name. `@` is the zone apex; names not ending in the zone are relative.
    pub name: String,

    /// Record type.
    pub r#type: DnsRecordType,

    /// Record content (address, target, text...).
    pub content: String,

    /// TTL in seconds. `1` means automatic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1, max = 86_400))]
    pub ttl: Option<u32>,

    /// Proxy traffic through Cloudflare (A, AAAA and CNAME only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,

    /// Priority for MX records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,

    /// Free-form comment stored on the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    /// How to treat an existing record with the same name and type.
    #[serde(default)]
    pub adopt_policy: AdoptPolicy,
}

/// `DNSRecord` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DNSRecordStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(default)]
    pub adopted: bool,
    /// Hash of the spec last applied to Cloudflare.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// ============================================================================
// AccessApplication
// ============================================================================

/// `AccessApplication` manages a Cloudflare Access application.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "networking.cloudflare-operator.io",
    version = "v1alpha2",
    kind = "AccessApplication",
    namespaced,
    shortname = "accessapp",
    doc = "AccessApplication manages a Cloudflare Access application protecting a domain."
)]
#[kube(status = "AccessApplicationStatus")]
#[serde(rename_all = "camelCase")]
pub struct AccessApplicationSpec {
    /// Cloudflare account and credentials.
    pub cloudflare: CloudflareDetails,

    /// Display name of the application.
    pub name: String,

    /// Protected domain, e.g. `app.example.com/admin`.
    pub domain: String,

    /// Application type. Defaults to `self_hosted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#type: Option<String>,

    /// Session duration, e.g. `24h`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_duration: Option<String>,

    /// Identity provider ids allowed to authenticate.
    #[serde(default)]
    pub allowed_idps: Vec<String>,

    /// Skip the identity provider selection page when only one is allowed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_redirect_to_identity: Option<bool>,

    /// Show the application in the App Launcher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_launcher_visible: Option<bool>,

    /// How to treat an existing application protecting the same domain.
    #[serde(default)]
    pub adopt_policy: AdoptPolicy,
}

/// `AccessApplication` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AccessApplicationStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(default)]
    pub adopted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

// ============================================================================
// CloudflareSyncState
// ============================================================================

/// The kind of external object a `CloudflareSyncState` aggregates into.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum SyncResourceType {
    /// The remote ingress configuration of a tunnel.
    TunnelConfiguration,
    /// A single DNS record.
    #[serde(rename = "DNSRecord")]
    DnsRecord,
}

impl SyncResourceType {
    /// Name used in labels, metrics and object names.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncResourceType::TunnelConfiguration => "TunnelConfiguration",
            SyncResourceType::DnsRecord => "DNSRecord",
        }
    }
}

impl fmt::Display for SyncResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespaced reference to the Secret holding Cloudflare credentials.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsRef {
    /// Namespace of the resource whose `cloudflare` details are used.
    pub namespace: String,

    /// The `cloudflare` details of that resource.
    pub details: CloudflareDetails,
}

/// Identifies the Kubernetes object that contributed a source.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl SourceRef {
    /// Build a reference from a kind and a namespaced name.
    #[must_use]
    pub fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    /// Stable `Kind/namespace/name` key used for ordering and ownership markers.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}/{}/{}", self.kind, self.namespace, self.name)
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// One contribution to a `CloudflareSyncState`.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSource {
    /// Contributing object.
    #[serde(rename = "ref")]
    pub source_ref: SourceRef,

    /// Precedence of this source. Lower value wins.
    pub priority: i32,

    /// Resource-type specific configuration fragment.
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub config: serde_json::Value,

    /// When the source was last written (RFC3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

fn preserve_unknown_fields(_gen: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true
    })
}

/// `CloudflareSyncState` aggregates several Kubernetes sources that write into one
/// external Cloudflare object.
///
/// Controllers register and unregister their sources; the SyncState controller
/// aggregates them, skips unchanged configurations by hash, debounces bursts of
/// writes and performs the Cloudflare API call.
#[derive(CustomResource, Clone, Debug, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "networking.cloudflare-operator.io",
    version = "v1alpha2",
    kind = "CloudflareSyncState",
    shortname = "cfss",
    doc = "CloudflareSyncState aggregates Kubernetes sources that configure one external Cloudflare object."
)]
#[kube(status = "CloudflareSyncStateStatus")]
#[kube(printcolumn = r#"{"name":"Type","type":"string","jsonPath":".spec.resourceType"}"#)]
#[kube(printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.syncStatus"}"#)]
#[serde(rename_all = "camelCase")]
pub struct CloudflareSyncStateSpec {
    /// Kind of external object.
    pub resource_type: SyncResourceType,

    /// External identity: the tunnel id, or the record FQDN.
    pub cloudflare_id: String,

    /// Cloudflare account identifier.
    pub account_id: String,

    /// Zone identifier for DNS records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_id: Option<String>,

    /// Where the credentials come from.
    pub credentials_ref: CredentialsRef,

    /// Registered sources.
    #[serde(default)]
    pub sources: Vec<ConfigSource>,
}

/// Sync phase of a `CloudflareSyncState`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
    Conflict,
    Error,
}

impl SyncStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "Pending",
            SyncStatus::Synced => "Synced",
            SyncStatus::Conflict => "Conflict",
            SyncStatus::Error => "Error",
        }
    }
}

/// `CloudflareSyncState` status
#[derive(Clone, Debug, Serialize, Deserialize, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloudflareSyncStateStatus {
    #[serde(default)]
    pub sync_status: SyncStatus,
    /// Hash of the aggregated configuration last pushed successfully.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<String>,
    /// Identifier of the external object, when it differs from `cloudflareId`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default)]
    pub aggregated_sources: i32,
    #[serde(default)]
    pub conflicts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
