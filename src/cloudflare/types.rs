// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Wire types of the Cloudflare v4 API.
//!
//! Only the fields the operator reads or writes are modelled; unknown fields
//! in responses are ignored.

use crate::crd::OriginRequest;
use serde::{Deserialize, Serialize};

/// Standard Cloudflare response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
    #[serde(default = "Option::default")]
    pub result: Option<T>,
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
}

/// One entry of `errors` or `messages`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Pagination information of list responses.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ResultInfo {
    pub page: u32,
    pub per_page: u32,
    pub count: u32,
    pub total_count: u32,
    pub total_pages: u32,
}

// ============================================================================
// Zones
// ============================================================================

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
}

// ============================================================================
// Tunnels
// ============================================================================

/// A Cloudflare tunnel (`cfd_tunnel`).
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CloudflareTunnel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Set when the tunnel has been deleted; Cloudflare keeps returning it by id.
    #[serde(default)]
    pub deleted_at: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub remote_config: Option<bool>,
}

impl CloudflareTunnel {
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTunnelRequest<'a> {
    pub name: &'a str,
    pub tunnel_secret: String,
    pub config_src: &'a str,
}

/// One rule of a tunnel's remote ingress configuration.
///
/// The catch-all rule has no hostname.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(
        rename = "originRequest",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub origin_request: Option<OriginRequest>,
}

/// Remote ingress configuration of a tunnel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TunnelConfiguration {
    #[serde(default)]
    pub ingress: Vec<IngressRule>,
    #[serde(
        rename = "originRequest",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub origin_request: Option<OriginRequest>,
}

impl TunnelConfiguration {
    /// A configuration routing every request to `service`.
    #[must_use]
    pub fn fallback_only(service: &str) -> Self {
        Self {
            ingress: vec![IngressRule {
                hostname: None,
                service: service.to_string(),
                path: None,
                origin_request: None,
            }],
            origin_request: None,
        }
    }
}

/// Result of `GET` and `PUT .../configurations`.
#[derive(Debug, Clone, Deserialize)]
pub struct TunnelConfigurationResult {
    #[serde(default)]
    pub tunnel_id: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
    /// Absent on a tunnel that was never configured.
    #[serde(default)]
    pub config: Option<TunnelConfiguration>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TunnelConfigurationBody<'a> {
    pub config: &'a TunnelConfiguration,
}

// ============================================================================
// DNS records
// ============================================================================

/// A DNS record as returned by Cloudflare.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct DnsRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default)]
    pub ttl: u32,
    #[serde(default)]
    pub priority: Option<u16>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Body of DNS record create and overwrite calls.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DnsRecordRequest {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    pub content: String,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

// ============================================================================
// Access applications
// ============================================================================

/// An Access application as returned by Cloudflare.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AccessApp {
    pub id: String,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(rename = "type", default)]
    pub app_type: Option<String>,
    #[serde(default)]
    pub session_duration: Option<String>,
    #[serde(default)]
    pub allowed_idps: Vec<String>,
    #[serde(default)]
    pub auto_redirect_to_identity: Option<bool>,
    #[serde(default)]
    pub app_launcher_visible: Option<bool>,
}

/// Body of Access application create and update calls.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AccessAppRequest {
    pub name: String,
    pub domain: String,
    #[serde(rename = "type")]
    pub app_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_duration: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_idps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_redirect_to_identity: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_launcher_visible: Option<bool>,
}
