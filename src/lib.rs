// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # cloudflare-operator - Cloudflare Operator for Kubernetes
//!
//! A Kubernetes operator written in Rust that manages Cloudflare tunnels, DNS
//! records and Access applications through Custom Resource Definitions (CRDs).
//!
//! ## Overview
//!
//! Several Kubernetes objects often contribute to one Cloudflare object: every
//! `TunnelBinding` that routes through a tunnel adds ingress rules to the same
//! tunnel configuration. Writing that configuration from each controller races.
//! Instead, contributors register *sources* on a cluster-scoped
//! [`crd::CloudflareSyncState`], and a single controller aggregates the sources
//! by priority, debounces bursts of changes and pushes the result.
//!
//! ## Modules
//!
//! - [`crd`] - Custom Resource Definition types
//! - [`cloudflare`] - Typed client for the Cloudflare v4 API
//! - [`sync`] - Source registration, aggregation, debouncing and ownership markers
//! - [`reconcilers`] - Reconciliation logic for each resource type
//! - [`controller`] - kube-runtime controllers wiring the reconcilers together
//! - [`context`] - Shared context and reflector stores
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use cloudflare_operator::crd::{AdoptPolicy, CloudflareDetails, DNSRecordSpec, DnsRecordType};
//!
//! let spec = DNSRecordSpec {
//!     cloudflare: CloudflareDetails {
//!         account_id: "0123456789abcdef".to_string(),
//!         domain: Some("example.com".to_string()),
//!         secret: "cloudflare-credentials".to_string(),
//!         ..Default::default()
//!     },
//!     name: "www".to_string(),
//!     r#type: DnsRecordType::CNAME,
//!     content: "example.com".to_string(),
//!     ttl: None,
//!     proxied: Some(true),
//!     priority: None,
//!     comment: None,
//!     adopt_policy: AdoptPolicy::Never,
//! };
//! ```
//!
//! ## Features
//!
//! - **Unified Sync** - One writer per Cloudflare object, no lost updates
//! - **Adoption** - Take over pre-existing tunnels, records and applications on request
//! - **Ownership Markers** - Never delete DNS records created by someone else
//! - **Status Tracking** - Full status subresources with standard conditions

pub mod cloudflare;
pub mod cloudflare_errors;
pub mod config;
pub mod constants;
pub mod context;
pub mod controller;
pub mod crd;
pub mod http_errors;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod status_reasons;
pub mod sync;

#[cfg(test)]
mod test_support;
