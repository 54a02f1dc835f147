// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Aggregation of SyncState sources into one desired external configuration.
//!
//! Sources are visited in precedence order: ascending `priority`, then
//! ascending `Kind/namespace/name`. Lower priority values win, so the
//! `Tunnel`'s own source (priority 10) outranks bindings (default 100).

use super::SyncError;
use crate::cloudflare::types::{DnsRecordRequest, IngressRule, TunnelConfiguration};
use crate::constants::{DEFAULT_FALLBACK_SERVICE, DNS_TTL_AUTO};
use crate::crd::{AdoptPolicy, ConfigSource, DnsRecordType, OriginRequest, TunnelIngressRule};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Fragment a source contributes to a tunnel configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TunnelSourceConfig {
    #[serde(default)]
    pub ingress: Vec<TunnelIngressRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_request: Option<OriginRequest>,
}

/// Fragment a source contributes to a DNS record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DnsSourceConfig {
    /// Fully qualified record name.
    pub name: String,
    pub r#type: DnsRecordType,
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub adopt_policy: AdoptPolicy,
}

/// Winning DNS configuration of a SyncState.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DesiredDnsRecord {
    pub config: DnsSourceConfig,
    /// `Kind/namespace/name` of the winning source.
    pub winner: String,
}

impl DesiredDnsRecord {
    /// Request body for this record, carrying `comment`.
    #[must_use]
    pub fn to_request(&self, comment: Option<String>) -> DnsRecordRequest {
        let proxied = self.config.proxied && self.config.r#type.proxiable();
        DnsRecordRequest {
            record_type: self.config.r#type.as_str().to_string(),
            name: self.config.name.clone(),
            content: self.config.content.clone(),
            ttl: if proxied {
                DNS_TTL_AUTO
            } else {
                self.config.ttl.unwrap_or(DNS_TTL_AUTO)
            },
            proxied: self.config.r#type.proxiable().then_some(proxied),
            priority: None,
            comment,
        }
    }
}

/// Sources ordered by precedence, highest first.
fn by_precedence(sources: &[ConfigSource]) -> Vec<&ConfigSource> {
    let mut ordered: Vec<&ConfigSource> = sources.iter().collect();
    ordered.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.source_ref.cmp(&b.source_ref))
    });
    ordered
}

fn decode<T: for<'de> Deserialize<'de>>(source: &ConfigSource) -> Result<T, SyncError> {
    serde_json::from_value(source.config.clone()).map_err(|e| SyncError::InvalidSource {
        source_ref: source.source_ref.key(),
        reason: e.to_string(),
    })
}

/// Merge tunnel sources into one ingress configuration.
///
/// Rules are keyed by (hostname, path); the first claimant in precedence order
/// wins. A later claimant with a different service or origin settings is
/// reported in the returned conflicts, an identical one is dropped silently.
/// Sources whose configuration cannot be decoded are skipped and reported.
///
/// Output order: exact hostnames before wildcards, then hostname ascending,
/// then rules with a path (longest first) before the rule without one. The
/// catch-all fallback rule is always last.
#[must_use]
pub fn aggregate_tunnel_configuration(
    sources: &[ConfigSource],
) -> (TunnelConfiguration, Vec<String>) {
    let mut conflicts = Vec::new();
    let mut claimed: BTreeMap<(String, Option<String>), (TunnelIngressRule, String)> =
        BTreeMap::new();
    let mut fallback: Option<String> = None;
    let mut origin_request: Option<OriginRequest> = None;

    for source in by_precedence(sources) {
        let owner = source.source_ref.key();
        let config: TunnelSourceConfig = match decode(source) {
            Ok(config) => config,
            Err(e) => {
                conflicts.push(e.to_string());
                continue;
            }
        };

        if fallback.is_none() {
            fallback = config.fallback_service.clone();
        }
        if origin_request.is_none() {
            origin_request = config.origin_request.clone();
        }

        for rule in config.ingress {
            let key = (rule.hostname.to_ascii_lowercase(), rule.path.clone());
            match claimed.get(&key) {
                Some((existing, winner)) => {
                    if existing.service != rule.service
                        || existing.origin_request != rule.origin_request
                    {
                        conflicts.push(format!(
                            "{}{} is routed to {} by {winner}; ignoring {} from {owner}",
                            rule.hostname,
                            rule.path.as_deref().unwrap_or(""),
                            existing.service,
                            rule.service,
                        ));
                    }
                }
                None => {
                    claimed.insert(key, (rule, owner.clone()));
                }
            }
        }
    }

    let mut rules: Vec<TunnelIngressRule> = claimed.into_values().map(|(rule, _)| rule).collect();
    rules.sort_by_key(|rule| {
        let path_len = rule.path.as_ref().map_or(0, String::len);
        (
            rule.hostname.starts_with('*'),
            rule.hostname.to_ascii_lowercase(),
            rule.path.is_none(),
            Reverse(path_len),
            rule.path.clone(),
        )
    });

    let mut ingress: Vec<IngressRule> = rules
        .into_iter()
        .map(|rule| IngressRule {
            hostname: Some(rule.hostname),
            service: rule.service,
            path: rule.path,
            origin_request: rule.origin_request,
        })
        .collect();
    ingress.push(IngressRule {
        hostname: None,
        service: fallback.unwrap_or_else(|| DEFAULT_FALLBACK_SERVICE.to_string()),
        path: None,
        origin_request: None,
    });

    (
        TunnelConfiguration {
            ingress,
            origin_request,
        },
        conflicts,
    )
}

/// Pick the DNS configuration of the highest-precedence source.
///
/// Lower-precedence sources asking for a different type, content or proxy
/// mode are reported as conflicts.
///
/// # Errors
///
/// Returns [`SyncError::NoSources`] when no source decodes.
pub fn aggregate_dns_record(
    sources: &[ConfigSource],
) -> Result<(DesiredDnsRecord, Vec<String>), SyncError> {
    let mut conflicts = Vec::new();
    let mut winner: Option<DesiredDnsRecord> = None;

    for source in by_precedence(sources) {
        let config: DnsSourceConfig = match decode(source) {
            Ok(config) => config,
            Err(e) => {
                conflicts.push(e.to_string());
                continue;
            }
        };

        match &winner {
            None => {
                winner = Some(DesiredDnsRecord {
                    config,
                    winner: source.source_ref.key(),
                });
            }
            Some(current) => {
                let differs = current.config.r#type != config.r#type
                    || current.config.content != config.content
                    || current.config.proxied != config.proxied;
                if differs {
                    conflicts.push(format!(
                        "{} wants {} {} but {} wants {} {}; {} wins",
                        source.source_ref.key(),
                        config.r#type,
                        config.content,
                        current.winner,
                        current.config.r#type,
                        current.config.content,
                        current.winner,
                    ));
                }
            }
        }
    }

    winner
        .map(|desired| (desired, conflicts))
        .ok_or(SyncError::NoSources)
}

#[cfg(test)]
#[path = "aggregate_tests.rs"]
mod aggregate_tests;
