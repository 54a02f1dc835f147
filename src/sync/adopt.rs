// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Ownership markers and adopt-vs-conflict decisions for DNS records.
//!
//! The operator marks every record it writes by appending
//! `[managed-by:cloudflare-operator/<owner>]` to the record comment. A record
//! carrying another owner's marker is never touched; an unmarked record is
//! taken over only when the resource's [`AdoptPolicy`] allows it.

use crate::cloudflare::types::{DnsRecord, DnsRecordRequest};
use crate::crd::AdoptPolicy;
use crate::labels::OWNERSHIP_MARKER_PREFIX;

/// What to do about the desired record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdoptionDecision {
    /// No record exists; create one.
    Create,
    /// The owned record differs; overwrite it.
    Update { id: String },
    /// The owned record already matches.
    InSync { id: String },
    /// Take over an unowned record and overwrite it with the desired state.
    Adopt { id: String },
    /// Leave the record alone.
    Conflict { reason: String },
}

/// Marker text for `owner`.
#[must_use]
pub fn ownership_marker(owner: &str) -> String {
    format!("[{OWNERSHIP_MARKER_PREFIX}{owner}]")
}

/// Owner recorded in `comment`, if any.
#[must_use]
pub fn owner_of(comment: Option<&str>) -> Option<&str> {
    let comment = comment?;
    let start = comment.find(&format!("[{OWNERSHIP_MARKER_PREFIX}"))?;
    let rest = &comment[start + 1 + OWNERSHIP_MARKER_PREFIX.len()..];
    let end = rest.find(']')?;
    Some(&rest[..end])
}

/// `comment` without any ownership marker, or `None` when nothing else remains.
#[must_use]
pub fn strip_marker(comment: Option<&str>) -> Option<String> {
    let comment = comment?;
    let stripped = match owner_of(Some(comment)) {
        Some(owner) => comment.replace(&ownership_marker(owner), ""),
        None => comment.to_string(),
    };
    let stripped = stripped.trim().to_string();
    (!stripped.is_empty()).then_some(stripped)
}

/// `comment` with the marker of `owner` appended (replacing any existing marker).
#[must_use]
pub fn with_marker(comment: Option<&str>, owner: &str) -> String {
    match strip_marker(comment) {
        Some(text) => format!("{text} {}", ownership_marker(owner)),
        None => ownership_marker(owner),
    }
}

/// Whether `policy` allows taking over an unowned object.
#[must_use]
pub fn policy_allows(policy: AdoptPolicy, identical: bool) -> bool {
    match policy {
        AdoptPolicy::Always => true,
        AdoptPolicy::IfIdentical => identical,
        AdoptPolicy::Never => false,
    }
}

fn normalize_content(record_type: &str, content: &str) -> String {
    match record_type.to_ascii_uppercase().as_str() {
        "CNAME" | "NS" | "MX" => content.trim_end_matches('.').to_ascii_lowercase(),
        _ => content.to_string(),
    }
}

/// Type, content and proxy mode match.
#[must_use]
pub fn same_target(existing: &DnsRecord, desired: &DnsRecordRequest) -> bool {
    existing.record_type.eq_ignore_ascii_case(&desired.record_type)
        && normalize_content(&existing.record_type, &existing.content)
            == normalize_content(&desired.record_type, &desired.content)
        && existing.proxied == desired.proxied.unwrap_or(false)
}

/// Every field the operator writes matches, ignoring ownership markers.
#[must_use]
pub fn identical(existing: &DnsRecord, desired: &DnsRecordRequest) -> bool {
    same_target(existing, desired)
        && existing.ttl == desired.ttl
        && existing.priority == desired.priority
        && strip_marker(existing.comment.as_deref()) == strip_marker(desired.comment.as_deref())
}

/// Choose between create, update, adopt and conflict.
#[must_use]
pub fn decide(
    existing: Option<&DnsRecord>,
    desired: &DnsRecordRequest,
    owner: &str,
    policy: AdoptPolicy,
) -> AdoptionDecision {
    let Some(existing) = existing else {
        return AdoptionDecision::Create;
    };

    match owner_of(existing.comment.as_deref()) {
        Some(current) if current == owner => {
            if identical(existing, desired) {
                AdoptionDecision::InSync {
                    id: existing.id.clone(),
                }
            } else {
                AdoptionDecision::Update {
                    id: existing.id.clone(),
                }
            }
        }
        Some(other) => AdoptionDecision::Conflict {
            reason: format!(
                "{} {} is managed by {other}",
                existing.record_type, existing.name
            ),
        },
        None if policy_allows(policy, same_target(existing, desired)) => AdoptionDecision::Adopt {
            id: existing.id.clone(),
        },
        None => AdoptionDecision::Conflict {
            reason: format!(
                "{} {} already exists with content {} and adoptPolicy {:?} does not allow taking it over",
                existing.record_type, existing.name, existing.content, policy
            ),
        },
    }
}

/// Pick the record to reconcile among same-name records: the one owned by
/// `owner`, otherwise the first one.
#[must_use]
pub fn select_existing<'a>(records: &'a [DnsRecord], owner: &str) -> Option<&'a DnsRecord> {
    records
        .iter()
        .find(|r| owner_of(r.comment.as_deref()) == Some(owner))
        .or_else(|| records.first())
}

#[cfg(test)]
#[path = "adopt_tests.rs"]
mod adopt_tests;
