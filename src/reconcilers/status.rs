// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Status condition helpers for Kubernetes resources.
//!
//! This module provides utility functions for creating and managing Kubernetes
//! status conditions following the standard conventions, plus a [`StatusUpdater`]
//! that collects every status change of one reconciliation and writes them in a
//! single patch.
//!
//! # Condition Format
//!
//! Kubernetes conditions follow a standard format:
//! - `type`: The aspect of the resource being reported (e.g., "Ready", "Synced")
//! - `status`: "True", "False", or "Unknown"
//! - `reason`: A programmatic identifier (CamelCase)
//! - `message`: A human-readable explanation
//! - `lastTransitionTime`: RFC3339 timestamp when the condition changed
//!
//! # Example
//!
//! ```rust,no_run
//! use cloudflare_operator::reconcilers::status::create_condition;
//!
//! let condition = create_condition(
//!     "Ready",
//!     "True",
//!     "Ready",
//!     "Tunnel is connected to Cloudflare"
//! );
//! ```

use crate::crd::{
    AccessApplicationStatus, CloudflareSyncStateStatus, Condition, DNSRecordStatus,
    TunnelBindingStatus, TunnelStatus,
};
use crate::status_reasons::{CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE, CONDITION_TYPE_READY};
use anyhow::Result;
use chrono::Utc;
use kube::api::{Patch, PatchParams};
use kube::Api;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Debug;
use tracing::debug;

/// Create a new Kubernetes condition with the current timestamp.
///
/// # Arguments
///
/// * `condition_type` - The type of condition (e.g., "Ready")
/// * `status` - The status: "True", "False", or "Unknown"
/// * `reason` - A programmatic identifier in `CamelCase`
/// * `message` - A human-readable explanation
#[must_use]
pub fn create_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> Condition {
    Condition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
        last_transition_time: Some(Utc::now().to_rfc3339()),
    }
}

/// Find a condition by type in a list of conditions.
#[must_use]
pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}

/// Whether `conditions` carries `Ready=True`.
#[must_use]
pub fn is_ready(conditions: &[Condition]) -> bool {
    find_condition(conditions, CONDITION_TYPE_READY).is_some_and(|c| c.status == CONDITION_STATUS_TRUE)
}

/// Update or add a condition in a mutable conditions list (in-memory, no API call).
///
/// Preserves `lastTransitionTime` when the status value is unchanged and sets a
/// new timestamp when it flips.
pub fn update_condition_in_memory(
    conditions: &mut Vec<Condition>,
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition_type) {
        let last_transition_time = if existing.status == status {
            existing
                .last_transition_time
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc3339())
        } else {
            Utc::now().to_rfc3339()
        };

        existing.status = status.to_string();
        existing.reason = Some(reason.to_string());
        existing.message = Some(message.to_string());
        existing.last_transition_time = Some(last_transition_time);
    } else {
        conditions.push(create_condition(condition_type, status, reason, message));
    }
}

/// Compare two condition lists, ignoring `lastTransitionTime`.
#[must_use]
pub fn conditions_equal(current: &[Condition], new: &[Condition]) -> bool {
    if current.len() != new.len() {
        return false;
    }

    new.iter().all(|new_cond| {
        current.iter().any(|curr_cond| {
            curr_cond.r#type == new_cond.r#type
                && curr_cond.status == new_cond.status
                && curr_cond.reason == new_cond.reason
                && curr_cond.message == new_cond.message
        })
    })
}

/// Merge patch turning `current` into `new`.
///
/// Status structs skip `None` fields when serialized, which a JSON merge patch
/// reads as "leave unchanged". Top-level keys present in `current` but missing
/// from `new` are therefore sent as `null` so they are actually cleared.
#[must_use]
pub fn merge_patch(current: Option<&Value>, new: &Value) -> Value {
    let mut patch = new.clone();
    if let (Some(Value::Object(current)), Value::Object(patch)) = (current, &mut patch) {
        for key in current.keys() {
            if !patch.contains_key(key) {
                patch.insert(key.clone(), Value::Null);
            }
        }
    }
    patch
}

/// Status types carrying `conditions` and `observedGeneration`.
pub trait ConditionedStatus: Clone + Debug + Default + PartialEq + Serialize {
    /// Conditions list.
    fn conditions(&self) -> &[Condition];

    /// Mutable conditions list.
    fn conditions_mut(&mut self) -> &mut Vec<Condition>;

    /// Record the generation this status reflects.
    fn set_observed_generation(&mut self, generation: Option<i64>);
}

macro_rules! impl_conditioned_status {
    ($($status:ty),+ $(,)?) => {
        $(
            impl ConditionedStatus for $status {
                fn conditions(&self) -> &[Condition] {
                    &self.conditions
                }

                fn conditions_mut(&mut self) -> &mut Vec<Condition> {
                    &mut self.conditions
                }

                fn set_observed_generation(&mut self, generation: Option<i64>) {
                    self.observed_generation = generation;
                }
            }
        )+
    };
}

impl_conditioned_status!(
    TunnelStatus,
    TunnelBindingStatus,
    DNSRecordStatus,
    AccessApplicationStatus,
    CloudflareSyncStateStatus,
);

/// Centralized status updater.
///
/// Collects all status changes during reconciliation and applies them in a
/// single Kubernetes API call, skipped entirely when nothing changed
/// semantically. Every status write triggers a watch event, so avoiding no-op
/// writes keeps controllers from reconciling in a loop.
///
/// # Example
///
/// ```rust,ignore
/// let mut updater = StatusUpdater::new(tunnel.status.as_ref());
/// updater.status_mut().tunnel_id = Some(id);
/// updater.set_ready("Ready", "Tunnel is ready");
/// updater.apply(&api, &tunnel.name_any()).await?;
/// ```
pub struct StatusUpdater<S: ConditionedStatus> {
    current_status: Option<S>,
    new_status: S,
}

impl<S: ConditionedStatus> StatusUpdater<S> {
    /// Start from the resource's current status (or an empty one).
    #[must_use]
    pub fn new(current: Option<&S>) -> Self {
        Self {
            current_status: current.cloned(),
            new_status: current.cloned().unwrap_or_default(),
        }
    }

    /// The status being built.
    #[must_use]
    pub fn status(&self) -> &S {
        &self.new_status
    }

    /// Mutable access to the status being built.
    pub fn status_mut(&mut self) -> &mut S {
        &mut self.new_status
    }

    /// Update or add a condition (in-memory only, no API call).
    pub fn set_condition(
        &mut self,
        condition_type: &str,
        status: &str,
        reason: &str,
        message: &str,
    ) {
        update_condition_in_memory(
            self.new_status.conditions_mut(),
            condition_type,
            status,
            reason,
            message,
        );
    }

    /// Set `Ready=True`.
    pub fn set_ready(&mut self, reason: &str, message: &str) {
        self.set_condition(CONDITION_TYPE_READY, CONDITION_STATUS_TRUE, reason, message);
    }

    /// Set `Ready=False`.
    pub fn set_not_ready(&mut self, reason: &str, message: &str) {
        self.set_condition(CONDITION_TYPE_READY, CONDITION_STATUS_FALSE, reason, message);
    }

    /// Set the observed generation to match the current generation.
    pub fn set_observed_generation(&mut self, generation: Option<i64>) {
        self.new_status.set_observed_generation(generation);
    }

    /// Whether the collected status differs semantically from the current one.
    ///
    /// Condition timestamps are ignored; everything else is compared.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        let Some(current) = &self.current_status else {
            return true;
        };
        if !conditions_equal(current.conditions(), self.new_status.conditions()) {
            return true;
        }

        let mut current = current.clone();
        let mut new = self.new_status.clone();
        current.conditions_mut().clear();
        new.conditions_mut().clear();
        current != new
    }

    /// Apply the collected status changes through `api` (single API call).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the Kubernetes API call fails.
    pub async fn apply<K>(&self, api: &Api<K>, name: &str) -> Result<()>
    where
        K: kube::Resource<DynamicType = ()> + Clone + Debug + DeserializeOwned,
    {
        if !self.has_changes() {
            debug!(resource = %name, kind = %K::kind(&()), "Status unchanged, skipping update");
            return Ok(());
        }

        let current = self
            .current_status
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;
        let new = serde_json::to_value(&self.new_status)?;
        let patch = json!({ "status": merge_patch(current.as_ref(), &new) });

        api.patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;

        debug!(
            resource = %name,
            kind = %K::kind(&()),
            conditions = self.new_status.conditions().len(),
            "Updated status"
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
