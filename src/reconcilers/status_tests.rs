// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{CloudflareSyncStateStatus, Condition, SyncStatus, TunnelStatus};
    use crate::reconcilers::status::{
        conditions_equal, create_condition, find_condition, is_ready, merge_patch,
        update_condition_in_memory, StatusUpdater,
    };
    use serde_json::json;

    const CONDITION_TYPE_READY: &str = "Ready";
    const STATUS_TRUE: &str = "True";
    const STATUS_FALSE: &str = "False";

    #[test]
    fn test_create_condition_basic() {
        let condition = create_condition(CONDITION_TYPE_READY, STATUS_TRUE, "Ready", "Tunnel ready");

        assert_eq!(condition.r#type, CONDITION_TYPE_READY);
        assert_eq!(condition.status, STATUS_TRUE);
        assert_eq!(condition.reason.as_deref(), Some("Ready"));
        assert_eq!(condition.message.as_deref(), Some("Tunnel ready"));

        let timestamp = condition.last_transition_time.unwrap();
        assert!(timestamp.contains('T'));
    }

    #[test]
    fn test_find_condition_and_is_ready() {
        let conditions = vec![
            create_condition("Synced", STATUS_FALSE, "Pending", ""),
            create_condition(CONDITION_TYPE_READY, STATUS_TRUE, "Ready", ""),
        ];
        assert_eq!(
            find_condition(&conditions, "Synced").map(|c| c.status.as_str()),
            Some(STATUS_FALSE)
        );
        assert!(find_condition(&conditions, "Degraded").is_none());
        assert!(is_ready(&conditions));
        assert!(!is_ready(&conditions[..1]));
        assert!(!is_ready(&[]));
    }

    #[test]
    fn test_update_condition_preserves_transition_time_when_status_unchanged() {
        let mut conditions = vec![Condition {
            r#type: CONDITION_TYPE_READY.into(),
            status: STATUS_TRUE.into(),
            reason: Some("Ready".into()),
            message: Some("old".into()),
            last_transition_time: Some("2025-01-01T00:00:00Z".into()),
        }];

        update_condition_in_memory(&mut conditions, CONDITION_TYPE_READY, STATUS_TRUE, "Ready", "new");
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].message.as_deref(), Some("new"));
        assert_eq!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00Z")
        );

        update_condition_in_memory(
            &mut conditions,
            CONDITION_TYPE_READY,
            STATUS_FALSE,
            "TunnelConflict",
            "taken",
        );
        assert_ne!(
            conditions[0].last_transition_time.as_deref(),
            Some("2025-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_update_condition_appends_new_type() {
        let mut conditions = Vec::new();
        update_condition_in_memory(&mut conditions, "Synced", STATUS_TRUE, "Synced", "");
        update_condition_in_memory(&mut conditions, CONDITION_TYPE_READY, STATUS_TRUE, "Ready", "");
        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn test_conditions_equal_ignores_timestamps() {
        let mut a = create_condition(CONDITION_TYPE_READY, STATUS_TRUE, "Ready", "ok");
        let mut b = a.clone();
        a.last_transition_time = Some("2025-01-01T00:00:00Z".into());
        b.last_transition_time = Some("2026-01-01T00:00:00Z".into());
        assert!(conditions_equal(&[a.clone()], &[b]));

        let c = create_condition(CONDITION_TYPE_READY, STATUS_FALSE, "Ready", "ok");
        assert!(!conditions_equal(&[a.clone()], &[c]));
        assert!(!conditions_equal(&[a], &[]));
    }

    #[test]
    fn test_merge_patch_nulls_removed_fields() {
        let current = json!({"tunnelId": "abc", "adopted": false, "conditions": []});
        let new = json!({"adopted": false, "conditions": []});
        let patch = merge_patch(Some(&current), &new);
        assert_eq!(patch["tunnelId"], serde_json::Value::Null);
        assert_eq!(patch["adopted"], false);

        assert_eq!(merge_patch(None, &new), new);
    }

    #[test]
    fn test_updater_without_current_status_has_changes() {
        let updater: StatusUpdater<TunnelStatus> = StatusUpdater::new(None);
        assert!(updater.has_changes());
    }

    #[test]
    fn test_updater_detects_semantic_changes_only() {
        let mut current = TunnelStatus {
            tunnel_id: Some("abc".into()),
            ..Default::default()
        };
        current.conditions.push(create_condition(CONDITION_TYPE_READY, STATUS_TRUE, "Ready", "ok"));

        let mut updater = StatusUpdater::new(Some(&current));
        updater.set_ready("Ready", "ok");
        assert!(!updater.has_changes());

        updater.status_mut().token_secret = Some("edge-tunnel-token".into());
        assert!(updater.has_changes());
    }

    #[test]
    fn test_updater_condition_change_is_detected() {
        let current = CloudflareSyncStateStatus::default();
        let mut updater = StatusUpdater::new(Some(&current));
        updater.status_mut().sync_status = SyncStatus::Pending;
        assert!(!updater.has_changes());

        updater.set_not_ready("Debounced", "waiting");
        assert!(updater.has_changes());
        assert_eq!(updater.status().conditions.len(), 1);
    }

    #[test]
    fn test_updater_observed_generation() {
        let current = TunnelStatus {
            observed_generation: Some(1),
            ..Default::default()
        };
        let mut updater = StatusUpdater::new(Some(&current));
        updater.set_observed_generation(Some(2));
        assert!(updater.has_changes());
        assert_eq!(updater.status().observed_generation, Some(2));
    }
}
