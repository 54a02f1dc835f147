// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `controller.rs`

#[cfg(test)]
mod tests {
    use super::super::tunnels_to_recover;
    use crate::crd::{
        CloudflareSyncState, CloudflareSyncStateSpec, CloudflareSyncStateStatus, Condition,
        ConfigSource, CredentialsRef, SourceRef, SyncResourceType, SyncStatus,
    };
    use crate::status_reasons::{REASON_EXTERNAL_NOT_FOUND, REASON_SYNC_FAILED};
    use serde_json::json;

    fn source(kind: &str, namespace: &str, name: &str) -> ConfigSource {
        ConfigSource {
            source_ref: SourceRef::new(kind, namespace, name),
            priority: 10,
            config: json!({}),
            last_updated: None,
        }
    }

    fn sync_state(
        resource_type: SyncResourceType,
        sync_status: SyncStatus,
        reason: &str,
    ) -> CloudflareSyncState {
        let mut sync_state = CloudflareSyncState::new(
            "tunnelconfiguration-t-1",
            CloudflareSyncStateSpec {
                resource_type,
                cloudflare_id: "t-1".into(),
                account_id: "acc".into(),
                zone_id: None,
                credentials_ref: CredentialsRef::default(),
                sources: vec![
                    source("Tunnel", "ingress", "edge"),
                    source("TunnelBinding", "apps", "web"),
                ],
            },
        );
        sync_state.status = Some(CloudflareSyncStateStatus {
            sync_status,
            conditions: vec![Condition {
                r#type: "Ready".into(),
                status: "False".into(),
                reason: Some(reason.into()),
                message: None,
                last_transition_time: None,
            }],
            ..Default::default()
        });
        sync_state
    }

    #[test]
    fn test_lost_tunnel_requeues_only_tunnel_sources() {
        let refs = tunnels_to_recover(&sync_state(
            SyncResourceType::TunnelConfiguration,
            SyncStatus::Error,
            REASON_EXTERNAL_NOT_FOUND,
        ));

        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "edge");
        assert_eq!(refs[0].namespace.as_deref(), Some("ingress"));
    }

    #[test]
    fn test_other_failures_do_not_requeue_tunnels() {
        let failed = sync_state(
            SyncResourceType::TunnelConfiguration,
            SyncStatus::Error,
            REASON_SYNC_FAILED,
        );
        assert!(tunnels_to_recover(&failed).is_empty());

        let synced = sync_state(
            SyncResourceType::TunnelConfiguration,
            SyncStatus::Synced,
            REASON_EXTERNAL_NOT_FOUND,
        );
        assert!(tunnels_to_recover(&synced).is_empty());
    }

    #[test]
    fn test_dns_sync_states_never_requeue_tunnels() {
        let dns = sync_state(
            SyncResourceType::DnsRecord,
            SyncStatus::Error,
            REASON_EXTERNAL_NOT_FOUND,
        );
        assert!(tunnels_to_recover(&dns).is_empty());
    }

    #[test]
    fn test_without_status_nothing_to_recover() {
        let mut pending = sync_state(
            SyncResourceType::TunnelConfiguration,
            SyncStatus::Pending,
            REASON_EXTERNAL_NOT_FOUND,
        );
        pending.status = None;
        assert!(tunnels_to_recover(&pending).is_empty());
    }
}
