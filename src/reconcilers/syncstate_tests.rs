// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `syncstate.rs`

#[cfg(test)]
mod tests {
    use super::super::{already_synced, desired_state, lookup_type, sync_state_owner, DesiredState};
    use crate::crd::{
        AdoptPolicy, CloudflareSyncStateSpec, CloudflareSyncStateStatus, ConfigSource,
        CredentialsRef, DnsRecordType, SourceRef, SyncResourceType, SyncStatus, TunnelIngressRule,
    };
    use super::super::reconcile_sync_state;
    use crate::constants::REQUEUE_WHEN_READY_SECS;
    use crate::crd::CloudflareSyncState;
    use crate::labels::FINALIZER_SYNC_STATE;
    use crate::reconcilers::requeue_based_on_readiness;
    use crate::status_reasons::{
        CONDITION_TYPE_READY, REASON_EXTERNAL_NOT_FOUND, REASON_SOURCE_CONFLICT,
    };
    use crate::sync::adopt::{owner_of, ownership_marker};
    use crate::sync::{DebounceDecision, DnsSourceConfig, SyncError, TunnelSourceConfig};
    use crate::test_support::{
        body_json, cf_error, cf_ok, credentials_ref, mount_credentials, requests_to, test_context,
    };
    use kube::runtime::controller::Action;
    use kube::ResourceExt;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::{Duration, Instant};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(kind: &str, name: &str, priority: i32, config: serde_json::Value) -> ConfigSource {
        ConfigSource {
            source_ref: SourceRef::new(kind, "apps", name),
            priority,
            config,
            last_updated: None,
        }
    }

    fn spec(resource_type: SyncResourceType, sources: Vec<ConfigSource>) -> CloudflareSyncStateSpec {
        CloudflareSyncStateSpec {
            resource_type,
            cloudflare_id: "t-1".into(),
            account_id: "acc".into(),
            zone_id: Some("zone-1".into()),
            credentials_ref: CredentialsRef::default(),
            sources,
        }
    }

    fn tunnel_source(name: &str, priority: i32, hostname: &str, service: &str) -> ConfigSource {
        let config = TunnelSourceConfig {
            ingress: vec![TunnelIngressRule {
                hostname: hostname.into(),
                service: service.into(),
                path: None,
                origin_request: None,
            }],
            fallback_service: None,
            origin_request: None,
        };
        source("TunnelBinding", name, priority, serde_json::to_value(config).unwrap())
    }

    fn cname_source(name: &str, priority: i32, content: &str) -> ConfigSource {
        let config = DnsSourceConfig {
            name: "app.example.com".into(),
            r#type: DnsRecordType::CNAME,
            content: content.into(),
            proxied: true,
            ttl: None,
            adopt_policy: AdoptPolicy::Always,
        };
        source("TunnelBinding", name, priority, serde_json::to_value(config).unwrap())
    }

    #[test]
    fn test_sync_state_owner() {
        assert_eq!(
            sync_state_owner("dnsrecord-app.example.com"),
            "CloudflareSyncState/dnsrecord-app.example.com"
        );
    }

    #[test]
    fn test_desired_tunnel_state_ends_with_fallback() {
        let spec = spec(
            SyncResourceType::TunnelConfiguration,
            vec![tunnel_source("web", 100, "app.example.com", "http://app:80")],
        );

        let (desired, conflicts) = desired_state(&spec, "CloudflareSyncState/x").unwrap();

        assert!(conflicts.is_empty());
        let DesiredState::Tunnel(config) = desired else {
            panic!("expected a tunnel configuration");
        };
        assert_eq!(config.ingress.len(), 2);
        assert_eq!(config.ingress[0].hostname.as_deref(), Some("app.example.com"));
        assert!(config.ingress[1].hostname.is_none());
    }

    #[test]
    fn test_desired_dns_state_carries_owner_marker() {
        let spec = spec(
            SyncResourceType::DnsRecord,
            vec![
                cname_source("b", 100, "t-2.cfargotunnel.com"),
                cname_source("a", 50, "t-1.cfargotunnel.com"),
            ],
        );
        let owner = "CloudflareSyncState/dnsrecord-app.example.com";

        let (desired, conflicts) = desired_state(&spec, owner).unwrap();

        assert_eq!(conflicts.len(), 1);
        let DesiredState::Dns {
            request,
            adopt_policy,
        } = desired
        else {
            panic!("expected a DNS record");
        };
        assert_eq!(request.content, "t-1.cfargotunnel.com");
        assert_eq!(request.proxied, Some(true));
        assert_eq!(adopt_policy, AdoptPolicy::Always);
        assert_eq!(owner_of(request.comment.as_deref()), Some(owner));
    }

    #[test]
    fn test_desired_dns_state_without_valid_sources() {
        let spec = spec(
            SyncResourceType::DnsRecord,
            vec![source("TunnelBinding", "bad", 100, json!({"unexpected": true}))],
        );
        assert!(matches!(
            desired_state(&spec, "CloudflareSyncState/x"),
            Err(SyncError::NoSources)
        ));
    }

    #[test]
    fn test_hash_changes_with_content_not_with_source_order() {
        let a = tunnel_source("a", 100, "a.example.com", "http://a");
        let b = tunnel_source("b", 100, "b.example.com", "http://b");

        let first = spec(SyncResourceType::TunnelConfiguration, vec![a.clone(), b.clone()]);
        let reordered = spec(SyncResourceType::TunnelConfiguration, vec![b, a]);
        let changed = spec(
            SyncResourceType::TunnelConfiguration,
            vec![tunnel_source("a", 100, "a.example.com", "http://other")],
        );

        let hash = |spec: &CloudflareSyncStateSpec| desired_state(spec, "o").unwrap().0.hash(spec);
        assert_eq!(hash(&first), hash(&reordered));
        assert_ne!(hash(&first), hash(&changed));
    }

    #[test]
    fn test_already_synced() {
        let synced = CloudflareSyncStateStatus {
            sync_status: SyncStatus::Synced,
            config_hash: Some("abc".into()),
            ..Default::default()
        };
        assert!(already_synced(Some(&synced), "abc"));
        assert!(!already_synced(Some(&synced), "def"));
        assert!(!already_synced(None, "abc"));

        let failed = CloudflareSyncStateStatus {
            sync_status: SyncStatus::Error,
            ..synced
        };
        assert!(!already_synced(Some(&failed), "abc"));
    }

    #[test]
    fn test_lookup_type() {
        let spec = spec(
            SyncResourceType::DnsRecord,
            vec![cname_source("a", 100, "t-1.cfargotunnel.com")],
        );
        let (DesiredState::Dns { mut request, .. }, _) = desired_state(&spec, "o").unwrap() else {
            panic!("expected a DNS record");
        };
        assert_eq!(lookup_type(&request), None);

        request.record_type = "A".into();
        assert_eq!(lookup_type(&request), Some("A"));
    }

    // ------------------------------------------------------------------
    // reconcile_sync_state against mocked Kubernetes and Cloudflare APIs
    // ------------------------------------------------------------------

    const COLLECTION: &str = "/apis/networking.cloudflare-operator.io/v1alpha2/cloudflaresyncstates";

    fn sync_state(
        name: &str,
        mut spec: CloudflareSyncStateSpec,
        status: Option<CloudflareSyncStateStatus>,
    ) -> CloudflareSyncState {
        spec.credentials_ref = credentials_ref(spec.zone_id.as_deref());
        let mut sync_state = CloudflareSyncState::new(name, spec);
        sync_state.metadata.finalizers = Some(vec![FINALIZER_SYNC_STATE.to_string()]);
        sync_state.metadata.resource_version = Some("1".into());
        sync_state.status = status;
        sync_state
    }

    /// Serve the object itself for status patches and return the status path.
    async fn mount_status_patch(kube: &MockServer, sync_state: &CloudflareSyncState) -> String {
        let status_path = format!("{COLLECTION}/{}/status", sync_state.name_any());
        Mock::given(method("PATCH"))
            .and(path(status_path.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(sync_state))
            .mount(kube)
            .await;
        status_path
    }

    fn ready_reason(status: &serde_json::Value) -> Option<String> {
        status["conditions"]
            .as_array()?
            .iter()
            .find(|c| c["type"] == CONDITION_TYPE_READY)
            .and_then(|c| c["reason"].as_str())
            .map(str::to_string)
    }

    #[tokio::test]
    async fn test_reconcile_deletes_sync_state_without_sources() {
        let kube = MockServer::start().await;
        let cloudflare = MockServer::start().await;
        let sync_state = sync_state(
            "tunnelconfiguration-t-1",
            spec(SyncResourceType::TunnelConfiguration, vec![]),
            None,
        );
        Mock::given(method("DELETE"))
            .and(path(format!("{COLLECTION}/tunnelconfiguration-t-1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "apiVersion": "v1", "kind": "Status", "status": "Success", "metadata": {}
            })))
            .expect(1)
            .mount(&kube)
            .await;

        let ctx = test_context(&kube, &cloudflare, 0);
        let action = reconcile_sync_state(ctx, Arc::new(sync_state)).await.unwrap();

        assert_eq!(action, Action::await_change());
        assert!(cloudflare.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_skips_unchanged_configuration() {
        let kube = MockServer::start().await;
        let cloudflare = MockServer::start().await;
        let name = "tunnelconfiguration-t-1";
        let spec = spec(
            SyncResourceType::TunnelConfiguration,
            vec![tunnel_source("a", 100, "app.example.com", "http://app:80")],
        );
        let (desired, _) = desired_state(&spec, &sync_state_owner(name)).unwrap();
        let synced = CloudflareSyncStateStatus {
            sync_status: SyncStatus::Synced,
            config_hash: Some(desired.hash(&spec)),
            ..Default::default()
        };
        let sync_state = sync_state(name, spec, Some(synced));

        let ctx = test_context(&kube, &cloudflare, 500);
        // A burst that ended on the configuration already pushed
        let t0 = Instant::now();
        assert!(matches!(ctx.debouncer.observe(name, "burst", t0), DebounceDecision::Wait(_)));

        let action = reconcile_sync_state(ctx.clone(), Arc::new(sync_state)).await.unwrap();

        assert_eq!(action, Action::requeue(Duration::from_secs(REQUEUE_WHEN_READY_SECS)));
        assert!(cloudflare.received_requests().await.unwrap().is_empty());
        assert!(kube.received_requests().await.unwrap().is_empty());
        // The stale burst no longer shortens the next quiet period
        assert_eq!(
            ctx.debouncer.observe(name, "next", t0 + Duration::from_secs(60)),
            DebounceDecision::Wait(Duration::from_millis(500))
        );
    }

    #[tokio::test]
    async fn test_reconcile_debounces_new_configuration() {
        let kube = MockServer::start().await;
        let cloudflare = MockServer::start().await;
        let sync_state = sync_state(
            "tunnelconfiguration-t-1",
            spec(
                SyncResourceType::TunnelConfiguration,
                vec![tunnel_source("a", 100, "app.example.com", "http://app:80")],
            ),
            None,
        );

        let ctx = test_context(&kube, &cloudflare, 500);
        let action = reconcile_sync_state(ctx, Arc::new(sync_state)).await.unwrap();

        assert_eq!(action, Action::requeue(Duration::from_millis(500)));
        assert!(cloudflare.received_requests().await.unwrap().is_empty());
        assert!(kube.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_reports_missing_tunnel() {
        let kube = MockServer::start().await;
        let cloudflare = MockServer::start().await;
        mount_credentials(&kube).await;
        let sync_state = sync_state(
            "tunnelconfiguration-t-1",
            spec(
                SyncResourceType::TunnelConfiguration,
                vec![tunnel_source("a", 100, "app.example.com", "http://app:80")],
            ),
            None,
        );
        let status_path = mount_status_patch(&kube, &sync_state).await;
        Mock::given(method("GET"))
            .and(path("/accounts/acc/cfd_tunnel/t-1/configurations"))
            .respond_with(cf_error(404, 1003, "tunnel not found"))
            .mount(&cloudflare)
            .await;
        Mock::given(method("PUT"))
            .respond_with(cf_ok(json!({})))
            .expect(0)
            .mount(&cloudflare)
            .await;

        let ctx = test_context(&kube, &cloudflare, 0);
        let action = reconcile_sync_state(ctx, Arc::new(sync_state)).await.unwrap();

        assert_eq!(action, requeue_based_on_readiness(false));
        let patches = requests_to(&kube, "PATCH", &status_path).await;
        assert_eq!(patches.len(), 1);
        let status = &body_json(&patches[0])["status"];
        assert_eq!(status["syncStatus"], "Error");
        assert_eq!(ready_reason(status).as_deref(), Some(REASON_EXTERNAL_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_reconcile_pushes_tunnel_configuration() {
        let kube = MockServer::start().await;
        let cloudflare = MockServer::start().await;
        mount_credentials(&kube).await;
        let sync_state = sync_state(
            "tunnelconfiguration-t-1",
            spec(
                SyncResourceType::TunnelConfiguration,
                vec![tunnel_source("a", 100, "app.example.com", "http://app:80")],
            ),
            None,
        );
        let status_path = mount_status_patch(&kube, &sync_state).await;
        Mock::given(method("GET"))
            .and(path("/accounts/acc/cfd_tunnel/t-1/configurations"))
            .respond_with(cf_ok(json!({"tunnel_id": "t-1", "version": 1, "config": null})))
            .mount(&cloudflare)
            .await;
        Mock::given(method("PUT"))
            .and(path("/accounts/acc/cfd_tunnel/t-1/configurations"))
            .respond_with(cf_ok(json!({"tunnel_id": "t-1", "version": 2})))
            .expect(1)
            .mount(&cloudflare)
            .await;

        let ctx = test_context(&kube, &cloudflare, 0);
        let action = reconcile_sync_state(ctx, Arc::new(sync_state)).await.unwrap();

        assert_eq!(action, requeue_based_on_readiness(true));
        let status = &body_json(&requests_to(&kube, "PATCH", &status_path).await[0])["status"];
        assert_eq!(status["syncStatus"], "Synced");
        assert_eq!(status["externalId"], "t-1");
        assert!(status["configHash"].is_string());
    }

    #[tokio::test]
    async fn test_reconcile_does_not_rewrite_matching_remote_configuration() {
        let kube = MockServer::start().await;
        let cloudflare = MockServer::start().await;
        mount_credentials(&kube).await;
        let sync_state = sync_state(
            "tunnelconfiguration-t-1",
            spec(
                SyncResourceType::TunnelConfiguration,
                vec![tunnel_source("a", 100, "app.example.com", "http://app:80")],
            ),
            None,
        );
        let DesiredState::Tunnel(remote) = desired_state(&sync_state.spec, "x").unwrap().0 else {
            panic!("expected a tunnel configuration");
        };
        let status_path = mount_status_patch(&kube, &sync_state).await;
        Mock::given(method("GET"))
            .and(path("/accounts/acc/cfd_tunnel/t-1/configurations"))
            .respond_with(cf_ok(json!({"tunnel_id": "t-1", "version": 7, "config": remote})))
            .expect(1)
            .mount(&cloudflare)
            .await;
        Mock::given(method("PUT"))
            .and(path("/accounts/acc/cfd_tunnel/t-1/configurations"))
            .respond_with(cf_ok(json!({"tunnel_id": "t-1", "version": 8})))
            .expect(0)
            .mount(&cloudflare)
            .await;

        let ctx = test_context(&kube, &cloudflare, 0);
        reconcile_sync_state(ctx, Arc::new(sync_state)).await.unwrap();

        let status = &body_json(&requests_to(&kube, "PATCH", &status_path).await[0])["status"];
        assert_eq!(status["syncStatus"], "Synced");
        assert_eq!(status["externalId"], "t-1");
    }

    #[tokio::test]
    async fn test_reconcile_reports_dns_ownership_conflict() {
        let kube = MockServer::start().await;
        let cloudflare = MockServer::start().await;
        mount_credentials(&kube).await;
        let mut dns_spec = spec(
            SyncResourceType::DnsRecord,
            vec![cname_source("a", 100, "t-1.cfargotunnel.com")],
        );
        dns_spec.cloudflare_id = "app.example.com".into();
        let sync_state = sync_state("dnsrecord-app.example.com", dns_spec, None);
        let status_path = mount_status_patch(&kube, &sync_state).await;
        Mock::given(method("GET"))
            .and(path("/zones/zone-1/dns_records"))
            .respond_with(cf_ok(json!([{
                "id": "rec-1",
                "type": "CNAME",
                "name": "app.example.com",
                "content": "elsewhere.example.net",
                "proxied": true,
                "ttl": 1,
                "comment": ownership_marker("DNSRecord/other/app")
            }])))
            .mount(&cloudflare)
            .await;
        Mock::given(method("PUT"))
            .respond_with(cf_ok(json!({})))
            .expect(0)
            .mount(&cloudflare)
            .await;
        Mock::given(method("POST"))
            .respond_with(cf_ok(json!({})))
            .expect(0)
            .mount(&cloudflare)
            .await;

        let ctx = test_context(&kube, &cloudflare, 0);
        let action = reconcile_sync_state(ctx, Arc::new(sync_state)).await.unwrap();

        assert_eq!(action, requeue_based_on_readiness(false));
        let status = &body_json(&requests_to(&kube, "PATCH", &status_path).await[0])["status"];
        assert_eq!(status["syncStatus"], "Conflict");
        assert!(status["error"].as_str().unwrap().contains("DNSRecord/other/app"));
        assert_eq!(ready_reason(status).as_deref(), Some(REASON_SOURCE_CONFLICT));
    }
}
