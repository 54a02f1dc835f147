// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `accessapplication.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        desired_application, find_by_domain, may_adopt, reconcile_access_application,
        same_identity,
    };
    use crate::cloudflare::types::AccessApp;
    use crate::crd::{
        AccessApplication, AccessApplicationSpec, AccessApplicationStatus, AdoptPolicy,
        CloudflareDetails,
    };
    use crate::reconcilers::requeue_based_on_readiness;
    use crate::sync::hash::hash_of;
    use crate::test_support::{
        body_json, cf_ok, cloudflare_details, kube_status, mount_credentials, requests_to,
        test_context, ACCOUNT, NAMESPACE,
    };
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn spec() -> AccessApplicationSpec {
        AccessApplicationSpec {
            cloudflare: CloudflareDetails::default(),
            name: "Grafana".into(),
            domain: "grafana.example.com".into(),
            r#type: None,
            session_duration: Some("24h".into()),
            allowed_idps: vec!["idp-1".into()],
            auto_redirect_to_identity: Some(true),
            app_launcher_visible: None,
            adopt_policy: AdoptPolicy::IfIdentical,
        }
    }

    fn existing(id: &str, name: &str, domain: &str, app_type: Option<&str>) -> AccessApp {
        AccessApp {
            id: id.into(),
            aud: Some(format!("aud-{id}")),
            name: name.into(),
            domain: domain.into(),
            app_type: app_type.map(str::to_string),
            session_duration: None,
            allowed_idps: vec![],
            auto_redirect_to_identity: None,
            app_launcher_visible: None,
        }
    }

    #[test]
    fn test_desired_application_defaults_type() {
        let request = desired_application(&spec());
        assert_eq!(request.app_type, "self_hosted");
        assert_eq!(request.name, "Grafana");
        assert_eq!(request.session_duration.as_deref(), Some("24h"));
        assert_eq!(request.allowed_idps, vec!["idp-1".to_string()]);
        assert_eq!(request.auto_redirect_to_identity, Some(true));
    }

    #[test]
    fn test_desired_application_explicit_type() {
        let mut spec = spec();
        spec.r#type = Some("ssh".into());
        assert_eq!(desired_application(&spec).app_type, "ssh");
    }

    #[test]
    fn test_find_by_domain_is_case_and_slash_insensitive() {
        let apps = vec![
            existing("a", "Other", "other.example.com", None),
            existing("b", "Grafana", "Grafana.Example.com/", None),
        ];
        let found = find_by_domain(&apps, &desired_application(&spec())).unwrap();
        assert_eq!(found.id, "b");
    }

    #[test]
    fn test_find_by_domain_none() {
        let apps = vec![existing("a", "Other", "other.example.com", None)];
        assert!(find_by_domain(&apps, &desired_application(&spec())).is_none());
    }

    #[test]
    fn test_same_identity_requires_name_and_type() {
        let desired = desired_application(&spec());
        assert!(same_identity(
            &existing("a", "Grafana", "grafana.example.com", Some("self_hosted")),
            &desired
        ));
        assert!(same_identity(
            &existing("a", "Grafana", "grafana.example.com", None),
            &desired
        ));
        assert!(!same_identity(
            &existing("a", "Grafana (old)", "grafana.example.com", None),
            &desired
        ));
        assert!(!same_identity(
            &existing("a", "Grafana", "grafana.example.com", Some("saas")),
            &desired
        ));
    }

    #[test]
    fn test_may_adopt_follows_policy() {
        let desired = desired_application(&spec());
        let other = existing("a", "Legacy", "grafana.example.com", None);
        let same = existing("b", "Grafana", "grafana.example.com", None);

        assert!(!may_adopt(AdoptPolicy::Never, &same, &desired));
        assert!(may_adopt(AdoptPolicy::IfIdentical, &same, &desired));
        assert!(!may_adopt(AdoptPolicy::IfIdentical, &other, &desired));
        assert!(may_adopt(AdoptPolicy::Always, &other, &desired));
    }

    // ------------------------------------------------------------------
    // reconcile_access_application against mocked APIs
    // ------------------------------------------------------------------

    const STATUS_PATH: &str =
        "/apis/networking.cloudflare-operator.io/v1alpha2/namespaces/apps/accessapplications/grafana/status";

    fn application(status: Option<AccessApplicationStatus>) -> AccessApplication {
        let mut spec = spec();
        spec.cloudflare = cloudflare_details(None, None);
        let mut app = AccessApplication::new("grafana", spec);
        app.metadata.namespace = Some(NAMESPACE.into());
        app.status = status;
        app
    }

    fn app_json(id: &str) -> serde_json::Value {
        json!({
            "id": id,
            "aud": format!("aud-{id}"),
            "name": "Grafana",
            "domain": "grafana.example.com",
            "type": "self_hosted"
        })
    }

    #[tokio::test]
    async fn test_created_application_id_survives_failed_final_update() {
        let kube = MockServer::start().await;
        let cloudflare = MockServer::start().await;
        mount_credentials(&kube).await;
        let app = application(None);
        Mock::given(method("PATCH"))
            .and(path(STATUS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(&app))
            .up_to_n_times(1)
            .mount(&kube)
            .await;
        Mock::given(method("PATCH"))
            .and(path(STATUS_PATH))
            .respond_with(kube_status(500, "InternalError"))
            .mount(&kube)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/accounts/{ACCOUNT}/access/apps")))
            .respond_with(cf_ok(json!([])))
            .mount(&cloudflare)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/accounts/{ACCOUNT}/access/apps")))
            .respond_with(cf_ok(app_json("app-1")))
            .expect(1)
            .mount(&cloudflare)
            .await;

        let ctx = test_context(&kube, &cloudflare, 0);
        assert!(reconcile_access_application(ctx, Arc::new(app)).await.is_err());

        let patches = requests_to(&kube, "PATCH", STATUS_PATH).await;
        let first = &body_json(&patches[0])["status"];
        assert_eq!(first["applicationId"], "app-1");
        assert_eq!(first["aud"], "aud-app-1");
        assert_eq!(first["adopted"], false);
        assert!(first["specHash"].is_string());
    }

    #[tokio::test]
    async fn test_recorded_application_is_not_looked_up_by_domain() {
        let kube = MockServer::start().await;
        let cloudflare = MockServer::start().await;
        mount_credentials(&kube).await;
        let spec_hash = hash_of(&desired_application(&application(None).spec));
        let app = application(Some(AccessApplicationStatus {
            application_id: Some("app-1".into()),
            aud: Some("aud-app-1".into()),
            spec_hash: Some(spec_hash),
            ..Default::default()
        }));
        Mock::given(method("PATCH"))
            .and(path(STATUS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(&app))
            .mount(&kube)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/accounts/{ACCOUNT}/access/apps/app-1")))
            .respond_with(cf_ok(app_json("app-1")))
            .expect(1)
            .mount(&cloudflare)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/accounts/{ACCOUNT}/access/apps")))
            .respond_with(cf_ok(json!([app_json("app-1")])))
            .expect(0)
            .mount(&cloudflare)
            .await;
        Mock::given(method("POST"))
            .respond_with(cf_ok(app_json("app-2")))
            .expect(0)
            .mount(&cloudflare)
            .await;

        let ctx = test_context(&kube, &cloudflare, 0);
        let action = reconcile_access_application(ctx, Arc::new(app)).await.unwrap();

        assert_eq!(action, requeue_based_on_readiness(true));
        let status = &body_json(&requests_to(&kube, "PATCH", STATUS_PATH).await[0])["status"];
        assert_eq!(status["applicationId"], "app-1");
        assert_eq!(status["adopted"], false);
    }
}
