// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Fixtures shared by unit tests that talk to mocked Kubernetes and
//! Cloudflare API servers.

use crate::config::OperatorConfig;
use crate::constants::DEFAULT_API_TOKEN_KEY;
use crate::context::{Context, Stores};
use crate::crd::{CloudflareDetails, CredentialsRef};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use kube::runtime::reflector;
use kube::Client;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const NAMESPACE: &str = "apps";
pub const SECRET: &str = "cloudflare-credentials";
pub const ACCOUNT: &str = "acct";

/// kube and reqwest link different rustls backends; tests pick one the same
/// way `main` does. Installing twice is harmless.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

pub fn http_client() -> reqwest::Client {
    install_crypto_provider();
    reqwest::Client::new()
}

/// Kubernetes client talking plain HTTP to `server`.
pub fn kube_client(server: &MockServer) -> Client {
    install_crypto_provider();
    let config = kube::Config::new(server.uri().parse().expect("mock server uri"));
    Client::try_from(config).expect("kube client")
}

/// Context whose Kubernetes API is `kube` and whose Cloudflare API is `cloudflare`.
pub fn test_context(kube: &MockServer, cloudflare: &MockServer, debounce_ms: u64) -> Arc<Context> {
    let (tunnels, _) = reflector::store();
    let (tunnel_bindings, _) = reflector::store();
    let (sync_states, _) = reflector::store();
    let config = OperatorConfig {
        cloudflare_api_url: cloudflare.uri(),
        sync_debounce_ms: debounce_ms,
        sync_max_wait_ms: debounce_ms * 10,
        ..OperatorConfig::default()
    };
    Arc::new(
        Context::new(
            kube_client(kube),
            Stores {
                tunnels,
                tunnel_bindings,
                sync_states,
            },
            config,
        )
        .expect("context"),
    )
}

pub fn cloudflare_details(domain: Option<&str>, zone_id: Option<&str>) -> CloudflareDetails {
    CloudflareDetails {
        account_id: ACCOUNT.to_string(),
        domain: domain.map(str::to_string),
        zone_id: zone_id.map(str::to_string),
        secret: SECRET.to_string(),
        ..CloudflareDetails::default()
    }
}

pub fn credentials_ref(zone_id: Option<&str>) -> CredentialsRef {
    CredentialsRef {
        namespace: NAMESPACE.to_string(),
        details: cloudflare_details(None, zone_id),
    }
}

/// Serve the credentials Secret `apps/cloudflare-credentials`.
pub async fn mount_credentials(kube: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/api/v1/namespaces/{NAMESPACE}/secrets/{SECRET}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "apiVersion": "v1",
            "kind": "Secret",
            "metadata": {"name": SECRET, "namespace": NAMESPACE},
            "data": {DEFAULT_API_TOKEN_KEY: BASE64.encode("token")}
        })))
        .mount(kube)
        .await;
}

/// Cloudflare success envelope around `result`.
pub fn cf_ok(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true, "errors": [], "messages": [], "result": result
    }))
}

/// Cloudflare failure envelope.
pub fn cf_error(status: u16, code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "success": false,
        "errors": [{"code": code, "message": message}],
        "messages": [],
        "result": null
    }))
}

/// Kubernetes `Status` failure body.
pub fn kube_status(code: u16, reason: &str) -> ResponseTemplate {
    ResponseTemplate::new(code).set_body_json(json!({
        "apiVersion": "v1",
        "kind": "Status",
        "status": "Failure",
        "message": format!("{reason} from test server"),
        "reason": reason,
        "code": code
    }))
}

/// Responds with the request body, the way the API server echoes a written object.
pub struct Echo;

impl wiremock::Respond for Echo {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let mut body: serde_json::Value =
            serde_json::from_slice(&request.body).unwrap_or_else(|_| json!({}));
        if body.get("metadata").is_none() {
            body["metadata"] = json!({});
        }
        body["metadata"]["resourceVersion"] = json!("2");
        ResponseTemplate::new(200).set_body_json(body)
    }
}

/// Requests `server` received with `verb` on `path`.
pub async fn requests_to(server: &MockServer, verb: &str, request_path: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == verb && r.url.path() == request_path)
        .collect()
}

/// JSON body of a received request.
pub fn body_json(request: &Request) -> serde_json::Value {
    serde_json::from_slice(&request.body).expect("json body")
}
