// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::cloudflare::types::DnsRecordRequest;
    use crate::cloudflare::{ApiCredentials, CloudflareClient};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CloudflareClient {
        CloudflareClient::new(
            crate::test_support::http_client(),
            &server.uri(),
            ApiCredentials::ApiToken("tok".into()),
        )
    }

    fn ok(result: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "success": true, "errors": [], "messages": [], "result": result
        }))
    }

    #[tokio::test]
    async fn test_find_dns_records_filters_by_name_and_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/zones/z1/dns_records"))
            .and(query_param("name", "app.example.com"))
            .and(query_param("type", "CNAME"))
            .respond_with(ok(json!([
                {"id": "r1", "type": "CNAME", "name": "app.example.com", "content": "t-1.cfargotunnel.com", "proxied": true, "ttl": 1}
            ])))
            .mount(&server)
            .await;

        let records = client(&server)
            .find_dns_records("z1", "app.example.com", Some("CNAME"))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].proxied);
        assert_eq!(records[0].content, "t-1.cfargotunnel.com");
    }

    #[tokio::test]
    async fn test_create_dns_record_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/zones/z1/dns_records"))
            .and(body_json(json!({
                "type": "A",
                "name": "www.example.com",
                "content": "192.0.2.1",
                "ttl": 1,
                "proxied": true
            })))
            .respond_with(ok(json!({
                "id": "r2", "type": "A", "name": "www.example.com", "content": "192.0.2.1", "proxied": true, "ttl": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = DnsRecordRequest {
            record_type: "A".into(),
            name: "www.example.com".into(),
            content: "192.0.2.1".into(),
            ttl: 1,
            proxied: Some(true),
            priority: None,
            comment: None,
        };
        let created = client(&server).create_dns_record("z1", &record).await.unwrap();
        assert_eq!(created.id, "r2");
    }

    #[tokio::test]
    async fn test_update_uses_put() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/zones/z1/dns_records/r2"))
            .respond_with(ok(json!({
                "id": "r2", "type": "TXT", "name": "txt.example.com", "content": "v=1", "ttl": 300
            })))
            .expect(1)
            .mount(&server)
            .await;

        let record = DnsRecordRequest {
            record_type: "TXT".into(),
            name: "txt.example.com".into(),
            content: "v=1".into(),
            ttl: 300,
            proxied: None,
            priority: None,
            comment: Some("note".into()),
        };
        let updated = client(&server)
            .update_dns_record("z1", "r2", &record)
            .await
            .unwrap();
        assert!(!updated.proxied);
        assert_eq!(updated.ttl, 300);
    }
}
