// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `resources.rs`

#[cfg(test)]
mod tests {
    use crate::crd::{CloudflareDetails, Tunnel, TunnelSpec};
    use crate::reconcilers::resources::owner_reference;

    fn tunnel(uid: Option<&str>) -> Tunnel {
        let mut tunnel = Tunnel::new(
            "edge",
            TunnelSpec {
                cloudflare: CloudflareDetails::default(),
                tunnel_name: None,
                adopt_existing: false,
                fallback_service: None,
                origin_request: None,
                ingress: vec![],
            },
        );
        tunnel.metadata.namespace = Some("infra".into());
        tunnel.metadata.uid = uid.map(str::to_string);
        tunnel
    }

    #[test]
    fn test_owner_reference_points_at_tunnel() {
        let reference = owner_reference(&tunnel(Some("1234-abcd"))).unwrap();
        assert_eq!(reference.kind, "Tunnel");
        assert_eq!(reference.name, "edge");
        assert_eq!(reference.uid, "1234-abcd");
        assert_eq!(
            reference.api_version,
            "networking.cloudflare-operator.io/v1alpha2"
        );
        assert_eq!(reference.controller, Some(true));
    }

    #[test]
    fn test_owner_reference_requires_uid() {
        assert!(owner_reference(&tunnel(None)).is_err());
    }
}
