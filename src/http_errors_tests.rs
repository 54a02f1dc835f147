// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for http_errors module
//!
//! These tests verify HTTP error code mapping to status condition reasons.

#[cfg(test)]
mod tests {
    use crate::cloudflare_errors::CloudflareError;
    use crate::http_errors::*;
    use crate::status_reasons::*;

    // ============================================================================
    // Test HTTP 4xx Error Code Mappings
    // ============================================================================

    #[test]
    fn test_map_http_400_bad_request() {
        let (reason, message) = map_http_error_to_reason(400);
        assert_eq!(reason, REASON_CLOUDFLARE_BAD_REQUEST);
        assert!(message.contains("400"));
    }

    #[test]
    fn test_map_http_401_and_403_are_auth_failures() {
        let (reason, message) = map_http_error_to_reason(401);
        assert_eq!(reason, REASON_CLOUDFLARE_AUTH_FAILED);
        assert!(message.contains("401"));

        let (reason, message) = map_http_error_to_reason(403);
        assert_eq!(reason, REASON_CLOUDFLARE_AUTH_FAILED);
        assert!(message.contains("permission"));
    }

    #[test]
    fn test_map_http_404_not_found() {
        let (reason, message) = map_http_error_to_reason(404);
        assert_eq!(reason, REASON_EXTERNAL_NOT_FOUND);
        assert!(message.contains("not found"));
    }

    #[test]
    fn test_map_http_429_rate_limited() {
        let (reason, _) = map_http_error_to_reason(429);
        assert_eq!(reason, REASON_CLOUDFLARE_RATE_LIMITED);
    }

    // ============================================================================
    // Test HTTP 5xx Error Code Mappings
    // ============================================================================

    #[test]
    fn test_map_http_5xx_unavailable() {
        for code in [500, 502, 503, 504, 520] {
            let (reason, message) = map_http_error_to_reason(code);
            assert_eq!(reason, REASON_CLOUDFLARE_UNAVAILABLE);
            assert!(message.contains(&code.to_string()));
        }
    }

    #[test]
    fn test_map_http_unknown() {
        let (reason, message) = map_http_error_to_reason(418);
        assert_eq!(reason, REASON_CLOUDFLARE_UNREACHABLE);
        assert!(message.contains("418"));
    }

    #[test]
    fn test_map_connection_error() {
        let (reason, message) = map_connection_error();
        assert_eq!(reason, REASON_CLOUDFLARE_UNREACHABLE);
        assert!(message.contains("Cloudflare"));
    }

    // ============================================================================
    // Test CloudflareError Mappings
    // ============================================================================

    #[test]
    fn test_map_cloudflare_error_variants() {
        let (reason, _) = map_cloudflare_error(&CloudflareError::NotFound {
            path: "/zones/z/dns_records/r".into(),
        });
        assert_eq!(reason, REASON_EXTERNAL_NOT_FOUND);

        let (reason, message) = map_cloudflare_error(&CloudflareError::NotFound {
            path: "/zones?name=example.com".into(),
        });
        assert_eq!(reason, REASON_ZONE_NOT_FOUND);
        assert!(message.contains("example.com"));

        let (reason, message) = map_cloudflare_error(&CloudflareError::InvalidCredentials {
            secret: "apps/cf".into(),
            reason: "no token".into(),
        });
        assert_eq!(reason, REASON_INVALID_CREDENTIALS);
        assert!(message.contains("apps/cf"));

        let (reason, _) = map_cloudflare_error(&CloudflareError::Transport {
            message: "dns error".into(),
        });
        assert_eq!(reason, REASON_CLOUDFLARE_UNREACHABLE);

        let (reason, message) = map_cloudflare_error(&CloudflareError::Api {
            status: 400,
            code: 9106,
            message: "Missing X-Auth-Key".into(),
        });
        assert_eq!(reason, REASON_CLOUDFLARE_BAD_REQUEST);
        assert!(message.contains("9106"));
    }
}
