// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod tests {
    use crate::config::OperatorConfig;
    use crate::constants::DEFAULT_CLOUDFLARE_API_URL;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn test_defaults_match_default_impl() {
        let parsed = OperatorConfig::try_parse_from(["cloudflare-operator"]).unwrap();
        assert_eq!(parsed.cloudflare_api_url, DEFAULT_CLOUDFLARE_API_URL);
        assert_eq!(parsed.sync_debounce(), Duration::from_millis(500));
        assert_eq!(parsed.sync_max_wait(), Duration::from_secs(5));
        assert_eq!(parsed.http_timeout(), Duration::from_secs(30));
        assert_eq!(parsed.metrics_bind_address.port(), 8080);
        assert_eq!(parsed, OperatorConfig::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let parsed = OperatorConfig::try_parse_from([
            "cloudflare-operator",
            "--cloudflare-api-url",
            "http://127.0.0.1:9999/client/v4",
            "--sync-debounce-ms",
            "100",
            "--sync-max-wait-ms",
            "1000",
            "--metrics-bind-address",
            "127.0.0.1:9090",
        ])
        .unwrap();
        assert_eq!(parsed.cloudflare_api_url, "http://127.0.0.1:9999/client/v4");
        assert_eq!(parsed.sync_debounce(), Duration::from_millis(100));
        assert_eq!(parsed.sync_max_wait(), Duration::from_secs(1));
        assert_eq!(parsed.metrics_bind_address.port(), 9090);
    }

    #[test]
    fn test_max_wait_never_below_debounce() {
        let config = OperatorConfig {
            sync_debounce_ms: 2_000,
            sync_max_wait_ms: 100,
            ..OperatorConfig::default()
        };
        assert_eq!(config.sync_max_wait(), Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_bind_address_is_rejected() {
        let result = OperatorConfig::try_parse_from([
            "cloudflare-operator",
            "--metrics-bind-address",
            "not-an-address",
        ]);
        assert!(result.is_err());
    }
}
