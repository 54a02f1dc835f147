// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `retry.rs`

#[cfg(test)]
mod tests {
    use super::super::{
        is_retryable_error, retry_api_call, BackoffPolicy, CLOUDFLARE_BACKOFF, KUBE_BACKOFF,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    const MS: Duration = Duration::from_millis(1);

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(
            kube::core::Status::failure(&format!("status {code}"), "Test")
                .with_code(code)
                .boxed(),
        )
    }

    #[test]
    fn test_cloudflare_gives_up_sooner_than_kubernetes() {
        assert!(CLOUDFLARE_BACKOFF.initial < KUBE_BACKOFF.initial);
        assert!(CLOUDFLARE_BACKOFF.max_interval < KUBE_BACKOFF.max_interval);
        assert_eq!(CLOUDFLARE_BACKOFF.budget, Duration::from_secs(120));
        assert_eq!(KUBE_BACKOFF.budget, Duration::from_secs(300));
    }

    #[test]
    fn test_waits_double_up_to_the_cap() {
        let policy = BackoffPolicy {
            initial: MS * 100,
            max_interval: MS * 350,
            budget: Duration::from_secs(60),
        };
        let mut backoff = policy.start().without_jitter();

        let waits: Vec<_> = (0..4).filter_map(|_| backoff.next_backoff()).collect();
        assert_eq!(waits, vec![MS * 100, MS * 200, MS * 350, MS * 350]);
    }

    #[test]
    fn test_waits_are_spread_by_ten_percent() {
        for _ in 0..50 {
            let first = CLOUDFLARE_BACKOFF.start().next_backoff().unwrap();
            assert!(first >= MS * 45 && first <= MS * 55, "{first:?}");
        }
    }

    #[test]
    fn test_spent_budget_stops_the_schedule() {
        let policy = BackoffPolicy {
            initial: MS * 10,
            max_interval: MS * 10,
            budget: Duration::ZERO,
        };
        assert_eq!(policy.start().next_backoff(), None);
    }

    #[test]
    fn test_kube_error_classification() {
        assert!(is_retryable_error(&api_error(429)));
        assert!(is_retryable_error(&api_error(503)));
        assert!(!is_retryable_error(&api_error(404)));
        assert!(!is_retryable_error(&api_error(409)));

        let refused: Box<dyn std::error::Error + Send + Sync> = Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert!(is_retryable_error(&kube::Error::Service(refused)));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let calls = AtomicU32::new(0);
        let result = retry_api_call(
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(api_error(503))
                    } else {
                        Ok("done")
                    }
                }
            },
            "delete CloudflareSyncState",
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_not_found_is_returned_at_once() {
        let calls = AtomicU32::new(0);
        let result: anyhow::Result<()> = retry_api_call(
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(api_error(404)) }
            },
            "delete CloudflareSyncState",
        )
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err.downcast_ref::<kube::Error>(), Some(kube::Error::Api(ae)) if ae.code == 404));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
