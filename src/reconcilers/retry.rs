// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Backoff schedules, and retrying of Kubernetes calls made by reconcilers.
//!
//! A schedule starts at `initial`, doubles after every attempt up to
//! `max_interval`, and gives up once `budget` has passed since the first
//! attempt. Every wait is spread by ±10% so workers hitting the same API do
//! not retry in lockstep.
//!
//! The Cloudflare client uses [`CLOUDFLARE_BACKOFF`]; [`retry_api_call`] uses
//! [`KUBE_BACKOFF`].

use anyhow::{anyhow, Result};
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Growth factor between two consecutive waits.
const GROWTH: f64 = 2.0;

/// Relative spread applied to every wait.
const JITTER: f64 = 0.1;

/// Shape of a backoff schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// First wait.
    pub initial: Duration,
    /// Longest single wait.
    pub max_interval: Duration,
    /// Total time after which no further attempt is made.
    pub budget: Duration,
}

/// Kubernetes API calls: 100ms doubling to 30s, for at most 5 minutes.
pub const KUBE_BACKOFF: BackoffPolicy = BackoffPolicy {
    initial: Duration::from_millis(100),
    max_interval: Duration::from_secs(30),
    budget: Duration::from_secs(300),
};

/// Cloudflare API calls: 50ms doubling to 10s, for at most 2 minutes.
///
/// A reconcile stuck on Cloudflare for longer is requeued rather than held.
pub const CLOUDFLARE_BACKOFF: BackoffPolicy = BackoffPolicy {
    initial: Duration::from_millis(50),
    max_interval: Duration::from_secs(10),
    budget: Duration::from_secs(120),
};

impl BackoffPolicy {
    /// Begin a schedule now.
    #[must_use]
    pub fn start(self) -> Backoff {
        Backoff {
            policy: self,
            next: self.initial,
            started: Instant::now(),
            jitter: JITTER,
        }
    }
}

/// A running backoff schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    next: Duration,
    started: Instant,
    jitter: f64,
}

impl Backoff {
    /// Wait before the next attempt, or `None` once the budget is spent.
    pub fn next_backoff(&mut self) -> Option<Duration> {
        if self.started.elapsed() >= self.policy.budget {
            return None;
        }

        let wait = self.next;
        self.next = Duration::from_secs_f64(wait.as_secs_f64() * GROWTH).min(self.policy.max_interval);
        Some(spread(wait, self.jitter))
    }

    /// Time since the schedule started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[cfg(test)]
    pub(crate) fn without_jitter(mut self) -> Self {
        self.jitter = 0.0;
        self
    }
}

fn spread(wait: Duration, jitter: f64) -> Duration {
    if jitter == 0.0 {
        return wait;
    }
    let secs = wait.as_secs_f64();
    let delta = secs * jitter;
    let spread = rand::thread_rng().gen_range((secs - delta)..=(secs + delta));
    Duration::from_secs_f64(spread.max(0.0))
}

/// Run `operation` until it succeeds, retrying throttling (429), server
/// errors (5xx) and connection failures on the [`KUBE_BACKOFF`] schedule.
///
/// # Errors
///
/// Returns the first error that is not retryable, or the last one once the
/// budget is spent.
pub async fn retry_api_call<T, F, Fut>(mut operation: F, what: &str) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut backoff = KUBE_BACKOFF.start();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation = what, attempt = attempt, "Kubernetes call succeeded after retrying");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_retryable_error(&err) {
            return Err(err.into());
        }
        let Some(wait) = backoff.next_backoff() else {
            error!(operation = what, attempt = attempt, elapsed = ?backoff.elapsed(), error = %err, "Giving up on Kubernetes call");
            return Err(anyhow!("{what} failed after {attempt} attempts: {err}"));
        };
        warn!(operation = what, attempt = attempt, wait = ?wait, error = %err, "Kubernetes call failed, retrying");
        tokio::time::sleep(wait).await;
    }
}

/// Throttling, server errors and connection failures are transient. Not
/// found and conflicts are answers the caller has to handle.
pub(crate) fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::Api(status) => status.code == 429 || (500..600).contains(&status.code),
        kube::Error::Service(_) => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod retry_tests;
