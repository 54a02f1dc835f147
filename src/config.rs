// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Operator command-line and environment configuration.
//!
//! Every flag can also be set through its environment variable, which is how
//! the Deployment manifest configures the operator.

use crate::constants::{
    DEFAULT_CLOUDFLARE_API_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_METRICS_BIND_ADDRESS,
    DEFAULT_SYNC_DEBOUNCE_MILLIS, DEFAULT_SYNC_MAX_WAIT_MILLIS,
};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Runtime configuration of the operator.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct OperatorConfig {
    /// Base URL of the Cloudflare v4 API
    #[arg(long, env = "CLOUDFLARE_API_URL", default_value = DEFAULT_CLOUDFLARE_API_URL)]
    pub cloudflare_api_url: String,

    /// Quiet period before a CloudflareSyncState is pushed to Cloudflare (milliseconds)
    #[arg(long, env = "SYNC_DEBOUNCE_MS", default_value_t = DEFAULT_SYNC_DEBOUNCE_MILLIS)]
    pub sync_debounce_ms: u64,

    /// Longest a burst of source writes can postpone a push (milliseconds)
    #[arg(long, env = "SYNC_MAX_WAIT_MS", default_value_t = DEFAULT_SYNC_MAX_WAIT_MILLIS)]
    pub sync_max_wait_ms: u64,

    /// Bind address of the metrics and health server
    #[arg(long, env = "METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    pub metrics_bind_address: SocketAddr,

    /// Timeout of a single Cloudflare API request (seconds)
    #[arg(long, env = "CLOUDFLARE_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    pub http_timeout_secs: u64,
}

impl OperatorConfig {
    #[must_use]
    pub fn sync_debounce(&self) -> Duration {
        Duration::from_millis(self.sync_debounce_ms)
    }

    /// Max wait is never shorter than the debounce delay.
    #[must_use]
    pub fn sync_max_wait(&self) -> Duration {
        Duration::from_millis(self.sync_max_wait_ms.max(self.sync_debounce_ms))
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            cloudflare_api_url: DEFAULT_CLOUDFLARE_API_URL.to_string(),
            sync_debounce_ms: DEFAULT_SYNC_DEBOUNCE_MILLIS,
            sync_max_wait_ms: DEFAULT_SYNC_MAX_WAIT_MILLIS,
            metrics_bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
