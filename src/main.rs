// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use cloudflare_operator::{
    config::OperatorConfig,
    constants::{HEALTH_SERVER_PATH, METRICS_SERVER_PATH, TOKIO_WORKER_THREADS},
    context::{Context, Stores},
    controller::{
        run_access_application_controller, run_dns_record_controller, run_reflector,
        run_sync_state_controller, run_tunnel_binding_controller, run_tunnel_controller,
    },
    crd::{CloudflareSyncState, Tunnel, TunnelBinding},
    metrics,
};
use kube::runtime::reflector;
use kube::{Api, Client};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};

fn main() -> Result<()> {
    // Both ring and aws-lc-rs are linked in, so rustls cannot pick a default
    // provider on its own. Install one before any TLS client is built.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("CRITICAL: failed to install the rustls crypto provider");
    }

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("cloudflare-operator")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

fn init_logging() {
    // Format: timestamp file:line LEVEL message
    //
    // Respects RUST_LOG (default: info) and RUST_LOG_FORMAT (text or json)
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main() -> Result<()> {
    init_logging();
    let config = OperatorConfig::parse();

    info!("Starting Cloudflare operator");
    debug!(config = ?config, "Loaded configuration");

    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let (tunnels, tunnel_writer) = reflector::store::<Tunnel>();
    let (tunnel_bindings, binding_writer) = reflector::store::<TunnelBinding>();
    let (sync_states, sync_state_writer) = reflector::store::<CloudflareSyncState>();

    let stores = Stores {
        tunnels,
        tunnel_bindings,
        sync_states,
    };
    let metrics_addr = config.metrics_bind_address;
    let context = Arc::new(Context::new(client.clone(), stores, config)?);

    info!("Starting all controllers");

    // Controllers should never exit - if one does, log it and exit the process
    tokio::select! {
        () = run_reflector(Api::<Tunnel>::all(client.clone()), tunnel_writer) => {
            anyhow::bail!("Tunnel reflector exited unexpectedly")
        }
        () = run_reflector(Api::<TunnelBinding>::all(client.clone()), binding_writer) => {
            anyhow::bail!("TunnelBinding reflector exited unexpectedly")
        }
        () = run_reflector(Api::<CloudflareSyncState>::all(client.clone()), sync_state_writer) => {
            anyhow::bail!("CloudflareSyncState reflector exited unexpectedly")
        }
        result = run_tunnel_controller(context.clone()) => {
            error!("CRITICAL: Tunnel controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Tunnel controller exited unexpectedly without error")
        }
        result = run_tunnel_binding_controller(context.clone()) => {
            error!("CRITICAL: TunnelBinding controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("TunnelBinding controller exited unexpectedly without error")
        }
        result = run_dns_record_controller(context.clone()) => {
            error!("CRITICAL: DNSRecord controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("DNSRecord controller exited unexpectedly without error")
        }
        result = run_access_application_controller(context.clone()) => {
            error!("CRITICAL: AccessApplication controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("AccessApplication controller exited unexpectedly without error")
        }
        result = run_sync_state_controller(context.clone()) => {
            error!("CRITICAL: CloudflareSyncState controller exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("CloudflareSyncState controller exited unexpectedly without error")
        }
        result = run_metrics_server(metrics_addr) => {
            error!("CRITICAL: metrics server exited: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
        result = shutdown_signal() => {
            result?;
            info!("Graceful shutdown completed successfully");
            Ok(())
        }
    }
}

fn metrics_router() -> Router {
    Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_SERVER_PATH, get(health_handler))
}

/// Serve `/metrics` and `/healthz` on `addr`.
async fn run_metrics_server(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);
    axum::serve(listener, metrics_router()).await?;
    Ok(())
}

async fn metrics_handler() -> (StatusCode, String) {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received SIGINT, initiating graceful shutdown...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM (pod termination), initiating graceful shutdown...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received SIGINT, initiating graceful shutdown...");
    }
    Ok(())
}

#[cfg(test)]
mod main_tests;
