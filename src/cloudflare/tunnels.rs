// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Tunnel lifecycle, connector tokens and remote ingress configuration.
//!
//! All tunnels are created remotely-managed (`config_src = "cloudflare"`), so
//! their ingress rules live in Cloudflare and `cloudflared` only needs the
//! connector token.

use super::types::{
    CloudflareTunnel, CreateTunnelRequest, TunnelConfiguration, TunnelConfigurationBody,
    TunnelConfigurationResult,
};
use super::CloudflareClient;
use crate::cloudflare_errors::CloudflareError;
use crate::constants::{TUNNEL_CONFIG_SRC_CLOUDFLARE, TUNNEL_SECRET_BYTES};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::RngCore;
use reqwest::Method;
use tracing::info;

fn tunnels_path(account_id: &str) -> String {
    format!("/accounts/{account_id}/cfd_tunnel")
}

fn tunnel_path(account_id: &str, tunnel_id: &str) -> String {
    format!("/accounts/{account_id}/cfd_tunnel/{tunnel_id}")
}

/// Random base64 secret for a new tunnel.
#[must_use]
pub fn generate_tunnel_secret() -> String {
    let mut bytes = [0u8; TUNNEL_SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    BASE64.encode(bytes)
}

impl CloudflareClient {
    /// Find a live (not deleted) tunnel by exact name.
    ///
    /// # Errors
    ///
    /// Fails when the list call fails.
    pub async fn find_tunnel_by_name(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<Option<CloudflareTunnel>, CloudflareError> {
        let tunnels: Vec<CloudflareTunnel> = self
            .get_all(
                &tunnels_path(account_id),
                &[("name", name.to_string()), ("is_deleted", "false".to_string())],
            )
            .await?;

        Ok(tunnels
            .into_iter()
            .find(|t| t.name == name && !t.is_deleted()))
    }

    /// Get a tunnel by id. Deleted tunnels are still returned, with `deleted_at` set.
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the id is unknown.
    pub async fn get_tunnel(
        &self,
        account_id: &str,
        tunnel_id: &str,
    ) -> Result<CloudflareTunnel, CloudflareError> {
        self.get(&tunnel_path(account_id, tunnel_id), &[]).await
    }

    /// Create a remotely-managed tunnel with a freshly generated secret.
    ///
    /// # Errors
    ///
    /// Fails when the create call fails; a duplicate name satisfies
    /// [`CloudflareError::is_already_exists`].
    pub async fn create_tunnel(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<CloudflareTunnel, CloudflareError> {
        let body = CreateTunnelRequest {
            name,
            tunnel_secret: generate_tunnel_secret(),
            config_src: TUNNEL_CONFIG_SRC_CLOUDFLARE,
        };
        let tunnel: CloudflareTunnel = self
            .send(Method::POST, &tunnels_path(account_id), &body)
            .await?;
        info!(account = %account_id, tunnel = %name, tunnel_id = %tunnel.id, "Created Cloudflare tunnel");
        Ok(tunnel)
    }

    /// Delete a tunnel. Active connections must be cleaned up first.
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the tunnel no longer exists.
    pub async fn delete_tunnel(&self, account_id: &str, tunnel_id: &str) -> Result<(), CloudflareError> {
        self.delete(&tunnel_path(account_id, tunnel_id)).await?;
        info!(account = %account_id, tunnel_id = %tunnel_id, "Deleted Cloudflare tunnel");
        Ok(())
    }

    /// Drop stale connector connections so the tunnel can be deleted.
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the tunnel no longer exists.
    pub async fn cleanup_tunnel_connections(
        &self,
        account_id: &str,
        tunnel_id: &str,
    ) -> Result<(), CloudflareError> {
        self.delete(&format!("{}/connections", tunnel_path(account_id, tunnel_id)))
            .await
    }

    /// Connector token `cloudflared` runs with.
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the tunnel no longer exists.
    pub async fn get_tunnel_token(
        &self,
        account_id: &str,
        tunnel_id: &str,
    ) -> Result<String, CloudflareError> {
        self.get(&format!("{}/token", tunnel_path(account_id, tunnel_id)), &[])
            .await
    }

    /// Current remote ingress configuration and its version.
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the tunnel no longer exists.
    pub async fn get_tunnel_configuration(
        &self,
        account_id: &str,
        tunnel_id: &str,
    ) -> Result<TunnelConfigurationResult, CloudflareError> {
        self.get(
            &format!("{}/configurations", tunnel_path(account_id, tunnel_id)),
            &[],
        )
        .await
    }

    /// Replace the remote ingress configuration. Returns the new configuration version.
    ///
    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the tunnel no longer exists.
    pub async fn put_tunnel_configuration(
        &self,
        account_id: &str,
        tunnel_id: &str,
        config: &TunnelConfiguration,
    ) -> Result<Option<i64>, CloudflareError> {
        let result: TunnelConfigurationResult = self
            .send(
                Method::PUT,
                &format!("{}/configurations", tunnel_path(account_id, tunnel_id)),
                &TunnelConfigurationBody { config },
            )
            .await?;
        Ok(result.version)
    }
}

#[cfg(test)]
#[path = "tunnels_tests.rs"]
mod tunnels_tests;
