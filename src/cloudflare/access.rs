// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Access application CRUD.

use super::types::{AccessApp, AccessAppRequest};
use super::CloudflareClient;
use crate::cloudflare_errors::CloudflareError;
use reqwest::Method;
use tracing::info;

fn apps_path(account_id: &str) -> String {
    format!("/accounts/{account_id}/access/apps")
}

fn app_path(account_id: &str, app_id: &str) -> String {
    format!("/accounts/{account_id}/access/apps/{app_id}")
}

impl CloudflareClient {
    /// # Errors
    ///
    /// Fails when any page of the list call fails.
    pub async fn list_access_applications(
        &self,
        account_id: &str,
    ) -> Result<Vec<AccessApp>, CloudflareError> {
        self.get_all(&apps_path(account_id), &[]).await
    }

    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the application no longer exists.
    pub async fn get_access_application(
        &self,
        account_id: &str,
        app_id: &str,
    ) -> Result<AccessApp, CloudflareError> {
        self.get(&app_path(account_id, app_id), &[]).await
    }

    /// # Errors
    ///
    /// Fails when the create call fails.
    pub async fn create_access_application(
        &self,
        account_id: &str,
        app: &AccessAppRequest,
    ) -> Result<AccessApp, CloudflareError> {
        let created: AccessApp = self.send(Method::POST, &apps_path(account_id), app).await?;
        info!(account = %account_id, domain = %created.domain, app_id = %created.id, "Created Access application");
        Ok(created)
    }

    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the application no longer exists.
    pub async fn update_access_application(
        &self,
        account_id: &str,
        app_id: &str,
        app: &AccessAppRequest,
    ) -> Result<AccessApp, CloudflareError> {
        let updated: AccessApp = self
            .send(Method::PUT, &app_path(account_id, app_id), app)
            .await?;
        info!(account = %account_id, app_id = %app_id, "Updated Access application");
        Ok(updated)
    }

    /// # Errors
    ///
    /// Returns [`CloudflareError::NotFound`] when the application no longer exists.
    pub async fn delete_access_application(
        &self,
        account_id: &str,
        app_id: &str,
    ) -> Result<(), CloudflareError> {
        self.delete(&app_path(account_id, app_id)).await?;
        info!(account = %account_id, app_id = %app_id, "Deleted Access application");
        Ok(())
    }
}
