//! Backend health probe over HTTP

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::BackendConfig;
use crate::error::{AppError, Result};

/// Body of the backend's health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HealthReport {
    pub ok: bool,
    /// Compute device the backend runs on, e.g. `cuda` or `cpu`
    #[serde(default)]
    pub device: Option<String>,
    /// Model directory or hub id in use
    #[serde(default)]
    pub using: Option<String>,
    #[serde(default)]
    pub local_dir: Option<String>,
    #[serde(default)]
    pub local_has_model_index: Option<bool>,
}

/// Client for the health endpoint
#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: Client,
    url: String,
}

impl HealthProbe {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.health_timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.health_url()?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the current health report
    pub async fn check(&self) -> Result<HealthReport> {
        debug!(url = %self.url, "Checking backend health");

        let response = self.client.get(&self.url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Backend(format!(
                "Backend returned {}: {}",
                status, body
            )));
        }

        response.json::<HealthReport>().await.map_err(|e| {
            error!(url = %self.url, error = %e, "Failed to parse health response");
            AppError::Backend(format!("Failed to parse health response: {}", e))
        })
    }
}
