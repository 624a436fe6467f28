// Copyright (c) 2025 - Cowboy AI, Inc.

//! NetBox DCIM Inventory Adapter
//!
//! Exposes NetBox devices as gateway [`Resource`]s so the polling engine can
//! detect device changes in a backend that has no usable event feed.
//!
//! # Mapping
//!
//! ```text
//! GET /api/dcim/devices/        → ResourceLister::list   (follows `next` pages)
//! GET /api/dcim/devices/{id}/   → ResourceGetter::get
//!
//! device.id           → resource_id
//! device.device_type  → resource_type_id
//! device.site         → resource_pool_id
//! device.asset_tag    → global_asset_id
//! device.name         → description
//! status/serial/role  → extensions
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use infra_gateway::adapters::{NetBoxConfig, NetBoxInventory};
//! use infra_gateway::domain::ResourceLister;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let inventory = NetBoxInventory::new(NetBoxConfig {
//!         base_url: "http://netbox.local".to_string(),
//!         api_token: "your-token-here".to_string(),
//!         ..Default::default()
//!     })?;
//!
//!     let devices = inventory.list().await?;
//!     println!("{} devices", devices.len());
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::{BackendError, Resource, ResourceGetter, ResourceLister};

/// Configuration for NetBox connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetBoxConfig {
    /// NetBox base URL (e.g., "http://netbox.local")
    pub base_url: String,

    /// API token for authentication
    pub api_token: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Devices requested per page when listing
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_timeout() -> u64 {
    30
}

fn default_page_size() -> u32 {
    250
}

impl Default for NetBoxConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            api_token: String::new(),
            timeout_secs: default_timeout(),
            page_size: default_page_size(),
        }
    }
}

/// Nested object reference as returned by the NetBox API
#[derive(Debug, Clone, Default, Deserialize)]
struct NestedRef {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StatusValue {
    #[serde(default)]
    value: String,
}

/// NetBox device representation (fields the gateway uses)
#[derive(Debug, Clone, Deserialize)]
struct NetBoxDevice {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    device_type: Option<NestedRef>,
    #[serde(default, alias = "device_role")]
    role: Option<NestedRef>,
    #[serde(default)]
    site: Option<NestedRef>,
    #[serde(default)]
    status: Option<StatusValue>,
    #[serde(default)]
    serial: String,
    #[serde(default)]
    asset_tag: Option<String>,
}

impl NetBoxDevice {
    fn into_resource(self) -> Resource {
        let extensions = serde_json::json!({
            "status": self.status.map(|s| s.value).unwrap_or_default(),
            "serial": self.serial,
            "role": self.role.and_then(|r| r.name),
            "model": self.device_type.as_ref().and_then(|t| t.model.clone()),
        });

        Resource {
            resource_id: self.id.to_string(),
            resource_type_id: self
                .device_type
                .map(|t| t.id.to_string())
                .unwrap_or_default(),
            resource_pool_id: self.site.map(|s| s.id.to_string()).unwrap_or_default(),
            global_asset_id: self.asset_tag,
            description: self.name.unwrap_or_default(),
            extensions,
        }
    }
}

/// One page of a NetBox list response
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default)]
    next: Option<String>,
    results: Vec<T>,
}

/// NetBox-backed resource inventory
pub struct NetBoxInventory {
    config: NetBoxConfig,
    client: Client,
}

impl NetBoxInventory {
    /// Create a new NetBox inventory client
    pub fn new(config: NetBoxConfig) -> Result<Self, BackendError> {
        info!("Connecting to NetBox at {}", config.base_url);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    "Authorization",
                    format!("Token {}", config.api_token)
                        .parse()
                        .map_err(|e| BackendError::Unavailable(format!("Invalid API token: {}", e)))?,
                );
                headers.insert(
                    "Accept",
                    "application/json"
                        .parse()
                        .map_err(|e| BackendError::Unavailable(format!("Invalid header: {}", e)))?,
                );
                headers
            })
            .build()
            .map_err(|e| {
                BackendError::Unavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn devices_url(&self) -> String {
        format!(
            "{}/api/dcim/devices/?limit={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.page_size
        )
    }

    fn device_url(&self, resource_id: &str) -> String {
        format!(
            "{}/api/dcim/devices/{}/",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(resource_id)
        )
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, BackendError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BackendError::Unavailable(format!("NetBox API error: {}", e)))?;

        match response.status() {
            status if status.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| BackendError::InvalidResponse(e.to_string())),
            StatusCode::NOT_FOUND => Err(BackendError::NotFound(url.to_string())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(BackendError::Unavailable(format!(
                    "NetBox API returned {}: {}",
                    status, body
                )))
            }
        }
    }

    /// Verify connectivity by checking API status
    pub async fn health_check(&self) -> Result<(), BackendError> {
        let url = format!("{}/api/status/", self.config.base_url.trim_end_matches('/'));
        self.fetch::<serde_json::Value>(&url).await.map(|_| {
            debug!("NetBox health check passed");
        })
    }
}

#[async_trait]
impl ResourceLister for NetBoxInventory {
    async fn list(&self) -> Result<Vec<Resource>, BackendError> {
        let mut resources = Vec::new();
        let mut next = Some(self.devices_url());

        while let Some(url) = next {
            let page: Page<NetBoxDevice> = self.fetch(&url).await?;
            resources.extend(page.results.into_iter().map(NetBoxDevice::into_resource));
            next = page.next;
        }

        debug!(devices = resources.len(), "Listed NetBox devices");
        Ok(resources)
    }
}

#[async_trait]
impl ResourceGetter for NetBoxInventory {
    async fn get(&self, resource_id: &str) -> Result<Resource, BackendError> {
        match self.fetch::<NetBoxDevice>(&self.device_url(resource_id)).await {
            Err(BackendError::NotFound(_)) => Err(BackendError::NotFound(resource_id.to_string())),
            other => other.map(NetBoxDevice::into_resource),
        }
    }
}
