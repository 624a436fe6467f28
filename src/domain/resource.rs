// Copyright (c) 2025 - Cowboy AI, Inc.
//! Common resource model and backend collaborator traits
//!
//! Every backend adapter translates its native inventory into [`Resource`]
//! values and exposes them through [`ResourceLister`] and [`ResourceGetter`].
//! The change-detection engine only ever talks to these two traits.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A backend resource in the gateway's uniform model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Stable identifier, unique within one backend
    pub resource_id: String,

    #[serde(default)]
    pub resource_type_id: String,

    #[serde(default)]
    pub resource_pool_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_asset_id: Option<String>,

    #[serde(default)]
    pub description: String,

    /// Vendor-specific attributes
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub extensions: serde_json::Value,
}

impl Resource {
    pub fn new(
        resource_id: impl Into<String>,
        resource_type_id: impl Into<String>,
        resource_pool_id: impl Into<String>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            resource_type_id: resource_type_id.into(),
            resource_pool_id: resource_pool_id.into(),
            global_asset_id: None,
            description: String::new(),
            extensions: serde_json::Value::Null,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_extensions(mut self, extensions: serde_json::Value) -> Self {
        self.extensions = extensions;
        self
    }
}

/// Errors reported by backend adapters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Backend could not be reached or refused the request
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Requested resource does not exist
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Backend answered with something we could not interpret
    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

/// Lists a backend's current resource inventory
#[async_trait]
pub trait ResourceLister: Send + Sync {
    async fn list(&self) -> Result<Vec<Resource>, BackendError>;
}

/// Fetches one resource's current detail
#[async_trait]
pub trait ResourceGetter: Send + Sync {
    async fn get(&self, resource_id: &str) -> Result<Resource, BackendError>;
}
