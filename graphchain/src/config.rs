// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Graph and store configuration
//!
//! Both are plain serde structs with defaults; they can be built in code or
//! loaded from JSON files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Store backend type
///
/// Only the in-memory store ships with this crate; other backends plug in
/// through the `Store` trait.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    /// Memory - In-memory storage with ingest aggregation
    #[default]
    Memory,
}

impl std::str::FromStr for StoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreType::Memory),
            _ => Err(format!("Unknown store type: {}. Valid options: memory", s)),
        }
    }
}

impl std::fmt::Display for StoreType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StoreType::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

fn default_page_size() -> usize {
    1000
}

fn default_max_sort_size() -> usize {
    1_000_000
}

/// Backend settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreProperties {
    #[serde(default)]
    pub store_type: StoreType,
    /// Elements fetched per page by store cursors
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Upper bound on elements a Sort without a result limit may buffer
    #[serde(default = "default_max_sort_size")]
    pub max_sort_size: usize,
}

impl Default for StoreProperties {
    fn default() -> Self {
        Self {
            store_type: StoreType::default(),
            page_size: default_page_size(),
            max_sort_size: default_max_sort_size(),
        }
    }
}

impl StoreProperties {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let properties: StoreProperties = serde_json::from_str(json)?;
        properties.validate()?;
        Ok(properties)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&read_file(path.as_ref())?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_size == 0 {
            return Err(ConfigError::Invalid("pageSize must be at least 1".to_string()));
        }
        if self.max_sort_size == 0 {
            return Err(ConfigError::Invalid("maxSortSize must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Graph identity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GraphConfig {
    pub graph_id: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            graph_id: "graph".to_string(),
            description: None,
        }
    }
}

impl GraphConfig {
    pub fn new(graph_id: impl Into<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            description: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: GraphConfig = serde_json::from_str(json)?;
        if config.graph_id.trim().is_empty() {
            return Err(ConfigError::Invalid("graphId must not be empty".to_string()));
        }
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json(&read_file(path.as_ref())?)
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}
