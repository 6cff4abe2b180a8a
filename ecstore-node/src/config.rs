//! Configuration management for the ecstore storage node
//!
//! Supports loading from TOML files with CLI and environment overrides.

use ecstore_network::GrpcServerConfig;
use ecstore_storage::{BackendKind, StorageConfig};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Complete node configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node identity configuration
    #[serde(default)]
    pub node: NodeIdentity,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageSettings,

    /// Network configuration
    #[serde(default)]
    pub network: NetworkSettings,
}

impl NodeConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: NodeConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Validate the configuration, creating the data directory if needed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.network.port == 0 {
            return Err(ConfigError::ValidationError(
                "gRPC port cannot be 0".to_string(),
            ));
        }

        self.network.bind_address.parse::<IpAddr>().map_err(|e| {
            ConfigError::ValidationError(format!(
                "Invalid bind address {:?}: {}",
                self.network.bind_address, e
            ))
        })?;

        if self.storage.backend == BackendKind::Sled {
            let dir = self.data_dir();
            if !dir.exists() {
                std::fs::create_dir_all(&dir).map_err(|e| {
                    ConfigError::ValidationError(format!(
                        "Cannot create data directory {:?}: {}",
                        dir, e
                    ))
                })?;
            }
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        data_dir: Option<PathBuf>,
        port: Option<u16>,
        memory: bool,
    ) -> Self {
        if let Some(dir) = data_dir {
            self.storage.data_dir = Some(dir);
        }
        if let Some(p) = port {
            self.network.port = p;
        }
        if memory {
            self.storage.backend = BackendKind::Memory;
        }
        self
    }

    /// Directory fragments are kept in
    ///
    /// Defaults to `storage_{port}` so several nodes can share a working
    /// directory.
    pub fn data_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("storage_{}", self.network.port)))
    }

    /// Settings for the chunk store
    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig::new(self.data_dir())
            .with_max_capacity(self.storage.max_capacity_mb * 1024 * 1024)
            .with_backend(self.storage.backend)
    }

    /// Settings for the gRPC server
    pub fn grpc_config(&self) -> Result<GrpcServerConfig, ConfigError> {
        Ok(GrpcServerConfig::new(self.network.grpc_addr()?)
            .with_max_message_size(self.network.max_message_size_mb * 1024 * 1024))
    }
}

/// Node identity configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeIdentity {
    /// Unique node identifier (generated if not provided)
    #[serde(default = "generate_node_id")]
    pub id: String,

    /// Human-readable node name
    #[serde(default = "default_node_name")]
    pub name: String,
}

impl Default for NodeIdentity {
    fn default() -> Self {
        Self {
            id: generate_node_id(),
            name: default_node_name(),
        }
    }
}

fn generate_node_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_node_name() -> String {
    "ecstore-node".to_string()
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Directory for fragment data (default `storage_{port}`)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Store implementation
    #[serde(default)]
    pub backend: BackendKind,

    /// Maximum capacity in MB (0 = unlimited)
    #[serde(default)]
    pub max_capacity_mb: u64,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    /// Address to bind for gRPC server
    #[serde(default = "default_bind_addr")]
    pub bind_address: String,

    /// gRPC server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum message size in MB
    #[serde(default = "default_max_message_size")]
    pub max_message_size_mb: usize,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_addr(),
            port: default_port(),
            max_message_size_mb: default_max_message_size(),
        }
    }
}

impl NetworkSettings {
    /// Get the gRPC listen address
    pub fn grpc_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.bind_address.parse().map_err(|e| {
            ConfigError::ValidationError(format!(
                "Invalid bind address {:?}: {}",
                self.bind_address, e
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9001
}

fn default_max_message_size() -> usize {
    64
}
