use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use blobcache_types::CacheConfig;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub cache: CacheConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8898".parse().expect("valid default bind addr"),
            cache: CacheConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| ServerError::Config(e.to_string()))
    }
}
