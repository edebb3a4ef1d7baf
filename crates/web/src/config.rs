//! Web service configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Web service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// HTTP listen address
    pub listen: String,

    /// TOML file with `[[experiments]]` tables. Built-in experiments are
    /// served when unset.
    pub experiments_file: Option<PathBuf>,

    /// Allow any origin to call the API (the tracking script runs on
    /// third-party pages)
    pub cors_permissive: bool,

    /// Tracking collector configuration
    pub tracking: TrackingConfig,

    /// Page extraction service configuration
    pub extraction: ExtractionConfig,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3000".to_string(),
            experiments_file: None,
            cors_permissive: true,
            tracking: TrackingConfig::default(),
            extraction: ExtractionConfig::default(),
        }
    }
}

/// Tracking collector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Collector endpoint. Events are only logged when unset.
    pub collector_url: Option<String>,

    /// Request timeout for the collector
    pub timeout_secs: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            collector_url: None,
            timeout_secs: 5,
        }
    }
}

/// Page extraction service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Base URL of the extraction service. `/api/extract` answers 503 when
    /// unset.
    pub service_url: Option<String>,

    /// Request timeout for the extraction service
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            service_url: None,
            timeout_secs: 30,
        }
    }
}

impl WebConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {:?}: {}", self.listen, e))
    }
}
