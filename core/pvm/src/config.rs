//! Settings for catalog retrieval and downloads.
//!
//! Values come from three layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. `<root>/config.toml`
//! 3. The `PVM_DIST_SERVER` environment variable
//!
//! ```toml
//! # ~/.pvm/config.toml
//! dist_server = "https://windows.php.net"
//! connect_timeout_secs = 30
//! read_timeout_secs = 60
//! catalog_ttl_secs = 900
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::error::{PvmError, Result};
use crate::paths::PvmPaths;

/// Environment variable to override the distribution server URL.
pub const DIST_SERVER_ENV: &str = "PVM_DIST_SERVER";

/// Default distribution server URL.
pub const DEFAULT_DIST_SERVER: &str = "https://windows.php.net";

/// Effective configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL for the version listing and relative download links.
    pub dist_server: String,
    /// Seconds allowed for establishing a connection.
    pub connect_timeout_secs: u64,
    /// Seconds a single read may stall before the transfer is aborted.
    pub read_timeout_secs: u64,
    /// Seconds a cached catalog stays fresh.
    pub catalog_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dist_server: DEFAULT_DIST_SERVER.to_string(),
            connect_timeout_secs: 30,
            read_timeout_secs: 60,
            catalog_ttl_secs: 15 * 60,
        }
    }
}

impl Config {
    /// Loads `config.toml` from the pvm root and applies environment overrides.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PvmError::Config`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(paths: &PvmPaths) -> Result<Self> {
        let file = paths.config_file();
        let config = if file.exists() {
            debug!("Loading config from {}", file.display());
            let content = std::fs::read_to_string(&file).map_err(|e| PvmError::Config {
                path: file.clone(),
                message: e.to_string(),
            })?;
            Self::from_toml(&content, &file)?
        } else {
            Self::default()
        };

        Ok(config.with_dist_server_override(std::env::var(DIST_SERVER_ENV).ok()))
    }

    /// Parses configuration from TOML text. `origin` is used in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`PvmError::Config`] on malformed TOML or unknown keys.
    pub fn from_toml(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| PvmError::Config {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Replaces the distribution server unless `value` is empty or whitespace.
    #[must_use]
    pub fn with_dist_server_override(mut self, value: Option<String>) -> Self {
        if let Some(server) = value.filter(|s| !s.trim().is_empty()) {
            self.dist_server = server;
        }
        self
    }

    /// The distribution server without surrounding whitespace or trailing `/`.
    #[must_use]
    pub fn dist_server(&self) -> &str {
        self.dist_server.trim().trim_end_matches('/')
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    #[must_use]
    pub fn catalog_ttl(&self) -> Duration {
        Duration::from_secs(self.catalog_ttl_secs)
    }
}
