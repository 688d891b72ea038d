//! Configuration file support for the sffs CLI.
//!
//! The file is optional and selected with `--config PATH` or `SFFS_CONFIG`.
//! Its `[mount]` table is deserialized straight into
//! [`MountConfig`]; anything left out keeps its default.
//!
//! # Example configuration
//!
//! ```toml
//! [mount]
//! uid = 501
//! gid = 20
//! file_mask = 0o022
//! attr_ttl = "2s"
//! negative_ttl = "250ms"
//! segment_size = 4096
//! lookup_mode = "provider"
//! well_known_name = "guest.ready"
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sffs_core::MountConfig;

/// Main configuration structure
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Mount options passed to the adapter
    #[serde(default)]
    pub mount: MountConfig,
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Invalid configuration file")?;
        config.mount.validate().context("Invalid mount options")?;
        Ok(config)
    }

    /// Load the configuration at `path`, or the defaults when none is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::parse(&text)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }
}
