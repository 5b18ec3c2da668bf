//! Application configuration.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file: `--config PATH`, or `config.toml` in the platform config
//!    directory (`~/.config/vcpkg-cache/` on Linux)
//! 3. Environment variables prefixed with `VCPKG_CACHE_`
//!    (`VCPKG_CACHE_CACHE_DIR=/srv/cache`)
//! 4. Command-line flags, applied by the caller
//!
//! ```toml
//! packages_dir = "/opt/vcpkg/packages"
//! cache_dir = "/srv/vcpkg-cache"
//! known_triplets = ["x64-linux", "x64-linux-dynamic"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "VCPKG_CACHE_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one subdirectory per installed package.
    pub packages_dir: PathBuf,
    /// Binary cache root.
    pub cache_dir: PathBuf,
    /// Triplets used to split package directory names into port and
    /// triplet. Empty means split at the last underscore.
    pub known_triplets: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            packages_dir: PathBuf::from("vcpkg/packages"),
            cache_dir: PathBuf::from("vcpkg-cache"),
            known_triplets: Vec::new(),
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// `path` overrides the platform default file. An explicit file must
    /// exist; a missing default file is simply skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing or any layer holds
    /// invalid values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        match path {
            Some(path) => {
                if !path.is_file() {
                    anyhow::bail!("Configuration file not found: {}", path.display());
                }
                log::debug!("Loading configuration from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(default_path) = Self::default_path() {
                    if default_path.is_file() {
                        log::debug!("Loading configuration from {}", default_path.display());
                    }
                    figment = figment.merge(Toml::file(default_path));
                }
            }
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]))
            .extract()
            .context("Invalid configuration")
    }

    /// Platform-specific default configuration file.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "vcpkg-cache").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be represented in TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
