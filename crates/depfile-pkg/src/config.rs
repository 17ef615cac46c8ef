//! Loader configuration (`depfile.toml`).
//!
//! ```toml
//! [loader]
//! strict-options = true
//! strict-generators = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The configuration filename looked up next to a manifest.
pub const CONFIG_FILE: &str = "depfile.toml";

/// Errors that can occur when reading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Validation settings for manifest loading.
    #[serde(default)]
    pub loader: LoaderConfig,
}

/// How strictly manifests are validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct LoaderConfig {
    /// Reject options aimed at packages the manifest does not depend on.
    #[serde(default)]
    pub strict_options: bool,

    /// Reject generators outside the known set.
    #[serde(default)]
    pub strict_generators: bool,
}

impl LoaderConfig {
    /// Everything enabled.
    pub fn strict() -> Self {
        Self {
            strict_options: true,
            strict_generators: true,
        }
    }
}

impl Config {
    /// Load a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `depfile.toml` from `dir` if present, otherwise the defaults.
    pub fn discover(dir: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = dir.as_ref().join(CONFIG_FILE);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "using loader config");
            Self::from_path(path)
        } else {
            Ok(Self::default())
        }
    }
}
