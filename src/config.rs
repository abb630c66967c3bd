//! Engine configuration.
//!
//! Read from `phpantom-reflect.toml`.  Every field has a default, so an
//! empty file (or no file at all) is a valid configuration:
//!
//! ```toml
//! record_external_stubs = true
//! max_inheritance_depth = 64
//! file_extensions = ["php", "inc"]
//! ```

use std::path::{Path, PathBuf};

use etcetera::BaseStrategy;
use serde::Deserialize;
use tracing::debug;

use crate::error::Error;

/// Name of the configuration file looked up by [`ReflectConfig::discover`].
pub const CONFIG_FILE_NAME: &str = "phpantom-reflect.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReflectConfig {
    /// Register undeclared ancestor names as external stubs.
    pub record_external_stubs: bool,
    /// Upper bound on nested composition while walking ancestors.
    pub max_inheritance_depth: usize,
    /// File extensions picked up when walking directories.
    pub file_extensions: Vec<String>,
}

impl Default for ReflectConfig {
    fn default() -> Self {
        Self {
            record_external_stubs: true,
            max_inheritance_depth: 64,
            file_extensions: vec!["php".to_string()],
        }
    }
}

impl ReflectConfig {
    /// Parse a configuration file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|reason| Error::Config {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Parse configuration text.
    pub fn parse(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        if config.max_inheritance_depth == 0 {
            return Err("max_inheritance_depth must be at least 1".to_string());
        }
        Ok(config)
    }

    /// Load the first configuration file found in the working directory
    /// or the user configuration directory, or the defaults.
    pub fn discover() -> Result<Self, Error> {
        match Self::candidate_paths().into_iter().find(|p| p.is_file()) {
            Some(path) => {
                debug!("loading configuration from {}", path.display());
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE_NAME));
        }
        if let Ok(strategy) = etcetera::choose_base_strategy() {
            paths.push(strategy.config_dir().join("phpantom").join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Whether `path` has one of the configured extensions.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.file_extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
    }
}
