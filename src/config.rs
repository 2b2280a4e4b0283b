//! Configuration management
//!
//! Settings come from, in increasing priority:
//! - Defaults
//! - A configuration file (TOML)
//! - Command-line arguments, applied by the CLI on top of the loaded config

use crate::codegen::{GenerateOptions, Target};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Code generation defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Target language
    #[serde(default)]
    pub target: Target,

    /// Wrap generated machines in a read/write lock
    #[serde(default)]
    pub concurrency_safe: bool,

    /// Package name for generated Go code. Overrides the definition's `package`;
    /// a `--package` flag overrides this in turn.
    pub package: Option<String>,
}

/// Report output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    /// Report format (text, json)
    #[serde(default = "default_format")]
    pub format: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_format() -> String {
    "text".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::config(format!("Failed to read config file {:?}: {}", path, e)))?;

        let config = Self::from_toml(&contents)
            .map_err(|e| Error::config(format!("Failed to parse config file {:?}: {}", path, e)))?;
        config.check()?;
        Ok(config)
    }

    /// Reject values serde accepts but nothing downstream can use
    fn check(&self) -> Result<()> {
        crate::ensure!(
            matches!(self.output.format.as_str(), "text" | "json"),
            "Unknown output format {:?} (expected text or json)",
            self.output.format
        );
        crate::ensure!(
            tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_ok(),
            "Invalid log level {:?}",
            self.logging.level
        );
        Ok(())
    }

    fn from_toml(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Load configuration from default locations
    ///
    /// Searches in order:
    /// 1. ./fsmgen.toml
    /// 2. ~/.fsmgen/config.toml
    /// 3. /etc/fsmgen/config.toml
    pub fn load() -> Result<Self> {
        for path in Self::search_paths() {
            if path.exists() {
                tracing::debug!("Loading config from {:?}", path);
                return Self::from_file(path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(Config::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("fsmgen.toml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".fsmgen").join("config.toml"));
        }
        paths.push(Path::new("/etc/fsmgen").join("config.toml"));
        paths
    }

    /// Generator options from the `[generator]` section
    pub fn generate_options(&self) -> GenerateOptions {
        GenerateOptions {
            target: self.generator.target,
            concurrency_safe: self.generator.concurrency_safe,
            package: self.generator.package.clone(),
        }
    }
}
