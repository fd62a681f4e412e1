//! Configuration file support.
//!
//! Ampoule reads two configuration file locations:
//! - Global: `~/.ampoule/config.toml` - user-wide defaults
//! - Project: `.ampoule/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config, and command-line
//! flags take precedence over both. Toolchain paths configured here take
//! precedence over the `CC`/`CXX`/`CXXFLAGS` environment variables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::options::LogLevel;

/// Ampoule configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Packaging defaults
    pub build: BuildConfig,

    /// Compiler overrides
    pub toolchain: ToolchainConfig,
}

/// Packaging defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default Ruby version
    pub ruby: Option<String>,

    /// Default packaging prefix
    pub prefix: Option<String>,

    /// Default log level for the image tooling
    #[serde(rename = "log-level")]
    pub log_level: Option<LogLevel>,
}

/// Compiler overrides for the setup/press builds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Path to the C compiler (e.g., /usr/bin/clang)
    pub cc: Option<PathBuf>,

    /// Path to the C++ compiler (e.g., /usr/bin/clang++)
    pub cxx: Option<PathBuf>,

    /// Additional C++ compiler flags
    #[serde(default)]
    pub cxxflags: Vec<String>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing
    /// or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.ruby.is_some() {
            self.build.ruby = other.build.ruby;
        }
        if other.build.prefix.is_some() {
            self.build.prefix = other.build.prefix;
        }
        if other.build.log_level.is_some() {
            self.build.log_level = other.build.log_level;
        }
        if other.toolchain.cc.is_some() {
            self.toolchain.cc = other.toolchain.cc;
        }
        if other.toolchain.cxx.is_some() {
            self.toolchain.cxx = other.toolchain.cxx;
        }
        if !other.toolchain.cxxflags.is_empty() {
            self.toolchain.cxxflags = other.toolchain.cxxflags;
        }
    }
}

/// Get the global ampoule config directory (~/.ampoule).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".ampoule"))
}

/// Get the global config path (~/.ampoule/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (<root>/.ampoule/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".ampoule").join("config.toml")
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.ampoule/config.toml)
/// 2. Global config (~/.ampoule/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}
