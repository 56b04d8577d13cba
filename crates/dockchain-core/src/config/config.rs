//! Profile storage and engine connection settings
//!
//! Configuration is stored in TOML format with one table per named profile:
//!
//! ```toml
//! default_profile = "build-host"
//!
//! [profiles.local]
//! endpoint = "local"
//!
//! [profiles.build-host]
//! endpoint = "http"
//! url = "${BUILD_HOST:-tcp://10.0.0.5:2375}"
//! timeout_secs = 300
//! ```

use bollard::{API_DEFAULT_VERSION, Docker};
#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::error::{ConfigError, Result};
use crate::error::ChainError;

/// Timeout bollard applies to requests when none is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when none is given explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, EngineProfile>,
}

/// One engine a chain can connect to
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EngineProfile {
    /// Where the engine listens (flattened into the profile)
    #[serde(flatten)]
    pub endpoint: Endpoint,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Engine address
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "endpoint", rename_all = "lowercase")]
pub enum Endpoint {
    /// `DOCKER_HOST`, or the platform's default socket
    Local,
    /// Unix socket at `path`
    Unix { path: String },
    /// HTTP endpoint such as `tcp://host:2375` or `http://host:2375`
    Http { url: String },
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Local => write!(f, "local"),
            Endpoint::Unix { path } => write!(f, "unix://{}", path.trim_start_matches("unix://")),
            Endpoint::Http { url } => write!(f, "{url}"),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self::new(Endpoint::Local)
    }
}

impl EngineProfile {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Build an engine client for this profile.
    ///
    /// No request is made here; the chain's liveness check is the first
    /// contact with the daemon.
    pub fn connect(&self) -> crate::error::Result<Docker> {
        debug!(endpoint = %self.endpoint, timeout_secs = self.timeout_secs, "Building docker client");
        let docker = match &self.endpoint {
            Endpoint::Local => Docker::connect_with_local_defaults()
                .map(|docker| docker.with_timeout(Duration::from_secs(self.timeout_secs))),
            #[cfg(unix)]
            Endpoint::Unix { path } => {
                Docker::connect_with_unix(path, self.timeout_secs, API_DEFAULT_VERSION)
            }
            #[cfg(not(unix))]
            Endpoint::Unix { path } => {
                return Err(ChainError::Config(format!(
                    "unix socket endpoints are not supported on this platform: {path}"
                )));
            }
            Endpoint::Http { url } => {
                Docker::connect_with_http(url, self.timeout_secs, API_DEFAULT_VERSION)
            }
        };
        docker.map_err(|e| ChainError::Connect(e.into()))
    }
}

impl Config {
    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path; a missing file is an empty config
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let expanded_content = Self::expand_env_vars(&content);
        let config: Config = toml::from_str(&expanded_content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: EngineProfile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<EngineProfile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &EngineProfile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Name of the profile to use.
    ///
    /// Resolution order: the explicit name, then `default_profile`, then the
    /// alphabetically first profile.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(profile_name) = explicit_profile {
            return Ok(profile_name.to_string());
        }

        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }

        self.list_profiles()
            .first()
            .map(|(name, _)| (*name).clone())
            .ok_or(ConfigError::NoProfiles)
    }

    /// Look up a profile by name
    pub fn profile(&self, name: &str) -> Result<&EngineProfile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, `~/.config/dockchain/config.toml` is preferred when it exists,
    /// falling back to `~/Library/Application Support/com.dockchain.dockchain/config.toml`.
    ///
    /// On Linux: ~/.config/dockchain/config.toml
    /// On Windows: %APPDATA%\dockchain\dockchain\config\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_dir = base_dirs.home_dir().join(".config").join("dockchain");
                if linux_style_dir.exists() {
                    return Ok(linux_style_dir.join("config.toml"));
                }
            }
        }

        let proj_dirs = ProjectDirs::from("com", "dockchain", "dockchain")
            .ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Expand `${VAR}` and `${VAR:-default}` references.
    ///
    /// Unset variables without a default are left as written so profiles that
    /// are never used do not need their variables set.
    fn expand_env_vars(content: &str) -> String {
        let expanded =
            shellexpand::env_with_context_no_errors(content, |var| std::env::var(var).ok());
        expanded.to_string()
    }
}
