//! Turning flags and profiles into connected chains

use crate::error::{CliError, Result as CliResult};
use dockchain_core::config::{Config, Endpoint, EngineProfile};
use dockchain_core::{DockerChain, OpContext};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Builds chains for commands from the loaded config and global flags
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
    host: Option<String>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
}

impl ConnectionManager {
    /// Create a new connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
            host: None,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Engine address that overrides every profile
    #[must_use]
    pub fn with_host(mut self, host: Option<String>) -> Self {
        self.host = host;
        self
    }

    /// Deadline applied to each engine operation
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Token that cancels whatever operation is in flight
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Save the configuration to the appropriate location
    pub fn save_config(&self, config: &Config) -> CliResult<()> {
        match &self.config_path {
            Some(path) => config.save_to_path(path)?,
            None => config.save()?,
        }
        Ok(())
    }

    /// Engine profile for this invocation.
    ///
    /// `--host` wins; then an explicit or default profile; with no profiles
    /// configured at all, the local daemon.
    pub fn engine_profile(&self, profile_name: Option<&str>) -> CliResult<EngineProfile> {
        if let Some(host) = &self.host {
            debug!("Using engine from --host: {}", host);
            return Ok(EngineProfile::new(parse_host(host)?));
        }

        if profile_name.is_none() && self.config.profiles.is_empty() {
            debug!("No profiles configured, using local engine defaults");
            return Ok(EngineProfile::default());
        }

        let name = self.config.resolve_profile(profile_name)?;
        info!("Using engine profile: {}", name);
        Ok(self.config.profile(&name)?.clone())
    }

    /// A fresh chain for this invocation, honoring `--timeout` and Ctrl-C
    pub fn chain(&self, profile_name: Option<&str>) -> CliResult<DockerChain> {
        let profile = self.engine_profile(profile_name)?;
        let mut chain = DockerChain::from_profile(profile);

        let timeout = self.timeout;
        let cancel = self.cancel.clone();
        chain.set_context_factory(move || {
            let context = OpContext::background().with_cancellation(cancel.clone());
            match timeout {
                Some(limit) => context.timeout(limit),
                None => context,
            }
        });
        Ok(chain)
    }
}

/// Parse a `--host` value into an endpoint
pub fn parse_host(host: &str) -> CliResult<Endpoint> {
    if let Some(path) = host.strip_prefix("unix://") {
        if path.is_empty() {
            return Err(CliError::InvalidInput {
                message: "unix:// host needs a socket path".to_string(),
            });
        }
        return Ok(Endpoint::Unix {
            path: path.to_string(),
        });
    }
    if host.starts_with("tcp://") || host.starts_with("http://") {
        return Ok(Endpoint::Http {
            url: host.to_string(),
        });
    }
    Err(CliError::InvalidInput {
        message: format!(
            "unsupported host '{}': expected unix://, tcp:// or http://",
            host
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host() {
        assert_eq!(
            parse_host("unix:///var/run/docker.sock").unwrap(),
            Endpoint::Unix {
                path: "/var/run/docker.sock".to_string()
            }
        );
        assert_eq!(
            parse_host("tcp://10.0.0.5:2375").unwrap(),
            Endpoint::Http {
                url: "tcp://10.0.0.5:2375".to_string()
            }
        );
        assert!(parse_host("ssh://box").is_err());
        assert!(parse_host("unix://").is_err());
    }

    #[test]
    fn test_host_overrides_profiles() {
        let mut config = Config::default();
        config.set_profile(
            "remote".to_string(),
            EngineProfile::new(Endpoint::Http {
                url: "tcp://remote:2375".to_string(),
            }),
        );
        let mgr = ConnectionManager::with_config_path(config, None)
            .with_host(Some("unix:///tmp/d.sock".to_string()));

        let profile = mgr.engine_profile(Some("remote")).unwrap();
        assert_eq!(
            profile.endpoint,
            Endpoint::Unix {
                path: "/tmp/d.sock".to_string()
            }
        );
    }

    #[test]
    fn test_no_profiles_means_local() {
        let mgr = ConnectionManager::with_config_path(Config::default(), None);
        assert_eq!(mgr.engine_profile(None).unwrap().endpoint, Endpoint::Local);
    }

    #[test]
    fn test_unknown_profile_is_reported() {
        let mgr = ConnectionManager::with_config_path(Config::default(), None);
        assert!(matches!(
            mgr.engine_profile(Some("ghost")),
            Err(CliError::ProfileNotFound { name }) if name == "ghost"
        ));
    }

    #[test]
    fn test_default_profile_is_used() {
        let mut config = Config::default();
        config.set_profile("a".to_string(), EngineProfile::default());
        config.set_profile(
            "b".to_string(),
            EngineProfile::new(Endpoint::Http {
                url: "http://b:2375".to_string(),
            })
            .with_timeout_secs(9),
        );
        config.default_profile = Some("b".to_string());
        let mgr = ConnectionManager::with_config_path(config, None);

        assert_eq!(mgr.engine_profile(None).unwrap().timeout_secs, 9);
    }
}
