//! Profile management command implementations

use crate::cli::{EndpointKind, OutputFormat, ProfileCommands};
use crate::connection::ConnectionManager;
use crate::error::{CliError, Result as CliResult};
use crate::output;
use colored::Colorize;
use dockchain_core::config::{Config, Endpoint, EngineProfile};
use tracing::{debug, info};

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<()> {
    use ProfileCommands::*;

    match profile_cmd {
        List => handle_list(conn_mgr, output_format),
        Path => handle_path(conn_mgr, output_format),
        Show { name } => handle_show(conn_mgr, name, output_format),
        Set {
            name,
            endpoint,
            path,
            url,
            timeout_secs,
            default,
        } => {
            let endpoint = build_endpoint(*endpoint, path.as_deref(), url.as_deref())?;
            handle_set(conn_mgr, name, endpoint, *timeout_secs, *default)
        }
        Remove { name } => handle_remove(conn_mgr, name),
    }
}

fn build_endpoint(kind: EndpointKind, path: Option<&str>, url: Option<&str>) -> CliResult<Endpoint> {
    let missing = |flag: &str| CliError::InvalidInput {
        message: format!("--{} is required for this endpoint", flag),
    };
    Ok(match kind {
        EndpointKind::Local => Endpoint::Local,
        EndpointKind::Unix => Endpoint::Unix {
            path: path.ok_or_else(|| missing("path"))?.to_string(),
        },
        EndpointKind::Http => Endpoint::Http {
            url: url.ok_or_else(|| missing("url"))?.to_string(),
        },
    })
}

fn profile_json(config: &Config, name: &str, profile: &EngineProfile) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "endpoint": profile.endpoint.to_string(),
        "timeout_secs": profile.timeout_secs,
        "is_default": config.default_profile.as_deref() == Some(name),
    })
}

fn handle_list(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    debug!("Listing all configured profiles");
    let config = &conn_mgr.config;
    let profiles = config.list_profiles();

    match output_format {
        OutputFormat::Auto => {
            if profiles.is_empty() {
                println!("No profiles configured.");
                println!("Use 'dockchain profile set' to create a profile.");
                return Ok(());
            }
            for (name, profile) in profiles {
                let marker = if config.default_profile.as_deref() == Some(name.as_str()) {
                    "*".green().bold().to_string()
                } else {
                    " ".to_string()
                };
                println!("{} {:<20} {}", marker, name.bold(), profile.endpoint);
            }
        }
        format => {
            let rows: Vec<_> = profiles
                .iter()
                .map(|(name, profile)| profile_json(config, name, profile))
                .collect();
            output::print_output(rows, output::OutputFormat::resolve(format, output::OutputFormat::Json))?;
        }
    }
    Ok(())
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let path = match &conn_mgr.config_path {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    match output_format {
        OutputFormat::Auto => println!("{}", path.display()),
        format => output::print_output(
            serde_json::json!({"config_path": path.display().to_string()}),
            output::OutputFormat::resolve(format, output::OutputFormat::Json),
        )?,
    }
    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let config = &conn_mgr.config;
    let profile = config.profile(name)?;
    output::print_output(
        profile_json(config, name, profile),
        output::OutputFormat::resolve(output_format, output::OutputFormat::Table),
    )?;
    Ok(())
}

fn handle_set(
    conn_mgr: &ConnectionManager,
    name: &str,
    endpoint: Endpoint,
    timeout_secs: Option<u64>,
    make_default: bool,
) -> CliResult<()> {
    let mut config = conn_mgr.config.clone();

    let mut profile = EngineProfile::new(endpoint);
    if let Some(timeout_secs) = timeout_secs {
        profile = profile.with_timeout_secs(timeout_secs);
    }
    info!("Saving profile '{}' -> {}", name, profile.endpoint);
    config.set_profile(name.to_string(), profile);
    if make_default {
        config.default_profile = Some(name.to_string());
    }
    conn_mgr.save_config(&config)?;

    println!("Profile '{}' saved", name);
    Ok(())
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    let mut config = conn_mgr.config.clone();
    if config.remove_profile(name).is_none() {
        return Err(CliError::ProfileNotFound {
            name: name.to_string(),
        });
    }
    conn_mgr.save_config(&config)?;

    println!("Profile '{}' removed", name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_endpoint() {
        assert_eq!(
            build_endpoint(EndpointKind::Local, None, None).unwrap(),
            Endpoint::Local
        );
        assert_eq!(
            build_endpoint(EndpointKind::Http, None, Some("tcp://h:2375")).unwrap(),
            Endpoint::Http {
                url: "tcp://h:2375".to_string()
            }
        );
        assert!(build_endpoint(EndpointKind::Unix, None, None).is_err());
    }

    #[test]
    fn test_profile_json_marks_default() {
        let mut config = Config::default();
        config.set_profile("a".to_string(), EngineProfile::default());
        config.default_profile = Some("a".to_string());
        let profile = config.profile("a").unwrap().clone();

        let value = profile_json(&config, "a", &profile);
        assert_eq!(value["is_default"], true);
        assert_eq!(value["endpoint"], "local");
    }
}
