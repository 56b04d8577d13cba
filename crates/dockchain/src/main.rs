use anyhow::Result;
use clap::Parser;
use dockchain_core::config::Config;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands};
use commands::container::RunArgs;
use connection::ConnectionManager;
use error::CliError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    // Load configuration from specified path or default location
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };
    let conn_mgr = ConnectionManager::with_config_path(config, config_path)
        .with_host(cli.host.clone())
        .with_timeout(cli.timeout.map(Duration::from_secs));

    let cancel = conn_mgr.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight operation");
            cancel.cancel();
        }
    });

    if let Err(e) = execute_command(&cli, &conn_mgr).await {
        if let CliError::ContainerExited { code, .. } = e {
            std::process::exit(exit_status(code));
        }
        e.print_diagnostic();
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "dockchain=warn,dockchain_core=warn",
            1 => "dockchain=info,dockchain_core=info",
            2 => "dockchain=debug,dockchain_core=debug",
            _ => "dockchain=trace,dockchain_core=trace,bollard=debug",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &ConnectionManager) -> Result<(), CliError> {
    trace!("Executing command: {:?}", cli.command);
    info!("Command: {}", format_command(&cli.command));

    let profile = cli.profile.as_deref();
    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Pull {
            image,
            tag,
            platform,
        } => {
            commands::image::handle_pull(
                conn_mgr,
                profile,
                image,
                tag.as_deref(),
                platform.as_deref(),
                cli.output,
            )
            .await
        }
        Commands::Images { reference, all } => {
            commands::image::handle_images(conn_mgr, profile, reference.as_deref(), *all, cli.output)
                .await
        }
        Commands::Run {
            image,
            name,
            pull,
            keep,
            cmd,
        } => {
            let args = RunArgs {
                image,
                name: name.as_deref(),
                pull: *pull,
                keep: *keep,
                cmd,
            };
            commands::container::handle_run(conn_mgr, profile, args, cli.output).await
        }
        Commands::Start { id } => commands::container::handle_start(conn_mgr, profile, id).await,
        Commands::Wait { id, condition } => {
            commands::container::handle_wait(conn_mgr, profile, id, *condition, cli.output).await
        }
        Commands::Logs {
            id,
            tail,
            timestamps,
        } => {
            commands::container::handle_logs(conn_mgr, profile, id, tail, *timestamps, cli.output)
                .await
        }
        Commands::Rm { id, force, volumes } => {
            commands::container::handle_rm(conn_mgr, profile, id, *force, *volumes).await
        }
        Commands::Profile(profile_cmd) => {
            debug!("Executing profile command");
            commands::profile::handle_profile_command(profile_cmd, conn_mgr, cli.output).await
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(CliError::ContainerExited { id, code }) => {
            info!("Container {} exited with {} after {:?}", id, code, duration)
        }
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }

    result
}

/// Process exit status for a container exit code; non-zero codes never wrap to success
fn exit_status(code: i64) -> i32 {
    if code == 0 {
        0
    } else {
        code.clamp(1, 255) as i32
    }
}

/// Format command for human-readable logging
fn format_command(command: &Commands) -> String {
    match command {
        Commands::Pull { image, .. } => format!("pull {}", image),
        Commands::Images { reference, .. } => match reference {
            Some(reference) => format!("images --reference {}", reference),
            None => "images".to_string(),
        },
        Commands::Run { image, cmd, .. } => format!("run {} {}", image, cmd.join(" ")),
        Commands::Start { id } => format!("start {}", id),
        Commands::Wait { id, condition } => format!("wait {} ({})", id, condition),
        Commands::Logs { id, .. } => format!("logs {}", id),
        Commands::Rm { id, .. } => format!("rm {}", id),
        Commands::Profile(cmd) => {
            use cli::ProfileCommands::*;
            match cmd {
                List => "profile list".to_string(),
                Path => "profile path".to_string(),
                Show { name } => format!("profile show {}", name),
                Set { name, .. } => format!("profile set {}", name),
                Remove { name } => format!("profile remove {}", name),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_stays_in_range() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(3), 3);
        assert_eq!(exit_status(255), 255);
        assert_eq!(exit_status(256), 255);
        assert_eq!(exit_status(-1), 1);
        assert_eq!(exit_status(i64::MAX), 255);
    }
}
