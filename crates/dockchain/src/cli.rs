//! CLI structure and command definitions

use clap::{Parser, Subcommand};
use dockchain_core::WaitCondition;

/// Container lifecycles against a Docker engine, one chain per command
#[derive(Parser, Debug)]
#[command(name = "dockchain")]
#[command(version, about = "Docker container lifecycles as a single chain")]
#[command(long_about = "
Docker container lifecycles as a single chain

Every command runs its engine calls as one chain: the first failure stops
the rest and is reported once at the end.

EXAMPLES:
    # Run a throwaway container and print its output
    dockchain run alpine -- echo hello

    # Keep the container around afterwards
    dockchain run --name job --keep alpine -- sh -c 'date'

    # Talk to a remote engine
    dockchain --host tcp://build-host:2375 images

    # Save that engine as a profile and use it
    dockchain profile set build --endpoint http --url tcp://build-host:2375
    dockchain -p build images -o json

For more help on a specific command, run:
    dockchain <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "DOCKCHAIN_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "DOCKCHAIN_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Engine address (unix:///path, tcp://host:port, http://host:port); overrides profiles
    #[arg(long, global = true, env = "DOCKCHAIN_HOST")]
    pub host: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Deadline in seconds for each engine operation
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text or tables
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Table output
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pull an image
    #[command(after_help = "EXAMPLES:
    dockchain pull alpine
    dockchain pull docker.io/library/alpine:3.20
    dockchain pull --platform linux/arm64 alpine
")]
    Pull {
        /// Image reference; pulls `latest` when no tag is given
        image: String,

        /// Tag to pull, overriding one in the reference
        #[arg(long)]
        tag: Option<String>,

        /// Platform such as linux/amd64
        #[arg(long)]
        platform: Option<String>,
    },

    /// List images
    #[command(visible_alias = "ls")]
    Images {
        /// Only images matching this REPOSITORY[:TAG]
        #[arg(long, short)]
        reference: Option<String>,

        /// Include intermediate images
        #[arg(long, short)]
        all: bool,
    },

    /// Create, start, wait for, print logs of and remove a container
    #[command(after_help = "EXAMPLES:
    # Run and clean up
    dockchain run alpine -- echo hello

    # Pull first and keep the container
    dockchain run --pull --keep --name report alpine -- uname -a
")]
    Run {
        /// Image to run
        image: String,

        /// Container name
        #[arg(long)]
        name: Option<String>,

        /// Pull the image before creating the container
        #[arg(long)]
        pull: bool,

        /// Keep the container instead of removing it
        #[arg(long)]
        keep: bool,

        /// Command and arguments to run in the container
        #[arg(last = true)]
        cmd: Vec<String>,
    },

    /// Start an existing container
    Start {
        /// Container ID or name
        id: String,
    },

    /// Wait for a container and print its exit status
    Wait {
        /// Container ID or name
        id: String,

        /// Condition to wait for
        #[arg(long, value_enum, default_value = "not-running")]
        condition: WaitCondition,
    },

    /// Print a container's logs
    Logs {
        /// Container ID or name
        id: String,

        /// Number of trailing lines, or `all`
        #[arg(long, default_value = "all")]
        tail: String,

        /// Prefix lines with timestamps
        #[arg(long, short)]
        timestamps: bool,
    },

    /// Remove a container
    Rm {
        /// Container ID or name
        id: String,

        /// Kill the container first if it is running
        #[arg(long, short)]
        force: bool,

        /// Remove anonymous volumes too
        #[arg(long)]
        volumes: bool,
    },

    /// Profile management
    #[command(subcommand, visible_alias = "prof")]
    #[command(after_help = "EXAMPLES:
    # Local daemon (DOCKER_HOST or the default socket)
    dockchain profile set local --endpoint local

    # Rootless daemon socket
    dockchain profile set rootless --endpoint unix --path /run/user/1000/docker.sock

    # Remote engine, made the default
    dockchain profile set build --endpoint http --url tcp://build-host:2375 --default

    # List and inspect
    dockchain profile list
    dockchain profile show build
")]
    Profile(ProfileCommands),
}

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List all configured profiles
    #[command(visible_alias = "ls")]
    List,

    /// Show the path to the configuration file
    Path,

    /// Show details of a specific profile
    #[command(visible_alias = "get")]
    Show {
        /// Profile name to show
        name: String,
    },

    /// Set or create a profile
    #[command(visible_alias = "add")]
    Set {
        /// Profile name
        name: String,

        /// Kind of endpoint
        #[arg(long, value_enum, default_value = "local")]
        endpoint: EndpointKind,

        /// Socket path for unix endpoints
        #[arg(long, required_if_eq("endpoint", "unix"))]
        path: Option<String>,

        /// Address for http endpoints
        #[arg(long, required_if_eq("endpoint", "http"))]
        url: Option<String>,

        /// Request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Make this the default profile
        #[arg(long)]
        default: bool,
    },

    /// Remove a profile
    #[command(visible_alias = "rm")]
    Remove {
        /// Profile name to remove
        name: String,
    },
}

/// Endpoint kinds accepted by `profile set`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EndpointKind {
    Local,
    Unix,
    Http,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_trailing_command() {
        let cli = Cli::parse_from(["dockchain", "run", "--keep", "alpine", "--", "echo", "hi"]);
        match cli.command {
            Commands::Run {
                image, keep, cmd, ..
            } => {
                assert_eq!(image, "alpine");
                assert!(keep);
                assert_eq!(cmd, vec!["echo", "hi"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_wait_condition_value() {
        let cli = Cli::parse_from(["dockchain", "wait", "abc", "--condition", "next-exit"]);
        assert!(matches!(
            cli.command,
            Commands::Wait {
                condition: WaitCondition::NextExit,
                ..
            }
        ));
    }

    #[test]
    fn test_unix_profile_requires_path() {
        let res = Cli::try_parse_from(["dockchain", "profile", "set", "s", "--endpoint", "unix"]);
        assert!(res.is_err());
    }
}
