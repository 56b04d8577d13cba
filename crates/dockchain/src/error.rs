//! Error types for dockchain
//!
//! Chain and config failures are folded into [`CliError`], which knows how to
//! suggest a next step for the failures a user can act on.

use colored::Colorize;
use dockchain_core::ChainError;
use dockchain_core::config::ConfigError;
use thiserror::Error;

/// Cargo-style diagnostic formatter for CLI errors.
///
/// Produces structured output like:
/// ```text
/// error: Cannot reach docker engine: ...
///
///   tip: check that the daemon is running:
///       docker info
/// ```
pub struct CliDiagnostic {
    message: String,
    tips: Vec<(String, Vec<String>)>,
}

impl CliDiagnostic {
    /// Start a new error diagnostic with the given message.
    pub fn error(message: &str) -> Self {
        Self {
            message: message.to_string(),
            tips: Vec::new(),
        }
    }

    /// Add a tip with optional example commands.
    pub fn tip(mut self, description: &str, commands: &[&str]) -> Self {
        self.tips.push((
            description.to_string(),
            commands.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    /// Print the diagnostic to stderr with colored formatting.
    pub fn print(&self) {
        eprint!("{}{}", "error".red().bold(), ": ".bold());
        eprintln!("{}", self.message);

        for (description, commands) in &self.tips {
            eprintln!();
            eprint!("  {}{}", "tip".yellow().bold(), ": ".bold());
            eprintln!("{}", description);
            for cmd in commands {
                eprintln!("      {}", cmd);
            }
        }
    }
}

/// Main error type for the dockchain binary
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Cannot reach docker engine: {message}")]
    ConnectionError { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Engine error: {message}")]
    EngineError { message: String },

    #[error("Timeout: {message}")]
    Timeout { message: String },

    #[error("Interrupted")]
    Cancelled,

    #[error("Container {id} exited with status {code}")]
    ContainerExited { id: String, code: i64 },

    #[error("Output formatting error: {message}")]
    OutputError { message: String },
}

/// Result type for dockchain commands
pub type Result<T> = std::result::Result<T, CliError>;

impl CliError {
    /// Get helpful suggestions for resolving this error
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            CliError::ProfileNotFound { name } => vec![
                "List available profiles: dockchain profile list".to_string(),
                format!("Create profile '{}': dockchain profile set {} --endpoint local", name, name),
            ],
            CliError::ConnectionError { .. } => vec![
                "Check that the docker daemon is running: docker info".to_string(),
                "Point at an engine explicitly: dockchain --host unix:///var/run/docker.sock <command>".to_string(),
                "Check the profile's endpoint: dockchain profile show <profile>".to_string(),
            ],
            CliError::NotFound { .. } => vec![
                "List local images: dockchain images".to_string(),
                "Pull the image first: dockchain pull <image>".to_string(),
                "Verify the container ID or name is correct".to_string(),
            ],
            CliError::Conflict { .. } => vec![
                "Remove the existing container: dockchain rm --force <id>".to_string(),
                "Pick another name with --name".to_string(),
            ],
            CliError::Timeout { .. } => vec![
                "Raise the per-operation deadline: dockchain --timeout <secs> <command>".to_string(),
            ],
            CliError::InvalidInput { .. } => {
                vec!["Check the command syntax: dockchain <command> --help".to_string()]
            }
            _ => vec![],
        }
    }

    /// Print a cargo-style diagnostic to stderr using colored formatting.
    pub fn print_diagnostic(&self) {
        let mut diag = CliDiagnostic::error(&format!("{}", self));

        for suggestion in self.suggestions() {
            diag = diag.tip(&suggestion, &[]);
        }

        diag.print();
    }
}

impl From<ChainError> for CliError {
    fn from(err: ChainError) -> Self {
        let message = err.to_string();
        match err {
            ChainError::Cancelled => CliError::Cancelled,
            ChainError::MissingContainerId { .. } => CliError::InvalidInput { message },
            ChainError::Config(msg) => CliError::Config(msg),
            ref e if e.is_connection() => CliError::ConnectionError { message },
            ref e if e.is_timeout() => CliError::Timeout { message },
            ref e if e.is_not_found() => CliError::NotFound { message },
            ref e if e.is_conflict() => CliError::Conflict { message },
            _ => CliError::EngineError { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound { name },
            other => CliError::Config(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::OutputError {
            message: format!("JSON error: {}", err),
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::OutputError {
            message: err.to_string(),
        }
    }
}
