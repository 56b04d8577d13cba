//! Error handling for dockchain-core
//!
//! Every failure a chain can hit ends up as one [`ChainError`] held as the
//! chain's sticky error. The variants keep the failure kinds apart so callers
//! can react without parsing messages.
//!
//! # Example
//!
//! ```rust
//! use dockchain_core::ChainError;
//!
//! let err = ChainError::MissingContainerId { operation: "start" };
//! assert!(err.is_missing_id());
//! assert!(!err.is_connection());
//! ```

use bollard::errors::Error as DockerError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Failure recorded by a [`DockerChain`](crate::DockerChain)
///
/// Engine errors are held behind an `Arc` so the sticky error can be handed
/// to response handlers and direct-returning helpers while the chain keeps
/// its own copy.
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    /// The connection factory could not produce an engine handle
    #[error("Failed to connect to docker engine: {}", engine_message(.0))]
    Connect(#[source] Arc<DockerError>),

    /// The engine handle was created but the liveness check failed
    #[error("Docker engine ping failed: {}", engine_message(.0))]
    Ping(#[source] Arc<DockerError>),

    /// The liveness check did not answer in time
    #[error("Docker engine ping timed out after {0:?}")]
    PingTimeout(Duration),

    /// No container ID was given and no container was created earlier in the chain
    #[error("No container ID given for {operation} and no container was created in this chain")]
    MissingContainerId { operation: &'static str },

    /// The engine rejected or failed an operation
    #[error("Docker engine error: {}", engine_message(.0))]
    Engine(#[source] Arc<DockerError>),

    /// A response handler reported a failure
    #[error("Response handler failed: {0}")]
    Handler(String),

    /// The operation's cancellation token fired
    #[error("Operation cancelled")]
    Cancelled,

    /// The operation ran past its deadline
    #[error("Operation exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// Connection settings could not be turned into a client
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for chain operations
pub type Result<T> = std::result::Result<T, ChainError>;

/// bollard leaves the daemon's reason out of `Display` for stream and wait errors
fn engine_message(err: &DockerError) -> String {
    match err {
        DockerError::DockerStreamError { error } => error.clone(),
        DockerError::DockerContainerWaitError { error, code } => {
            format!("container exited with {}: {}", code, error)
        }
        other => other.to_string(),
    }
}

impl From<DockerError> for ChainError {
    fn from(err: DockerError) -> Self {
        ChainError::Engine(Arc::new(err))
    }
}

impl ChainError {
    /// Build a handler failure from any displayable message
    pub fn handler(message: impl Into<String>) -> Self {
        ChainError::Handler(message.into())
    }

    /// The underlying engine error, if this failure came from the engine client
    #[must_use]
    pub fn docker_error(&self) -> Option<&DockerError> {
        match self {
            ChainError::Connect(e) | ChainError::Ping(e) | ChainError::Engine(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if the engine answered with 404
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.docker_error(),
            Some(DockerError::DockerResponseServerError {
                status_code: 404,
                ..
            })
        )
    }

    /// Returns true if the engine answered with 409
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(
            self.docker_error(),
            Some(DockerError::DockerResponseServerError {
                status_code: 409,
                ..
            })
        )
    }

    /// Returns true if the engine could not be reached at all
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(
            self,
            ChainError::Connect(_) | ChainError::Ping(_) | ChainError::PingTimeout(_)
        )
    }

    /// Returns true if a container-targeting operation had no ID to work with
    #[must_use]
    pub fn is_missing_id(&self) -> bool {
        matches!(self, ChainError::MissingContainerId { .. })
    }

    /// Returns true for ping timeouts and expired deadlines
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ChainError::PingTimeout(_) | ChainError::DeadlineExceeded(_)
        ) || matches!(self.docker_error(), Some(DockerError::RequestTimeoutError))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error(status_code: u16) -> DockerError {
        DockerError::DockerResponseServerError {
            status_code,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_engine_error_from_docker() {
        let err: ChainError = server_error(404).into();
        assert!(matches!(err, ChainError::Engine(_)));
        assert!(err.is_not_found());
        assert!(!err.is_conflict());
        assert!(!err.is_connection());
    }

    #[test]
    fn test_stream_errors_keep_daemon_reason() {
        let err: ChainError = DockerError::DockerStreamError {
            error: "manifest unknown".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Docker engine error: manifest unknown");

        let err: ChainError = DockerError::DockerContainerWaitError {
            error: "oom killed".to_string(),
            code: 137,
        }
        .into();
        assert!(err.to_string().contains("137"));
        assert!(err.to_string().contains("oom killed"));
    }

    #[test]
    fn test_conflict_detection() {
        let err: ChainError = server_error(409).into();
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_connection_failures() {
        assert!(ChainError::Connect(Arc::new(server_error(500))).is_connection());
        assert!(ChainError::Ping(Arc::new(server_error(500))).is_connection());
        assert!(ChainError::PingTimeout(Duration::from_secs(3)).is_connection());
        assert!(!ChainError::Cancelled.is_connection());
    }

    #[test]
    fn test_timeouts() {
        assert!(ChainError::PingTimeout(Duration::from_secs(3)).is_timeout());
        assert!(ChainError::DeadlineExceeded(Duration::from_secs(1)).is_timeout());
        assert!(!ChainError::handler("nope").is_timeout());
    }

    #[test]
    fn test_clone_keeps_source() {
        let err: ChainError = server_error(500).into();
        let copy = err.clone();
        assert_eq!(err.to_string(), copy.to_string());
        assert!(copy.docker_error().is_some());
    }

    #[test]
    fn test_display() {
        let err = ChainError::MissingContainerId { operation: "logs" };
        assert!(err.to_string().contains("logs"));

        let err = ChainError::handler("image count mismatch");
        assert!(err.to_string().contains("image count mismatch"));
    }
}
