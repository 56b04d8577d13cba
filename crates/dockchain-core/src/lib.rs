//! # dockchain-core
//!
//! Chainable Docker Engine operations with a single sticky error.
//!
//! A [`DockerChain`] wraps an engine client and lets a caller describe a
//! container lifecycle as one pipeline: pull, create, start, wait, read logs,
//! remove. The first failure is recorded and every later call in the chain
//! returns without contacting the engine, so the caller checks for failure
//! exactly once at the end with [`DockerChain::error`].
//!
//! ```rust,ignore
//! use dockchain_core::DockerChain;
//!
//! let mut chain = DockerChain::local();
//! chain
//!     .container_create_with_callback("alpine", None, None).await
//!     .container_start().await
//!     .container_wait().await
//!     .container_remove().await;
//! chain.error()?;
//! ```
//!
//! ## Modules
//!
//! - [`chain`] - the accumulator and every chained operation
//! - [`options`] - per-operation parameters, contexts and response handlers
//! - [`engine`] - the [`Engine`] trait the chain talks to, implemented for `bollard::Docker`
//! - [`context`] - per-operation deadlines and cancellation
//! - [`config`] - named engine profiles stored as TOML
//! - [`error`] - [`ChainError`]

pub mod chain;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod options;
pub mod types;

pub use chain::{DockerChain, PING_TIMEOUT};
pub use context::OpContext;
pub use engine::{Engine, ImagePullRequest, WaitStream};
pub use error::{ChainError, Result};
pub use types::{ContainerLogs, WaitCondition};

// Engine client types that appear in chain signatures
pub use bollard::container::Config as ContainerConfig;
pub use bollard::models::{ContainerCreateResponse, ContainerWaitResponse, ImageSummary};
