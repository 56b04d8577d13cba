//! Connection profiles for Docker engines
//!
// Allow nested config module - this is intentional for the config subsystem

#![allow(clippy::module_inception)]
//!
//! Profiles name the engines a chain can talk to: the local daemon, a unix
//! socket somewhere else, or a remote HTTP endpoint. They live in a TOML file
//! in the platform config directory, and values may reference environment
//! variables with `${VAR}` or `${VAR:-default}`.

pub mod config;
pub mod error;

// Re-export main types for convenience
pub use config::{Config, Endpoint, EngineProfile};
pub use error::{ConfigError, Result};
