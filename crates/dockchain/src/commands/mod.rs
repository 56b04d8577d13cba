//! Command implementations

pub mod container;
pub mod image;
pub mod profile;
