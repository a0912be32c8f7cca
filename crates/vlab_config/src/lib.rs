//! Parsing and validation of `vlab.toml` project configuration files.
//!
//! This crate reads the project configuration file and produces a strongly-typed
//! [`ProjectConfig`] with target resolution, pin merging, and constraint handling.

#![warn(missing_docs)]

pub mod error;
pub mod flags;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use flags::CompilerFlags;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
