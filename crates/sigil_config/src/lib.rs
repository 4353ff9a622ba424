//! Parsing and validation of `sigil.toml` configuration files.
//!
//! This crate reads the optional configuration file and produces a
//! strongly-typed [`SigilConfig`] controlling the signature cache, which
//! packages are treated as API-bearing, and how results are printed.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_file, load_config_from_str, CONFIG_FILE};
pub use types::*;
