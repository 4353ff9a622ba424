//! Configuration types deserialized from `sigil.toml`.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Deserialize;

/// The top-level configuration parsed from `sigil.toml`.
///
/// Every section is optional; a missing file is equivalent to an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigilConfig {
    /// Signature cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// ABI extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Signature cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Whether signature hashes are persisted between runs.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Cache directory, relative to the working directory unless absolute.
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: default_cache_dir(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".sigil-cache")
}

/// ABI extraction settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Packages whose classes form the public API, e.g. `com.example.api`.
    ///
    /// Empty means every package is API-bearing and package-private
    /// declarations are part of the ABI.
    #[serde(default)]
    pub exported_packages: Vec<String>,
}

/// Output settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Result format.
    #[serde(default)]
    pub format: OutputFormat,
}

/// How command results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text (default).
    #[default]
    Text,
    /// One JSON document.
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => f.write_str("text"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{other}' (expected text or json)")),
        }
    }
}
