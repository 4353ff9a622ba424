//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SigilConfig;
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE: &str = "sigil.toml";

/// Loads `<dir>/sigil.toml`, falling back to the defaults when the file does
/// not exist.
pub fn load_config(dir: &Path) -> Result<SigilConfig, ConfigError> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(SigilConfig::default());
    }
    load_config_file(&path)
}

/// Loads and validates an explicitly named configuration file.
pub fn load_config_file(path: &Path) -> Result<SigilConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `sigil.toml` configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<SigilConfig, ConfigError> {
    let config: SigilConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks that every exported package is a well-formed package name.
fn validate_config(config: &SigilConfig) -> Result<(), ConfigError> {
    for package in &config.extraction.exported_packages {
        let well_formed = !package.is_empty()
            && package
                .split(['.', '/'])
                .all(|segment| !segment.is_empty() && !segment.contains(char::is_whitespace));
        if !well_formed {
            return Err(ConfigError::ValidationError(format!(
                "invalid package name '{package}' in extraction.exported_packages"
            )));
        }
    }
    if config.cache.enabled && config.cache.dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "cache.dir must not be empty".to_string(),
        ));
    }
    Ok(())
}
