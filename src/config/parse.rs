use super::types::*;
use crate::config::expand_tilde;
use crate::timeframe::TimeWindow;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed:\n{}", .0.join("\n"))]
    ValidationList(Vec<String>),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    use std::io::Read;

    let mut file = File::open(path).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut yaml_string = String::new();
    file.read_to_string(&mut yaml_string).map_err(|e| {
        ConfigError::Io(std::io::Error::new(
            e.kind(),
            format!("failed to read config file '{}': {}", path.display(), e),
        ))
    })?;

    let mut config: Config = serde_yaml::from_str(&yaml_string)?;

    config.input.path = expand_tilde(&config.input.path);

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.input.path.as_os_str().is_empty() {
        errors.push("input.path must not be empty".to_string());
    }

    if config.batch.quiescence.is_zero() {
        errors.push("batch.quiescence must be greater than zero".to_string());
    }

    if config.batch.buffer_limit == 0 {
        errors.push("batch.buffer_limit must be greater than zero".to_string());
    }

    if config.bus.enabled && config.bus.interface.is_empty() {
        errors.push("bus.interface must not be empty when bus.enabled is set".to_string());
    }

    // Timeframe bounds are validated even when the filter is disabled so a
    // typo doesn't surface only after the window is switched on.
    if let Err(e) = TimeWindow::new(&config.timeframe) {
        errors.push(format!("timeframe: {}", e));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationList(errors))
    }
}
