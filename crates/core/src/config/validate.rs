use std::collections::HashSet;
use std::path::{Component, Path};

use super::{types::Config, ConfigError};
use crate::resolver::CategoryMap;

/// Validate configuration
/// Currently validates:
/// - At least one worker, one stability poll, and a non-zero poll interval
/// - Non-zero queue poll timeout and status buffer
/// - A named log file with a non-zero roll-over size, when file logging is on
/// - Category names are unique single folder names, and at least one exists
///
/// Extensions claimed by more than one category only produce a warning.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Sorter validation
    if config.sorter.workers == 0 {
        return Err(ConfigError::ValidationError(
            "sorter.workers must be at least 1".to_string(),
        ));
    }
    if config.sorter.poll_timeout_ms == 0 {
        return Err(ConfigError::ValidationError(
            "sorter.poll_timeout_ms cannot be 0".to_string(),
        ));
    }
    if config.sorter.status_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "sorter.status_buffer cannot be 0".to_string(),
        ));
    }

    // Stability validation
    if config.stability.max_polls == 0 {
        return Err(ConfigError::ValidationError(
            "stability.max_polls must be at least 1".to_string(),
        ));
    }
    if config.stability.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "stability.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    if config.placer.buffer_size == 0 {
        return Err(ConfigError::ValidationError(
            "placer.buffer_size cannot be 0".to_string(),
        ));
    }

    if config.logging.to_file {
        if config.logging.file.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "logging.file cannot be empty when logging.to_file is set".to_string(),
            ));
        }
        if config.logging.max_size_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "logging.max_size_bytes cannot be 0".to_string(),
            ));
        }
    }

    // Category validation
    if config.categories.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one category is required".to_string(),
        ));
    }
    let mut seen = HashSet::new();
    for category in &config.categories {
        if !is_folder_name(&category.name) {
            return Err(ConfigError::ValidationError(format!(
                "invalid category name {:?}: must be a single folder name",
                category.name
            )));
        }
        if !seen.insert(category.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate category name {:?}",
                category.name
            )));
        }
    }

    for (extension, winner) in CategoryMap::from_config(&config.categories).overlapping_extensions()
    {
        tracing::warn!(
            "Extension {} is listed by more than one category; files go to {}",
            extension,
            winner
        );
    }

    Ok(())
}

fn is_folder_name(name: &str) -> bool {
    if name.trim().is_empty() || name.contains('/') || name.contains('\\') {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
