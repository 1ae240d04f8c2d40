use std::path::Path;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Data file name is a bare, non-empty file name
/// - Retention period and purge interval are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let file_name = config.storage.file_name.trim();
    if file_name.is_empty() {
        return Err(ConfigError::ValidationError(
            "storage.file_name cannot be empty".to_string(),
        ));
    }
    if Path::new(file_name).file_name().and_then(|n| n.to_str()) != Some(file_name) {
        return Err(ConfigError::ValidationError(format!(
            "storage.file_name must be a plain file name, got {:?}",
            config.storage.file_name
        )));
    }

    if config.retention.repaired_days == 0 {
        return Err(ConfigError::ValidationError(
            "retention.repaired_days cannot be 0".to_string(),
        ));
    }

    if config.retention.purge_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "retention.purge_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
