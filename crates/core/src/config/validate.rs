use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - CUIT is eleven digits
/// - Credential paths are not empty
/// - Transport timeout is not 0
/// - The authentication endpoint resolves for the selected environment
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.cuit.len() != 11 || !config.cuit.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ConfigError::ValidationError(format!(
            "cuit must be 11 digits, got {:?}",
            config.cuit
        )));
    }

    if config.files.certificate.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "files.certificate cannot be empty".to_string(),
        ));
    }
    if config.files.private_key.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "files.private_key cannot be empty".to_string(),
        ));
    }

    if config.transport.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "transport.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.endpoint("wsaa").is_none() {
        return Err(ConfigError::ValidationError(
            "no wsaa endpoint for the selected environment".to_string(),
        ));
    }

    Ok(())
}
