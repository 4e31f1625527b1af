use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Required sections exist (enforced by serde)
/// - Server port is not 0
/// - Endpoints are http(s) URLs
/// - Secret prefix and job namespace are set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let endpoints = [
        ("update.callback_endpoint", &config.update.callback_endpoint),
        (
            "update.credential_provider_endpoint",
            &config.update.credential_provider_endpoint,
        ),
        ("sts.endpoint", &config.sts.endpoint),
        ("license_server.endpoint", &config.license_server.endpoint),
    ];
    for (name, value) in endpoints {
        if !(value.starts_with("http://") || value.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "{name} must be an http(s) URL, got {value:?}"
            )));
        }
    }

    if config.update.secret_prefix.is_empty() {
        return Err(ConfigError::ValidationError(
            "update.secret_prefix cannot be empty".to_string(),
        ));
    }

    if config.job.namespace.is_empty() {
        return Err(ConfigError::ValidationError(
            "job.namespace cannot be empty".to_string(),
        ));
    }

    Ok(())
}
