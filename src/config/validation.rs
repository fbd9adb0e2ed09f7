//! Configuration validation.

use url::Url;

use crate::config::schema::VaultConfig;

/// A single validation failure, pointing at the offending field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every failure rather than stopping
/// at the first.
pub fn validate_config(config: &VaultConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if Url::parse(&config.remote.base_url).is_err() {
        errors.push(ValidationError {
            field: "remote.base_url".to_string(),
            message: format!("not a valid URL: {}", config.remote.base_url),
        });
    }

    if config.remote.request_timeout_ms == 0 {
        errors.push(ValidationError {
            field: "remote.request_timeout_ms".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    if config.probe.timeout_ms == 0 {
        errors.push(ValidationError {
            field: "probe.timeout_ms".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    if config.probe.timeout_ms >= config.probe.cooldown_ms {
        errors.push(ValidationError {
            field: "probe.cooldown_ms".to_string(),
            message: "cooldown must exceed the probe timeout".to_string(),
        });
    }

    if config.sync.debounce_ms == 0 {
        errors.push(ValidationError {
            field: "sync.debounce_ms".to_string(),
            message: "must be greater than zero".to_string(),
        });
    }

    if config.retry.max_attempts == 0 {
        errors.push(ValidationError {
            field: "retry.max_attempts".to_string(),
            message: "must be at least one".to_string(),
        });
    }

    if config.retry.base_delay_ms > config.retry.max_delay_ms {
        errors.push(ValidationError {
            field: "retry.base_delay_ms".to_string(),
            message: "base delay exceeds max delay".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&VaultConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_failures() {
        let mut config = VaultConfig::default();
        config.remote.base_url = "not a url".to_string();
        config.sync.debounce_ms = 0;
        config.retry.max_attempts = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.field == "remote.base_url"));
        assert!(errors.iter().any(|e| e.field == "sync.debounce_ms"));
        assert!(errors.iter().any(|e| e.field == "retry.max_attempts"));
    }

    #[test]
    fn probe_timeout_must_stay_under_cooldown() {
        let mut config = VaultConfig::default();
        config.probe.timeout_ms = 120_000;
        config.probe.cooldown_ms = 120_000;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "probe.cooldown_ms");
    }
}
