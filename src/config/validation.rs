//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: VaultConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::VaultConfig;
use crate::provider::normalize_name;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Check value ranges and cross-field consistency.
pub fn validate_config(config: &VaultConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rate_limit.capacity == 0 {
        errors.push(ValidationError::new("rate_limit.capacity", "must be greater than 0"));
    }
    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::new("rate_limit.window_ms", "must be greater than 0"));
    }
    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_threshold",
            "must be greater than 0",
        ));
    }
    if config.executor.max_delay_ms < config.executor.retry_delay_ms {
        errors.push(ValidationError::new(
            "executor.max_delay_ms",
            "must not be smaller than executor.retry_delay_ms",
        ));
    }
    if config.executor.deadline_ms == Some(0) {
        errors.push(ValidationError::new("executor.deadline_ms", "must be greater than 0"));
    }
    if config.maintenance.enabled {
        if config.maintenance.interval_secs == 0 {
            errors.push(ValidationError::new("maintenance.interval_secs", "must be greater than 0"));
        }
        if config.maintenance.max_backups == 0 {
            errors.push(ValidationError::new("maintenance.max_backups", "must be greater than 0"));
        }
        if config.maintenance.backup_dir.trim().is_empty() {
            errors.push(ValidationError::new("maintenance.backup_dir", "must not be empty"));
        }
    }
    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::new("http.request_timeout_secs", "must be greater than 0"));
    }
    if config.events.buffer == 0 {
        errors.push(ValidationError::new("events.buffer", "must be greater than 0"));
    }
    if !LOG_LEVELS.contains(&config.observability.log_level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level '{}'", config.observability.log_level),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("invalid socket address '{}'", config.observability.metrics_address),
        ));
    }

    for name in config.providers.priorities.keys() {
        if normalize_name(name).is_empty() {
            errors.push(ValidationError::new("providers.priorities", "provider name must not be empty"));
        }
    }

    let mut seen = HashSet::new();
    for (i, provider) in config.providers.memory.iter().enumerate() {
        let name = normalize_name(&provider.name);
        if name.is_empty() {
            errors.push(ValidationError::new(
                format!("providers.memory[{}].name", i),
                "must not be empty",
            ));
        } else if !seen.insert(name.clone()) {
            errors.push(ValidationError::new(
                format!("providers.memory[{}].name", i),
                format!("duplicate provider '{}'", name),
            ));
        }
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
    use crate::config::schema::MemoryProviderConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&VaultConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = VaultConfig::default();
        config.rate_limit.capacity = 0;
        config.circuit_breaker.failure_threshold = 0;
        config.observability.log_level = "loud".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors[0].field, "rate_limit.capacity");
        assert!(errors[2].to_string().contains("loud"));
    }

    #[test]
    fn test_duplicate_memory_providers() {
        let mut config = VaultConfig::default();
        for name in ["Essentials", "essentials "] {
            config.providers.memory.push(MemoryProviderConfig {
                name: name.into(),
                priority: None,
                balances: Default::default(),
            });
        }

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("duplicate"));
    }

    #[test]
    fn test_disabled_maintenance_skips_checks() {
        let mut config = VaultConfig::default();
        config.maintenance.enabled = false;
        config.maintenance.interval_secs = 0;
        assert!(validate_config(&config).is_ok());
    }
}
