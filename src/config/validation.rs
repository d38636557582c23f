//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check addresses and URLs parse
//! - Validate value ranges (timeouts > 0, confirmations > 0)
//!
//! Returns all validation errors, not just the first.

use alloy::primitives::Address;
use std::fmt;

use crate::config::schema::AppConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.network.chain_id == 0 {
        errors.push(ValidationError::new("network.chain_id", "must be non-zero"));
    }

    if let Err(e) = config.network.rpc_url.parse::<url::Url>() {
        errors.push(ValidationError::new(
            "network.rpc_url",
            format!("invalid URL '{}': {}", config.network.rpc_url, e),
        ));
    }

    for failover in &config.network.failover_urls {
        if let Err(e) = failover.parse::<url::Url>() {
            errors.push(ValidationError::new(
                "network.failover_urls",
                format!("invalid URL '{}': {}", failover, e),
            ));
        }
    }

    if config.network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be > 0"));
    }

    if let Err(e) = config.contract.address.parse::<Address>() {
        errors.push(ValidationError::new(
            "contract.address",
            format!("invalid address '{}': {}", config.contract.address, e),
        ));
    }

    if config.contract.event_poll_interval_ms == 0 {
        errors.push(ValidationError::new("contract.event_poll_interval_ms", "must be > 0"));
    }

    if config.contract.max_poll_failures == 0 {
        errors.push(ValidationError::new("contract.max_poll_failures", "must be > 0"));
    }

    if config.confirmation.blocks == 0 {
        errors.push(ValidationError::new("confirmation.blocks", "must be at least 1"));
    }

    if config.confirmation.timeout_secs == 0 {
        errors.push(ValidationError::new("confirmation.timeout_secs", "must be > 0"));
    }

    if config.ui.filler_interval_ms == 0 {
        errors.push(ValidationError::new("ui.filler_interval_ms", "must be > 0"));
    }

    if config.wallet.private_key_env.is_empty() {
        errors.push(ValidationError::new("wallet.private_key_env", "must not be empty"));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "observability.metrics_address",
                format!("invalid socket address '{}'", addr),
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

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.contract.address = "not-an-address".to_string();
        config.confirmation.blocks = 0;
        config.network.rpc_url = "::bad::".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(errors.len(), 3);
        assert!(fields.contains(&"contract.address"));
        assert!(fields.contains(&"confirmation.blocks"));
        assert!(fields.contains(&"network.rpc_url"));
    }

    #[test]
    fn test_bad_metrics_address() {
        let mut config = AppConfig::default();
        config.observability.metrics_address = Some("localhost".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}
