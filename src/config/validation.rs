//! Configuration validation
//!
//! Validates cache configuration for correctness:
//! - At least one root id
//! - No blank or duplicate root ids
//! - A usable result cache size

use super::cache_config::CacheConfig;
use crate::CacheError;
use std::collections::HashSet;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
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

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Validate a cache configuration
pub fn validate_config(config: &CacheConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if config.root_ids.is_empty() {
        errors.push(ValidationError::new(
            "root_ids",
            "At least one root id must be defined",
        ));
    }

    let mut seen = HashSet::new();
    for id in &config.root_ids {
        if id.trim().is_empty() {
            errors.push(ValidationError::new("root_ids", "Root ids cannot be blank"));
        } else if !seen.insert(id) {
            errors.push(ValidationError::new(
                "root_ids",
                format!("Duplicate root id: {}", id),
            ));
        }
    }

    if config.result_cache_max_size == 0 {
        errors.push(ValidationError::new(
            "result_cache_max_size",
            "Result cache size must be greater than 0",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate and convert errors to a CacheError
pub fn validate_config_result(config: &CacheConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        CacheError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}
