//! Error types for graphcache
//!
//! Dangling references, unknown ids in `release`/`evict` and idle collections
//! are normal states and never surface here. Uses thiserror for ergonomic
//! error handling.

use thiserror::Error;

/// Result type alias for graphcache operations
pub type Result<T> = std::result::Result<T, CacheError>;

/// Error type for graphcache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A caller passed a value the cache cannot use
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Snapshot loading/restoring errors
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// A user-supplied read or merge function failed
    #[error("Policy function for {typename}.{field_name} failed: {source}")]
    Policy {
        typename: String,
        field_name: String,
        #[source]
        source: anyhow::Error,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Field key decoding errors
    #[error("Field key error: {0}")]
    FieldKey(#[from] fieldkey::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl CacheError {
    /// Wrap a failure raised inside a read or merge function
    pub fn policy(
        typename: impl Into<String>,
        field_name: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::Policy {
            typename: typename.into(),
            field_name: field_name.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_error_display() {
        let err = CacheError::policy("Query", "feed", anyhow::anyhow!("bad offset"));
        assert_eq!(
            err.to_string(),
            "Policy function for Query.feed failed: bad offset"
        );
    }

    #[test]
    fn test_from_field_key_error() {
        let err: CacheError = fieldkey::split_key("feed(").unwrap_err().into();
        assert!(matches!(err, CacheError::FieldKey(_)));
    }
}
