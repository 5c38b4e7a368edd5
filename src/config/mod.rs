//! Configuration system
//!
//! Loads ~/.config/graphcache/config.yaml with support for:
//! - Configured root ids
//! - Result canonicalization
//! - Result cache capacity

mod cache_config;
pub mod validation;

pub use cache_config::CacheConfig;
pub use validation::{validate_config, validate_config_result, ValidationError};
