//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ExchangeConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;

use crate::config::schema::ExchangeConfig;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("limits.{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("limits.upload_memory_bytes ({memory}) exceeds limits.max_upload_bytes ({max})")]
    MemoryExceedsUpload { memory: usize, max: u64 },

    #[error("observability.log_level {0:?} is not one of trace, debug, info, warn, error")]
    UnknownLogLevel(String),
}

pub fn validate_config(config: &ExchangeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let limits = &config.limits;

    if limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_body_bytes"));
    }
    if limits.upload_memory_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("upload_memory_bytes"));
    }
    if limits.max_upload_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_upload_bytes"));
    }
    if limits.upload_memory_bytes as u64 > limits.max_upload_bytes {
        errors.push(ValidationError::MemoryExceedsUpload {
            memory: limits.upload_memory_bytes,
            max: limits.max_upload_bytes,
        });
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::UnknownLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
