//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for request/response helpers.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ExchangeConfig {
    /// Body and upload size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Size limits applied while reading requests.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of a JSON request body in bytes.
    pub max_body_bytes: usize,

    /// Bytes of uploaded file parts kept in memory before spooling to disk.
    pub upload_memory_bytes: usize,

    /// Maximum size of a whole multipart request in bytes.
    pub max_upload_bytes: u64,

    /// Parent directory for spooled upload parts; the system temp dir if unset.
    pub spool_dir: Option<PathBuf>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10_000_000,
            upload_memory_bytes: 10_000_000,
            max_upload_bytes: 32 * 1024 * 1024,
            spool_dir: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of plain text.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
