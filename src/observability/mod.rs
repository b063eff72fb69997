//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Failed exchange:
//!     → Severity::for_status (warning below 500, error from 500)
//!     → ErrorLog sink (TracingLog in production, MemoryLog in tests)
//!     → logging.rs subscriber (stdout, plain or JSON)
//! ```

pub mod logging;
pub mod sink;

pub use sink::{ErrorLog, LogMessage, LogRecord, MemoryLog, Severity, TracingLog};
