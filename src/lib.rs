//! JSON request/response helpers for axum handlers.
//!
//! An [`Exchange`] wraps one incoming request and the response being built
//! for it. Its helpers decode and encode JSON and, when something fails,
//! write the matching status code and log the error through an [`ErrorLog`]
//! sink:
//!
//! ```no_run
//! use axum::{body::Body, http::Request, response::{IntoResponse, Response}};
//! use exchange_kit::{Exchange, JsonExchange, LogMessage, TracingLog};
//!
//! #[derive(serde::Deserialize, serde::Serialize, Default)]
//! struct Order { id: u64 }
//!
//! async fn create_order(request: Request<Body>) -> Response {
//!     let mut exchange = Exchange::new(request, TracingLog);
//!     let mut order = Order::default();
//!
//!     if exchange.decode_request_body(&mut order, "decode order").await.is_handled() {
//!         return exchange.into_response();
//!     }
//!
//!     let _ = exchange.encode_response_body(&order, LogMessage::new("encode order").field("id", order.id));
//!     exchange.into_response()
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod observability;

pub use config::{ExchangeConfig, LimitsConfig};
pub use error::{BodyError, UploadError};
pub use http::{BufferedResponse, Exchange, JsonExchange, Outcome, UploadForm};
pub use observability::{ErrorLog, LogMessage, MemoryLog, Severity, TracingLog};
