//! HTTP exchange handling subsystem.
//!
//! # Data Flow
//! ```text
//! axum handler receives Request<Body>
//!     → exchange.rs (Exchange::new with an ErrorLog sink)
//!     → decode_request_body / decode_uploaded_file (multipart.rs)
//!     → handler logic
//!     → encode_response_body / set_download_filename
//!     → response.rs (BufferedResponse → axum Response)
//! ```
//!
//! Any helper returning `Outcome::Handled` has already written the error
//! status; the handler returns `exchange.into_response()` straight away.

pub mod codec;
pub mod exchange;
pub mod multipart;
pub mod outcome;
pub mod response;

pub use exchange::{Exchange, JsonExchange};
pub use multipart::{UploadForm, UploadedFile};
pub use outcome::Outcome;
pub use response::BufferedResponse;
