//! Error types produced while handling an exchange.
//!
//! None of these leave the helper operations: they are handed to the
//! [`ErrorLog`](crate::observability::ErrorLog) sink and turned into a status
//! code on the response.

use thiserror::Error;

/// Errors reading or decoding a whole request body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The body stream was already taken by an earlier operation.
    #[error("request body already consumed")]
    Consumed,

    /// The body could not be read, or exceeded the configured limit.
    #[error("failed to read request body: {0}")]
    Read(#[source] axum::Error),

    /// The body was read but is not valid JSON for the destination type.
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors from the multipart upload pipeline.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The body stream was already taken by an earlier operation.
    #[error("request body already consumed")]
    Consumed,

    /// The request does not declare a multipart/form-data boundary.
    #[error("request is not multipart/form-data: {0}")]
    NotMultipart(#[source] multer::Error),

    /// The multipart stream is malformed, truncated or too large.
    #[error("malformed multipart body: {0}")]
    Malformed(#[source] multer::Error),

    /// A file part could not be spooled to temporary storage.
    #[error("failed to spool upload to disk: {0}")]
    Spool(#[source] std::io::Error),

    /// No file part with the requested name was uploaded.
    #[error("no file named {0:?} in upload")]
    MissingFile(String),

    /// A spooled file part could not be read back.
    #[error("failed to read uploaded file {name:?}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// The file part is not valid JSON for the destination type.
    #[error("invalid JSON in uploaded file {name:?}: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl UploadError {
    /// Whether the failure is the client's fault (400) rather than ours (500).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            UploadError::MissingFile(_) | UploadError::Read { .. } | UploadError::Json { .. }
        )
    }
}
