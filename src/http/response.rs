//! Response under construction for one exchange.
//!
//! # Design Decisions
//! - Status, headers and body are buffered until the handler returns
//! - The first status write wins; later writes are ignored and logged
//! - Body bytes never commit the status, so a failed encode can still
//!   report 500 after a partial body was written

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the response status.
    ///
    /// Returns `false` when a status was already written, in which case the
    /// earlier one is kept.
    pub fn write_status(&mut self, status: StatusCode) -> bool {
        match self.status {
            Some(current) => {
                tracing::warn!(
                    current = %current,
                    ignored = %status,
                    "Response status already written"
                );
                false
            }
            None => {
                self.status = Some(status);
                true
            }
        }
    }

    /// The status that will be sent: the written one, or 200.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// The explicitly written status, if any.
    pub fn written_status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set a header, replacing any previous value.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_mut(&mut self) -> &mut Vec<u8> {
        &mut self.body
    }
}

impl IntoResponse for BufferedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn test_default_status_is_ok() {
        let response = BufferedResponse::new();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.written_status(), None);
    }

    #[test]
    fn test_first_status_wins() {
        let mut response = BufferedResponse::new();
        assert!(response.write_status(StatusCode::BAD_REQUEST));
        assert!(!response.write_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_into_response_carries_everything() {
        let mut response = BufferedResponse::new();
        response.write_status(StatusCode::CREATED);
        response.set_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        response.body_mut().extend_from_slice(b"done");

        let response = response.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"done");
    }
}
