//! JSON decode/encode helpers bound to one request/response pair.
//!
//! # Responsibilities
//! - Decode the request body (or an uploaded file) as JSON
//! - Encode a value as the JSON response body
//! - Turn "did this fail?" into "write a status and log the error"
//!
//! # Design Decisions
//! - Every helper absorbs its own error and reports an [`Outcome`]
//! - Log severity follows the status class, never the caller
//! - The response is encoded straight into the body buffer. If serialization
//!   fails halfway the partial body stays and the status becomes 500; this is
//!   accepted rather than paying for a second buffer on large responses.

use std::fmt;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, request, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{de::DeserializeOwned, Serialize};

use crate::config::LimitsConfig;
use crate::error::{BodyError, UploadError};
use crate::http::codec::decode_first;
use crate::http::multipart::UploadForm;
use crate::http::outcome::Outcome;
use crate::http::response::BufferedResponse;
use crate::observability::{ErrorLog, LogMessage, Severity, TracingLog};

/// Request/response helpers for a single exchange.
#[async_trait]
pub trait JsonExchange {
    /// Decode the whole request body as JSON into `dst`.
    ///
    /// The body stream is released when this returns. On failure a 400 is
    /// written and the error logged as a warning.
    async fn decode_request_body<T, M>(&mut self, dst: &mut T, message: M) -> Outcome
    where
        T: DeserializeOwned + Send,
        M: Into<LogMessage> + Send;

    /// Set `Content-Type: application/json` and encode `src` as the body.
    ///
    /// On failure a 500 is written and the error logged. Bytes serialized
    /// before the failure remain in the body.
    fn encode_response_body<T, M>(&mut self, src: &T, message: M) -> Outcome
    where
        T: Serialize + ?Sized,
        M: Into<LogMessage>;

    /// Parse a multipart upload and decode the file part `field_name` as JSON.
    ///
    /// An unparseable form is a 500; a missing file part or bad JSON inside
    /// it is a 400. Spooled parts are removed before this returns, and a
    /// failed removal is logged without changing the outcome.
    async fn decode_uploaded_file<T, M>(
        &mut self,
        field_name: &str,
        dst: &mut T,
        message: M,
    ) -> Outcome
    where
        T: DeserializeOwned + Send,
        M: Into<LogMessage> + Send;

    /// Mark the response as an attachment named `name`.
    fn set_download_filename<D: fmt::Display>(&mut self, name: D);

    /// Write `status` and log `err` if there is one.
    ///
    /// Severity is error for 5xx and above, warning otherwise.
    fn write_status_if_error<E, M>(
        &mut self,
        err: Option<E>,
        status: StatusCode,
        message: M,
    ) -> Outcome
    where
        E: std::error::Error + 'static,
        M: Into<LogMessage>;

    /// Same as [`write_status_if_error`](Self::write_status_if_error) with 400.
    fn write_400_if_error<E, M>(&mut self, err: Option<E>, message: M) -> Outcome
    where
        E: std::error::Error + 'static,
        M: Into<LogMessage>,
    {
        self.write_status_if_error(err, StatusCode::BAD_REQUEST, message)
    }

    /// Same as [`write_status_if_error`](Self::write_status_if_error) with 500.
    fn write_500_if_error<E, M>(&mut self, err: Option<E>, message: M) -> Outcome
    where
        E: std::error::Error + 'static,
        M: Into<LogMessage>,
    {
        self.write_status_if_error(err, StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// One in-flight request and the response being built for it.
#[derive(Debug)]
pub struct Exchange<L = TracingLog> {
    head: request::Parts,
    body: Option<Body>,
    response: BufferedResponse,
    limits: LimitsConfig,
    logger: L,
}

impl<L: ErrorLog> Exchange<L> {
    pub fn new(request: Request<Body>, logger: L) -> Self {
        Self::with_limits(request, logger, LimitsConfig::default())
    }

    pub fn with_limits(request: Request<Body>, logger: L, limits: LimitsConfig) -> Self {
        let (head, body) = request.into_parts();
        Self {
            head,
            body: Some(body),
            response: BufferedResponse::new(),
            limits,
            logger,
        }
    }

    /// Request line and headers.
    pub fn request(&self) -> &request::Parts {
        &self.head
    }

    pub fn response(&self) -> &BufferedResponse {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut BufferedResponse {
        &mut self.response
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    async fn read_json_body<T: DeserializeOwned>(&mut self) -> Result<T, BodyError> {
        let body = self.body.take().ok_or(BodyError::Consumed)?;
        let bytes = axum::body::to_bytes(body, self.limits.max_body_bytes)
            .await
            .map_err(BodyError::Read)?;
        Ok(decode_first(&bytes)?)
    }

    async fn read_upload(&mut self, form: &mut UploadForm) -> Result<(), UploadError> {
        let body = self.body.take().ok_or(UploadError::Consumed)?;
        form.read_from(&self.head.headers, body, &self.limits).await
    }
}

fn upload_stage(err: &UploadError) -> &'static str {
    match err {
        UploadError::MissingFile(_) => "locate",
        UploadError::Read { .. } | UploadError::Json { .. } => "decode",
        _ => "parse",
    }
}

#[async_trait]
impl<L: ErrorLog> JsonExchange for Exchange<L> {
    async fn decode_request_body<T, M>(&mut self, dst: &mut T, message: M) -> Outcome
    where
        T: DeserializeOwned + Send,
        M: Into<LogMessage> + Send,
    {
        let result = self.read_json_body::<T>().await.map(|value| *dst = value);
        self.write_400_if_error(result.err(), message)
    }

    fn encode_response_body<T, M>(&mut self, src: &T, message: M) -> Outcome
    where
        T: Serialize + ?Sized,
        M: Into<LogMessage>,
    {
        self.response.set_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );

        let body = self.response.body_mut();
        let result = serde_json::to_writer(&mut *body, src).map(|()| body.push(b'\n'));

        self.write_500_if_error(result.err(), message)
    }

    async fn decode_uploaded_file<T, M>(
        &mut self,
        field_name: &str,
        dst: &mut T,
        message: M,
    ) -> Outcome
    where
        T: DeserializeOwned + Send,
        M: Into<LogMessage> + Send,
    {
        let message = message.into().field("field", field_name);

        let mut form = UploadForm::new();
        let result = match self.read_upload(&mut form).await {
            Ok(()) => match form.file(field_name) {
                Ok(file) => file.read_json::<T>().await.map(|value| *dst = value),
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        // Spooled parts are released whether or not parsing finished.
        if let Err(err) = form.release() {
            self.logger
                .error(&message.clone().field("stage", "release"), &err);
        }

        let Err(err) = result else {
            return Outcome::Continue;
        };
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let stage = upload_stage(&err);
        self.write_status_if_error(Some(err), status, message.field("stage", stage))
    }

    fn set_download_filename<D: fmt::Display>(&mut self, name: D) {
        let name: String = name
            .to_string()
            .chars()
            .filter(|c| !c.is_control())
            .collect();
        let value = format!(
            "attachment; filename=\"{}\"",
            name.replace('\\', "\\\\").replace('"', "\\\"")
        );

        match HeaderValue::from_str(&value) {
            Ok(value) => self.response.set_header(header::CONTENT_DISPOSITION, value),
            Err(e) => tracing::debug!(error = %e, "Download filename is not a valid header value"),
        }
    }

    fn write_status_if_error<E, M>(
        &mut self,
        err: Option<E>,
        status: StatusCode,
        message: M,
    ) -> Outcome
    where
        E: std::error::Error + 'static,
        M: Into<LogMessage>,
    {
        let Some(err) = err else {
            return Outcome::Continue;
        };

        self.response.write_status(status);
        self.logger
            .log(Severity::for_status(status), &message.into(), &err);
        Outcome::Handled
    }
}

impl<L> IntoResponse for Exchange<L> {
    fn into_response(self) -> Response {
        self.response.into_response()
    }
}
