//! Parsed multipart/form-data uploads.
//!
//! # Responsibilities
//! - Parse the whole form up front, bounded by `max_upload_bytes`
//! - Keep file parts in memory up to `upload_memory_bytes`, spool the rest
//!   to a temporary directory
//! - Hand out uploaded files by field name
//!
//! The temporary directory lives as long as the form, including a form whose
//! parse failed halfway. [`UploadForm::release`] removes it and reports
//! failures; dropping the form removes it silently.

use std::path::{Path, PathBuf};

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap},
};
use multer::{Constraints, Multipart, SizeLimit};
use serde::de::DeserializeOwned;
use tempfile::TempDir;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};

use crate::config::LimitsConfig;
use crate::error::UploadError;
use crate::http::codec::decode_first;

#[derive(Debug)]
enum PartData {
    Memory(Bytes),
    Disk(PathBuf),
}

#[derive(Debug)]
struct FilePart {
    name: String,
    file_name: String,
    content_type: Option<String>,
    data: PartData,
}

/// A parsed multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    files: Vec<FilePart>,
    spool: Option<TempDir>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `body` as multipart/form-data using the boundary in `headers`.
    ///
    /// On failure the form keeps whatever was spooled before the error, so
    /// the caller still owns the storage and must [`release`](Self::release) it.
    pub async fn read_from(
        &mut self,
        headers: &HeaderMap,
        body: Body,
        limits: &LimitsConfig,
    ) -> Result<(), UploadError> {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let boundary = multer::parse_boundary(content_type).map_err(UploadError::NotMultipart)?;

        let constraints = Constraints::new()
            .size_limit(SizeLimit::new().whole_stream(limits.max_upload_bytes));
        let mut multipart =
            Multipart::with_constraints(body.into_data_stream(), boundary, constraints);

        let spool_dir = limits.spool_dir.as_deref();
        let mut memory_left = limits.upload_memory_bytes;

        while let Some(mut field) = multipart.next_field().await.map_err(UploadError::Malformed)? {
            let name = field.name().unwrap_or_default().to_owned();
            let Some(file_name) = field.file_name().map(ToOwned::to_owned) else {
                // Plain form values are never file candidates.
                field.bytes().await.map_err(UploadError::Malformed)?;
                continue;
            };
            let content_type = field.content_type().map(ToString::to_string);

            let mut buffer = Vec::new();
            let mut spooled: Option<(PathBuf, File)> = None;

            while let Some(chunk) = field.chunk().await.map_err(UploadError::Malformed)? {
                if let Some((_, file)) = spooled.as_mut() {
                    file.write_all(&chunk).await.map_err(UploadError::Spool)?;
                } else if buffer.len() + chunk.len() > memory_left {
                    let path = self.next_spool_path(spool_dir)?;
                    let mut file = File::create(&path).await.map_err(UploadError::Spool)?;
                    file.write_all(&buffer).await.map_err(UploadError::Spool)?;
                    file.write_all(&chunk).await.map_err(UploadError::Spool)?;
                    buffer = Vec::new();
                    spooled = Some((path, file));
                } else {
                    buffer.extend_from_slice(&chunk);
                }
            }

            let data = match spooled {
                Some((path, mut file)) => {
                    file.flush().await.map_err(UploadError::Spool)?;
                    tracing::debug!(field = %name, path = ?path, "Upload part spooled to disk");
                    PartData::Disk(path)
                }
                None => {
                    memory_left -= buffer.len();
                    PartData::Memory(Bytes::from(buffer))
                }
            };

            self.files.push(FilePart {
                name,
                file_name,
                content_type,
                data,
            });
        }

        Ok(())
    }

    /// Find the first file part uploaded under `name`.
    pub fn file(&self, name: &str) -> Result<UploadedFile<'_>, UploadError> {
        self.files
            .iter()
            .find(|part| part.name == name)
            .map(|part| UploadedFile { part })
            .ok_or_else(|| UploadError::MissingFile(name.to_owned()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Directory holding spooled parts, if anything was spooled.
    pub fn spool_path(&self) -> Option<&Path> {
        self.spool.as_ref().map(TempDir::path)
    }

    /// Remove temporary storage, reporting any failure.
    pub fn release(self) -> std::io::Result<()> {
        match self.spool {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }

    fn next_spool_path(&mut self, parent: Option<&Path>) -> Result<PathBuf, UploadError> {
        let dir = match self.spool.take() {
            Some(dir) => dir,
            None => {
                let mut builder = tempfile::Builder::new();
                builder.prefix("upload-");
                match parent {
                    Some(parent) => builder.tempdir_in(parent),
                    None => builder.tempdir(),
                }
                .map_err(UploadError::Spool)?
            }
        };
        let path = dir.path().join(format!("part-{}", self.files.len()));
        self.spool = Some(dir);
        Ok(path)
    }
}

/// A file part borrowed from an [`UploadForm`].
#[derive(Debug, Clone, Copy)]
pub struct UploadedFile<'a> {
    part: &'a FilePart,
}

impl UploadedFile<'_> {
    pub fn field_name(&self) -> &str {
        &self.part.name
    }

    pub fn file_name(&self) -> &str {
        &self.part.file_name
    }

    pub fn content_type(&self) -> Option<&str> {
        self.part.content_type.as_deref()
    }

    /// Whether the part was spooled to temporary storage.
    pub fn is_spooled(&self) -> bool {
        matches!(self.part.data, PartData::Disk(_))
    }

    /// Read the whole file. A spooled file is opened and closed within the call.
    pub async fn bytes(&self) -> Result<Bytes, UploadError> {
        match &self.part.data {
            PartData::Memory(bytes) => Ok(bytes.clone()),
            PartData::Disk(path) => {
                let mut file = File::open(path).await.map_err(|source| self.read_error(source))?;
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)
                    .await
                    .map_err(|source| self.read_error(source))?;
                Ok(Bytes::from(buffer))
            }
        }
    }

    /// Decode the file contents as JSON.
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, UploadError> {
        let bytes = self.bytes().await?;
        decode_first(&bytes).map_err(|source| UploadError::Json {
            name: self.part.name.clone(),
            source,
        })
    }

    fn read_error(&self, source: std::io::Error) -> UploadError {
        UploadError::Read {
            name: self.part.name.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde::Deserialize;

    const BOUNDARY: &str = "xxx";

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=xxx"),
        );
        headers
    }

    fn file_part(name: &str, content: &str) -> String {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{name}\"; filename=\"{name}.json\"\r\n\
             Content-Type: application/json\r\n\r\n\
             {content}\r\n"
        )
    }

    fn value_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{name}\"\r\n\r\n\
             {value}\r\n"
        )
    }

    fn finish(parts: &[String]) -> Body {
        Body::from(format!("{}--{BOUNDARY}--\r\n", parts.concat()))
    }

    async fn parse(
        headers: &HeaderMap,
        body: Body,
        limits: &LimitsConfig,
    ) -> Result<UploadForm, UploadError> {
        let mut form = UploadForm::new();
        form.read_from(headers, body, limits).await?;
        Ok(form)
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        #[serde(rename = "Value")]
        value: i64,
    }

    #[tokio::test]
    async fn test_parse_in_memory_file() {
        let body = finish(&[file_part("payload", r#"{"Value":42}"#)]);
        let form = parse(&headers(), body, &LimitsConfig::default())
            .await
            .unwrap();

        assert_eq!(form.len(), 1);
        let file = form.file("payload").unwrap();
        assert_eq!(file.file_name(), "payload.json");
        assert_eq!(file.content_type(), Some("application/json"));
        assert!(!file.is_spooled());

        let payload: Payload = file.read_json().await.unwrap();
        assert_eq!(payload, Payload { value: 42 });
        form.release().unwrap();
    }

    #[tokio::test]
    async fn test_value_parts_are_not_files() {
        let body = finish(&[value_part("payload", r#"{"Value":1}"#)]);
        let form = parse(&headers(), body, &LimitsConfig::default())
            .await
            .unwrap();

        assert!(form.is_empty());
        assert!(matches!(form.file("payload"), Err(UploadError::MissingFile(_))));
    }

    #[tokio::test]
    async fn test_large_part_spools_and_release_removes_it() {
        let limits = LimitsConfig {
            upload_memory_bytes: 4,
            ..LimitsConfig::default()
        };
        let body = finish(&[
            file_part("small", "{}"),
            file_part("payload", r#"{"Value":7}"#),
        ]);
        let form = parse(&headers(), body, &limits).await.unwrap();

        assert!(!form.file("small").unwrap().is_spooled());
        let file = form.file("payload").unwrap();
        assert!(file.is_spooled());
        let payload: Payload = file.read_json().await.unwrap();
        assert_eq!(payload.value, 7);

        let dir = form.spool_path().unwrap().to_path_buf();
        assert!(dir.exists());
        form.release().unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_spool_dir_is_configurable() {
        let parent = tempfile::tempdir().unwrap();
        let limits = LimitsConfig {
            upload_memory_bytes: 1,
            spool_dir: Some(parent.path().to_path_buf()),
            ..LimitsConfig::default()
        };
        let body = finish(&[file_part("payload", r#"{"Value":3}"#)]);
        let form = parse(&headers(), body, &limits).await.unwrap();

        assert!(form.spool_path().unwrap().starts_with(parent.path()));
        form.release().unwrap();
        assert_eq!(std::fs::read_dir(parent.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_release_reports_missing_spool_dir() {
        let limits = LimitsConfig {
            upload_memory_bytes: 1,
            ..LimitsConfig::default()
        };
        let body = finish(&[file_part("payload", r#"{"Value":7}"#)]);
        let form = parse(&headers(), body, &limits).await.unwrap();

        std::fs::remove_dir_all(form.spool_path().unwrap()).unwrap();
        assert!(form.release().is_err());
    }

    #[tokio::test]
    async fn test_failed_parse_keeps_spooled_parts_for_release() {
        let limits = LimitsConfig {
            upload_memory_bytes: 1,
            ..LimitsConfig::default()
        };
        // Second part never terminates.
        let body = Body::from(format!(
            "{}--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"x\"; filename=\"x\"\r\n\r\nabc",
            file_part("payload", r#"{"Value":7}"#)
        ));
        let mut form = UploadForm::new();
        let err = form.read_from(&headers(), body, &limits).await.unwrap_err();
        assert!(matches!(err, UploadError::Malformed(_)));

        let dir = form.spool_path().unwrap().to_path_buf();
        assert!(dir.exists());
        form.release().unwrap();
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_trailing_data_after_json_is_ignored() {
        let body = finish(&[file_part("payload", r#"{"Value":1} {"Value":2}"#)]);
        let form = parse(&headers(), body, &LimitsConfig::default()).await.unwrap();
        let payload: Payload = form.file("payload").unwrap().read_json().await.unwrap();
        assert_eq!(payload.value, 1);
    }

    #[tokio::test]
    async fn test_missing_boundary() {
        let body = finish(&[file_part("payload", "{}")]);
        let err = parse(&HeaderMap::new(), body, &LimitsConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::NotMultipart(_)));
    }

    #[tokio::test]
    async fn test_stream_limit() {
        let limits = LimitsConfig {
            max_upload_bytes: 16,
            ..LimitsConfig::default()
        };
        let body = finish(&[file_part("payload", r#"{"Value":42}"#)]);
        let err = parse(&headers(), body, &limits).await.unwrap_err();
        assert!(matches!(err, UploadError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_invalid_json_in_file() {
        let body = finish(&[file_part("payload", "not json")]);
        let form = parse(&headers(), body, &LimitsConfig::default())
            .await
            .unwrap();
        let err = form.file("payload").unwrap().read_json::<Payload>().await.unwrap_err();
        assert!(matches!(err, UploadError::Json { ref name, .. } if name == "payload"));
        assert!(err.is_client_error());
    }
}
