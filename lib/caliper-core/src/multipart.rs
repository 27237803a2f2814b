//! Multipart form-data body accumulation.

use bytes::{BufMut, Bytes, BytesMut};
use http::HeaderMap;

use crate::{Error, MediaType, RequestBody, Result};

/// A single part in a multipart body.
#[derive(Debug, Clone)]
pub struct Part {
    name: String,
    filename: Option<String>,
    content_type: Option<MediaType>,
    headers: HeaderMap,
    data: Bytes,
}

impl Part {
    /// Create a part with the given field name and payload.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            content_type: None,
            headers: HeaderMap::new(),
            data: data.into(),
        }
    }

    /// Create a text part (`text/plain; charset=utf-8`).
    #[must_use]
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, Bytes::from(value.into())).with_content_type(MediaType::text_plain_utf8())
    }

    /// Create a binary part (`application/octet-stream`).
    #[must_use]
    pub fn bytes(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self::new(name, data).with_content_type(MediaType::octet_stream())
    }

    /// Create a file part; the content type is guessed from the filename
    /// extension, falling back to `application/octet-stream`.
    #[must_use]
    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let filename = filename.into();
        let content_type = guess_content_type(&filename);
        Self::new(name, data)
            .with_filename(filename)
            .with_content_type(content_type)
    }

    /// Set the filename.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the content type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: MediaType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Attach extra headers carried verbatim into the part.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filename, if set.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Content type, if set.
    #[must_use]
    pub const fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    /// Payload bytes.
    #[must_use]
    pub const fn data(&self) -> &Bytes {
        &self.data
    }
}

fn guess_content_type(filename: &str) -> MediaType {
    let extension = filename
        .rsplit('.')
        .next()
        .map(str::to_lowercase)
        .unwrap_or_default();

    let mime = match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "json" => "application/json",
        "xml" => "application/xml",
        "csv" => "text/csv",
        "zip" => "application/zip",
        "gz" | "gzip" => "application/gzip",
        "mp3" => "audio/mpeg",
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    };
    MediaType::new_unchecked(mime.to_owned())
}

/// Accumulates parts into a `multipart/form-data` body.
#[derive(Debug, Clone)]
pub struct MultipartBody {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MultipartBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartBody {
    /// Create an empty accumulator with a generated boundary.
    #[must_use]
    pub fn new() -> Self {
        Self {
            boundary: generate_boundary(),
            parts: Vec::new(),
        }
    }

    /// Create an empty accumulator with an explicit boundary.
    ///
    /// The boundary must not occur inside any part payload.
    #[must_use]
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Append a part.
    pub fn add_part(&mut self, part: Part) {
        self.parts.push(part);
    }

    /// The boundary string.
    #[must_use]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The accumulated parts.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Returns `true` if no parts were accumulated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Encode the accumulated parts into a request body.
    ///
    /// # Errors
    ///
    /// Fails when no parts were added; a multipart body must carry at least
    /// one part.
    pub fn build(self) -> Result<RequestBody> {
        if self.parts.is_empty() {
            return Err(Error::invalid_state(
                "multipart body must have at least one part",
            ));
        }
        let content_type = MediaType::multipart_form_data(&self.boundary);
        let encoded = self.encode();
        Ok(RequestBody::new(Some(content_type), encoded))
    }

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();

        for part in &self.parts {
            buf.put_slice(b"--");
            buf.put_slice(self.boundary.as_bytes());
            buf.put_slice(b"\r\n");

            buf.put_slice(b"Content-Disposition: form-data; name=\"");
            buf.put_slice(part.name.as_bytes());
            buf.put_slice(b"\"");
            if let Some(filename) = &part.filename {
                buf.put_slice(b"; filename=\"");
                buf.put_slice(filename.as_bytes());
                buf.put_slice(b"\"");
            }
            buf.put_slice(b"\r\n");

            if let Some(content_type) = &part.content_type {
                buf.put_slice(b"Content-Type: ");
                buf.put_slice(content_type.as_str().as_bytes());
                buf.put_slice(b"\r\n");
            }

            for (name, value) in &part.headers {
                buf.put_slice(name.as_str().as_bytes());
                buf.put_slice(b": ");
                buf.put_slice(value.as_bytes());
                buf.put_slice(b"\r\n");
            }

            buf.put_slice(b"\r\n");
            buf.put_slice(&part.data);
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"--");
        buf.put_slice(self.boundary.as_bytes());
        buf.put_slice(b"--\r\n");

        buf.freeze()
    }
}

fn generate_boundary() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);

    format!("----CaliperBoundary{timestamp:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_constructors() {
        let part = Part::text("field", "value");
        assert_eq!(part.name(), "field");
        assert_eq!(part.data().as_ref(), b"value");
        assert_eq!(
            part.content_type().map(MediaType::essence),
            Some("text/plain")
        );
        assert!(part.filename().is_none());

        let part = Part::file("upload", "photo.jpg", vec![0xFF, 0xD8]);
        assert_eq!(part.filename(), Some("photo.jpg"));
        assert_eq!(part.content_type().map(MediaType::as_str), Some("image/jpeg"));
    }

    #[test]
    fn empty_multipart_is_rejected() {
        let err = MultipartBody::new().build().expect_err("should fail");
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn multipart_encoding() {
        let mut body = MultipartBody::with_boundary("boundary123");
        body.add_part(Part::text("field", "value"));

        let built = body.build().expect("build");
        assert_eq!(
            built.content_type().map(MediaType::as_str),
            Some("multipart/form-data; boundary=boundary123")
        );

        let encoded = String::from_utf8_lossy(built.data()).into_owned();
        assert!(encoded.contains("--boundary123\r\n"));
        assert!(encoded.contains("Content-Disposition: form-data; name=\"field\"\r\n"));
        assert!(encoded.contains("\r\nvalue\r\n"));
        assert!(encoded.ends_with("--boundary123--\r\n"));
    }

    #[test]
    fn multipart_encoding_with_filename_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::HeaderName::from_static("content-transfer-encoding"),
            http::HeaderValue::from_static("binary"),
        );

        let mut body = MultipartBody::with_boundary("b");
        body.add_part(
            Part::file("upload", "data.json", "{}").with_headers(headers),
        );

        let built = body.build().expect("build");
        let encoded = String::from_utf8_lossy(built.data()).into_owned();
        assert!(encoded.contains("name=\"upload\"; filename=\"data.json\""));
        assert!(encoded.contains("Content-Type: application/json\r\n"));
        assert!(encoded.contains("content-transfer-encoding: binary\r\n"));
    }

    #[test]
    fn generated_boundaries_carry_the_prefix() {
        let body = MultipartBody::new();
        assert!(body.boundary().starts_with("----CaliperBoundary"));
    }
}
