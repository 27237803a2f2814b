//! Transport-level and adapted HTTP responses.

use http::{HeaderMap, StatusCode};

use crate::{Error, ResponseBody, Result};

/// The raw response handed over by the transport.
#[derive(Debug)]
pub struct RawResponse {
    status: StatusCode,
    message: Option<String>,
    headers: HeaderMap,
    body: ResponseBody,
}

impl RawResponse {
    /// Create a raw response.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> Self {
        Self {
            status,
            message: None,
            headers,
            body,
        }
    }

    /// Create a raw response from all parts, including the transport's
    /// status text.
    #[must_use]
    pub fn from_parts(
        status: StatusCode,
        message: Option<String>,
        headers: HeaderMap,
        body: ResponseBody,
    ) -> Self {
        Self {
            status,
            message,
            headers,
            body,
        }
    }

    /// Attach a transport-reported status text.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// HTTP status message; the canonical reason phrase when the transport
    /// reported none.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .or_else(|| self.status.canonical_reason())
            .unwrap_or_default()
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The response body.
    #[must_use]
    pub const fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// Status is in `[200, 300)`.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.status.is_success()
    }

    /// Consume into `(status, message, headers, body)`.
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, Option<String>, HeaderMap, ResponseBody) {
        (self.status, self.message, self.headers, self.body)
    }
}

/// An adapted HTTP response: raw status and headers paired with exactly one
/// of a decoded body (success) or a raw error body (failure).
#[derive(Debug)]
pub struct Response<T> {
    raw: RawResponse,
    body: Option<T>,
    error_body: Option<ResponseBody>,
}

impl<T> Response<T> {
    /// Create a successful response with an optional decoded body.
    ///
    /// # Errors
    ///
    /// Fails when `raw` does not carry a 2xx status.
    pub fn success(body: Option<T>, raw: RawResponse) -> Result<Self> {
        if !raw.is_successful() {
            return Err(Error::invalid_state(format!(
                "success response requires a 2xx status, got {}",
                raw.status()
            )));
        }
        Ok(Self {
            raw,
            body,
            error_body: None,
        })
    }

    /// Create an error response with a raw error body.
    ///
    /// # Errors
    ///
    /// Fails when `raw` carries a 2xx status.
    pub fn error(error_body: ResponseBody, raw: RawResponse) -> Result<Self> {
        if raw.is_successful() {
            return Err(Error::invalid_state(format!(
                "error response requires a non-2xx status, got {}",
                raw.status()
            )));
        }
        Ok(Self {
            raw,
            body: None,
            error_body: Some(error_body),
        })
    }

    /// The raw transport response (its body replaced by a placeholder).
    #[must_use]
    pub const fn raw(&self) -> &RawResponse {
        &self.raw
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.raw.status()
    }

    /// HTTP status message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.raw.message()
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        self.raw.headers()
    }

    /// Status is in `[200, 300)`.
    #[must_use]
    pub fn is_successful(&self) -> bool {
        self.raw.is_successful()
    }

    /// The decoded body of a successful response.
    #[must_use]
    pub const fn body(&self) -> Option<&T> {
        self.body.as_ref()
    }

    /// Consume into the decoded body.
    #[must_use]
    pub fn into_body(self) -> Option<T> {
        self.body
    }

    /// The raw body of an unsuccessful response.
    #[must_use]
    pub const fn error_body(&self) -> Option<&ResponseBody> {
        self.error_body.as_ref()
    }

    /// Consume into the raw error body.
    #[must_use]
    pub fn into_error_body(self) -> Option<ResponseBody> {
        self.error_body
    }

    /// Transform the decoded body.
    pub fn map_body<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            raw: self.raw,
            body: self.body.map(f),
            error_body: self.error_body,
        }
    }

    /// Transform the decoded body with a fallible function.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `f`.
    pub fn try_map_body<U, E, F>(self, f: F) -> std::result::Result<Response<U>, E>
    where
        F: FnOnce(T) -> std::result::Result<U, E>,
    {
        let body = self.body.map(f).transpose()?;
        Ok(Response {
            raw: self.raw,
            body,
            error_body: self.error_body,
        })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn raw(status: u16, body: ResponseBody) -> RawResponse {
        RawResponse::new(
            StatusCode::from_u16(status).expect("status"),
            HeaderMap::new(),
            body,
        )
    }

    #[test]
    fn raw_response_message_falls_back_to_canonical_reason() {
        let response = raw(404, ResponseBody::no_content(None, None));
        assert_eq!(response.message(), "Not Found");

        let response = response.with_message("Missing");
        assert_eq!(response.message(), "Missing");
    }

    #[test]
    fn success_response() {
        let response = Response::success(
            Some("decoded"),
            raw(200, ResponseBody::no_content(None, None)),
        )
        .expect("success");

        assert!(response.is_successful());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body(), Some(&"decoded"));
        assert!(response.error_body().is_none());
    }

    #[test]
    fn success_without_content() {
        let response = Response::<String>::success(
            None,
            raw(204, ResponseBody::no_content(None, None)),
        )
        .expect("success");

        assert!(response.is_successful());
        assert!(response.into_body().is_none());
    }

    #[test]
    fn error_response() {
        let body = ResponseBody::buffered(None, Bytes::from_static(b"missing"));
        let response = Response::<String>::error(body, raw(404, ResponseBody::no_content(None, None)))
            .expect("error");

        assert!(!response.is_successful());
        assert!(response.body().is_none());
        let error_body = response.into_error_body().expect("error body");
        assert_eq!(error_body.bytes().expect("bytes"), Bytes::from_static(b"missing"));
    }

    #[test]
    fn constructors_validate_the_status_class() {
        let err = Response::success(Some(()), raw(500, ResponseBody::no_content(None, None)))
            .expect_err("should fail");
        assert!(matches!(err, Error::InvalidState(_)));

        let err = Response::<()>::error(
            ResponseBody::buffered(None, Bytes::new()),
            raw(200, ResponseBody::no_content(None, None)),
        )
        .expect_err("should fail");
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn map_body_preserves_metadata() {
        let response = Response::success(
            Some("12"),
            raw(201, ResponseBody::no_content(None, None)),
        )
        .expect("success");

        let mapped = response.map_body(str::len);
        assert_eq!(mapped.status(), StatusCode::CREATED);
        assert_eq!(mapped.body(), Some(&2));
    }
}
