//! The immutable HTTP request produced by the assembler.

use http::{Extensions, HeaderMap};
use url::Url;

use crate::{Method, Priority, RequestBody};

/// A finalized, immutable HTTP request.
///
/// Produced by [`crate::RequestAssembler::build`]; handed to the transport
/// by value or reference and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<RequestBody>,
    priority: Priority,
    disable_cache: bool,
    extensions: Extensions,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        url: Url,
        headers: HeaderMap,
        body: Option<RequestBody>,
        priority: Priority,
        disable_cache: bool,
        extensions: Extensions,
    ) -> Self {
        Self {
            method,
            url,
            headers,
            body,
            priority,
            disable_cache,
            extensions,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Request URL.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, when present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Request body, if any.
    #[must_use]
    pub const fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    /// Transport priority hint.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Returns `true` if transport-level caching is disabled.
    #[must_use]
    pub const fn cache_disabled(&self) -> bool {
        self.disable_cache
    }

    /// Tags attached while assembling the request.
    #[must_use]
    pub const fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Typed tag lookup, a shorthand over [`Request::extensions`].
    #[must_use]
    pub fn tag<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::HeaderValue;

    use super::*;
    use crate::Invocation;

    fn request_with(headers: HeaderMap, extensions: Extensions) -> Request {
        Request::new(
            Method::Get,
            Url::parse("https://api.test/user/42").expect("url"),
            headers,
            Some(RequestBody::new(None, Bytes::from_static(b"x"))),
            Priority::Low,
            true,
            extensions,
        )
    }

    #[test]
    fn request_accessors() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::ACCEPT, HeaderValue::from_static("text/plain"));

        let request = request_with(headers, Extensions::new());
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.url().as_str(), "https://api.test/user/42");
        assert_eq!(request.header("accept"), Some("text/plain"));
        assert_eq!(request.header("x-missing"), None);
        assert_eq!(request.priority(), Priority::Low);
        assert!(request.cache_disabled());
        assert!(request.body().is_some());
    }

    #[test]
    fn request_tags() {
        let mut extensions = Extensions::new();
        extensions.insert(Invocation::new("get_user", vec!["42".to_owned()]));

        let request = request_with(HeaderMap::new(), extensions);
        let invocation = request.tag::<Invocation>().expect("tag");
        assert_eq!(invocation.operation(), "get_user");
        assert!(request.tag::<u64>().is_none());
    }
}
