//! Assembly of one HTTP request from a call descriptor.

use http::{Extensions, HeaderMap, HeaderName, HeaderValue, header};
use url::Url;

use crate::encode::{canonicalize_for_path, has_path_traversal, query_encode};
use crate::{
    BodyMode, CallDescriptor, Error, FormBody, MediaType, Method, MultipartBody, Part, Priority,
    Request, RequestBody, Result,
};

/// Mutable state for one in-progress request.
///
/// An assembler is owned by exactly one request construction and applies a
/// descriptor's parameter bindings through its mutation operations. Path
/// parameters substitute into the relative URL template until the first
/// query parameter merges that template into the base URL; that transition
/// is one-way, so path parameters must be fully applied first.
///
/// The accumulator in use (form or multipart) is fixed by the descriptor's
/// [`BodyMode`]; mismatching accumulator operations are rejected. An
/// explicit [`RequestAssembler::set_body`] overrides any accumulated body.
#[derive(Debug)]
pub struct RequestAssembler {
    method: Method,
    base_url: Url,
    relative_url: Option<String>,
    url_builder: Option<UrlBuilder>,
    headers: HeaderMap,
    content_type: Option<MediaType>,
    accumulator: BodyAccumulator,
    explicit_body: Option<RequestBody>,
    requires_body: bool,
    priority: Priority,
    disable_cache: bool,
    extensions: Extensions,
}

#[derive(Debug)]
enum BodyAccumulator {
    None,
    Form(FormBody),
    Multipart(MultipartBody),
}

impl RequestAssembler {
    /// Create an assembler for one invocation of `descriptor`, resolving
    /// against `base_url`.
    #[must_use]
    pub fn new(base_url: Url, descriptor: &CallDescriptor) -> Self {
        let accumulator = match descriptor.body_mode() {
            BodyMode::FormUrlEncoded => BodyAccumulator::Form(FormBody::new()),
            BodyMode::Multipart => BodyAccumulator::Multipart(MultipartBody::new()),
            BodyMode::None | BodyMode::Raw => BodyAccumulator::None,
        };
        Self {
            method: descriptor.method(),
            base_url,
            relative_url: Some(descriptor.relative_url().to_owned()),
            url_builder: None,
            headers: descriptor.headers().clone(),
            content_type: descriptor.content_type().cloned(),
            accumulator,
            explicit_body: None,
            requires_body: descriptor.body_mode() == BodyMode::Raw,
            priority: descriptor.priority(),
            disable_cache: descriptor.cache_disabled(),
            extensions: Extensions::new(),
        }
    }

    /// Replace the relative URL wholesale (dynamic-URL operations).
    ///
    /// # Errors
    ///
    /// Fails once a query parameter has consumed the relative URL.
    pub fn set_relative_url(&mut self, relative_url: impl Into<String>) -> Result<()> {
        if self.url_builder.is_some() {
            return Err(Error::invalid_state(
                "relative URL cannot change after a query parameter was added",
            ));
        }
        self.relative_url = Some(relative_url.into());
        Ok(())
    }

    /// Append a header.
    ///
    /// `Content-Type` (case-insensitive) is parsed as a media type and held
    /// aside to override the body's content type at build time. Other
    /// values go through strict ASCII validation unless `allow_unsafe`
    /// permits the tolerant byte-level path.
    ///
    /// # Errors
    ///
    /// Fails on a malformed `Content-Type` or an invalid header name or
    /// value.
    pub fn add_header(&mut self, name: &str, value: &str, allow_unsafe: bool) -> Result<()> {
        if name.eq_ignore_ascii_case("content-type") {
            self.content_type = Some(MediaType::parse(value)?);
            return Ok(());
        }
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::invalid_request(format!("invalid header name: {name}")))?;
        let header_value = if allow_unsafe {
            HeaderValue::from_bytes(value.as_bytes())
        } else {
            if !value.is_ascii() {
                return Err(Error::invalid_request(format!(
                    "non-ASCII header value for {name}: {value}"
                )));
            }
            HeaderValue::from_str(value)
        }
        .map_err(|_| Error::invalid_request(format!("invalid header value for {name}")))?;
        self.headers.append(header_name, header_value);
        Ok(())
    }

    /// Append every header in `headers`.
    pub fn add_headers(&mut self, headers: &HeaderMap) {
        for (name, value) in headers {
            self.headers.append(name.clone(), value.clone());
        }
    }

    /// Substitute the `{name}` placeholder with a canonicalized value.
    ///
    /// # Errors
    ///
    /// Fails once a query parameter has consumed the relative URL, or when
    /// the substituted relative URL contains a `.`/`..` traversal segment.
    pub fn add_path_param(&mut self, name: &str, value: &str, already_encoded: bool) -> Result<()> {
        let Some(relative_url) = self.relative_url.as_ref() else {
            // The relative URL is gone once the first query parameter merged it.
            return Err(Error::invalid_state(
                "path parameters must be applied before query parameters",
            ));
        };
        let replacement = canonicalize_for_path(value, already_encoded);
        let substituted = relative_url.replace(&format!("{{{name}}}"), &replacement);
        if has_path_traversal(&substituted) {
            return Err(Error::path_traversal(value));
        }
        self.relative_url = Some(substituted);
        Ok(())
    }

    /// Append a query parameter; `None` values append a bare name.
    ///
    /// The first call merges the relative URL into the base URL; later
    /// calls append to the merged URL. With `already_encoded` the name and
    /// value are appended verbatim.
    ///
    /// # Errors
    ///
    /// Fails when base and relative URL do not combine into a parsable URL.
    pub fn add_query_param(
        &mut self,
        name: &str,
        value: Option<&str>,
        already_encoded: bool,
    ) -> Result<()> {
        if self.url_builder.is_none() {
            // One-time combination of the built relative URL and the base URL.
            let relative = self.relative_url.take().unwrap_or_default();
            let merged = self
                .base_url
                .join(&relative)
                .map_err(|_| Error::malformed_url(self.base_url.as_str(), &relative))?;
            self.url_builder = Some(UrlBuilder::new(merged));
        }
        if let Some(builder) = self.url_builder.as_mut() {
            if already_encoded {
                builder.append_encoded(name, value);
            } else {
                builder.append(name, value);
            }
        }
        Ok(())
    }

    /// Accumulate a form field.
    ///
    /// # Errors
    ///
    /// Fails unless the descriptor declared form encoding.
    pub fn add_form_field(&mut self, name: &str, value: &str, already_encoded: bool) -> Result<()> {
        let BodyAccumulator::Form(form) = &mut self.accumulator else {
            return Err(Error::invalid_state(
                "form fields require a form-urlencoded operation",
            ));
        };
        if already_encoded {
            form.add_encoded(name, value);
        } else {
            form.add(name, value);
        }
        Ok(())
    }

    /// Accumulate a multipart part.
    ///
    /// # Errors
    ///
    /// Fails unless the descriptor declared multipart encoding.
    pub fn add_part(&mut self, part: Part) -> Result<()> {
        let BodyAccumulator::Multipart(multipart) = &mut self.accumulator else {
            return Err(Error::invalid_state("parts require a multipart operation"));
        };
        multipart.add_part(part);
        Ok(())
    }

    /// Set the request body, overriding any accumulated form or multipart
    /// output.
    pub fn set_body(&mut self, body: RequestBody) {
        self.explicit_body = Some(body);
    }

    /// Attach a typed tag to the request's extensions.
    pub fn add_tag<T>(&mut self, tag: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(tag);
    }

    /// Finalize into an immutable [`Request`].
    ///
    /// # Errors
    ///
    /// Fails when the relative URL does not resolve against the base URL,
    /// or when a multipart operation accumulated no parts.
    pub fn build(self) -> Result<Request> {
        let Self {
            method,
            base_url,
            relative_url,
            url_builder,
            mut headers,
            content_type,
            accumulator,
            explicit_body,
            requires_body,
            priority,
            disable_cache,
            extensions,
        } = self;

        let url = match url_builder {
            Some(builder) => builder.finish(),
            None => {
                // No query parameters forced a builder; resolve directly.
                let relative = relative_url.unwrap_or_default();
                base_url
                    .join(&relative)
                    .map_err(|_| Error::malformed_url(base_url.as_str(), &relative))?
            }
        };

        let mut body = match explicit_body {
            Some(body) => Some(body),
            None => match accumulator {
                BodyAccumulator::Form(form) => Some(form.build()),
                BodyAccumulator::Multipart(multipart) => Some(multipart.build()?),
                BodyAccumulator::None if requires_body => Some(RequestBody::empty()),
                BodyAccumulator::None => None,
            },
        };

        if let Some(content_type) = content_type {
            match body.take() {
                Some(existing) => body = Some(existing.with_content_type(content_type)),
                None => {
                    let value = HeaderValue::from_str(content_type.as_str()).map_err(|_| {
                        Error::malformed_content_type(content_type.as_str().to_owned())
                    })?;
                    headers.append(header::CONTENT_TYPE, value);
                }
            }
        }

        Ok(Request::new(
            method,
            url,
            headers,
            body,
            priority,
            disable_cache,
            extensions,
        ))
    }
}

/// Query-string accumulation over a merged URL.
#[derive(Debug)]
struct UrlBuilder {
    url: Url,
}

impl UrlBuilder {
    fn new(url: Url) -> Self {
        Self { url }
    }

    fn append(&mut self, name: &str, value: Option<&str>) {
        let name = query_encode(name);
        let value = value.map(query_encode);
        self.push_raw(&name, value.as_deref());
    }

    fn append_encoded(&mut self, name: &str, value: Option<&str>) {
        self.push_raw(name, value);
    }

    fn push_raw(&mut self, name: &str, value: Option<&str>) {
        let mut query = self.url.query().map(str::to_owned).unwrap_or_default();
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(name);
        if let Some(value) = value {
            query.push('=');
            query.push_str(value);
        }
        self.url.set_query(Some(&query));
    }

    fn finish(self) -> Url {
        self.url
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::Invocation;

    fn base() -> Url {
        Url::parse("https://api.test/").expect("base url")
    }

    fn assembler(descriptor: &CallDescriptor) -> RequestAssembler {
        RequestAssembler::new(base(), descriptor)
    }

    fn get(template: &str) -> CallDescriptor {
        CallDescriptor::builder(Method::Get, template).build()
    }

    #[test]
    fn path_param_substitution() {
        let descriptor = get("user/{id}");
        let mut assembler = assembler(&descriptor);
        assembler.add_path_param("id", "42", false).expect("path");

        let request = assembler.build().expect("build");
        assert_eq!(request.url().as_str(), "https://api.test/user/42");
        assert!(request.body().is_none());
    }

    #[test]
    fn path_param_values_are_canonicalized() {
        let descriptor = get("search/{q}");
        let mut assembler = assembler(&descriptor);
        assembler.add_path_param("q", "a/b c", false).expect("path");

        let request = assembler.build().expect("build");
        assert_eq!(request.url().as_str(), "https://api.test/search/a%2Fb%20c");
    }

    #[test]
    fn path_traversal_is_rejected() {
        for (value, already_encoded) in [
            (".", false),
            ("..", false),
            ("%2E", true),
            ("%2e", true),
            ("%2e%2E", true),
        ] {
            let descriptor = get("account/book/{isbn}/");
            let mut assembler = assembler(&descriptor);
            let err = assembler
                .add_path_param("isbn", value, already_encoded)
                .expect_err("should fail");
            assert!(matches!(err, Error::PathTraversal(_)), "{value:?}");
        }
    }

    #[test]
    fn unencoded_percent_dots_are_escaped_not_traversal() {
        // With encoding requested, the '%' itself is escaped, so the
        // substituted segment is %252E and resolves literally.
        let descriptor = get("account/{id}");
        let mut assembler = assembler(&descriptor);
        assembler.add_path_param("id", "%2E", false).expect("path");
        let request = assembler.build().expect("build");
        assert_eq!(request.url().as_str(), "https://api.test/account/%252E");
    }

    #[test]
    fn traversal_check_covers_the_whole_relative_url() {
        // A literal traversal segment in the template itself trips the same
        // check once any parameter is substituted.
        let descriptor = get("static/../{file}");
        let mut assembler = assembler(&descriptor);
        let err = assembler
            .add_path_param("file", "logo.png", false)
            .expect_err("should fail");
        assert!(matches!(err, Error::PathTraversal(_)));
    }

    #[test]
    fn embedded_dots_are_allowed() {
        let descriptor = get("files/{name}");
        let mut assembler = assembler(&descriptor);
        assembler
            .add_path_param("name", "index.html", false)
            .expect("path");
        let request = assembler.build().expect("build");
        assert_eq!(request.url().as_str(), "https://api.test/files/index.html");
    }

    #[test]
    fn path_param_after_query_param_is_rejected() {
        let descriptor = get("user/{id}");
        let mut assembler = assembler(&descriptor);
        assembler
            .add_query_param("page", Some("1"), false)
            .expect("query");

        let err = assembler
            .add_path_param("id", "42", false)
            .expect_err("should fail");
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn set_relative_url_after_query_param_is_rejected() {
        let descriptor = get("user");
        let mut assembler = assembler(&descriptor);
        assembler.add_query_param("a", Some("b"), false).expect("query");
        let err = assembler
            .set_relative_url("other")
            .expect_err("should fail");
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn query_params_merge_then_append() {
        let descriptor = get("search");
        let mut assembler = assembler(&descriptor);
        assembler
            .add_query_param("q", Some("rust http"), false)
            .expect("query");
        assembler.add_query_param("page", Some("2"), false).expect("query");
        assembler
            .add_query_param("raw", Some("a%2Fb"), true)
            .expect("query");
        assembler.add_query_param("flag", None, false).expect("query");

        let request = assembler.build().expect("build");
        assert_eq!(
            request.url().as_str(),
            "https://api.test/search?q=rust%20http&page=2&raw=a%2Fb&flag"
        );
    }

    #[test]
    fn content_type_header_is_parsed_and_held_aside() {
        let descriptor = get("ping");
        let mut assembler = assembler(&descriptor);
        assembler
            .add_header("Content-Type", "application/json", false)
            .expect("header");
        assembler
            .add_header("Accept", "application/json", false)
            .expect("header");

        let request = assembler.build().expect("build");
        // No body: the declared content type lands in the headers.
        assert_eq!(request.header("content-type"), Some("application/json"));
        assert_eq!(request.header("accept"), Some("application/json"));
    }

    #[test]
    fn malformed_content_type_is_rejected() {
        let descriptor = get("ping");
        let mut assembler = assembler(&descriptor);
        let err = assembler
            .add_header("content-type", "not a media type", false)
            .expect_err("should fail");
        assert!(matches!(err, Error::MalformedContentType(_)));
    }

    #[test]
    fn non_ascii_header_values_require_allow_unsafe() {
        let descriptor = get("ping");
        let mut assembler = assembler(&descriptor);
        let err = assembler
            .add_header("X-Name", "café", false)
            .expect_err("should fail");
        assert!(matches!(err, Error::InvalidRequest(_)));

        assembler.add_header("X-Name", "café", true).expect("unsafe ok");
        let request = assembler.build().expect("build");
        assert_eq!(
            request.headers().get("x-name").map(http::HeaderValue::as_bytes),
            Some("café".as_bytes())
        );
    }

    #[test]
    fn declared_content_type_overrides_the_body_content_type() {
        let descriptor = CallDescriptor::builder(Method::Post, "upload")
            .content_type(MediaType::parse("application/vnd.custom+json").expect("media type"))
            .body_mode(BodyMode::Raw)
            .build();
        let mut assembler = assembler(&descriptor);
        let data = Bytes::from_static(b"{}");
        assembler.set_body(RequestBody::new(
            Some(MediaType::parse("application/json").expect("media type")),
            data.clone(),
        ));

        let request = assembler.build().expect("build");
        let body = request.body().expect("body");
        assert_eq!(
            body.content_type().map(MediaType::as_str),
            Some("application/vnd.custom+json")
        );
        // The override shares the payload instead of re-encoding it.
        assert_eq!(body.data().as_ptr(), data.as_ptr());
    }

    #[test]
    fn raw_mode_without_a_body_sends_an_empty_body() {
        let descriptor = CallDescriptor::builder(Method::Post, "touch")
            .body_mode(BodyMode::Raw)
            .build();
        let request = assembler(&descriptor).build().expect("build");
        let body = request.body().expect("body");
        assert!(body.is_empty());
    }

    #[test]
    fn form_fields_accumulate_into_the_body() {
        let descriptor = CallDescriptor::builder(Method::Post, "login")
            .body_mode(BodyMode::FormUrlEncoded)
            .build();
        let mut assembler = assembler(&descriptor);
        assembler.add_form_field("user", "alice", false).expect("field");
        assembler
            .add_form_field("note", "a%20b", true)
            .expect("field");

        let request = assembler.build().expect("build");
        let body = request.body().expect("body");
        assert_eq!(
            body.content_type().map(MediaType::as_str),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(body.data().as_ref(), b"user=alice&note=a%20b");
    }

    #[test]
    fn form_fields_require_the_form_mode() {
        let descriptor = get("login");
        let mut assembler = assembler(&descriptor);
        let err = assembler
            .add_form_field("user", "alice", false)
            .expect_err("should fail");
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn parts_require_the_multipart_mode() {
        let descriptor = CallDescriptor::builder(Method::Post, "upload")
            .body_mode(BodyMode::FormUrlEncoded)
            .build();
        let mut assembler = assembler(&descriptor);
        let err = assembler
            .add_part(Part::text("f", "v"))
            .expect_err("should fail");
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn multipart_parts_accumulate_into_the_body() {
        let descriptor = CallDescriptor::builder(Method::Post, "upload")
            .body_mode(BodyMode::Multipart)
            .build();
        let mut assembler = assembler(&descriptor);
        assembler.add_part(Part::text("field", "value")).expect("part");

        let request = assembler.build().expect("build");
        let body = request.body().expect("body");
        assert_eq!(
            body.content_type().map(MediaType::essence),
            Some("multipart/form-data")
        );
    }

    #[test]
    fn explicit_body_overrides_the_accumulator() {
        let descriptor = CallDescriptor::builder(Method::Post, "login")
            .body_mode(BodyMode::FormUrlEncoded)
            .build();
        let mut assembler = assembler(&descriptor);
        assembler.add_form_field("user", "alice", false).expect("field");
        assembler.set_body(RequestBody::new(None, Bytes::from_static(b"override")));

        let request = assembler.build().expect("build");
        assert_eq!(request.body().expect("body").data().as_ref(), b"override");
    }

    #[test]
    fn static_descriptor_headers_are_carried() {
        let descriptor = CallDescriptor::builder(Method::Get, "ping")
            .header(
                http::header::USER_AGENT,
                HeaderValue::from_static("caliper-tests"),
            )
            .build();
        let request = assembler(&descriptor).build().expect("build");
        assert_eq!(request.header("user-agent"), Some("caliper-tests"));
    }

    #[test]
    fn tags_land_in_the_request_extensions() {
        let descriptor = get("user/{id}");
        let mut assembler = assembler(&descriptor);
        assembler.add_tag(Invocation::new("get_user", vec!["42".to_owned()]));
        assembler.add_path_param("id", "42", false).expect("path");

        let request = assembler.build().expect("build");
        assert_eq!(
            request.tag::<Invocation>().map(Invocation::operation),
            Some("get_user")
        );
    }

    #[test]
    fn absolute_relative_urls_replace_the_base_path() {
        let base = Url::parse("https://api.test/v2/").expect("base");
        let descriptor = get("/health");
        let mut assembler = RequestAssembler::new(base, &descriptor);
        assembler.add_query_param("deep", Some("1"), false).expect("query");

        let request = assembler.build().expect("build");
        assert_eq!(request.url().as_str(), "https://api.test/health?deep=1");
    }

    #[test]
    fn descriptor_flags_are_carried_into_the_request() {
        let descriptor = CallDescriptor::builder(Method::Get, "feed")
            .priority(Priority::Highest)
            .disable_cache()
            .build();
        let request = assembler(&descriptor).build().expect("build");
        assert_eq!(request.priority(), Priority::Highest);
        assert!(request.cache_disabled());
    }
}
