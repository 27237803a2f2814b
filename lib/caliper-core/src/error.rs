//! Error types for caliper.

use derive_more::{Display, Error, From};

/// Main error type for caliper operations.
///
/// Variants fall into four families:
/// - configuration errors, raised synchronously while a call is being set
///   up and never after the transport has been touched;
/// - transport failures reported by the underlying call;
/// - HTTP failures (structurally valid non-2xx responses), surfaced only by
///   shapes that unwrap response bodies;
/// - cancellation, delivered through the same channel a failure would use.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// No converter factory produced a converter for the requested type.
    #[display("no {role} converter for {target} (tried: {tried})")]
    #[from(skip)]
    UnresolvedConverter {
        /// Conversion role: `"request body"` or `"response body"`.
        role: &'static str,
        /// Name of the type no factory handled.
        target: &'static str,
        /// Names of the factories consulted, in order.
        tried: String,
    },

    /// No call-adapter factory handled the declared return shape.
    #[display("no call adapter for {target} (tried: {tried})")]
    #[from(skip)]
    UnresolvedAdapter {
        /// Rendering of the declared return shape.
        target: String,
        /// Names of the factories consulted, in order.
        tried: String,
    },

    /// A declared return shape is missing its concrete body type.
    #[display("invalid return type: {_0}")]
    #[from(skip)]
    InvalidReturnType(#[error(not(source))] String),

    /// A `Content-Type` value failed to parse as a media type.
    #[display("malformed content type: {_0}")]
    #[from(skip)]
    MalformedContentType(#[error(not(source))] String),

    /// A path parameter produced a standalone `.` or `..` path segment.
    #[display("path parameters may not perform path traversal ('.' or '..'): {_0}")]
    #[from(skip)]
    PathTraversal(#[error(not(source))] String),

    /// Base and relative URL did not combine into a parsable URL.
    #[display("malformed URL; base: {base}, relative: {relative}")]
    #[from(skip)]
    MalformedUrl {
        /// The base URL the relative URL was resolved against.
        base: String,
        /// The offending relative URL.
        relative: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),

    /// Invalid request configuration (bad header, base URL rule, ...).
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// An operation was invoked in a state that forbids it.
    #[display("invalid state: {_0}")]
    #[from(skip)]
    InvalidState(#[error(not(source))] String),

    /// A factory or converter produced a value of an unexpected type.
    #[display("unexpected type: {_0}")]
    #[from(skip)]
    UnexpectedType(#[error(not(source))] String),

    /// Structurally valid HTTP response with a non-2xx status code.
    #[display("HTTP {status} {message}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: u16,
        /// HTTP status message.
        message: String,
        /// Raw error body, if available.
        #[error(not(source))]
        body: Option<bytes::Bytes>,
    },

    /// Network or I/O failure reported by the transport.
    #[display("transport error: {_0}")]
    #[from(skip)]
    Transport(#[error(not(source))] String),

    /// The call was canceled before its outcome could be delivered.
    #[display("canceled")]
    #[from(skip)]
    Canceled,
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an unresolved-converter error listing the factories tried.
    #[must_use]
    pub fn unresolved_converter(role: &'static str, target: &'static str, tried: &[&str]) -> Self {
        Self::UnresolvedConverter {
            role,
            target,
            tried: tried.join(", "),
        }
    }

    /// Create an unresolved-adapter error listing the factories tried.
    #[must_use]
    pub fn unresolved_adapter(target: impl Into<String>, tried: &[&str]) -> Self {
        Self::UnresolvedAdapter {
            target: target.into(),
            tried: tried.join(", "),
        }
    }

    /// Create an invalid-return-type error.
    #[must_use]
    pub fn invalid_return_type(message: impl Into<String>) -> Self {
        Self::InvalidReturnType(message.into())
    }

    /// Create a malformed-content-type error.
    #[must_use]
    pub fn malformed_content_type(value: impl Into<String>) -> Self {
        Self::MalformedContentType(value.into())
    }

    /// Create a path-traversal error from the offending parameter value.
    #[must_use]
    pub fn path_traversal(value: impl Into<String>) -> Self {
        Self::PathTraversal(value.into())
    }

    /// Create a malformed-URL error.
    #[must_use]
    pub fn malformed_url(base: impl Into<String>, relative: impl Into<String>) -> Self {
        Self::MalformedUrl {
            base: base.into(),
            relative: relative.into(),
        }
    }

    /// Create an invalid-request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an invalid-state error.
    #[must_use]
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create an unexpected-type error.
    #[must_use]
    pub fn unexpected_type(message: impl Into<String>) -> Self {
        Self::UnexpectedType(message.into())
    }

    /// Create an HTTP error from status code, status message, and raw body.
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>, body: Option<bytes::Bytes>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            body,
        }
    }

    /// Create a transport error.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Returns `true` for errors raised while setting a call up, before any
    /// transport activity.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedConverter { .. }
                | Self::UnresolvedAdapter { .. }
                | Self::InvalidReturnType(_)
                | Self::MalformedContentType(_)
                | Self::PathTraversal(_)
                | Self::MalformedUrl { .. }
                | Self::InvalidUrl(_)
                | Self::InvalidRequest(_)
                | Self::InvalidState(_)
                | Self::UnexpectedType(_)
        )
    }

    /// Returns `true` if this is a transport failure.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if this is an HTTP (non-2xx) failure.
    #[must_use]
    pub const fn is_http(&self) -> bool {
        matches!(self, Self::Http { .. })
    }

    /// Returns `true` if the call was canceled.
    #[must_use]
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Returns the HTTP status code if this is an HTTP failure.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| (400..500).contains(&s))
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|s| (500..600).contains(&s))
    }

    /// Returns the raw error body if this is an HTTP failure with a body.
    #[must_use]
    pub fn body(&self) -> Option<&bytes::Bytes> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
