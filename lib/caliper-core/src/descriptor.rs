//! Call descriptors and the static metadata consumed by the adaptation core.
//!
//! A [`CallDescriptor`] is the immutable shape of one HTTP operation,
//! produced by a codegen or registration layer outside this crate and
//! consumed read-only here. [`TypeTag`] and [`ReturnType`] carry the
//! resolved type information that layer extracted, so no runtime reflection
//! is ever needed; [`Annotations`] carries its marker set.

use std::any::{TypeId, type_name};
use std::collections::BTreeSet;
use std::fmt;

use http::HeaderMap;

use crate::{MediaType, Method};

/// Relative priority hint forwarded to the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Lowest priority, background work.
    Idle,
    /// Very low priority.
    Lowest,
    /// Low priority.
    Low,
    /// Default priority.
    #[default]
    Medium,
    /// Highest priority, user-blocking work.
    Highest,
}

/// How an operation supplies its request body.
///
/// Form and multipart accumulation are mutually exclusive by construction;
/// the assembler rejects accumulator operations that do not match the
/// declared mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyMode {
    /// No request body.
    #[default]
    None,
    /// A single body argument; an empty body is sent if none is supplied.
    Raw,
    /// Accumulated `application/x-www-form-urlencoded` fields.
    FormUrlEncoded,
    /// Accumulated multipart parts.
    Multipart,
}

impl BodyMode {
    /// Returns `true` if the operation carries a request body.
    #[must_use]
    pub const fn has_body(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Marker annotations attached to an operation or parameter.
///
/// Factories select strategies by marker presence alone; user-defined
/// factories may introduce their own markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    markers: BTreeSet<&'static str>,
}

impl Annotations {
    /// Marker requesting the streaming response-body converter.
    pub const STREAMING: &'static str = "streaming";
    /// Marker bypassing the callback executor for a direct call.
    pub const SKIP_CALLBACK_EXECUTOR: &'static str = "skip-callback-executor";

    /// An empty marker set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker.
    #[must_use]
    pub fn with(mut self, marker: &'static str) -> Self {
        self.markers.insert(marker);
        self
    }

    /// Returns `true` if `marker` is present.
    #[must_use]
    pub fn contains(&self, marker: &str) -> bool {
        self.markers.contains(marker)
    }

    /// Returns `true` if the streaming marker is present.
    #[must_use]
    pub fn streaming(&self) -> bool {
        self.contains(Self::STREAMING)
    }

    /// Returns `true` if the skip-callback-executor marker is present.
    #[must_use]
    pub fn skips_callback_executor(&self) -> bool {
        self.contains(Self::SKIP_CALLBACK_EXECUTOR)
    }
}

/// A resolved type tag: type identity plus a printable name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// The tag for `T`.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// The type name the tag was created from.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if the tag identifies `T`.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The type parameter of a declared return shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeParam {
    /// Missing type parameter; rejected eagerly by the built-in factories.
    Untyped,
    /// A concrete body type.
    Body(TypeTag),
    /// A full response wrapper around the inner parameter.
    Response(Box<TypeParam>),
}

impl fmt::Display for TypeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Untyped => f.write_str("_"),
            Self::Body(tag) => write!(f, "{tag}"),
            Self::Response(inner) => write!(f, "Response<{inner}>"),
        }
    }
}

/// Declared return shape of a service operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnType {
    /// A cancellable call handle.
    Call(TypeParam),
    /// A single-assignment future.
    Future(TypeParam),
}

impl ReturnType {
    /// `Call<T>`: a cancellable handle decoding bodies to `T`.
    #[must_use]
    pub fn call<T: 'static>() -> Self {
        Self::Call(TypeParam::Body(TypeTag::of::<T>()))
    }

    /// `Future<T>`: a future resolving to the decoded body.
    #[must_use]
    pub fn future<T: 'static>() -> Self {
        Self::Future(TypeParam::Body(TypeTag::of::<T>()))
    }

    /// `Future<Response<T>>`: a future resolving to the full response.
    #[must_use]
    pub fn future_response<T: 'static>() -> Self {
        Self::Future(TypeParam::Response(Box::new(TypeParam::Body(
            TypeTag::of::<T>(),
        ))))
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call(param) => write!(f, "Call<{param}>"),
            Self::Future(param) => write!(f, "Future<{param}>"),
        }
    }
}

/// A record of the service-method invocation behind a request, stored in
/// the request extensions for instrumentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    operation: &'static str,
    arguments: Vec<String>,
}

impl Invocation {
    /// Create an invocation record.
    #[must_use]
    pub fn new(operation: &'static str, arguments: Vec<String>) -> Self {
        Self {
            operation,
            arguments,
        }
    }

    /// The operation name.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// The rendered arguments, in declaration order.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.operation, self.arguments.join(", "))
    }
}

/// Immutable specification of one HTTP operation's shape.
#[derive(Debug, Clone)]
pub struct CallDescriptor {
    method: Method,
    relative_url: String,
    headers: HeaderMap,
    content_type: Option<MediaType>,
    body_mode: BodyMode,
    priority: Priority,
    disable_cache: bool,
}

impl CallDescriptor {
    /// Start building a descriptor for `method` and a relative URL
    /// template with `{name}` placeholders.
    #[must_use]
    pub fn builder(method: Method, relative_url: impl Into<String>) -> CallDescriptorBuilder {
        CallDescriptorBuilder {
            method,
            relative_url: relative_url.into(),
            headers: HeaderMap::new(),
            content_type: None,
            body_mode: BodyMode::None,
            priority: Priority::default(),
            disable_cache: false,
        }
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// The relative URL template.
    #[must_use]
    pub fn relative_url(&self) -> &str {
        &self.relative_url
    }

    /// Static headers declared on the operation.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Declared content type, if any.
    #[must_use]
    pub const fn content_type(&self) -> Option<&MediaType> {
        self.content_type.as_ref()
    }

    /// How the operation supplies its body.
    #[must_use]
    pub const fn body_mode(&self) -> BodyMode {
        self.body_mode
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
}

/// Builder for [`CallDescriptor`].
#[derive(Debug, Clone)]
pub struct CallDescriptorBuilder {
    method: Method,
    relative_url: String,
    headers: HeaderMap,
    content_type: Option<MediaType>,
    body_mode: BodyMode,
    priority: Priority,
    disable_cache: bool,
}

impl CallDescriptorBuilder {
    /// Append a static header.
    #[must_use]
    pub fn header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Set the declared content type.
    #[must_use]
    pub fn content_type(mut self, content_type: MediaType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Set the body mode.
    #[must_use]
    pub const fn body_mode(mut self, body_mode: BodyMode) -> Self {
        self.body_mode = body_mode;
        self
    }

    /// Set the transport priority hint.
    #[must_use]
    pub const fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Disable transport-level caching for this operation.
    #[must_use]
    pub const fn disable_cache(mut self) -> Self {
        self.disable_cache = true;
        self
    }

    /// Build the descriptor.
    #[must_use]
    pub fn build(self) -> CallDescriptor {
        CallDescriptor {
            method: self.method,
            relative_url: self.relative_url,
            headers: self.headers,
            content_type: self.content_type,
            body_mode: self.body_mode,
            priority: self.priority,
            disable_cache: self.disable_cache,
        }
    }
}
