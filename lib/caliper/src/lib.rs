//! Request-construction and call-adaptation core for a typed HTTP client.
//!
//! Given a declarative [`CallDescriptor`] and runtime arguments, this crate
//! assembles a correctly encoded [`Request`], bridges it over a pluggable
//! [`Transport`] into a cancellable [`Call`], resolves response decoding
//! through an ordered [`ConverterFactory`] chain, and adapts the call into
//! the declared return shape through an ordered [`CallAdapterFactory`]
//! chain - a blocking handle, a future, or a full [`Response`] wrapper.
//!
//! # Example
//!
//! ```ignore
//! use caliper::{Annotations, CallDescriptor, Caliper, Method, ResponseBody};
//!
//! let client = Caliper::builder()
//!     .transport(my_transport)
//!     .base_url("https://api.test/")
//!     .build()?;
//!
//! let descriptor = CallDescriptor::builder(Method::Get, "user/{id}").build();
//! let mut assembler = client.assembler(&descriptor);
//! assembler.add_path_param("id", "42", false)?;
//!
//! let body: ResponseBody = client
//!     .future::<ResponseBody>(assembler.build()?, &Annotations::new())?
//!     .await?;
//! ```

mod adapter;
mod call;
mod client;
mod converter;
mod executor;
mod future;
pub mod prelude;

pub use adapter::{AdaptedCall, CallAdapter, CallAdapterFactory, DefaultCallAdapterFactory};
pub use call::{Call, Callback, TypedCall};
pub use client::{Builder, Caliper, Defaults};
pub use converter::{
    BuiltinConverters, ConverterFactory, Payload, RequestConverter, ResponseConverter,
};
pub use executor::{CallbackExecutor, InlineExecutor, Job, TokioCallbackExecutor};
pub use future::{
    CallFuture, FutureCallAdapterFactory, ResponseFuture, TypedCallFuture, TypedResponseFuture,
};

// Re-export the core crate's surface.
pub use caliper_core::{
    Annotations, BodyMode, CallDescriptor, CallDescriptorBuilder, Error, Extensions, FormBody,
    HeaderMap, HeaderName, HeaderValue, Invocation, MediaType, Method, MultipartBody, Part,
    Priority, RawCall, RawCallback, RawResponse, Request, RequestAssembler, RequestBody, Response,
    ResponseBody, Result, ReturnType, StatusCode, Transport, TypeParam, TypeTag, encode, header,
};
