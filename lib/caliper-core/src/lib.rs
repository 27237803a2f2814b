//! Core types for the caliper typed HTTP client.
//!
//! This crate provides the foundational pieces of the request-construction
//! layer:
//! - [`RequestAssembler`] - builds one immutable [`Request`] from a
//!   [`CallDescriptor`] and its runtime parameter bindings
//! - [`encode`] - percent-encoding and path-traversal detection
//! - [`RequestBody`], [`ResponseBody`], [`MediaType`] - body representations
//! - [`Response`] - status/headers paired with a decoded body or a raw
//!   error body
//! - [`Transport`] and [`RawCall`] - the seam to the network layer
//! - [`Error`] and [`Result`] - error handling
//! - [`TypeTag`], [`ReturnType`], [`Annotations`] - the resolved metadata a
//!   descriptor layer supplies in place of runtime reflection

mod assembler;
mod body;
mod descriptor;
pub mod encode;
mod error;
mod form;
mod media;
mod method;
mod multipart;
pub mod prelude;
mod request;
mod response;
mod transport;

pub use assembler::RequestAssembler;
pub use body::{RequestBody, ResponseBody};
pub use descriptor::{
    Annotations, BodyMode, CallDescriptor, CallDescriptorBuilder, Invocation, Priority, ReturnType,
    TypeParam, TypeTag,
};
pub use encode::{canonicalize_for_path, has_path_traversal};
pub use error::{Error, Result};
pub use form::FormBody;
pub use media::MediaType;
pub use method::Method;
pub use multipart::{MultipartBody, Part};
pub use request::Request;
pub use response::{RawResponse, Response};
pub use transport::{RawCall, RawCallback, Transport};

// Re-export http crate types for status codes, headers, and extensions.
pub use http::{Extensions, HeaderMap, HeaderName, HeaderValue, StatusCode, header};
