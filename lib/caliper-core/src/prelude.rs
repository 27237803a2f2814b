//! Convenience re-exports for working with the caliper core types.

pub use crate::{
    Annotations, BodyMode, CallDescriptor, Error, MediaType, Method, Priority, RawCall,
    RawResponse, Request, RequestAssembler, RequestBody, Response, ResponseBody, Result,
    ReturnType, Transport, TypeTag,
};
