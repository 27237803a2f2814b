//! Convenience re-exports for working with caliper.

pub use crate::{
    Annotations, BodyMode, Call, CallAdapter, CallAdapterFactory, CallDescriptor, Caliper,
    CallbackExecutor, ConverterFactory, Error, Method, Payload, RawCall, RawResponse, Request,
    RequestBody, RequestConverter, Response, ResponseBody, ResponseConverter, Result, ReturnType,
    Transport, TypeTag, TypedCall,
};
