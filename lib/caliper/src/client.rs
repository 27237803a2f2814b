//! The configured caliper client: registries, defaults, and resolution.

use std::sync::Arc;

use caliper_core::{
    Annotations, CallDescriptor, Error, Request, RequestAssembler, Result, ReturnType, Transport,
    TypeTag,
};
use tracing::{debug, trace};
use url::Url;

use crate::adapter::{AdaptedCall, CallAdapter, CallAdapterFactory, DefaultCallAdapterFactory};
use crate::call::{BridgedCall, Call, TypedCall};
use crate::converter::{BuiltinConverters, ConverterFactory, RequestConverter, ResponseConverter};
use crate::executor::{CallbackExecutor, TokioCallbackExecutor};
use crate::future::{
    CallFuture, FutureCallAdapterFactory, ResponseFuture, TypedCallFuture, TypedResponseFuture,
};

/// The configured request-construction and call-adaptation core.
///
/// Holds the transport, the base URL, and the ordered converter and
/// call-adapter factory chains. Immutable once built; resolution methods
/// are pure and safe to call concurrently.
#[derive(Clone)]
pub struct Caliper {
    transport: Arc<dyn Transport>,
    base_url: Url,
    converter_factories: Vec<Arc<dyn ConverterFactory>>,
    default_converter_factories: usize,
    call_adapter_factories: Vec<Arc<dyn CallAdapterFactory>>,
    default_call_adapter_factories: usize,
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
}

impl std::fmt::Debug for Caliper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Caliper")
            .field("base_url", &self.base_url.as_str())
            .field("converter_factories", &self.converter_factories.len())
            .field("call_adapter_factories", &self.call_adapter_factories.len())
            .field("has_callback_executor", &self.callback_executor.is_some())
            .finish_non_exhaustive()
    }
}

impl Caliper {
    /// Create a new [`Builder`].
    #[must_use]
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The API base URL every relative URL resolves against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The executor completion callbacks are marshaled onto, if any.
    #[must_use]
    pub fn callback_executor(&self) -> Option<&Arc<dyn CallbackExecutor>> {
        self.callback_executor.as_ref()
    }

    /// The converter factories, in resolution order.
    #[must_use]
    pub fn converter_factories(&self) -> &[Arc<dyn ConverterFactory>] {
        &self.converter_factories
    }

    /// The call-adapter factories, in resolution order.
    #[must_use]
    pub fn call_adapter_factories(&self) -> &[Arc<dyn CallAdapterFactory>] {
        &self.call_adapter_factories
    }

    /// An assembler for one invocation of `descriptor`, seeded with this
    /// client's base URL.
    #[must_use]
    pub fn assembler(&self, descriptor: &CallDescriptor) -> RequestAssembler {
        RequestAssembler::new(self.base_url.clone(), descriptor)
    }

    /// Resolve a request-body converter for `target`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnresolvedConverter`] when no factory applies.
    pub fn request_body_converter(
        &self,
        target: TypeTag,
        param_annotations: &Annotations,
        method_annotations: &Annotations,
    ) -> Result<Arc<dyn RequestConverter>> {
        self.next_request_body_converter(None, target, param_annotations, method_annotations)
    }

    /// Resolve a request-body converter, skipping every factory up to and
    /// including `skip_past`; lets a delegating factory compose with the
    /// rest of the chain.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnresolvedConverter`] when no remaining factory
    /// applies.
    pub fn next_request_body_converter(
        &self,
        skip_past: Option<&Arc<dyn ConverterFactory>>,
        target: TypeTag,
        param_annotations: &Annotations,
        method_annotations: &Annotations,
    ) -> Result<Arc<dyn RequestConverter>> {
        let start = skip_index(&self.converter_factories, skip_past);
        for factory in self.converter_factories.iter().skip(start) {
            if let Some(converter) =
                factory.request_converter(target, param_annotations, method_annotations, self)
            {
                trace!(
                    factory = factory.name(),
                    body_type = target.name(),
                    "resolved request body converter"
                );
                return Ok(converter);
            }
        }
        Err(Error::unresolved_converter(
            "request body",
            target.name(),
            &self.converter_factory_names(start),
        ))
    }

    /// Resolve a response-body converter for `target`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnresolvedConverter`] when no factory applies.
    pub fn response_body_converter(
        &self,
        target: TypeTag,
        annotations: &Annotations,
    ) -> Result<Arc<dyn ResponseConverter>> {
        self.next_response_body_converter(None, target, annotations)
    }

    /// Resolve a response-body converter, skipping every factory up to and
    /// including `skip_past`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnresolvedConverter`] when no remaining factory
    /// applies.
    pub fn next_response_body_converter(
        &self,
        skip_past: Option<&Arc<dyn ConverterFactory>>,
        target: TypeTag,
        annotations: &Annotations,
    ) -> Result<Arc<dyn ResponseConverter>> {
        let start = skip_index(&self.converter_factories, skip_past);
        for factory in self.converter_factories.iter().skip(start) {
            if let Some(converter) = factory.response_converter(target, annotations, self) {
                trace!(
                    factory = factory.name(),
                    body_type = target.name(),
                    "resolved response body converter"
                );
                return Ok(converter);
            }
        }
        Err(Error::unresolved_converter(
            "response body",
            target.name(),
            &self.converter_factory_names(start),
        ))
    }

    /// Resolve the call adapter for `return_type`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::UnresolvedAdapter`] when no factory applies, or
    /// with the factory's own configuration error for a recognized but
    /// malformed shape.
    pub fn call_adapter(
        &self,
        return_type: &ReturnType,
        annotations: &Annotations,
    ) -> Result<Arc<dyn CallAdapter>> {
        self.next_call_adapter(None, return_type, annotations)
    }

    /// Resolve the call adapter, skipping every factory up to and including
    /// `skip_past`.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Caliper::call_adapter`].
    pub fn next_call_adapter(
        &self,
        skip_past: Option<&Arc<dyn CallAdapterFactory>>,
        return_type: &ReturnType,
        annotations: &Annotations,
    ) -> Result<Arc<dyn CallAdapter>> {
        let start = skip_index(&self.call_adapter_factories, skip_past);
        for factory in self.call_adapter_factories.iter().skip(start) {
            if let Some(adapter) = factory.get(return_type, annotations, self)? {
                trace!(factory = factory.name(), %return_type, "resolved call adapter");
                return Ok(adapter);
            }
        }
        let tried: Vec<&str> = self
            .call_adapter_factories
            .iter()
            .skip(start)
            .map(|factory| factory.name())
            .collect();
        Err(Error::unresolved_adapter(return_type.to_string(), &tried))
    }

    /// Bridge `request` into a cancellable call whose response body decodes
    /// to `response_type`. Converter resolution happens here, eagerly,
    /// before any transport activity.
    ///
    /// # Errors
    ///
    /// Fails when no response-body converter resolves for `response_type`.
    pub fn new_call(
        &self,
        request: Request,
        response_type: TypeTag,
        annotations: &Annotations,
    ) -> Result<Box<dyn Call>> {
        let converter = self.response_body_converter(response_type, annotations)?;
        Ok(Box::new(BridgedCall::new(
            Arc::clone(&self.transport),
            request,
            converter,
        )))
    }

    /// Resolve the adapter for `return_type`, bridge `request`, and adapt.
    ///
    /// # Errors
    ///
    /// Any configuration error from adapter or converter resolution.
    pub fn adapt_call(
        &self,
        return_type: &ReturnType,
        annotations: &Annotations,
        request: Request,
    ) -> Result<AdaptedCall> {
        let adapter = self.call_adapter(return_type, annotations)?;
        let call = self.new_call(request, adapter.response_type(), annotations)?;
        Ok(adapter.adapt(call))
    }

    /// Adapt `request` into a typed cancellable call handle.
    ///
    /// # Errors
    ///
    /// Configuration errors from resolution, or an unexpected-type error
    /// when a user adapter factory intercepted the call shape with a
    /// different product.
    pub fn call<T: 'static>(
        &self,
        request: Request,
        annotations: &Annotations,
    ) -> Result<TypedCall<T>> {
        let adapted = self.adapt_call(&ReturnType::call::<T>(), annotations, request)?;
        adapted
            .downcast::<Box<dyn Call>>()
            .map(|call| TypedCall::new(*call))
            .map_err(|_| Error::unexpected_type("call adapter did not produce a Call"))
    }

    /// Adapt `request` into a typed future resolving to the decoded body.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Caliper::call`].
    pub fn future<T: 'static>(
        &self,
        request: Request,
        annotations: &Annotations,
    ) -> Result<TypedCallFuture<T>> {
        let adapted = self.adapt_call(&ReturnType::future::<T>(), annotations, request)?;
        adapted
            .downcast::<CallFuture>()
            .map(|future| (*future).typed())
            .map_err(|_| Error::unexpected_type("call adapter did not produce a CallFuture"))
    }

    /// Adapt `request` into a typed future resolving to the full response.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Caliper::call`].
    pub fn future_response<T: 'static>(
        &self,
        request: Request,
        annotations: &Annotations,
    ) -> Result<TypedResponseFuture<T>> {
        let adapted = self.adapt_call(&ReturnType::future_response::<T>(), annotations, request)?;
        adapted
            .downcast::<ResponseFuture>()
            .map(|future| (*future).typed())
            .map_err(|_| Error::unexpected_type("call adapter did not produce a ResponseFuture"))
    }

    /// A builder seeded with this client's configuration, minus the default
    /// factories `build` adds back.
    #[must_use]
    pub fn to_builder(&self) -> Builder {
        let user_converters = self
            .converter_factories
            .len()
            .saturating_sub(self.default_converter_factories);
        let user_adapters = self
            .call_adapter_factories
            .len()
            .saturating_sub(self.default_call_adapter_factories);
        Builder {
            transport: Some(Arc::clone(&self.transport)),
            base_url: Some(self.base_url.to_string()),
            converter_factories: self
                .converter_factories
                .iter()
                .take(user_converters)
                .cloned()
                .collect(),
            call_adapter_factories: self
                .call_adapter_factories
                .iter()
                .take(user_adapters)
                .cloned()
                .collect(),
            callback_executor: self.callback_executor.clone(),
            defaults: None,
        }
    }

    fn converter_factory_names(&self, start: usize) -> Vec<&str> {
        self.converter_factories
            .iter()
            .skip(start)
            .map(|factory| factory.name())
            .collect()
    }
}

fn skip_index<T: ?Sized>(factories: &[Arc<T>], skip_past: Option<&Arc<T>>) -> usize {
    skip_past
        .and_then(|skip| factories.iter().position(|factory| Arc::ptr_eq(factory, skip)))
        .map_or(0, |index| index + 1)
}

/// Default executor and factory set supplied at client construction.
///
/// Enumerating the defaults as plain configuration replaces any
/// platform-probing: whoever builds the client decides what "default"
/// means.
pub struct Defaults {
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
    converter_factories: Vec<Arc<dyn ConverterFactory>>,
    call_adapter_factories: Vec<Arc<dyn CallAdapterFactory>>,
}

impl Defaults {
    /// Standard defaults: a Tokio callback executor when a runtime is
    /// running, the future adapter factory, and the executor-aware direct
    /// adapter factory.
    #[must_use]
    pub fn standard() -> Self {
        let executor = TokioCallbackExecutor::try_current()
            .map(|executor| Arc::new(executor) as Arc<dyn CallbackExecutor>);
        Self::with_executor(executor)
    }

    /// The standard factory set wired to an explicit executor.
    #[must_use]
    pub fn with_executor(executor: Option<Arc<dyn CallbackExecutor>>) -> Self {
        Self {
            callback_executor: executor.clone(),
            converter_factories: Vec::new(),
            call_adapter_factories: vec![
                Arc::new(FutureCallAdapterFactory) as Arc<dyn CallAdapterFactory>,
                Arc::new(DefaultCallAdapterFactory::new(executor)),
            ],
        }
    }

    /// Replace the default converter factories (appended before the
    /// built-in converters).
    #[must_use]
    pub fn converter_factories(mut self, factories: Vec<Arc<dyn ConverterFactory>>) -> Self {
        self.converter_factories = factories;
        self
    }

    /// Replace the default call-adapter factories (appended after user
    /// factories).
    #[must_use]
    pub fn call_adapter_factories(mut self, factories: Vec<Arc<dyn CallAdapterFactory>>) -> Self {
        self.call_adapter_factories = factories;
        self
    }
}

impl std::fmt::Debug for Defaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Defaults")
            .field("has_callback_executor", &self.callback_executor.is_some())
            .field("converter_factories", &self.converter_factories.len())
            .field("call_adapter_factories", &self.call_adapter_factories.len())
            .finish()
    }
}

/// Builder for [`Caliper`].
///
/// A transport and a base URL are required; the base URL must end in `/`
/// so relative endpoint paths append to it instead of replacing its last
/// segment.
#[derive(Default)]
pub struct Builder {
    transport: Option<Arc<dyn Transport>>,
    base_url: Option<String>,
    converter_factories: Vec<Arc<dyn ConverterFactory>>,
    call_adapter_factories: Vec<Arc<dyn CallAdapterFactory>>,
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
    defaults: Option<Defaults>,
}

impl std::fmt::Debug for Builder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("base_url", &self.base_url)
            .field("converter_factories", &self.converter_factories.len())
            .field("call_adapter_factories", &self.call_adapter_factories.len())
            .finish_non_exhaustive()
    }
}

impl Builder {
    /// Set the transport that executes calls.
    #[must_use]
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Set an already shared transport.
    #[must_use]
    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Set the API base URL. Must end in `/`.
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Append a user converter factory. User factories are consulted before
    /// the built-in and default factories and can override every built-in
    /// decision.
    #[must_use]
    pub fn converter_factory(mut self, factory: impl ConverterFactory + 'static) -> Self {
        self.converter_factories.push(Arc::new(factory));
        self
    }

    /// Append a user call-adapter factory, consulted before the defaults.
    #[must_use]
    pub fn call_adapter_factory(mut self, factory: impl CallAdapterFactory + 'static) -> Self {
        self.call_adapter_factories.push(Arc::new(factory));
        self
    }

    /// Set the executor completion callbacks are marshaled onto.
    #[must_use]
    pub fn callback_executor(mut self, executor: impl CallbackExecutor + 'static) -> Self {
        self.callback_executor = Some(Arc::new(executor));
        self
    }

    /// Replace the defaults wholesale; overrides a callback executor set
    /// through [`Builder::callback_executor`].
    #[must_use]
    pub fn defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = Some(defaults);
        self
    }

    /// Build the configured client.
    ///
    /// # Errors
    ///
    /// Fails when the transport or base URL is missing, the base URL does
    /// not parse, or its path does not end in `/`.
    pub fn build(self) -> Result<Caliper> {
        let transport = self
            .transport
            .ok_or_else(|| Error::invalid_state("transport required"))?;
        let base_url = self
            .base_url
            .ok_or_else(|| Error::invalid_state("base URL required"))?;
        let base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            return Err(Error::invalid_request(format!(
                "base URL must end in '/': {base_url}"
            )));
        }

        let defaults = match (self.defaults, self.callback_executor) {
            (Some(defaults), _) => defaults,
            (None, Some(executor)) => Defaults::with_executor(Some(executor)),
            (None, None) => Defaults::standard(),
        };
        let Defaults {
            callback_executor,
            converter_factories: default_converters,
            call_adapter_factories: default_adapters,
        } = defaults;

        // User factories first; defaults and the built-ins are appended last
        // so user factories can override every built-in decision.
        let default_converter_factories = default_converters.len() + 1;
        let mut converter_factories = self.converter_factories;
        converter_factories.extend(default_converters);
        converter_factories.push(Arc::new(BuiltinConverters));

        let default_call_adapter_factories = default_adapters.len();
        let mut call_adapter_factories = self.call_adapter_factories;
        call_adapter_factories.extend(default_adapters);

        debug!(
            base_url = %base_url,
            converter_factories = converter_factories.len(),
            call_adapter_factories = call_adapter_factories.len(),
            "caliper client built"
        );

        Ok(Caliper {
            transport,
            base_url,
            converter_factories,
            default_converter_factories,
            call_adapter_factories,
            default_call_adapter_factories,
            callback_executor,
        })
    }
}
