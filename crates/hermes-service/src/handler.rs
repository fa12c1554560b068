//! The per-method adapter.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use chrono::Local;
use http::Response;
use serde_json::Value;
use tracing::Instrument;

use hermes_core::envelope::MSG_PARSE_ARGUMENT_FAILED;
use hermes_core::{
    invoke, ArgShape, Argument, BoxFuture, CallContext, CallRecorder, ContractViolation,
    FormattedResponse, IntoMethodReturn, MethodContract, Params, ResponseWriter,
};
use hermes_extract::{ArgumentResolver, InboundRequest, MultipartConfig};
use hermes_telemetry::{record_call, CallOutcome, InFlightGuard};

use crate::format;
use crate::options::ServiceOptions;
use crate::record;
use crate::trace::CallTrace;

/// Object-safe view of a bound handler, as stored by a router.
pub trait Endpoint: Send + Sync + 'static {
    /// Handles one request with the path parameters captured for it.
    fn call(&self, request: InboundRequest, params: Params) -> BoxFuture<'_, Response<Bytes>>;

    /// Name used in logs and metrics.
    fn name(&self) -> &str;
}

/// Adapter turning one service method into a request handler.
///
/// Holds no per-call state; share it behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use hermes_core::{validated_argument, CallContext};
/// use hermes_extract::InboundRequest;
/// use hermes_service::{ServiceHandler, ServiceOptions};
/// use serde::{Deserialize, Serialize};
/// use validator::Validate;
///
/// #[derive(Serialize, Deserialize, Validate)]
/// struct Add {
///     a: i64,
///     b: i64,
/// }
///
/// validated_argument!(Add);
///
/// let handler = ServiceHandler::bind(
///     |_ctx: CallContext, add: Add| async move { add.a + add.b },
///     ServiceOptions::default(),
/// )
/// .unwrap();
///
/// # tokio_test::block_on(async {
/// let request = InboundRequest::builder().uri("/add?a=2&b=3").build();
/// let response = handler.handle(request, None).await;
/// assert_eq!(response.body().as_ref(), b"5\n");
/// # });
/// ```
pub struct ServiceHandler<A, R> {
    name: String,
    contract: MethodContract<A, R>,
    resolver: ArgumentResolver,
    options: ServiceOptions,
}

impl<A, R> ServiceHandler<A, R>
where
    A: Argument,
    R: IntoMethodReturn,
{
    /// Verifies `method` and binds it with `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ContractViolation`] if the argument type is not a record,
    /// a string-keyed map or a sequence.
    pub fn bind<F, Fut>(method: F, options: ServiceOptions) -> Result<Self, ContractViolation>
    where
        F: Fn(CallContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self::builder(method).options(options).build()
    }

    /// Starts building a handler for `method`.
    pub fn builder<F, Fut>(method: F) -> ServiceHandlerBuilder<A, R>
    where
        F: Fn(CallContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        ServiceHandlerBuilder {
            name: std::any::type_name::<F>().to_string(),
            contract: MethodContract::check(method),
            options: ServiceOptions::default(),
            _marker: PhantomData,
        }
    }

    /// Name used in logs and metrics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shape of the bound method's argument.
    #[must_use]
    pub fn shape(&self) -> &ArgShape {
        self.contract.shape()
    }

    /// The handler settings.
    #[must_use]
    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Resolves the argument, calls the method and builds the response.
    ///
    /// Resolution failures answer `400` without calling the method or the
    /// recorder. Everything the method does to the
    /// [`ResponseWriter`] it receives through its [`CallContext`] is part of
    /// the returned response.
    pub async fn handle(&self, request: InboundRequest, params: Option<&Params>) -> Response<Bytes> {
        let trace = CallTrace::new(&self.name, &request);
        let span = trace.span().clone();
        self.serve(request, params, trace).instrument(span).await
    }

    async fn serve(
        &self,
        request: InboundRequest,
        params: Option<&Params>,
        trace: CallTrace,
    ) -> Response<Bytes> {
        let writer = ResponseWriter::new();

        let argument: A = match self.resolver.resolve(&request, params).await {
            Ok(argument) => argument,
            Err(err) => {
                tracing::debug!(error = %err, code = err.error_code(), "argument resolution failed");
                let response = FormattedResponse::new(
                    400,
                    MSG_PARSE_ARGUMENT_FAILED,
                    Value::String(err.to_string()),
                );
                format::write_envelope(&writer, &trace, &response);
                record_call(&self.name, CallOutcome::BadRequest, None);
                return writer.take_response();
            }
        };

        let recorded_argument = self
            .options
            .recorder
            .as_ref()
            .map(|_| record::encode(&argument));

        let ctx = call_context(&request, &writer);

        let in_flight = InFlightGuard::new();
        let begin = Local::now();
        let started = Instant::now();
        let invocation = invoke(|| self.contract.call(ctx, argument)).await;
        let duration = started.elapsed();
        drop(in_flight);

        let (outcome, written) =
            format::respond(&writer, &trace, invocation, self.options.bypass_response_body);

        tracing::debug!(
            outcome = %outcome,
            duration_ms = duration.as_secs_f64() * 1000.0,
            "service call finished"
        );
        record_call(&self.name, outcome, Some(duration));

        if let (Some(recorder), Some(argument)) = (&self.options.recorder, &recorded_argument) {
            record::emit(recorder.as_ref(), argument, &written, &begin, duration);
        }

        writer.take_response()
    }
}

fn call_context(request: &InboundRequest, writer: &ResponseWriter) -> CallContext {
    let mut builder = CallContext::builder()
        .cancellation(request.cancellation().clone())
        .headers(request.headers().clone())
        .body(request.body().clone())
        .writer(writer.clone());
    if let Some(addr) = request.remote_addr() {
        builder = builder.remote_addr(addr);
    }
    builder.build()
}

impl<A, R> Endpoint for ServiceHandler<A, R>
where
    A: Argument,
    R: IntoMethodReturn,
{
    fn call(&self, request: InboundRequest, params: Params) -> BoxFuture<'_, Response<Bytes>> {
        Box::pin(async move { self.handle(request, Some(&params)).await })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<A, R> fmt::Debug for ServiceHandler<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandler")
            .field("name", &self.name)
            .field("contract", &self.contract)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ServiceHandler`].
///
/// The contract is checked when the builder is created; the error surfaces
/// from [`build`](Self::build).
pub struct ServiceHandlerBuilder<A, R> {
    name: String,
    contract: Result<MethodContract<A, R>, ContractViolation>,
    options: ServiceOptions,
    _marker: PhantomData<fn(A) -> R>,
}

impl<A, R> ServiceHandlerBuilder<A, R>
where
    A: Argument,
    R: IntoMethodReturn,
{
    /// Sets the name used in logs and metrics.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Replaces every option at once.
    pub fn options(mut self, options: ServiceOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the call recorder.
    pub fn recorder(mut self, recorder: impl CallRecorder + 'static) -> Self {
        self.options = self.options.recorder(recorder);
        self
    }

    /// Sets a shared call recorder.
    pub fn shared_recorder(mut self, recorder: Arc<dyn CallRecorder>) -> Self {
        self.options = self.options.shared_recorder(recorder);
        self
    }

    /// Leaves JSON request bodies to the method.
    pub fn bypass_request_body(mut self, bypass: bool) -> Self {
        self.options = self.options.bypass_request_body(bypass);
        self
    }

    /// Leaves the response body to the method for plain return values.
    pub fn bypass_response_body(mut self, bypass: bool) -> Self {
        self.options = self.options.bypass_response_body(bypass);
        self
    }

    /// Sets the maximum JSON or urlencoded body size.
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.options = self.options.max_body_size(size);
        self
    }

    /// Sets the multipart limits.
    pub fn multipart(mut self, config: MultipartConfig) -> Self {
        self.options = self.options.multipart(config);
        self
    }

    /// Finishes the handler.
    ///
    /// # Errors
    ///
    /// Returns the [`ContractViolation`] found when the builder was created.
    pub fn build(self) -> Result<ServiceHandler<A, R>, ContractViolation> {
        let contract = self.contract.map_err(|err| {
            tracing::warn!(service = %self.name, error = %err, "service method rejected");
            err
        })?;
        let resolver = ArgumentResolver::new(*contract.shape(), self.options.resolver_config());

        tracing::debug!(
            service = %self.name,
            shape = %contract.shape(),
            recorder = self.options.has_recorder(),
            bypass_request_body = self.options.bypass_request_body,
            bypass_response_body = self.options.bypass_response_body,
            "service handler bound"
        );

        Ok(ServiceHandler {
            name: self.name,
            contract,
            resolver,
            options: self.options,
        })
    }
}

impl<A, R> fmt::Debug for ServiceHandlerBuilder<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandlerBuilder")
            .field("name", &self.name)
            .field("contract_ok", &self.contract.is_ok())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(serde::Serialize, serde::Deserialize)]
    struct Plain(String);

    impl Argument for Plain {}

    #[test]
    fn test_builder_name_defaults_to_method_type() {
        let handler = ServiceHandler::builder(|_ctx: CallContext, _m: HashMap<String, String>| async {})
            .build()
            .unwrap();
        assert!(handler.name().contains("closure"));

        let named = ServiceHandler::builder(|_ctx: CallContext, _m: Vec<i32>| async {})
            .name("list")
            .build()
            .unwrap();
        assert_eq!(named.name(), "list");
        assert_eq!(named.shape(), &ArgShape::Sequence);
    }

    #[test]
    fn test_builder_reports_contract_violation() {
        let err = ServiceHandler::builder(|_ctx: CallContext, _p: Plain| async {})
            .name("plain")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("Plain"));
    }

    #[tokio::test]
    async fn test_endpoint_object() {
        let handler = ServiceHandler::builder(|_ctx: CallContext, m: HashMap<String, String>| async move {
            m.get("id").cloned().unwrap_or_default()
        })
        .name("lookup")
        .build()
        .unwrap();

        let endpoint: Arc<dyn Endpoint> = Arc::new(handler);
        let params: Params = [("id", "42")].into_iter().collect();
        let response = endpoint
            .call(InboundRequest::builder().uri("/lookup/42").build(), params)
            .await;

        assert_eq!(endpoint.name(), "lookup");
        assert_eq!(response.body().as_ref(), b"\"42\"\n");
    }
}
