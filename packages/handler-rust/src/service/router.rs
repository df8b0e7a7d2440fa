//! Operation dispatch: resolves `(service, operation)` and invokes the handler.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use nexus_core::LazyValue;
use tracing::{debug, warn};

use super::error::{NotFoundError, StartOperationError};
use super::handler::OperationHandler;
use super::operation::{HandlerContext, OperationContext, StartOperationOptions, StartOperationResult};
use super::registry::Service;

/// Boxed future returned by the tower services in the dispatch pipeline.
pub type BoxedFuture =
    Pin<Box<dyn Future<Output = Result<StartOperationResult, StartOperationError>> + Send>>;

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Compiled, immutable dispatch target produced by `ServiceRegistry::new_handler`.
///
/// Cloning is cheap (one `Arc`), and `start_operation` only reads the frozen
/// service map, so a handler can be shared freely across tasks.
#[derive(Clone)]
pub struct Handler {
    services: Arc<HashMap<String, Service>>,
}

impl Handler {
    pub(crate) fn new(services: HashMap<String, Service>) -> Self {
        Self {
            services: Arc::new(services),
        }
    }

    /// Resolves an operation handler by service and operation name.
    ///
    /// # Errors
    ///
    /// Returns `NotFoundError` with `kind` set to `Service` or `Operation`
    /// depending on which lookup failed.
    pub fn resolve(&self, service: &str, operation: &str) -> Result<Arc<dyn OperationHandler>, NotFoundError> {
        let Some(svc) = self.services.get(service) else {
            warn!(service, operation, "service not found");
            return Err(NotFoundError::service(service, operation));
        };
        let Some(handler) = svc.operation(operation) else {
            warn!(service, operation, "operation not found");
            return Err(NotFoundError::operation(service, operation));
        };
        Ok(Arc::clone(handler))
    }

    /// Dispatches a start request.
    ///
    /// Only resolution failures are produced here; decode errors, business
    /// errors, and results come back from the operation handler unchanged.
    ///
    /// # Errors
    ///
    /// Returns `StartOperationError::NotFound` for an unknown service or
    /// operation, otherwise whatever the operation handler returns.
    pub async fn start_operation(
        &self,
        ctx: HandlerContext,
        service: &str,
        operation: &str,
        input: LazyValue,
        options: StartOperationOptions,
    ) -> Result<StartOperationResult, StartOperationError> {
        let handler = self.resolve(service, operation)?;
        debug!(
            service,
            operation,
            request_id = %options.request_id,
            content_type = input.content_type(),
            "dispatching operation"
        );
        let op_ctx = OperationContext::new(service, operation, &ctx, &options);
        handler.start(op_ctx, input, options).await
    }

    /// Registered service names, in no particular order.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    #[must_use]
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// Looks up an operation without logging a miss.
    #[must_use]
    pub fn operation(&self, service: &str, name: &str) -> Option<&Arc<dyn OperationHandler>> {
        self.services.get(service)?.operation(name)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("services", &self.services.values().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tower integration
// ---------------------------------------------------------------------------

/// A start request as a single value, for use with `tower` middleware.
#[derive(Debug)]
pub struct StartOperationRequest {
    pub ctx: HandlerContext,
    pub service: String,
    pub operation: String,
    pub input: LazyValue,
    pub options: StartOperationOptions,
}

impl StartOperationRequest {
    pub fn new(service: impl Into<String>, operation: impl Into<String>, input: LazyValue) -> Self {
        Self {
            ctx: HandlerContext::default(),
            service: service.into(),
            operation: operation.into(),
            input,
            options: StartOperationOptions::default(),
        }
    }
}

impl tower::Service<StartOperationRequest> for Handler {
    type Response = StartOperationResult;
    type Error = StartOperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Dispatch holds no per-request resources; the handler is always ready.
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: StartOperationRequest) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move {
            handler
                .start_operation(req.ctx, &req.service, &req.operation, req.input, req.options)
                .await
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
