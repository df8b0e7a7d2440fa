//! Pipeline composition: combines the middleware layers around a `Handler`.

use tower::ServiceBuilder;

use super::load_shed::LoadShedLayer;
use super::metrics::MetricsLayer;
use crate::service::config::HandlerConfig;
use crate::service::error::StartOperationError;
use crate::service::operation::StartOperationResult;
use crate::service::router::{BoxedFuture, Handler, StartOperationRequest};

/// Build the dispatch pipeline by wrapping a `Handler` with middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `MetricsLayer` -- record timing and outcome, including shed requests
/// 2. `LoadShedLayer` -- reject when overloaded, before any decoding
///
/// No timeout layer: cancellation and deadlines belong to the business
/// logic, through `OperationContext`.
#[must_use]
pub fn build_dispatch_pipeline(
    handler: Handler,
    config: &HandlerConfig,
) -> impl tower::Service<
    StartOperationRequest,
    Response = StartOperationResult,
    Error = StartOperationError,
    Future = BoxedFuture,
> + Clone {
    ServiceBuilder::new()
        .layer(MetricsLayer)
        .layer(LoadShedLayer::new(config.max_concurrent_operations))
        .service(handler)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
