//! Per-dispatch span with timing and outcome.
//!
//! The span is named `operation` and carries `service`, `operation`,
//! `request_id`, `duration_ms`, and `outcome`. The outcome is `sync` or
//! `failed` for started operations, otherwise the wire name of the error kind.

use std::task::{Context, Poll};
use std::time::Instant;

use tower::{Layer, Service};
use tracing::{field, info_span, Instrument, Span};

use crate::service::error::StartOperationError;
use crate::service::operation::StartOperationResult;
use crate::service::router::{BoxedFuture, StartOperationRequest};

/// Label recorded for a finished dispatch.
fn outcome_label(result: &Result<StartOperationResult, StartOperationError>) -> &'static str {
    match result {
        Ok(started) => started.outcome(),
        Err(err) => err.kind().as_str(),
    }
}

fn dispatch_span(req: &StartOperationRequest) -> Span {
    info_span!(
        "operation",
        service = %req.service,
        operation = %req.operation,
        request_id = %req.options.request_id,
        duration_ms = field::Empty,
        outcome = field::Empty,
    )
}

// ---------------------------------------------------------------------------
// MetricsLayer
// ---------------------------------------------------------------------------

/// Wraps each dispatch in an `operation` span.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsLayer;

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService { inner }
    }
}

// ---------------------------------------------------------------------------
// MetricsService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> Service<StartOperationRequest> for MetricsService<S>
where
    S: Service<StartOperationRequest, Response = StartOperationResult, Error = StartOperationError>,
    S::Future: Send + 'static,
{
    type Response = StartOperationResult;
    type Error = StartOperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: StartOperationRequest) -> Self::Future {
        let span = dispatch_span(&req);
        let started = Instant::now();
        // Inner layers run their synchronous part inside the span too.
        let inner = span.in_scope(|| self.inner.call(req));
        let recorder = span.clone();

        Box::pin(
            async move {
                let result = inner.await;
                let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                let outcome = outcome_label(&result);
                recorder.record("duration_ms", duration_ms);
                recorder.record("outcome", outcome);
                tracing::info!(duration_ms, outcome, "operation complete");
                result
            }
            .instrument(span),
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
