//! Concurrency limit for dispatch.
//!
//! A request that finds no free slot fails fast with
//! `StartOperationError::Overloaded`; nothing is queued.

use std::future;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::Semaphore;
use tower::{Layer, Service};

use crate::service::error::StartOperationError;
use crate::service::operation::StartOperationResult;
use crate::service::router::{BoxedFuture, StartOperationRequest};

// ---------------------------------------------------------------------------
// LoadShedLayer
// ---------------------------------------------------------------------------

/// Shares one pool of `max_concurrent` slots across every service it wraps.
#[derive(Debug, Clone)]
pub struct LoadShedLayer {
    slots: Arc<Semaphore>,
}

impl LoadShedLayer {
    #[must_use]
    pub fn new(max_concurrent: u32) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max_concurrent as usize)),
        }
    }

    /// Slots not currently held by an in-flight operation.
    #[must_use]
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }
}

impl<S> Layer<S> for LoadShedLayer {
    type Service = LoadShedService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        LoadShedService {
            inner,
            slots: Arc::clone(&self.slots),
        }
    }
}

// ---------------------------------------------------------------------------
// LoadShedService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LoadShedService<S> {
    inner: S,
    slots: Arc<Semaphore>,
}

impl<S> Service<StartOperationRequest> for LoadShedService<S>
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
        match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(slot) => {
                let inner = self.inner.call(req);
                Box::pin(async move {
                    let result = inner.await;
                    drop(slot);
                    result
                })
            }
            Err(_) => {
                tracing::warn!(
                    service = %req.service,
                    operation = %req.operation,
                    "no dispatch slot free, rejecting"
                );
                Box::pin(future::ready(Err(StartOperationError::Overloaded)))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
