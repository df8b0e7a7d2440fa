//! Operation handlers: the unit a `Service` registers and the dispatcher invokes.

use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;
use nexus_core::{LazyValue, OperationDefinition, OperationDescriptor};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{HandlerError, StartOperationError};
use super::operation::{OperationContext, StartOperationOptions, StartOperationResult, SyncValue};

// ---------------------------------------------------------------------------
// OperationHandler trait
// ---------------------------------------------------------------------------

/// A named, invocable operation.
///
/// Implementations decode their own input from the `LazyValue`, so the
/// dispatcher never needs to know concrete input types.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// Operation name, unique within its service.
    fn name(&self) -> &str;

    /// Name plus declared input/output types.
    fn descriptor(&self) -> OperationDescriptor;

    /// Starts the operation.
    async fn start(
        &self,
        ctx: OperationContext,
        input: LazyValue,
        options: StartOperationOptions,
    ) -> Result<StartOperationResult, StartOperationError>;
}

// ---------------------------------------------------------------------------
// SyncOperation
// ---------------------------------------------------------------------------

/// An operation that completes within the start call.
///
/// `start` decodes the input as `I` (failing fast on decode errors), runs
/// the function, and wraps its output in `StartOperationResult::Sync`. An
/// `OperationError` from the function becomes `StartOperationResult::Failed`;
/// any other error is returned as-is.
pub struct SyncOperation<I, O, F> {
    name: String,
    func: F,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, F, Fut> SyncOperation<I, O, F>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + Sync + 'static,
    F: Fn(OperationContext, I, StartOperationOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, HandlerError>> + Send + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
            _types: PhantomData,
        }
    }

    /// Builds the operation from a typed definition, so the function's
    /// input and output types are checked against it at compile time.
    pub fn from_definition(def: &OperationDefinition<I, O>, func: F) -> Self {
        Self::new(def.name(), func)
    }
}

#[async_trait]
impl<I, O, F, Fut> OperationHandler for SyncOperation<I, O, F>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + Sync + 'static,
    F: Fn(OperationContext, I, StartOperationOptions) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, HandlerError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> OperationDescriptor {
        OperationDescriptor::new::<I, O>(self.name.clone())
    }

    async fn start(
        &self,
        ctx: OperationContext,
        input: LazyValue,
        options: StartOperationOptions,
    ) -> Result<StartOperationResult, StartOperationError> {
        let input: I = input.consume().await?;
        match (self.func)(ctx, input, options).await {
            Ok(output) => Ok(StartOperationResult::Sync(SyncValue::new(output))),
            Err(HandlerError::Operation(err)) => Ok(StartOperationResult::Failed(err)),
            Err(err) => Err(StartOperationError::Handler(err)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use nexus_core::{default_serializer, Payload, TypeDescriptor, APPLICATION_JSON};

    use super::*;
    use crate::service::error::{HandlerErrorKind, OperationError, OperationState};
    use crate::service::operation::HandlerContext;

    const COUNT: OperationDefinition<String, i64> = OperationDefinition::new("count");

    async fn count_chars(
        _ctx: OperationContext,
        input: String,
        _options: StartOperationOptions,
    ) -> Result<i64, HandlerError> {
        Ok(i64::try_from(input.chars().count()).unwrap_or(i64::MAX))
    }

    fn json(body: &'static str) -> LazyValue {
        LazyValue::new(default_serializer(), Payload::new(APPLICATION_JSON, body.as_bytes()))
    }

    fn ctx() -> OperationContext {
        OperationContext::new(
            "Svc",
            "count",
            &HandlerContext::new(),
            &StartOperationOptions::default(),
        )
    }

    #[tokio::test]
    async fn decodes_invokes_and_wraps_output() {
        let op = SyncOperation::from_definition(&COUNT, count_chars);
        assert_eq!(op.name(), "count");

        let result = op
            .start(ctx(), json(r#""some string""#), StartOperationOptions::default())
            .await
            .unwrap();
        let value = result.into_sync().unwrap();
        assert_eq!(value.downcast::<i64>().unwrap(), 11);
    }

    #[tokio::test]
    async fn descriptor_reports_declared_types() {
        let op = SyncOperation::new("count", count_chars);
        let desc = op.descriptor();
        assert_eq!(desc, COUNT.descriptor());
        assert_eq!(desc.input, TypeDescriptor::of::<String>());
    }

    #[tokio::test]
    async fn decode_failure_skips_function() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let op = SyncOperation::new(
            "count",
            move |_ctx: OperationContext, input: String, _opts: StartOperationOptions| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<usize, HandlerError>(input.len()) }
            },
        );
        let err = op
            .start(ctx(), json("{ broken"), StartOperationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StartOperationError::Serialization(_)));
        assert_eq!(err.kind(), HandlerErrorKind::BadRequest);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn operation_error_becomes_failed_result() {
        let op = SyncOperation::new(
            "fail",
            |_ctx: OperationContext, _input: (), _opts: StartOperationOptions| async move {
                Err::<(), _>(HandlerError::from(OperationError::failed("no luck")))
            },
        );
        let result = op
            .start(
                ctx(),
                LazyValue::new(default_serializer(), Payload::default()),
                StartOperationOptions::default(),
            )
            .await
            .unwrap();
        match result {
            StartOperationResult::Failed(err) => {
                assert_eq!(err.state, OperationState::Failed);
                assert_eq!(err.message, "no luck");
            }
            other => panic!("expected failed result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handler_error_propagates_unchanged() {
        let op = SyncOperation::new(
            "external",
            |_ctx: OperationContext, _input: String, _opts: StartOperationOptions| async move {
                Err::<i64, _>(HandlerError::not_implemented("not implemented"))
            },
        );
        let err = op
            .start(ctx(), json(r#""x""#), StartOperationOptions::default())
            .await
            .unwrap_err();
        match err {
            StartOperationError::Handler(HandlerError::Request { kind, message, .. }) => {
                assert_eq!(kind, HandlerErrorKind::NotImplemented);
                assert_eq!(message, "not implemented");
            }
            other => panic!("expected handler error, got {other:?}"),
        }
    }
}
