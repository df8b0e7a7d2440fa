//! Nexus Handler — registers services and dispatches start-operation requests
//! to typed, synchronous operation handlers.

pub mod service;
pub mod telemetry;

pub use nexus_core::{
    default_serializer, LazyValue, OperationDefinition, Payload, SerializationError, Serializer,
    ServiceDefinition,
};
pub use service::{
    build_dispatch_pipeline, ConfigurationError, Handler, HandlerConfig, HandlerContext,
    HandlerError, HandlerErrorKind, NotFoundError, NotFoundKind, OperationContext, OperationError,
    OperationHandler, Service, ServiceRegistry, StartOperationError, StartOperationOptions,
    StartOperationResult, SyncOperation, SyncValue,
};
pub use telemetry::init_tracing;
