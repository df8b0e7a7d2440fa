//! Operation registration and dispatch.
//!
//! 1. **Operations** (`handler`): `OperationHandler` trait and the `SyncOperation` adapter
//! 2. **Registration** (`registry`): `Service` and `ServiceRegistry`, validated once
//! 3. **Dispatch** (`router`): the immutable `Handler` resolving `(service, operation)`
//! 4. **Middleware** (`middleware`): Tower layers (metrics, load-shedding)

pub mod config;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod operation;
pub mod registry;
pub mod router;

// Re-export key types for convenient access.
pub use config::{HandlerConfig, LogConfig};
pub use error::{
    ConfigurationError, HandlerError, HandlerErrorKind, NotFoundError, NotFoundKind,
    OperationError, OperationState, StartOperationError,
};
pub use handler::{OperationHandler, SyncOperation};
pub use middleware::build_dispatch_pipeline;
pub use operation::{
    HandlerContext, Link, OperationContext, StartOperationOptions, StartOperationResult, SyncValue,
};
pub use registry::{Service, ServiceRegistry};
pub use router::{Handler, StartOperationRequest};
