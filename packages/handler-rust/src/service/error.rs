//! Error taxonomy for registration and dispatch.
//!
//! Registration-time problems are `ConfigurationError`s (the `must_*`
//! registration methods panic with them). Dispatch-time problems are
//! `StartOperationError`s, which a transport adapter maps to protocol
//! responses through [`StartOperationError::kind`].

use std::fmt;

use nexus_core::{Direction, SerializationError, TypeDescriptor};

// ---------------------------------------------------------------------------
// ConfigurationError
// ---------------------------------------------------------------------------

/// Invalid service topology, detected while registering or compiling.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("invalid service name {name:?}: {reason}")]
    InvalidServiceName { name: String, reason: &'static str },
    #[error("invalid operation name {name:?} in service {service}: {reason}")]
    InvalidOperationName {
        service: String,
        name: String,
        reason: &'static str,
    },
    #[error("duplicate service: {name}")]
    DuplicateService { name: String },
    #[error("duplicate operation {operation} in service {service}")]
    DuplicateOperation { service: String, operation: String },
    #[error("must register at least one service")]
    EmptyRegistry,
    #[error("service {service} has no operations registered")]
    EmptyService { service: String },
    #[error("service {service} does not implement declared operation {operation}")]
    MissingOperation { service: String, operation: String },
    #[error("service {service} registers undeclared operation {operation}")]
    UndeclaredOperation { service: String, operation: String },
    #[error(
        "operation {service}/{operation} is declared as {expected_input} -> {expected_output} \
         but registered as {actual_input} -> {actual_output}"
    )]
    OperationTypeMismatch {
        service: String,
        operation: String,
        expected_input: TypeDescriptor,
        expected_output: TypeDescriptor,
        actual_input: TypeDescriptor,
        actual_output: TypeDescriptor,
    },
}

// ---------------------------------------------------------------------------
// NotFoundError
// ---------------------------------------------------------------------------

/// What failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotFoundKind {
    Service,
    Operation,
}

impl NotFoundKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Operation => "operation",
        }
    }
}

impl fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatch target that does not exist in the compiled handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFoundError {
    pub kind: NotFoundKind,
    pub service: String,
    pub operation: String,
}

impl NotFoundError {
    #[must_use]
    pub fn service(service: &str, operation: &str) -> Self {
        Self {
            kind: NotFoundKind::Service,
            service: service.to_string(),
            operation: operation.to_string(),
        }
    }

    #[must_use]
    pub fn operation(service: &str, operation: &str) -> Self {
        Self {
            kind: NotFoundKind::Operation,
            service: service.to_string(),
            operation: operation.to_string(),
        }
    }
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NotFoundKind::Service => write!(f, "service not found: {}", self.service),
            NotFoundKind::Operation => write!(
                f,
                "operation not found: {} in service {}",
                self.operation, self.service
            ),
        }
    }
}

impl std::error::Error for NotFoundError {}

// ---------------------------------------------------------------------------
// HandlerErrorKind
// ---------------------------------------------------------------------------

/// Protocol-level error categories a handler may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerErrorKind {
    BadRequest,
    Unauthenticated,
    Unauthorized,
    NotFound,
    ResourceExhausted,
    Internal,
    NotImplemented,
    Unavailable,
    UpstreamTimeout,
}

impl HandlerErrorKind {
    /// Wire name of the error type.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::NotFound => "NOT_FOUND",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::Internal => "INTERNAL",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::Unavailable => "UNAVAILABLE",
            Self::UpstreamTimeout => "UPSTREAM_TIMEOUT",
        }
    }

    /// Whether a caller may retry a request that failed with this kind.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::ResourceExhausted | Self::Internal | Self::Unavailable | Self::UpstreamTimeout
        )
    }
}

impl fmt::Display for HandlerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// OperationError
// ---------------------------------------------------------------------------

/// Terminal state of an operation that did not succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationState {
    Failed,
    Canceled,
}

impl OperationState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The operation ran and completed unsuccessfully.
#[derive(Debug, thiserror::Error)]
#[error("operation {state}: {message}")]
pub struct OperationError {
    pub state: OperationState,
    pub message: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl OperationError {
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            state: OperationState::Failed,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn canceled(message: impl Into<String>) -> Self {
        Self {
            state: OperationState::Canceled,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---------------------------------------------------------------------------
// HandlerError
// ---------------------------------------------------------------------------

/// Error returned by business logic. Propagated through dispatch unchanged.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The request could not be handled.
    #[error("{kind}: {message}")]
    Request {
        kind: HandlerErrorKind,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
    /// The operation itself completed as failed or canceled.
    #[error(transparent)]
    Operation(#[from] OperationError),
}

impl HandlerError {
    #[must_use]
    pub fn new(kind: HandlerErrorKind, message: impl Into<String>) -> Self {
        Self::Request {
            kind,
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::BadRequest, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::NotFound, message)
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::Internal, message)
    }

    #[must_use]
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::NotImplemented, message)
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(HandlerErrorKind::Unavailable, message)
    }

    /// Protocol category. Operation outcomes that escape a handler are internal.
    #[must_use]
    pub fn kind(&self) -> HandlerErrorKind {
        match self {
            Self::Request { kind, .. } => *kind,
            Self::Operation(_) => HandlerErrorKind::Internal,
        }
    }
}

impl From<anyhow::Error> for HandlerError {
    fn from(err: anyhow::Error) -> Self {
        Self::Request {
            kind: HandlerErrorKind::Internal,
            message: err.to_string(),
            source: Some(err),
        }
    }
}

// ---------------------------------------------------------------------------
// StartOperationError
// ---------------------------------------------------------------------------

/// Error returned from `Handler::start_operation`.
#[derive(Debug, thiserror::Error)]
pub enum StartOperationError {
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error(transparent)]
    Serialization(#[from] SerializationError),
    #[error(transparent)]
    Handler(#[from] HandlerError),
    #[error("handler overloaded, try again later")]
    Overloaded,
}

impl StartOperationError {
    /// Maps the error onto the protocol taxonomy.
    ///
    /// Undecodable input is the caller's fault (`BadRequest`); failing to
    /// encode or read is the handler's (`Internal`).
    #[must_use]
    pub fn kind(&self) -> HandlerErrorKind {
        match self {
            Self::NotFound(_) => HandlerErrorKind::NotFound,
            Self::Serialization(SerializationError::Read(_)) => HandlerErrorKind::Internal,
            Self::Serialization(err) => match err.direction() {
                Direction::Decode => HandlerErrorKind::BadRequest,
                Direction::Encode => HandlerErrorKind::Internal,
            },
            Self::Handler(err) => err.kind(),
            Self::Overloaded => HandlerErrorKind::ResourceExhausted,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_distinguishes_kind() {
        let svc = NotFoundError::service("UnknownService", "op");
        assert_eq!(svc.kind, NotFoundKind::Service);
        assert_eq!(svc.to_string(), "service not found: UnknownService");

        let op = NotFoundError::operation("KitchenSinkService", "nope");
        assert_eq!(op.kind, NotFoundKind::Operation);
        assert_eq!(
            op.to_string(),
            "operation not found: nope in service KitchenSinkService"
        );
    }

    #[test]
    fn start_error_kinds_map_to_protocol_taxonomy() {
        let not_found: StartOperationError = NotFoundError::service("a", "b").into();
        assert_eq!(not_found.kind(), HandlerErrorKind::NotFound);

        let decode: StartOperationError =
            SerializationError::decode("application/json", "bad").into();
        assert_eq!(decode.kind(), HandlerErrorKind::BadRequest);

        let encode: StartOperationError =
            SerializationError::encode("application/json", "bad").into();
        assert_eq!(encode.kind(), HandlerErrorKind::Internal);

        let read: StartOperationError =
            SerializationError::from(std::io::Error::other("eof")).into();
        assert_eq!(read.kind(), HandlerErrorKind::Internal);

        let handler: StartOperationError = HandlerError::unavailable("later").into();
        assert_eq!(handler.kind(), HandlerErrorKind::Unavailable);

        assert_eq!(
            StartOperationError::Overloaded.kind(),
            HandlerErrorKind::ResourceExhausted
        );
    }

    #[test]
    fn anyhow_errors_become_internal() {
        let err: HandlerError = anyhow::anyhow!("disk on fire").into();
        assert_eq!(err.kind(), HandlerErrorKind::Internal);
        assert_eq!(err.to_string(), "INTERNAL: disk on fire");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn retryable_kinds() {
        assert!(HandlerErrorKind::Unavailable.is_retryable());
        assert!(HandlerErrorKind::Internal.is_retryable());
        assert!(!HandlerErrorKind::BadRequest.is_retryable());
        assert!(!HandlerErrorKind::NotFound.is_retryable());
    }

    #[test]
    fn operation_error_display() {
        let err = OperationError::canceled("caller went away");
        assert_eq!(err.to_string(), "operation canceled: caller went away");
        let err = OperationError::failed("nope").with_source(anyhow::anyhow!("root"));
        assert!(err.source.is_some());
    }
}
