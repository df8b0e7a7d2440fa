//! Types carried with every operation through dispatch: caller and handler
//! contexts, start options, and start results.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;

use nexus_core::{Payload, SerializationError, Serializer};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::error::OperationError;

// ---------------------------------------------------------------------------
// Contexts
// ---------------------------------------------------------------------------

/// Caller-side context handed to `Handler::start_operation`.
///
/// Cancelling the token is visible to the business logic through
/// [`OperationContext`]; dispatch itself never cancels or times out.
#[derive(Debug, Clone, Default)]
pub struct HandlerContext {
    cancellation: CancellationToken,
}

impl HandlerContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing cancellation token, e.g. a child of a server-wide one.
    #[must_use]
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Context passed to an operation handler, built by the dispatcher from the
/// resolved names, the caller's context, and the start options.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub service: String,
    pub operation: String,
    pub request_id: String,
    pub headers: HashMap<String, String>,
    pub cancellation: CancellationToken,
}

impl OperationContext {
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        operation: impl Into<String>,
        ctx: &HandlerContext,
        options: &StartOperationOptions,
    ) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
            request_id: options.request_id.clone(),
            headers: options.headers.clone(),
            cancellation: ctx.cancellation.clone(),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the caller cancels.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}

// ---------------------------------------------------------------------------
// StartOperationOptions
// ---------------------------------------------------------------------------

/// A link to a related resource, propagated alongside an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub link_type: String,
}

/// Options accompanying a start request.
#[derive(Debug, Clone)]
pub struct StartOperationOptions {
    /// Idempotency key for the request. Defaults to a fresh UUID v4.
    pub request_id: String,
    /// Request headers, with the payload's own headers excluded.
    pub headers: HashMap<String, String>,
    /// Where an asynchronous completion would be delivered.
    pub callback_url: Option<String>,
    pub callback_headers: HashMap<String, String>,
    pub links: Vec<Link>,
}

impl Default for StartOperationOptions {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            headers: HashMap::new(),
            callback_url: None,
            callback_headers: HashMap::new(),
            links: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncValue
// ---------------------------------------------------------------------------

/// Encodes an erased value as the concrete type it was created with.
type EncodeFn = fn(&dyn Any, &dyn Serializer) -> Result<Payload, SerializationError>;

fn encode_as<T: Serialize + 'static>(
    value: &dyn Any,
    serializer: &dyn Serializer,
) -> Result<Payload, SerializationError> {
    match value.downcast_ref::<T>() {
        Some(value) => serializer.to_payload(value),
        None => Err(SerializationError::encode(
            serializer.content_type(),
            format!("sync value is not a {}", type_name::<T>()),
        )),
    }
}

/// Typed result of a synchronously completed operation.
///
/// The caller downcasts to the output type the operation declares, or
/// encodes the value with a serializer for the wire.
pub struct SyncValue {
    value: Box<dyn Any + Send + Sync>,
    encode: EncodeFn,
    type_name: &'static str,
}

impl SyncValue {
    #[must_use]
    pub fn new<T: Serialize + Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Box::new(value),
            encode: encode_as::<T>,
            type_name: type_name::<T>(),
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.value.is::<T>()
    }

    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Takes the value out as `T`.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged if the value is not a `T`.
    pub fn downcast<T: 'static>(self) -> Result<T, Self> {
        let Self {
            value,
            encode,
            type_name,
        } = self;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self {
                value,
                encode,
                type_name,
            }),
        }
    }

    /// Encodes the value with `serializer`.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError::Encode` if the value cannot be represented.
    pub fn to_payload(&self, serializer: &dyn Serializer) -> Result<Payload, SerializationError> {
        (self.encode)(self.value.as_ref(), serializer)
    }
}

impl fmt::Debug for SyncValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncValue")
            .field("type", &self.type_name)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// StartOperationResult
// ---------------------------------------------------------------------------

/// Outcome of starting an operation.
#[derive(Debug)]
#[non_exhaustive]
pub enum StartOperationResult {
    /// Completed synchronously with a value.
    Sync(SyncValue),
    /// Completed unsuccessfully.
    Failed(OperationError),
}

impl StartOperationResult {
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Sync(_) => "sync",
            Self::Failed(_) => "failed",
        }
    }

    /// Returns the synchronous value, if any.
    #[must_use]
    pub fn into_sync(self) -> Option<SyncValue> {
        match self {
            Self::Sync(value) => Some(value),
            Self::Failed(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use nexus_core::{
        default_serializer, JsonSerializer, MsgPackSerializer, APPLICATION_JSON, APPLICATION_MSGPACK,
    };
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Output {
        character_count: i64,
    }

    #[test]
    fn default_options_generate_unique_request_ids() {
        let a = StartOperationOptions::default();
        let b = StartOperationOptions::default();
        assert!(Uuid::parse_str(&a.request_id).is_ok());
        assert_ne!(a.request_id, b.request_id);
        assert!(a.links.is_empty());
        assert!(a.callback_url.is_none());
    }

    #[test]
    fn operation_context_copies_options_and_shares_cancellation() {
        let ctx = HandlerContext::new();
        let options = StartOperationOptions {
            headers: HashMap::from([("x-a".to_string(), "1".to_string())]),
            ..StartOperationOptions::default()
        };
        let op_ctx = OperationContext::new("Svc", "op", &ctx, &options);

        assert_eq!(op_ctx.request_id, options.request_id);
        assert_eq!(op_ctx.headers["x-a"], "1");
        assert!(!op_ctx.is_cancelled());
        ctx.cancellation().cancel();
        assert!(op_ctx.is_cancelled());
    }

    #[test]
    fn sync_value_downcasts_to_declared_type() {
        let value = SyncValue::new(11_i64);
        assert!(value.is::<i64>());
        assert_eq!(value.downcast_ref::<i64>(), Some(&11));
        assert_eq!(value.type_name(), "i64");

        let value = value.downcast::<String>().unwrap_err();
        assert_eq!(value.downcast::<i64>().unwrap(), 11);
    }

    #[test]
    fn sync_value_encodes_with_serializer() {
        let value = SyncValue::new(Output { character_count: 17 });
        let payload = value.to_payload(&JsonSerializer).unwrap();
        assert_eq!(payload.content_type(), Some(APPLICATION_JSON));
        assert_eq!(&payload.body()[..], br#"{"characterCount":17}"#);

        let decoded: Output = default_serializer().from_payload(&payload).unwrap();
        assert_eq!(decoded, Output { character_count: 17 });
    }

    #[test]
    fn sync_value_encodes_natively_with_msgpack() {
        let map = HashMap::from([(7_u32, "seven".to_string())]);
        let value = SyncValue::new(map.clone());
        let payload = value.to_payload(&MsgPackSerializer).unwrap();
        assert_eq!(payload.content_type(), Some(APPLICATION_MSGPACK));

        let decoded: HashMap<u32, String> = default_serializer().from_payload(&payload).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn result_outcome_labels() {
        let ok = StartOperationResult::Sync(SyncValue::new(()));
        assert_eq!(ok.outcome(), "sync");
        assert!(ok.into_sync().is_some());

        let failed = StartOperationResult::Failed(OperationError::failed("x"));
        assert_eq!(failed.outcome(), "failed");
        assert!(failed.into_sync().is_none());
    }
}
