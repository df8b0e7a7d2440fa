//! Nexus core — payloads, serializers, lazy values, and operation descriptors.

pub mod definition;
pub mod error;
pub mod lazy;
pub mod payload;
pub mod serializer;

pub use definition::{OperationDefinition, OperationDescriptor, ServiceDefinition, TypeDescriptor};
pub use error::{Direction, SerializationError};
pub use lazy::{BodyReader, LazyValue};
pub use payload::{Payload, CONTENT_TYPE_HEADER};
pub use serializer::{
    default_serializer, CompositeSerializer, DecodeVisitor, JsonSerializer, MsgPackSerializer, Serializer,
    APPLICATION_JSON, APPLICATION_MSGPACK,
};
