//! Deferred decoding of inbound payloads.
//!
//! The dispatch layer only moves `LazyValue`s around; the payload is decoded
//! once the final handler asks for its declared input type. Consuming takes
//! the value by ownership, so a streaming source is drained and dropped
//! exactly once on every path, including early decode failures.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::SerializationError;
use crate::payload::{split_content_type, Payload};
use crate::serializer::Serializer;

/// Boxed streaming body.
pub type BodyReader = Box<dyn AsyncRead + Send + Unpin>;

enum Source {
    Buffered(Payload),
    Streaming {
        content_type: Option<String>,
        headers: HashMap<String, String>,
        reader: BodyReader,
    },
}

/// A payload bound to a serializer, decoded on demand.
pub struct LazyValue {
    serializer: Arc<dyn Serializer>,
    source: Source,
}

impl LazyValue {
    /// Wraps an in-memory payload.
    #[must_use]
    pub fn new(serializer: Arc<dyn Serializer>, payload: Payload) -> Self {
        Self {
            serializer,
            source: Source::Buffered(payload),
        }
    }

    /// Wraps a streaming body. The content type is taken from `headers`
    /// (`type` or `content-type`), as for [`Payload::from_headers`].
    pub fn from_reader<R>(
        serializer: Arc<dyn Serializer>,
        headers: HashMap<String, String>,
        reader: R,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (content_type, headers) = split_content_type(headers);
        Self {
            serializer,
            source: Source::Streaming {
                content_type,
                headers,
                reader: Box::new(reader),
            },
        }
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        match &self.source {
            Source::Buffered(payload) => payload.content_type(),
            Source::Streaming { content_type, .. } => content_type.as_deref(),
        }
    }

    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        match &self.source {
            Source::Buffered(payload) => payload.headers(),
            Source::Streaming { headers, .. } => headers,
        }
    }

    #[must_use]
    pub fn serializer(&self) -> &Arc<dyn Serializer> {
        &self.serializer
    }

    /// Drains the source into a buffered payload without decoding it.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError::Read` if the streaming body fails.
    pub async fn into_payload(self) -> Result<Payload, SerializationError> {
        match self.source {
            Source::Buffered(payload) => Ok(payload),
            Source::Streaming {
                content_type,
                headers,
                mut reader,
            } => {
                let mut body = Vec::new();
                let read = reader.read_to_end(&mut body).await;
                // Released here whether or not the read succeeded.
                drop(reader);
                read?;
                let mut payload = match content_type {
                    Some(ct) => Payload::new(ct, body),
                    None => Payload::untyped(body),
                };
                for (k, v) in headers {
                    payload = payload.with_header(k, v);
                }
                Ok(payload)
            }
        }
    }

    /// Decodes the value into `T` via the bound serializer.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the body cannot be read, is malformed,
    /// or does not match `T`.
    pub async fn consume<T: DeserializeOwned>(self) -> Result<T, SerializationError> {
        let serializer = Arc::clone(&self.serializer);
        let payload = self.into_payload().await?;
        tracing::trace!(
            content_type = payload.content_type(),
            len = payload.body().len(),
            target = std::any::type_name::<T>(),
            "decoding lazy value"
        );
        serializer.from_payload(&payload)
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Buffered(_) => "buffered",
            Source::Streaming { .. } => "streaming",
        };
        f.debug_struct("LazyValue")
            .field("serializer", &self.serializer)
            .field("source", &source)
            .field("content_type", &self.content_type())
            .finish_non_exhaustive()
    }
}
