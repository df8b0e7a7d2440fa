//! Serialization errors shared by every serializer and by `LazyValue`.

use std::fmt;

/// Boxed cause carried by encode/decode failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Which side of the serializer contract failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Typed value -> payload.
    Encode,
    /// Payload -> typed value.
    Decode,
}

impl Direction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Encode => "encode",
            Self::Decode => "decode",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while moving values across the payload boundary.
///
/// A serializer never coerces: malformed bodies, type mismatches, and unknown
/// content types all surface here instead of producing a default value.
#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("failed to encode value as {content_type}: {source}")]
    Encode {
        content_type: String,
        #[source]
        source: BoxError,
    },
    #[error("failed to decode {content_type} payload: {source}")]
    Decode {
        content_type: String,
        #[source]
        source: BoxError,
    },
    #[error("unsupported content type for {direction}: {content_type}")]
    UnsupportedContentType {
        content_type: String,
        direction: Direction,
    },
    #[error("failed to read payload body: {0}")]
    Read(#[from] std::io::Error),
}

impl SerializationError {
    #[must_use]
    pub fn encode(content_type: &str, source: impl Into<BoxError>) -> Self {
        Self::Encode {
            content_type: content_type.to_string(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn decode(content_type: &str, source: impl Into<BoxError>) -> Self {
        Self::Decode {
            content_type: content_type.to_string(),
            source: source.into(),
        }
    }

    /// Returns whether the failure happened while encoding or decoding.
    ///
    /// Read failures only occur while draining an inbound body, so they
    /// count as decode failures.
    #[must_use]
    pub fn direction(&self) -> Direction {
        match self {
            Self::Encode { .. } => Direction::Encode,
            Self::Decode { .. } | Self::Read(_) => Direction::Decode,
            Self::UnsupportedContentType { direction, .. } => *direction,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_of_each_variant() {
        let json_err = serde_json::from_str::<u8>("x").unwrap_err();
        assert_eq!(
            SerializationError::decode("application/json", json_err).direction(),
            Direction::Decode
        );

        let enc = SerializationError::encode("application/json", "boom");
        assert_eq!(enc.direction(), Direction::Encode);

        let unsupported = SerializationError::UnsupportedContentType {
            content_type: "text/plain".to_string(),
            direction: Direction::Encode,
        };
        assert_eq!(unsupported.direction(), Direction::Encode);

        let read = SerializationError::from(std::io::Error::other("pipe closed"));
        assert_eq!(read.direction(), Direction::Decode);
    }

    #[test]
    fn display_names_content_type() {
        let err = SerializationError::UnsupportedContentType {
            content_type: "text/plain".to_string(),
            direction: Direction::Decode,
        };
        assert_eq!(
            err.to_string(),
            "unsupported content type for decode: text/plain"
        );
    }
}
