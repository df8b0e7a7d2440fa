//! Content-typed, header-bearing byte container exchanged at the protocol boundary.

use std::collections::HashMap;

use bytes::Bytes;

/// Header key Nexus uses for the content type of a payload.
pub const CONTENT_TYPE_HEADER: &str = "type";

/// Alternate spelling accepted when a payload is built from transport headers.
const HTTP_CONTENT_TYPE_HEADER: &str = "content-type";

/// An immutable payload: optional content type, header map, and body bytes.
///
/// The body is a reference-counted `Bytes`, so cloning a payload never
/// copies the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Payload {
    content_type: Option<String>,
    headers: HashMap<String, String>,
    body: Bytes,
}

impl Payload {
    /// Creates a payload with an explicit content type and no extra headers.
    #[must_use]
    pub fn new(content_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            content_type: Some(content_type.into()),
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Creates a payload with no content type. An empty untyped payload is
    /// how "no value" travels.
    #[must_use]
    pub fn untyped(body: impl Into<Bytes>) -> Self {
        Self {
            content_type: None,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Builds a payload from raw transport headers.
    ///
    /// The `type` header (or `content-type`, matched case-insensitively)
    /// becomes the content type and is removed from the remaining headers.
    #[must_use]
    pub fn from_headers(headers: HashMap<String, String>, body: impl Into<Bytes>) -> Self {
        let (content_type, headers) = split_content_type(headers);
        Self {
            content_type,
            headers,
            body: body.into(),
        }
    }

    /// Returns a copy of this payload with an additional header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    #[must_use]
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Consumes the payload, returning its body.
    #[must_use]
    pub fn into_body(self) -> Bytes {
        self.body
    }
}

/// Separates the content-type entry from a raw header map.
///
/// Every `type` and `content-type` key (any case) is removed. When several
/// are present the value comes from `type` first, then `content-type`, exact
/// spelling before other casings, ties broken by key order.
pub(crate) fn split_content_type(
    mut headers: HashMap<String, String>,
) -> (Option<String>, HashMap<String, String>) {
    let mut keys: Vec<String> = headers
        .keys()
        .filter(|k| {
            k.eq_ignore_ascii_case(CONTENT_TYPE_HEADER)
                || k.eq_ignore_ascii_case(HTTP_CONTENT_TYPE_HEADER)
        })
        .cloned()
        .collect();
    keys.sort_by_key(|k| {
        let http = !k.eq_ignore_ascii_case(CONTENT_TYPE_HEADER);
        let inexact = k != CONTENT_TYPE_HEADER && k != HTTP_CONTENT_TYPE_HEADER;
        (http, inexact, k.clone())
    });

    let mut content_type = None;
    for key in keys {
        let value = headers.remove(&key);
        if content_type.is_none() {
            content_type = value;
        }
    }
    (content_type, headers)
}

/// Strips parameters (`; charset=utf-8`) and lowercases a media type for comparison.
#[must_use]
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
