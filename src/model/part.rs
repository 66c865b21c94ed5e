//! Multi-part message body tree as delivered by the backend.

use serde::{Deserialize, Serialize};

use super::null_as_default;

/// A single `name: value` header pair, in the order it was received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

impl Header {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Transport-encoded payload of a leaf part.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartBody {
    /// URL-safe base64 of a quoted-printable byte stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,

    /// Size in bytes reported by the backend, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Backend handle for attachment bodies that are not inlined.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
}

/// A node of the message body tree.
///
/// A well-formed part is either a leaf (carries `body.data`) or a container
/// (carries `parts`). Anything else is tolerated and simply has no content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    /// MIME type, e.g. `text/plain` or `multipart/alternative`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub mime_type: String,

    /// Attachment filename; empty or absent for inline text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Headers of this part, in received order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: Vec<Header>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<PartBody>,

    /// Child parts, in order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub parts: Vec<Part>,
}

impl Part {
    /// Build a leaf part carrying already-encoded `data`.
    pub fn leaf(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            body: Some(PartBody {
                data: Some(data.into()),
                ..PartBody::default()
            }),
            ..Self::default()
        }
    }

    /// Build a container part with the given children.
    pub fn container(mime_type: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            mime_type: mime_type.into(),
            parts,
            ..Self::default()
        }
    }

    /// Attach headers (builder style).
    pub fn with_headers(mut self, headers: Vec<Header>) -> Self {
        self.headers = headers;
        self
    }

    /// The encoded body data, if present and non-empty.
    pub fn data(&self) -> Option<&str> {
        self.body
            .as_ref()
            .and_then(|b| b.data.as_deref())
            .filter(|d| !d.is_empty())
    }

    /// Charset parameter of this part's own `Content-Type` header, lower-cased.
    pub fn charset(&self) -> Option<String> {
        let content_type = self
            .headers
            .iter()
            .rev()
            .find(|h| h.name.eq_ignore_ascii_case("content-type"))?;

        content_type.value.split(';').skip(1).find_map(|param| {
            let (key, value) = param.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("charset") {
                let value = value.trim().trim_matches('"').trim();
                (!value.is_empty()).then(|| value.to_lowercase())
            } else {
                None
            }
        })
    }
}
