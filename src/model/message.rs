//! Message envelopes returned by the backend.

use serde::{Deserialize, Serialize};

use super::null_as_default;
use super::part::Part;

/// A message as returned by a latest-message or message-detail lookup.
///
/// Envelopes are replaced wholesale on every fetch; nothing mutates the
/// payload after it has been received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    /// Backend message id.
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,

    /// Short preview text. Detail lookups may leave this empty.
    #[serde(default, deserialize_with = "null_as_default")]
    pub snippet: String,

    /// Root of the body tree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Part>,

    /// Server-side verification status for this message, an opaque token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_status: Option<String>,
}

impl MessageEnvelope {
    /// Parse an envelope from the backend's JSON representation.
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
