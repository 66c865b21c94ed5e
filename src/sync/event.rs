//! Push channel wire messages and the verification status cache.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Frames sent from this client to the push server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Route push events for `address` to this connection.
    Subscribe { address: String },
}

/// Frames received from the push server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Verification progress changed for a message.
    VerificationUpdate {
        #[serde(rename = "messageId")]
        message_id: String,
        status: String,
    },
}

impl ServerEvent {
    /// Parse an inbound frame.
    ///
    /// Returns `None` for anything unusable: invalid JSON, unknown `type`,
    /// missing fields, or an empty message id.
    pub fn parse(frame: &str) -> Option<Self> {
        let event: ServerEvent = serde_json::from_str(frame).ok()?;
        let missing_id = matches!(
            &event,
            ServerEvent::VerificationUpdate { message_id, .. } if message_id.is_empty()
        );
        (!missing_id).then_some(event)
    }
}

/// Verification status per message id, as opaque server tokens.
///
/// Cumulative for the pipeline's lifetime: entries are never removed when
/// the selected message changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusCache(BTreeMap<String, String>);

impl StatusCache {
    /// Insert or overwrite the status for `message_id`. Returns the previous value.
    pub fn upsert(&mut self, message_id: impl Into<String>, status: impl Into<String>) -> Option<String> {
        self.0.insert(message_id.into(), status.into())
    }

    /// Record `status` only if `message_id` has no entry yet. Returns the cached value.
    pub fn seed_if_absent(&mut self, message_id: impl Into<String>, status: impl Into<String>) -> &str {
        self.0.entry(message_id.into()).or_insert_with(|| status.into()).as_str()
    }

    pub fn get(&self, message_id: &str) -> Option<&str> {
        self.0.get(message_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in message-id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
