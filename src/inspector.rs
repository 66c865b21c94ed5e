//! The inspection pipeline: look up an address, process the selected
//! message, and keep verification status live.
//!
//! One `Inspector` owns one backend handle, one push subscription and one
//! status cache. Everything runs on the caller's thread; push events are
//! applied when [`Inspector::pump`] is called.

use serde::Serialize;
use tracing::{debug, info};

use crate::backend::MailBackend;
use crate::config::{Config, ContentConfig};
use crate::error::{InboxError, Result};
use crate::model::message::MessageEnvelope;
use crate::parser::content::{extract_content_with_depth, list_attachments, AttachmentInfo, ExtractedContent};
use crate::parser::header::{get_headers, HeaderMap};
use crate::parser::html::html_to_text;
use crate::sync::{ConnectionState, StatusCache, StatusSync, Transport};
use crate::verify::find_verify_url;

/// A message after the content pipeline has run over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub id: String,
    pub snippet: String,
    pub subject: String,
    pub from: String,
    pub headers: HeaderMap,
    pub content: ExtractedContent,
    /// Text for display: the plain body, or the HTML body converted to text.
    pub display_text: String,
    pub verify_url: Option<String>,
    pub attachments: Vec<AttachmentInfo>,
}

impl MessageView {
    /// Run decoding, flattening, header normalization and link location.
    pub fn from_envelope(envelope: &MessageEnvelope, options: &ContentConfig) -> Self {
        let payload = envelope.payload.as_ref();
        let headers = get_headers(payload);
        let content = extract_content_with_depth(payload, options.max_part_depth);
        let verify_url = find_verify_url(content.search_text()).map(str::to_string);

        let display_text = if !content.text_content.is_empty() {
            content.text_content.clone()
        } else if options.html_fallback {
            html_to_text(&content.html_content)
        } else {
            String::new()
        };

        Self {
            id: envelope.id.clone(),
            snippet: envelope.snippet.clone(),
            subject: headers.subject(),
            from: headers.sender(),
            attachments: list_attachments(payload),
            headers,
            content,
            display_text,
            verify_url,
        }
    }
}

/// Result of looking up an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(MessageView),
    /// The backend answered, but the mailbox has no message.
    NotFound,
}

/// Result of asking the backend to follow the verification link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Sent { url: String },
    /// The selected message has no verification link.
    NoLink,
}

pub struct Inspector<B: MailBackend, T: Transport> {
    backend: B,
    sync: StatusSync<T>,
    options: ContentConfig,
    address: Option<String>,
    current: Option<MessageView>,
}

impl<B: MailBackend, T: Transport> Inspector<B, T> {
    pub fn new(backend: B, transport: T, config: &Config) -> Self {
        Self {
            backend,
            sync: StatusSync::new(transport).with_event_budget(config.sync.max_events_per_pump),
            options: config.content.clone(),
            address: None,
            current: None,
        }
    }

    /// Fetch the latest message for `address` and subscribe to its updates.
    ///
    /// Backend failures are returned as errors and leave the current state
    /// untouched. A push connection failure does not fail the lookup; it
    /// shows up as [`ConnectionState::Closed`].
    pub fn lookup(&mut self, address: &str) -> Result<LookupOutcome> {
        let Some(envelope) = self.backend.fetch_latest_message(address)? else {
            info!(address, "No message found");
            self.current = None;
            return Ok(LookupOutcome::NotFound);
        };

        self.seed_status(&envelope);
        self.address = Some(address.to_string());
        // The channel is left Closed on failure; the message is still usable
        if let Err(e) = self.sync.subscribe(address) {
            debug!(address, error = %e, "Continuing without live status updates");
        }
        self.sync.pump();

        let view = MessageView::from_envelope(&envelope, &self.options);
        debug!(id = %view.id, has_link = view.verify_url.is_some(), "Loaded latest message");
        self.current = Some(view.clone());
        Ok(LookupOutcome::Found(view))
    }

    /// Fetch a message by id and make it the current one.
    pub fn select(&mut self, id: &str) -> Result<&MessageView> {
        let envelope = self.backend.fetch_message_detail(id)?;
        self.seed_status(&envelope);
        let view = MessageView::from_envelope(&envelope, &self.options);
        debug!(id = %view.id, has_link = view.verify_url.is_some(), "Loaded message detail");
        Ok(&*self.current.insert(view))
    }

    /// Ask the backend to follow the current message's verification link.
    ///
    /// Not retried on failure.
    pub fn trigger_verification(&self) -> Result<VerifyOutcome> {
        let address = self.address.as_deref().ok_or(InboxError::NotSubscribed)?;
        let view = self.current.as_ref().ok_or(InboxError::NoActiveMessage)?;
        let Some(url) = view.verify_url.as_deref() else {
            return Ok(VerifyOutcome::NoLink);
        };

        self.backend.trigger_verification(url, address, &view.id)?;
        info!(id = %view.id, "Verification triggered");
        Ok(VerifyOutcome::Sent {
            url: url.to_string(),
        })
    }

    /// Apply pending push events. Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        self.sync.pump()
    }

    /// Close the push connection. The inspector can be reused via `lookup`.
    pub fn close(&mut self) {
        self.sync.close();
    }

    pub fn status(&self, message_id: &str) -> Option<&str> {
        self.sync.status(message_id)
    }

    /// Status of the currently selected message.
    pub fn current_status(&self) -> Option<&str> {
        self.current.as_ref().and_then(|v| self.sync.status(&v.id))
    }

    pub fn statuses(&self) -> &StatusCache {
        self.sync.statuses()
    }

    pub fn current(&self) -> Option<&MessageView> {
        self.current.as_ref()
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.sync.state()
    }

    fn seed_status(&mut self, envelope: &MessageEnvelope) {
        if let Some(status) = envelope.verification_status.as_deref() {
            if !envelope.id.is_empty() {
                self.sync.seed(&envelope.id, status);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::part::{Header, Part};
    use crate::sync::MemoryTransport;

    fn html_only_envelope() -> MessageEnvelope {
        MessageEnvelope {
            id: "m1".into(),
            snippet: "Click here".into(),
            payload: Some(
                Part::container(
                    "multipart/alternative",
                    vec![Part::leaf(
                        "text/html",
                        "PHA-Q2xpY2sgPGEgaHJlZj0iaHR0cHM6Ly9hcHAudGVzdC9jb25maXJtL2FiYyI-aGVyZTwvYT48L3A-",
                    )],
                )
                .with_headers(vec![Header::new("Subject", "Confirm")]),
            ),
            verification_status: None,
        }
    }

    #[test]
    fn test_view_from_html_only_message() {
        let view = MessageView::from_envelope(&html_only_envelope(), &ContentConfig::default());
        assert_eq!(view.subject, "Confirm");
        assert_eq!(view.display_text, "Click here");
        assert_eq!(view.verify_url.as_deref(), Some("https://app.test/confirm/abc"));
        assert!(view.content.text_content.is_empty());
    }

    #[test]
    fn test_view_without_html_fallback() {
        let options = ContentConfig {
            html_fallback: false,
            ..ContentConfig::default()
        };
        let view = MessageView::from_envelope(&html_only_envelope(), &options);
        assert!(view.display_text.is_empty());
        assert!(view.verify_url.is_some());
    }

    #[test]
    fn test_view_from_empty_envelope() {
        let view = MessageView::from_envelope(&MessageEnvelope::default(), &ContentConfig::default());
        assert!(view.headers.is_empty());
        assert!(view.display_text.is_empty());
        assert!(view.verify_url.is_none());
        assert!(view.attachments.is_empty());
    }

    struct NoBackend;

    impl MailBackend for NoBackend {
        fn fetch_latest_message(&self, _address: &str) -> Result<Option<MessageEnvelope>> {
            Ok(None)
        }

        fn fetch_message_detail(&self, id: &str) -> Result<MessageEnvelope> {
            Err(InboxError::backend("detail", format!("{id} unavailable")))
        }

        fn trigger_verification(&self, _url: &str, _address: &str, _id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_not_found_does_not_subscribe() {
        let transport = MemoryTransport::new();
        let mut inspector = Inspector::new(NoBackend, transport.clone(), &Config::default());
        assert_eq!(inspector.lookup("a@x.com").unwrap(), LookupOutcome::NotFound);
        assert_eq!(inspector.connection_state(), ConnectionState::Disconnected);
        assert_eq!(transport.connection_count(), 0);
    }

    #[test]
    fn test_trigger_requires_lookup() {
        let inspector = Inspector::new(NoBackend, MemoryTransport::new(), &Config::default());
        assert!(matches!(
            inspector.trigger_verification(),
            Err(InboxError::NotSubscribed)
        ));
    }

    #[test]
    fn test_select_failure_is_error() {
        let mut inspector = Inspector::new(NoBackend, MemoryTransport::new(), &Config::default());
        assert!(matches!(
            inspector.select("m1"),
            Err(InboxError::Backend { operation: "detail", .. })
        ));
        assert!(inspector.current().is_none());
    }
}
