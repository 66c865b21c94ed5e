//! Backend collaborator contract.
//!
//! Each call is an independent round trip. Implementations report
//! failures as [`InboxError::Backend`](crate::error::InboxError::Backend);
//! "nothing there" is `Ok(None)`, never an error.

use crate::error::Result;
use crate::model::message::MessageEnvelope;

pub trait MailBackend {
    /// Latest message for `address`, or `None` if the mailbox has none.
    fn fetch_latest_message(&self, address: &str) -> Result<Option<MessageEnvelope>>;

    /// Full message for `id`.
    fn fetch_message_detail(&self, id: &str) -> Result<MessageEnvelope>;

    /// Ask the backend to follow `url` on behalf of `address` for `message_id`.
    fn trigger_verification(&self, url: &str, address: &str, message_id: &str) -> Result<()>;
}

impl<B: MailBackend + ?Sized> MailBackend for &B {
    fn fetch_latest_message(&self, address: &str) -> Result<Option<MessageEnvelope>> {
        (**self).fetch_latest_message(address)
    }

    fn fetch_message_detail(&self, id: &str) -> Result<MessageEnvelope> {
        (**self).fetch_message_detail(id)
    }

    fn trigger_verification(&self, url: &str, address: &str, message_id: &str) -> Result<()> {
        (**self).trigger_verification(url, address, message_id)
    }
}
