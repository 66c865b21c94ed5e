//! `inboxpeek`: the message content pipeline behind an inbox inspector.
//!
//! This crate decodes nested multi-part message bodies into text, locates
//! verification links in that text, and keeps per-message verification
//! status in sync with a server push channel.

pub mod backend;
pub mod config;
pub mod error;
pub mod inspector;
pub mod model;
pub mod parser;
pub mod sync;
pub mod verify;
