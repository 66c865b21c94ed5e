//! Message content pipeline: payload decoding, part-tree flattening,
//! header normalization, and HTML-to-text conversion.

pub mod content;
pub mod decode;
pub mod header;
pub mod html;
