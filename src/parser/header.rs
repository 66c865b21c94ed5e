//! Header normalization and RFC 2047 encoded-word decoding.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD as BASE64_STD;
use base64::Engine;
use serde::Serialize;
use tracing::warn;

use crate::model::part::Part;

/// Case-insensitive header lookup built from a part's header list.
///
/// Keys are lower-cased and iterate in sorted order. When a name repeats,
/// the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderMap(BTreeMap<String, String>);

impl HeaderMap {
    /// Look up a header by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Decoded `Subject`, or empty.
    pub fn subject(&self) -> String {
        self.get("subject").map(decode_encoded_words).unwrap_or_default()
    }

    /// Decoded `From`, or empty.
    pub fn sender(&self) -> String {
        self.get("from").map(decode_encoded_words).unwrap_or_default()
    }
}

/// Normalize the top-level headers of `payload` into a [`HeaderMap`].
///
/// Sub-part headers are not consulted.
pub fn get_headers(payload: Option<&Part>) -> HeaderMap {
    let Some(part) = payload else {
        return HeaderMap::default();
    };
    HeaderMap(
        part.headers
            .iter()
            .map(|h| (h.name.to_lowercase(), h.value.clone()))
            .collect(),
    )
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`
///
/// If decoding fails for any token, the original text is preserved.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // Whitespace between two encoded words is dropped (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        if let Some((text, consumed)) = decode_one_word(after_start) {
            result.push_str(&text);
            remaining = &after_start[consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    result
}

/// Decode `charset?encoding?text?=`; returns the text and bytes consumed.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    let (charset, rest) = s.split_once('?')?;
    let (encoding, rest) = rest.split_once('?')?;
    let end = rest.find("?=")?;
    let encoded_text = &rest[..end];
    let consumed = charset.len() + 1 + encoding.len() + 1 + end + 2;

    let bytes = match encoding.to_ascii_uppercase().as_str() {
        "B" => BASE64_STD.decode(encoded_text.trim()).ok()?,
        "Q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    Some((decode_charset(charset, &bytes), consumed))
}

/// Decode Q-encoding: underscores become spaces, `=XX` becomes a byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let underscored: Vec<u8> = input
        .bytes()
        .map(|b| if b == b'_' { b' ' } else { b })
        .collect();
    super::decode::decode_quoted_printable(&underscored)
}

/// Decode bytes using a named charset, lossily.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    match encoding_rs::Encoding::for_label(charset.as_bytes()) {
        Some(encoding) => encoding.decode(bytes).0.into_owned(),
        None => {
            warn!(charset, "Unknown charset, falling back to UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
