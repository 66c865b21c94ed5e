//! Leaf payload decoding: URL-safe base64 wrapping a quoted-printable byte stream.
//!
//! Decoding is best-effort. Whenever a stage fails the caller gets the
//! original encoded string back, so downstream code always has some text.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::debug;

/// Standard-alphabet base64 that accepts input with or without `=` padding.
const TRANSPORT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a transport-encoded leaf payload into UTF-8 text.
///
/// Empty input yields an empty string. Any failure (bad base64, invalid
/// UTF-8 after quoted-printable decoding) returns `encoded` unchanged.
pub fn decode(encoded: &str) -> String {
    decode_with_charset(encoded, None)
}

/// Like [`decode`], but interprets the final bytes using `charset`.
///
/// Unknown or absent charset labels fall back to strict UTF-8. Bytes that
/// cannot be mapped in the chosen charset trigger the passthrough fallback.
pub fn decode_with_charset(encoded: &str, charset: Option<&str>) -> String {
    if encoded.is_empty() {
        return String::new();
    }

    let bytes = match transport_decode(encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(error = %e, len = encoded.len(), "Payload is not transport-encoded, passing through");
            return encoded.to_string();
        }
    };

    let unescaped = decode_quoted_printable(&bytes);

    match bytes_to_text(&unescaped, charset) {
        Some(text) => text,
        None => {
            debug!(charset = charset.unwrap_or("utf-8"), "Decoded bytes are not valid text, passing through");
            encoded.to_string()
        }
    }
}

/// Undo the URL-safe substitution and decode standard base64.
fn transport_decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let standard: String = encoded
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    TRANSPORT.decode(standard.as_bytes())
}

/// Decode quoted-printable escapes (`=XX` and soft line breaks).
///
/// Malformed escapes are kept literally.
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'=' {
            match (input.get(i + 1), input.get(i + 2)) {
                (Some(b'\r'), Some(b'\n')) => {
                    i += 3;
                    continue;
                }
                (Some(b'\n'), _) => {
                    i += 2;
                    continue;
                }
                (Some(&hi), Some(&lo)) => {
                    if let (Some(hi), Some(lo)) = (hex_value(hi), hex_value(lo)) {
                        result.push((hi << 4) | lo);
                        i += 3;
                        continue;
                    }
                }
                _ => {}
            }
        }
        result.push(input[i]);
        i += 1;
    }
    result
}

fn hex_value(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Strictly decode bytes in the named charset; `None` on unmappable input.
fn bytes_to_text(bytes: &[u8], charset: Option<&str>) -> Option<String> {
    let encoding = charset
        .and_then(|label| encoding_rs::Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);

    if encoding == encoding_rs::UTF_8 {
        return String::from_utf8(bytes.to_vec()).ok();
    }

    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(decode(""), "");
        assert_eq!(decode_with_charset("", Some("iso-8859-1")), "");
    }

    #[test]
    fn test_padded_and_unpadded() {
        assert_eq!(decode("SGVsbG8sIHdvcmxkIQ=="), "Hello, world!");
        assert_eq!(decode("SGVsbG8sIHdvcmxkIQ"), "Hello, world!");
    }

    #[test]
    fn test_url_safe_alphabet() {
        // ">>>???" encodes with both '-' and '_'
        assert_eq!(decode("Pj4-Pz8_"), ">>>???");
    }

    #[test]
    fn test_quoted_printable_utf8() {
        assert_eq!(
            decode("Q2FmPUMzPUE5IGNvbiBsZT1DMz1CMWE="),
            "Café con leña"
        );
    }

    #[test]
    fn test_soft_line_break() {
        assert_eq!(decode("bGluZSBvbmU9DQpzdGlsbCBvbmU="), "line onestill one");
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(decode("hello world"), "hello world");
        assert_eq!(decode("plain text, no markers"), "plain text, no markers");
    }

    #[test]
    fn test_plain_word_passes_through() {
        // Valid base64 alphabet, but the bytes are not UTF-8 or the length is wrong
        assert_eq!(decode("Test"), "Test");
        assert_eq!(decode("hello"), "hello");
        assert_eq!(decode("Verify"), "Verify");
        assert_eq!(decode("Confirm"), "Confirm");
    }

    #[test]
    fn test_invalid_utf8_falls_back_to_input() {
        // 0xFF 0xFE is not UTF-8
        assert_eq!(decode("__4="), "__4=");
    }

    #[test]
    fn test_charset_latin1() {
        assert_eq!(decode_with_charset("Y2FmPUU5", Some("ISO-8859-1")), "café");
        // Same bytes are not UTF-8
        assert_eq!(decode("Y2FmPUU5"), "Y2FmPUU5");
    }

    #[test]
    fn test_unknown_charset_uses_utf8() {
        assert_eq!(
            decode_with_charset("SGVsbG8sIHdvcmxkIQ", Some("x-made-up")),
            "Hello, world!"
        );
    }

    #[test]
    fn test_qp_malformed_escapes_kept() {
        assert_eq!(decode_quoted_printable(b"a=zz b="), b"a=zz b=".to_vec());
        assert_eq!(decode_quoted_printable(b"x=3d=3D"), b"x==".to_vec());
        assert_eq!(decode_quoted_printable(b"soft=\nbreak"), b"softbreak".to_vec());
    }
}
