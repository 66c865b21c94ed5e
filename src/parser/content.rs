//! Part-tree flattening: pick the text and HTML bodies, list attachments.

use serde::Serialize;
use tracing::warn;

use super::decode::decode_with_charset;
use crate::model::part::Part;

/// Maximum nesting depth walked before a subtree is skipped.
pub const MAX_DEPTH: usize = 64;

const TEXT_PLAIN: &str = "text/plain";
const TEXT_HTML: &str = "text/html";

/// Decoded bodies selected from a part tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedContent {
    /// First `text/plain` leaf, decoded. Empty if none.
    pub text_content: String,
    /// First `text/html` leaf, decoded. Empty if none.
    pub html_content: String,
}

impl ExtractedContent {
    /// The text used for link searching: plain text if present, else HTML.
    pub fn search_text(&self) -> &str {
        if !self.text_content.is_empty() {
            &self.text_content
        } else {
            &self.html_content
        }
    }
}

/// Metadata about a part that carries a filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentInfo {
    pub filename: String,
    pub mime_type: String,
    /// Size reported by the backend (0 if unknown).
    pub size: u64,
    /// Backend handle for fetching the body separately.
    pub attachment_id: Option<String>,
}

/// Extract the first plain-text and first HTML body from `payload`.
pub fn extract_content(payload: Option<&Part>) -> ExtractedContent {
    extract_content_with_depth(payload, MAX_DEPTH)
}

/// [`extract_content`] with an explicit depth cap.
///
/// The first leaf of each kind in depth-first, children-in-order traversal
/// wins; later leaves of the same kind are ignored.
pub fn extract_content_with_depth(payload: Option<&Part>, max_depth: usize) -> ExtractedContent {
    let mut text: Option<String> = None;
    let mut html: Option<String> = None;

    for part in walk(payload, max_depth) {
        if text.is_some() && html.is_some() {
            break;
        }
        let Some(data) = part.data() else {
            continue;
        };
        let slot = match part.mime_type.as_str() {
            TEXT_PLAIN => &mut text,
            TEXT_HTML => &mut html,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(decode_with_charset(data, part.charset().as_deref()));
        }
    }

    ExtractedContent {
        text_content: text.unwrap_or_default(),
        html_content: html.unwrap_or_default(),
    }
}

/// List every part with a non-empty filename, in traversal order.
pub fn list_attachments(payload: Option<&Part>) -> Vec<AttachmentInfo> {
    walk(payload, MAX_DEPTH)
        .into_iter()
        .filter_map(|part| {
            let filename = part.filename.as_deref().filter(|f| !f.is_empty())?;
            let body = part.body.as_ref();
            Some(AttachmentInfo {
                filename: filename.to_string(),
                mime_type: part.mime_type.clone(),
                size: body.and_then(|b| b.size).unwrap_or(0),
                attachment_id: body.and_then(|b| b.attachment_id.clone()),
            })
        })
        .collect()
}

/// Depth-first pre-order walk over an immutable part tree.
///
/// Uses an explicit stack; nodes deeper than `max_depth` are skipped.
fn walk(root: Option<&Part>, max_depth: usize) -> Vec<&Part> {
    let mut order = Vec::new();
    let mut stack: Vec<(&Part, usize)> = root.map(|p| (p, 0)).into_iter().collect();

    while let Some((part, depth)) = stack.pop() {
        if depth > max_depth {
            warn!(depth, max_depth, "Part tree too deep, skipping subtree");
            continue;
        }
        order.push(part);
        // Reverse so children are visited in declaration order
        for child in part.parts.iter().rev() {
            stack.push((child, depth + 1));
        }
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::part::{Header, PartBody};

    const PLAIN_A: &str = "UGxhaW4gQQ==";
    const PLAIN_B: &str = "UGxhaW4gQg==";

    #[test]
    fn test_absent_payload() {
        let content = extract_content(None);
        assert_eq!(content, ExtractedContent::default());
        assert!(list_attachments(None).is_empty());
    }

    #[test]
    fn test_single_leaf_payload() {
        let payload = Part::leaf("text/plain", PLAIN_A);
        let content = extract_content(Some(&payload));
        assert_eq!(content.text_content, "Plain A");
        assert!(content.html_content.is_empty());
    }

    #[test]
    fn test_first_plain_leaf_wins() {
        let payload = Part::container(
            "multipart/alternative",
            vec![
                Part::leaf("text/plain", PLAIN_A),
                Part::leaf("text/plain", PLAIN_B),
            ],
        );
        assert_eq!(extract_content(Some(&payload)).text_content, "Plain A");
    }

    #[test]
    fn test_depth_first_before_later_siblings() {
        // The nested leaf comes first in pre-order, ahead of the later sibling
        let payload = Part::container(
            "multipart/mixed",
            vec![
                Part::container(
                    "multipart/alternative",
                    vec![
                        Part::leaf("text/plain", PLAIN_A),
                        Part::leaf("text/html", "PGI-aGk8L2I-"),
                    ],
                ),
                Part::leaf("text/plain", PLAIN_B),
            ],
        );
        let content = extract_content(Some(&payload));
        assert_eq!(content.text_content, "Plain A");
        assert_eq!(content.html_content, "<b>hi</b>");
    }

    #[test]
    fn test_container_type_is_ignored_for_recursion() {
        // An unexpected container type still gets walked
        let payload = Part::container(
            "application/x-odd",
            vec![Part::leaf("text/html", "PGI-aGk8L2I-")],
        );
        assert_eq!(extract_content(Some(&payload)).html_content, "<b>hi</b>");
    }

    #[test]
    fn test_leaf_without_data_does_not_claim_slot() {
        let payload = Part::container(
            "multipart/alternative",
            vec![
                Part {
                    mime_type: "text/plain".into(),
                    body: Some(PartBody::default()),
                    ..Part::default()
                },
                Part::leaf("text/plain", PLAIN_B),
            ],
        );
        assert_eq!(extract_content(Some(&payload)).text_content, "Plain B");
    }

    #[test]
    fn test_mime_type_must_match_exactly() {
        let payload = Part::container(
            "multipart/alternative",
            vec![
                Part::leaf("TEXT/PLAIN", PLAIN_A),
                Part::leaf("text/plain; charset=utf-8", PLAIN_A),
            ],
        );
        assert!(extract_content(Some(&payload)).text_content.is_empty());
    }

    #[test]
    fn test_uses_part_charset() {
        let leaf = Part::leaf("text/plain", "Y2FmPUU5").with_headers(vec![Header::new(
            "Content-Type",
            "text/plain; charset=iso-8859-1",
        )]);
        let payload = Part::container("multipart/mixed", vec![leaf]);
        assert_eq!(extract_content(Some(&payload)).text_content, "café");
    }

    #[test]
    fn test_depth_cap() {
        let mut payload = Part::leaf("text/plain", PLAIN_A);
        for _ in 0..5 {
            payload = Part::container("multipart/mixed", vec![payload]);
        }
        assert!(extract_content_with_depth(Some(&payload), 4)
            .text_content
            .is_empty());
        assert_eq!(
            extract_content_with_depth(Some(&payload), 5).text_content,
            "Plain A"
        );
    }

    #[test]
    fn test_deep_tree_does_not_overflow() {
        let mut payload = Part::leaf("text/plain", PLAIN_A);
        for _ in 0..10_000 {
            payload = Part::container("multipart/mixed", vec![payload]);
        }
        assert!(extract_content(Some(&payload)).text_content.is_empty());
        // Dropping a deeply nested tree recurses in Drop; keep it off this stack
        std::mem::forget(payload);
    }

    #[test]
    fn test_list_attachments() {
        let payload = Part::container(
            "multipart/mixed",
            vec![
                Part::leaf("text/plain", PLAIN_A),
                Part {
                    mime_type: "application/pdf".into(),
                    filename: Some("invoice.pdf".into()),
                    body: Some(PartBody {
                        data: None,
                        size: Some(2048),
                        attachment_id: Some("att-9".into()),
                    }),
                    ..Part::default()
                },
                Part {
                    mime_type: "image/png".into(),
                    filename: Some(String::new()),
                    ..Part::default()
                },
            ],
        );
        let attachments = list_attachments(Some(&payload));
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].filename, "invoice.pdf");
        assert_eq!(attachments[0].size, 2048);
        assert_eq!(attachments[0].attachment_id.as_deref(), Some("att-9"));
    }

    #[test]
    fn test_search_text_prefers_plain() {
        let both = ExtractedContent {
            text_content: "plain".into(),
            html_content: "<p>html</p>".into(),
        };
        assert_eq!(both.search_text(), "plain");
        let html_only = ExtractedContent {
            text_content: String::new(),
            html_content: "<p>html</p>".into(),
        };
        assert_eq!(html_only.search_text(), "<p>html</p>");
        assert_eq!(ExtractedContent::default().search_text(), "");
    }
}
