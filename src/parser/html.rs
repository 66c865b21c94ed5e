//! HTML-to-text conversion for display when a message has no plain-text part.

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "tr", "li", "table", "h1", "h2", "h3", "h4", "h5", "h6",
];

const ENTITIES: &[(&str, &str)] = &[
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&nbsp;", " "),
    ("&#160;", " "),
    // Last, so "&amp;lt;" stays "&lt;"
    ("&amp;", "&"),
];

/// Convert HTML to readable plain text.
///
/// - Removes `<script>` and `<style>` blocks
/// - Turns `<br>` and block-level tags into line breaks
/// - Strips all remaining tags
/// - Decodes common entities
/// - Collapses runs of blank lines
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    let stripped = strip_tags(&text);

    let mut decoded = stripped;
    for (entity, replacement) in ENTITIES {
        decoded = decoded.replace(entity, replacement);
    }

    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(decoded.len());
    for line in decoded.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

/// Drop tags, emitting a newline for line-breaking ones.
fn strip_tags(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        result.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('>') else {
            // Unterminated tag: drop the remainder
            rest = "";
            break;
        };
        if breaks_line(&after[..close]) {
            result.push('\n');
        }
        rest = &after[close + 1..];
    }
    result.push_str(rest);
    result
}

fn breaks_line(tag: &str) -> bool {
    let name: String = tag
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    name == "br" || BLOCK_TAGS.contains(&name.as_str())
}

/// Remove an entire tag block (e.g. `<script>…</script>`), case-insensitively.
fn remove_tag_block(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    // ASCII lower-casing keeps byte offsets aligned with the original
    while let Some(start) = remaining.to_ascii_lowercase().find(&open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        match after.to_ascii_lowercase().find(&close) {
            Some(end) => remaining = &after[end + close.len()..],
            None => {
                remaining = "";
                break;
            }
        }
    }
    result.push_str(remaining);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_basic() {
        let text = html_to_text("<p>Hello <b>world</b></p><p>Second paragraph</p>");
        assert_eq!(text, "Hello world\n\nSecond paragraph");
    }

    #[test]
    fn test_html_to_text_entities() {
        assert_eq!(html_to_text("Tom &amp; Jerry &lt;3&gt;"), "Tom & Jerry <3>");
        assert_eq!(html_to_text("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_html_to_text_removes_scripts_and_styles() {
        let html = "Before<SCRIPT>alert('x')</SCRIPT><style>p{}</style>After";
        assert_eq!(html_to_text(html), "BeforeAfter");
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(html_to_text("one<br/>two<BR>three"), "one\ntwo\nthree");
    }

    #[test]
    fn test_unterminated_tag() {
        assert_eq!(html_to_text("text <a href="), "text");
    }

    #[test]
    fn test_collapses_blank_lines() {
        let text = html_to_text("<div>a</div>\n\n\n<div>b</div>");
        assert_eq!(text, "a\n\nb");
    }
}
