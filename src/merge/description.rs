//! Description rewriting for merged documents.

use crate::kml::{escape_xml, image_tag, strip_image_markup};

/// Build the description body of a merged placemark.
///
/// The old body loses its CDATA markers and image tags; the new image tag
/// (if any) goes first. Plain text is escaped into a paragraph, while text
/// that already contains markup from an earlier export is kept verbatim.
pub fn merged_body(image_src: Option<&str>, description: &str) -> String {
    let mut body = String::new();
    if let Some(src) = image_src {
        body.push_str(&image_tag(src));
    }

    let cleaned = strip_image_markup(description);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return body;
    }

    if cleaned.contains('<') && cleaned.contains('>') {
        body.push_str(cleaned);
    } else {
        body.push_str("<p>");
        body.push_str(&escape_xml(cleaned));
        body.push_str("</p>");
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_wrapped() {
        assert_eq!(merged_body(None, "  fish & chips "), "<p>fish &amp; chips</p>");
    }

    #[test]
    fn test_markup_kept_verbatim() {
        let old = r#"<img src="files/foto1.jpg" width="400"/><br/><p>seen at dawn</p>"#;
        assert_eq!(merged_body(None, old), "<p>seen at dawn</p>");
    }

    #[test]
    fn test_new_image_reinserted_first() {
        let old = r#"<![CDATA[<img src="files/foto1.jpg" width="400"/><br/><p>x</p>]]>"#;
        assert_eq!(
            merged_body(Some("files/image_3.jpg"), old),
            r#"<img src="files/image_3.jpg" width="400"/><br/><p>x</p>"#
        );
    }

    #[test]
    fn test_repeated_merges_do_not_accumulate() {
        let once = merged_body(Some("files/image_1.jpg"), "note");
        let twice = merged_body(Some("files/image_1.jpg"), &once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_empty_description() {
        assert_eq!(merged_body(None, ""), "");
        assert_eq!(merged_body(None, "<![CDATA[ ]]>"), "");
    }
}
