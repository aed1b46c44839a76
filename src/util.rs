//! Text decoding and date helpers.

use std::borrow::Cow;

use chrono::NaiveDate;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};

/// How far into a document the XML declaration is looked for.
const DECLARATION_SCAN: usize = 256;

/// Decode the bytes of a KML document.
///
/// Well-formed UTF-8 is returned as is, minus any byte order mark. Anything
/// else is read with the charset its XML declaration names, or as
/// Windows-1252 when the declaration is missing or names something unknown.
pub fn decode_kml(bytes: &[u8]) -> Cow<'_, str> {
    let (text, malformed) = UTF_8.decode_with_bom_removal(bytes);
    if !malformed {
        return text;
    }

    let encoding = declared_encoding(bytes)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(WINDOWS_1252);
    log::debug!("KML is not UTF-8, reading it as {}", encoding.name());
    encoding.decode(bytes).0
}

/// Charset label of a leading `<?xml ... encoding="..."?>` declaration.
pub fn declared_encoding(bytes: &[u8]) -> Option<&str> {
    let head = &bytes[..bytes.len().min(DECLARATION_SCAN)];
    let decl = &head[find(head, b"<?xml")?..];
    let decl = &decl[..find(decl, b"?>").unwrap_or(decl.len())];

    let attr = decl
        .windows(8)
        .position(|w| w.eq_ignore_ascii_case(b"encoding"))?;
    let value = decl[attr + 8..].trim_ascii_start();
    let value = value.strip_prefix(b"=")?.trim_ascii_start();

    let (&quote, value) = value.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = value.iter().position(|&b| b == quote)?;
    std::str::from_utf8(&value[..end]).ok()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Today's date in UTC.
pub fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Format a date as `YYYY-MM-DD`.
pub fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_strips_bom() {
        assert_eq!(decode_kml(b"\xEF\xBB\xBF<kml/>"), "<kml/>");
    }

    #[test]
    fn test_decode_uses_declared_charset() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"iso-8859-15\"?><name>\xA4 Caf\xE9</name>";
        assert!(decode_kml(bytes).ends_with("<name>\u{20AC} Café</name>"));
    }

    #[test]
    fn test_decode_falls_back_to_windows_1252() {
        assert_eq!(decode_kml(b"<name>\x93hi\x94</name>"), "<name>\u{201C}hi\u{201D}</name>");
        let unknown = b"<?xml version='1.0' encoding='klingon'?><a>\xE9</a>";
        assert!(decode_kml(unknown).ends_with("<a>é</a>"));
    }

    #[test]
    fn test_declared_encoding() {
        assert_eq!(
            declared_encoding(br#"<?xml version="1.0" encoding="UTF-8"?><kml/>"#),
            Some("UTF-8")
        );
        assert_eq!(
            declared_encoding(b"<?xml version='1.0' encoding = 'windows-1252'?>"),
            Some("windows-1252")
        );
        assert_eq!(declared_encoding(b"<?xml version='1.0'?><encoding='x'/>"), None);
        assert_eq!(declared_encoding(b"<kml/>"), None);
    }

    #[test]
    fn test_iso_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(iso_date(date), "2024-03-07");
    }
}
