//! KML document model: icon catalog, escaping, writer and parser.

mod escape;
mod icons;
mod parser;
mod writer;

pub use escape::{cdata, escape_xml, unescape_xml};
pub use icons::{CATALOG, IconCategory, IconDescriptor, OTHERS_LABEL};
pub use parser::{
    DEFAULT_NAME_PREFIX, ImportConfig, RawPlacemark, parse, parse_raw_placemarks, parse_with,
    plain_description,
};
pub use writer::{
    DEFAULT_DOCUMENT_DESCRIPTION, KML_NAMESPACE, KmlDocument, KmlPlacemark, SerializeOptions,
    description_html, group_by_icon, image_src, serialize, serialize_with,
};

pub(crate) use writer::image_tag;

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)src="([^"]+\.(?:jpg|jpeg|png|gif))""#).expect("valid regex")
});

static IMG_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<img[^>]*>(?:\s*<br\s*/?>)?").expect("valid regex"));

/// First `src="...jpg|jpeg|png|gif"` inside a description, if any.
pub fn image_reference(description: &str) -> Option<String> {
    IMG_SRC
        .captures(description)
        .and_then(|c| c.get(1))
        .map(|m| unescape_xml(m.as_str()))
}

/// Remove CDATA markers and `<img>` tags (with a directly following `<br/>`).
pub fn strip_image_markup(description: &str) -> Cow<'_, str> {
    let without_cdata: Cow<'_, str> =
        if description.contains("<![CDATA[") || description.contains("]]>") {
            Cow::Owned(description.replace("<![CDATA[", "").replace("]]>", ""))
        } else {
            Cow::Borrowed(description)
        };

    if !IMG_TAG.is_match(&without_cdata) {
        return without_cdata;
    }
    Cow::Owned(IMG_TAG.replace_all(&without_cdata, "").into_owned())
}
