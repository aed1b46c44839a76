//! KML parsing.
//!
//! Every `Placemark` is visited in document order regardless of folder
//! nesting. Within a placemark the first `name`, `description`,
//! `coordinates` and `href` descendants are collected.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{Error, Result};
use crate::kmz::{ImagePathPolicy, KmzEntries};
use crate::model::PlacemarkRecord;

use super::escape::{resolve_entity, unescape_xml};
use super::icons::IconCategory;

/// Prefix of the synthesized name for placemarks without one.
pub const DEFAULT_NAME_PREFIX: &str = "Punto";

/// A placemark as it appears in the document, before interpretation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPlacemark {
    /// 0-based position among all `Placemark` elements.
    pub index: usize,
    pub name: Option<String>,
    pub description: Option<String>,
    pub coordinates: Option<String>,
    pub href: Option<String>,
}

impl RawPlacemark {
    /// The name, or `Punto {index + 1}`.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{} {}", DEFAULT_NAME_PREFIX, self.index + 1),
        }
    }

    /// `(latitude, longitude)` from the coordinates text, or `None` when the
    /// placemark has no `coordinates` element.
    ///
    /// Each token is read up to its first non-numeric character, so `10abc`
    /// is 10; a token with no leading number comes back as NaN.
    pub fn position(&self) -> Option<(f64, f64)> {
        let text = self.coordinates.as_deref()?;
        let mut tokens = text.trim().split(',').map(parse_number);
        let longitude = tokens.next().unwrap_or(f64::NAN);
        let latitude = tokens.next().unwrap_or(f64::NAN);
        Some((latitude, longitude))
    }

    /// Icon inferred from the marker URL.
    pub fn icon(&self) -> IconCategory {
        self.href
            .as_deref()
            .map(IconCategory::detect)
            .unwrap_or_default()
    }
}

fn parse_number(token: &str) -> f64 {
    let token = token.trim_start();
    let bytes = token.as_bytes();
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int = digits(end);
    end += int;
    let mut frac = 0;
    if bytes.get(end) == Some(&b'.') {
        frac = digits(end + 1);
        if int + frac > 0 {
            end += 1 + frac;
        }
    }
    if int + frac == 0 {
        return f64::NAN;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let n = digits(exp);
        if n > 0 {
            end = exp + n;
        }
    }
    token[..end].parse().unwrap_or(f64::NAN)
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Name,
    Description,
    Coordinates,
    Href,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"name" => Some(Field::Name),
            b"description" => Some(Field::Description),
            b"coordinates" => Some(Field::Coordinates),
            b"href" => Some(Field::Href),
            _ => None,
        }
    }

    fn slot<'a>(&self, pm: &'a mut RawPlacemark) -> &'a mut Option<String> {
        match self {
            Field::Name => &mut pm.name,
            Field::Description => &mut pm.description,
            Field::Coordinates => &mut pm.coordinates,
            Field::Href => &mut pm.href,
        }
    }
}

/// Collect every placemark in `kml`, in document order.
pub fn parse_raw_placemarks(kml: &str) -> Result<Vec<RawPlacemark>> {
    let mut reader = Reader::from_str(kml);

    let mut placemarks = Vec::new();
    let mut current: Option<RawPlacemark> = None;
    // Field being captured, and the element depth it opened at.
    let mut capture: Option<(Field, usize)> = None;
    let mut depth = 0usize;
    let mut buf_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.name();
                let local = local_name(name.as_ref());

                if local == b"Placemark" {
                    current = Some(RawPlacemark {
                        index: placemarks.len(),
                        ..Default::default()
                    });
                } else if capture.is_none()
                    && let Some(pm) = current.as_mut()
                    && let Some(field) = Field::from_local_name(local)
                    && field.slot(pm).is_none()
                {
                    capture = Some((field, depth));
                    buf_text.clear();
                }
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                if capture.is_none()
                    && let Some(pm) = current.as_mut()
                    && let Some(field) = Field::from_local_name(local)
                {
                    let slot = field.slot(pm);
                    if slot.is_none() {
                        *slot = Some(String::new());
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if capture.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::CData(e)) => {
                if capture.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::GeneralRef(e)) => {
                // Entity references like &amp; arrive as separate events
                if capture.is_some() {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    match resolve_entity(&entity) {
                        Some(c) => buf_text.push(c),
                        None => {
                            buf_text.push('&');
                            buf_text.push_str(&entity);
                            buf_text.push(';');
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if let Some((field, open_depth)) = capture
                    && open_depth == depth
                {
                    if let Some(pm) = current.as_mut() {
                        *field.slot(pm) = Some(std::mem::take(&mut buf_text));
                    }
                    capture = None;
                }

                if local == b"Placemark"
                    && let Some(pm) = current.take()
                {
                    placemarks.push(pm);
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Xml(e)),
            _ => {}
        }
    }

    Ok(placemarks)
}

/// Configuration for [`parse_with`].
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Conventional paths tried, in order, when a description carries no
    /// resolvable image reference. Each is indexed by document position,
    /// so only conventions that number images that way belong here.
    pub fallback_policies: Vec<ImagePathPolicy>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            fallback_policies: vec![ImagePathPolicy::LEGACY_IMPORT],
        }
    }
}

/// Parse KML text into records with the default [`ImportConfig`].
pub fn parse(kml: &str, entries: &KmzEntries) -> Result<Vec<PlacemarkRecord>> {
    parse_with(kml, entries, &ImportConfig::default())
}

/// Parse KML text into records, attaching images found in `entries`.
///
/// Placemarks without a `coordinates` element are skipped.
pub fn parse_with(
    kml: &str,
    entries: &KmzEntries,
    config: &ImportConfig,
) -> Result<Vec<PlacemarkRecord>> {
    let raw = parse_raw_placemarks(kml)?;
    let total = raw.len();
    let mut records = Vec::with_capacity(total);

    for pm in raw {
        let Some((latitude, longitude)) = pm.position() else {
            log::debug!("placemark {} has no coordinates, skipping", pm.index);
            continue;
        };

        let description = pm.description.as_deref().unwrap_or("");
        let image = resolve_image(description, pm.index, entries, config);

        let mut record = PlacemarkRecord::new(pm.display_name(), latitude, longitude)
            .with_description(plain_description(description))
            .with_icon(pm.icon());
        record.image = image;
        records.push(record);
    }

    if records.len() < total {
        log::info!(
            "imported {} of {} placemarks ({} without coordinates)",
            records.len(),
            total,
            total - records.len()
        );
    }
    Ok(records)
}

fn resolve_image(
    description: &str,
    index: usize,
    entries: &KmzEntries,
    config: &ImportConfig,
) -> Option<Vec<u8>> {
    if let Some(reference) = super::image_reference(description) {
        if let Some((_, data)) = entries.find(&reference) {
            return Some(data.to_vec());
        }
        log::debug!("image reference {reference} of placemark {index} not in archive");
    }

    config
        .fallback_policies
        .iter()
        .find_map(|policy| entries.get(&policy.path(index)))
        .map(<[u8]>::to_vec)
}

/// Reduce a generated description body back to the user's text.
///
/// Drops CDATA markers, `<img>` tags and the `<br/>` after them. A single
/// remaining `<p>` with plain content is unwrapped and unescaped; any other
/// markup is returned as written.
pub fn plain_description(description: &str) -> String {
    let cleaned = super::strip_image_markup(description);
    let cleaned = cleaned.trim();

    if let Some(inner) = cleaned
        .strip_prefix("<p>")
        .and_then(|rest| rest.strip_suffix("</p>"))
        && !inner.contains('<')
    {
        return unescape_xml(inner);
    }
    cleaned.to_string()
}

/// Extract local name from potentially namespaced XML name
fn local_name(name: &[u8]) -> &[u8] {
    name.iter()
        .rposition(|&b| b == b':')
        .map(|i| &name[i + 1..])
        .unwrap_or(name)
}
