//! KML document generation.
//!
//! Placemarks are grouped into one `Folder` per icon category. Folder order
//! is the order in which each category first appears in the input.

use crate::kmz::{IMAGE_FOLDER, ImagePathPolicy};
use crate::model::PlacemarkRecord;

use super::escape::{cdata, escape_xml};
use super::icons::IconCategory;

/// KML 2.2 namespace.
pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// Description written on documents produced by the export flow.
pub const DEFAULT_DOCUMENT_DESCRIPTION: &str = "Generated with kmzgen";

/// Width attribute of embedded `<img>` tags.
const IMAGE_WIDTH: u32 = 400;

/// A placemark ready to be written.
#[derive(Debug, Clone)]
pub struct KmlPlacemark<'a> {
    pub name: &'a str,
    /// Markup placed inside the description's CDATA section.
    pub body: String,
    pub longitude: f64,
    pub latitude: f64,
    pub icon: IconCategory,
}

/// Document-level settings.
#[derive(Debug, Clone)]
pub struct KmlDocument<'a> {
    pub name: &'a str,
    pub description: &'a str,
    /// Append "(N points)" to each folder description.
    pub folder_counts: bool,
}

impl KmlDocument<'_> {
    /// Render the full document, grouping `placemarks` by icon.
    pub fn render(&self, placemarks: Vec<KmlPlacemark<'_>>) -> String {
        let mut kml = String::new();

        kml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        kml.push_str(&format!("<kml xmlns=\"{}\">\n", KML_NAMESPACE));
        kml.push_str("  <Document>\n");
        kml.push_str(&format!("    <name>{}</name>\n", escape_xml(self.name)));
        kml.push_str(&format!(
            "    <description>{}</description>\n",
            escape_xml(self.description)
        ));

        for (icon, group) in group_by_icon(placemarks, |p| p.icon) {
            self.write_folder(&mut kml, icon, &group);
        }

        kml.push_str("  </Document>\n</kml>\n");
        kml
    }

    fn write_folder(&self, kml: &mut String, icon: IconCategory, placemarks: &[KmlPlacemark<'_>]) {
        let label = icon.display_name();
        let description = if self.folder_counts {
            format!("Points with icon: {} ({} points)", label, placemarks.len())
        } else {
            format!("Points with icon: {}", label)
        };

        kml.push_str("    <Folder>\n");
        kml.push_str(&format!("      <name>{}</name>\n", escape_xml(label)));
        kml.push_str(&format!(
            "      <description>{}</description>\n",
            escape_xml(&description)
        ));
        for placemark in placemarks {
            write_placemark(kml, placemark);
        }
        kml.push_str("    </Folder>\n");
    }
}

fn write_placemark(kml: &mut String, placemark: &KmlPlacemark<'_>) {
    kml.push_str("      <Placemark>\n");
    kml.push_str(&format!(
        "        <name>{}</name>\n",
        escape_xml(placemark.name)
    ));
    kml.push_str(&format!(
        "        <description>{}</description>\n",
        cdata(&placemark.body)
    ));
    // KML coordinate tuples are longitude first.
    kml.push_str(&format!(
        "        <Point>\n          <coordinates>{},{},0</coordinates>\n        </Point>\n",
        placemark.longitude, placemark.latitude
    ));
    kml.push_str(&format!(
        "        <Style>\n          <IconStyle>\n            <Icon>\n              <href>{}</href>\n            </Icon>\n          </IconStyle>\n        </Style>\n",
        escape_xml(placemark.icon.marker_url())
    ));
    kml.push_str("      </Placemark>\n");
}

/// Partition `items` by icon, keeping first-occurrence order of categories
/// and input order within each group.
pub fn group_by_icon<T>(
    items: impl IntoIterator<Item = T>,
    icon_of: impl Fn(&T) -> IconCategory,
) -> Vec<(IconCategory, Vec<T>)> {
    let mut groups: Vec<(IconCategory, Vec<T>)> = Vec::new();
    for item in items {
        let icon = icon_of(&item);
        match groups.iter_mut().find(|(i, _)| *i == icon) {
            Some((_, group)) => group.push(item),
            None => groups.push((icon, vec![item])),
        }
    }
    groups
}

/// Archive path that an image file name is packed under.
pub fn image_src(file_name: &str) -> String {
    format!("{}/{}", IMAGE_FOLDER, file_name)
}

/// Description body: optional image tag followed by the escaped text in a paragraph.
pub fn description_html(image_src: Option<&str>, text: &str) -> String {
    let mut body = String::new();
    if let Some(src) = image_src {
        body.push_str(&image_tag(src));
    }
    if !text.is_empty() {
        body.push_str(&format!("<p>{}</p>", escape_xml(text)));
    }
    body
}

pub(crate) fn image_tag(src: &str) -> String {
    format!(
        "<img src=\"{}\" width=\"{}\"/><br/>",
        escape_xml(src),
        IMAGE_WIDTH
    )
}

/// Options for [`serialize_with`].
#[derive(Debug, Clone, Copy)]
pub struct SerializeOptions<'a> {
    pub description: &'a str,
    /// Names images by record position.
    pub image_policy: ImagePathPolicy,
}

impl Default for SerializeOptions<'_> {
    fn default() -> Self {
        Self {
            description: DEFAULT_DOCUMENT_DESCRIPTION,
            image_policy: ImagePathPolicy::CANONICAL,
        }
    }
}

/// Serialize records into a KML document with default options.
///
/// # Example
///
/// ```
/// use kmzgen::PlacemarkRecord;
/// use kmzgen::kml::serialize;
///
/// let kml = serialize(&[PlacemarkRecord::new("A", 10.5, -20.25)], "Test");
/// assert!(kml.contains("<coordinates>-20.25,10.5,0</coordinates>"));
/// ```
pub fn serialize(records: &[PlacemarkRecord], project_name: &str) -> String {
    serialize_with(records, project_name, &SerializeOptions::default())
}

/// Serialize records into a KML document.
///
/// A record at position `i` that carries an image references
/// `files/{policy.file_name(i)}`; the caller packs the bytes under that name.
pub fn serialize_with(
    records: &[PlacemarkRecord],
    project_name: &str,
    options: &SerializeOptions<'_>,
) -> String {
    let placemarks = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let src = record
                .image
                .as_ref()
                .map(|_| image_src(&options.image_policy.file_name(index)));
            KmlPlacemark {
                name: &record.name,
                body: description_html(src.as_deref(), &record.description),
                longitude: record.longitude,
                latitude: record.latitude,
                icon: record.icon,
            }
        })
        .collect();

    KmlDocument {
        name: project_name,
        description: options.description,
        folder_counts: false,
    }
    .render(placemarks)
}
