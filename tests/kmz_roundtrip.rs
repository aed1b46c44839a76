//! Export/import round-trip tests.
//!
//! Drives the public API end to end: records are exported to KMZ bytes or
//! files, read back, and compared.

use kmzgen::export::{KmzExporter, export_kmz};
use kmzgen::import::{import_kmz, read_kmz};
use kmzgen::kml::{CATALOG, group_by_icon, serialize};
use kmzgen::kmz::{pack, unpack};
use kmzgen::{IconCategory, PlacemarkRecord};
use proptest::prelude::*;
use tempfile::TempDir;

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_export_single_pushpin() {
    let records = vec![PlacemarkRecord::new("A", 10.5, -20.25).with_icon(IconCategory::Pushpin)];
    let bytes = export_kmz(&records, "Test").unwrap();
    let archive = unpack(&bytes).unwrap();

    assert_eq!(archive.kml_path, "doc.kml");
    assert!(archive.kml.contains("<coordinates>-20.25,10.5,0</coordinates>"));
    assert_eq!(archive.kml.matches("<Folder>").count(), 1);
    assert!(archive.kml.contains(&format!(
        "<name>{}</name>",
        IconCategory::Pushpin.display_name()
    )));
}

#[test]
fn test_export_to_file_and_read_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trip.kmz");

    let records = vec![
        PlacemarkRecord::new("Heron", 43.1, -8.2)
            .with_description("two adults & a chick")
            .with_icon(IconCategory::Bird)
            .with_image(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        PlacemarkRecord::new("Oak", 43.2, -8.3).with_icon(IconCategory::Tree),
    ];
    let file = std::fs::File::create(&path).unwrap();
    KmzExporter::new().export(&records, "Trip", file).unwrap();

    let back = read_kmz(&path).unwrap();
    assert_eq!(back.len(), 2);
    assert_eq!(back[0].name, "Heron");
    assert_eq!(back[0].description, "two adults & a chick");
    assert_eq!(back[0].icon, IconCategory::Bird);
    assert_eq!(back[0].image.as_deref(), Some(&[0xFF, 0xD8, 0xFF, 0xE0][..]));
    assert_eq!(back[1].icon, IconCategory::Tree);
    assert!(back[1].image.is_none());
}

#[test]
fn test_images_follow_their_records_across_folders() {
    // Grouping reorders placemarks; images must still land on the right ones.
    let records = vec![
        PlacemarkRecord::new("p1", 0.0, 0.0).with_image(b"one".to_vec()),
        PlacemarkRecord::new("s1", 1.0, 1.0)
            .with_icon(IconCategory::Star)
            .with_image(b"two".to_vec()),
        PlacemarkRecord::new("p2", 2.0, 2.0).with_image(b"three".to_vec()),
    ];
    let back = import_kmz(&export_kmz(&records, "Mixed").unwrap()).unwrap();

    let names: Vec<_> = back.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["p1", "p2", "s1"]);
    assert_eq!(back[0].image.as_deref(), Some(&b"one"[..]));
    assert_eq!(back[1].image.as_deref(), Some(&b"three"[..]));
    assert_eq!(back[2].image.as_deref(), Some(&b"two"[..]));
}

#[test]
fn test_missing_coordinates_dropped() {
    let kml = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2"><Document>
  <Placemark><name>kept</name><Point><coordinates>3,4,0</coordinates></Point></Placemark>
  <Placemark><name>no point</name></Placemark>
  <Folder><Placemark><Point><coordinates>5,6</coordinates></Point></Placemark></Folder>
  <Placemark><name>empty point</name><Point/></Placemark>
</Document></kml>"#;
    let records = import_kmz(&pack(kml, &[]).unwrap()).unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "kept");
    assert_eq!((records[0].latitude, records[0].longitude), (4.0, 3.0));
    // Unnamed placemarks are numbered by document position.
    assert_eq!(records[1].name, "Punto 3");
}

#[test]
fn test_unknown_icon_url_falls_back_to_pushpin() {
    let kml = r#"<kml><Placemark><coordinates>0,0</coordinates>
        <Style><IconStyle><Icon><href>http://example.com/markers/unicorn.png</href></Icon></IconStyle></Style>
    </Placemark></kml>"#;
    let records = import_kmz(&pack(kml, &[]).unwrap()).unwrap();
    assert_eq!(records[0].icon, IconCategory::Pushpin);
}

#[test]
fn test_legacy_export_icon_urls_detected() {
    let kml = r#"<kml><Document>
        <Placemark><coordinates>0,0</coordinates><href>http://maps.google.com/mapfiles/kml/pal4/icon56.png</href></Placemark>
        <Placemark><coordinates>0,0</coordinates><href>http://maps.google.com/mapfiles/kml/shapes/parks.png</href></Placemark>
    </Document></kml>"#;
    let records = import_kmz(&pack(kml, &[]).unwrap()).unwrap();
    assert_eq!(records[0].icon, IconCategory::Bird);
    assert_eq!(records[1].icon, IconCategory::Tree);
}

#[test]
fn test_non_kmz_input() {
    let err = import_kmz(b"<kml/>").unwrap_err();
    assert!(err.is_format());
}

#[test]
fn test_malformed_kml_is_format_error() {
    let bytes = pack("<kml><Placemark><name>x</Placemark></kml>", &[]).unwrap();
    assert!(import_kmz(&bytes).unwrap_err().is_format());
}

// ============================================================================
// Properties
// ============================================================================

fn icon_strategy() -> impl Strategy<Value = IconCategory> {
    prop::sample::select(CATALOG.iter().map(|d| d.category).collect::<Vec<_>>())
}

fn record_strategy() -> impl Strategy<Value = PlacemarkRecord> {
    (
        "[A-Za-z0-9][A-Za-z0-9 &<>']{0,18}[A-Za-z0-9]",
        "([A-Za-z0-9][A-Za-z0-9 &<>\"']{0,30}[A-Za-z0-9])?",
        -90.0f64..=90.0,
        -180.0f64..=180.0,
        icon_strategy(),
        prop::option::of(prop::collection::vec(any::<u8>(), 1..16)),
    )
        .prop_map(|(name, description, lat, lon, icon, image)| {
            let mut record = PlacemarkRecord::new(name, lat, lon)
                .with_description(description)
                .with_icon(icon);
            record.image = image;
            record
        })
}

proptest! {
    #[test]
    fn prop_export_import_round_trip(records in prop::collection::vec(record_strategy(), 0..12)) {
        let bytes = export_kmz(&records, "Round trip").unwrap();
        let back = import_kmz(&bytes).unwrap();

        // Import returns records in folder order.
        let expected: Vec<&PlacemarkRecord> = group_by_icon(records.iter(), |r| r.icon)
            .into_iter()
            .flat_map(|(_, group)| group)
            .collect();

        prop_assert_eq!(back.len(), expected.len());
        for (got, want) in back.iter().zip(expected) {
            prop_assert_eq!(&got.name, &want.name);
            prop_assert_eq!(&got.description, &want.description);
            prop_assert!((got.latitude - want.latitude).abs() < 1e-9);
            prop_assert!((got.longitude - want.longitude).abs() < 1e-9);
            prop_assert_eq!(got.icon, want.icon);
            prop_assert_eq!(&got.image, &want.image);
        }
    }

    #[test]
    fn prop_grouping_is_deterministic(records in prop::collection::vec(record_strategy(), 0..12)) {
        prop_assert_eq!(serialize(&records, "P"), serialize(&records, "P"));

        let folders: Vec<IconCategory> = group_by_icon(records.iter(), |r| r.icon)
            .into_iter()
            .map(|(icon, _)| icon)
            .collect();
        let mut first_seen: Vec<IconCategory> = Vec::new();
        for record in &records {
            if !first_seen.contains(&record.icon) {
                first_seen.push(record.icon);
            }
        }
        prop_assert_eq!(folders, first_seen);
    }
}
