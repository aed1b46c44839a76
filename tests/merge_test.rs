//! Merge tests.
//!
//! Archives are built with the exporter or packed by hand to mimic other
//! producers, then merged and inspected.

use std::collections::HashSet;

use kmzgen::export::export_kmz;
use kmzgen::import::import_kmz;
use kmzgen::kml::image_reference;
use kmzgen::kmz::{pack, unpack};
use kmzgen::merge::{MergeCoordinator, load_sources, merge_file_name, parse_for_merge};
use kmzgen::{IconCategory, PlacemarkRecord};
use tempfile::TempDir;

fn source_with_foo(placemark: &str, bytes: &[u8]) -> Vec<u8> {
    let kml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2"><Document>
  <Placemark>
    <name>{placemark}</name>
    <description><![CDATA[<img src="files/foo.jpg" width="400"/><br/><p>from {placemark}</p>]]></description>
    <Point><coordinates>-3.7,40.4,0</coordinates></Point>
  </Placemark>
</Document></kml>"#
    );
    pack(&kml, &[("foo.jpg".to_string(), bytes.to_vec())]).unwrap()
}

// ============================================================================
// Collisions
// ============================================================================

#[test]
fn test_same_file_name_in_two_sources() {
    let (sources, report) = load_sources(vec![
        ("one.kmz", source_with_foo("P1", b"first image")),
        ("two.kmz", source_with_foo("P2", b"second image")),
    ]);
    assert!(report.is_clean());

    let merged = MergeCoordinator::new().merge_to_vec(&sources, "Merged").unwrap();
    let archive = unpack(&merged).unwrap();

    let images: Vec<_> = archive.entries.images().collect();
    assert_eq!(images.len(), 2);
    let names: HashSet<_> = images.iter().map(|(p, _)| *p).collect();
    assert_eq!(names.len(), 2);

    // Each rewritten reference resolves to its own bytes.
    let records = import_kmz(&merged).unwrap();
    let p1 = records.iter().find(|r| r.name == "P1").unwrap();
    let p2 = records.iter().find(|r| r.name == "P2").unwrap();
    assert_eq!(p1.image.as_deref(), Some(&b"first image"[..]));
    assert_eq!(p2.image.as_deref(), Some(&b"second image"[..]));
    assert_eq!(p1.description, "from P1");

    let merged_source = parse_for_merge(&merged, "merged.kmz").unwrap();
    let refs: Vec<_> = merged_source
        .placemarks
        .iter()
        .map(|p| p.image_ref.clone().unwrap())
        .collect();
    assert_ne!(refs[0], refs[1]);
}

#[test]
fn test_merge_exported_archives() {
    let a = export_kmz(
        &[
            PlacemarkRecord::new("Nest", 1.0, 1.0)
                .with_icon(IconCategory::Bird)
                .with_image(vec![1, 2, 3]),
            PlacemarkRecord::new("Pin", 2.0, 2.0),
        ],
        "A",
    )
    .unwrap();
    let b = export_kmz(
        &[PlacemarkRecord::new("Other nest", 3.0, 3.0)
            .with_icon(IconCategory::Bird)
            .with_image(vec![4, 5, 6])],
        "B",
    )
    .unwrap();

    let (sources, _) = load_sources(vec![("a.kmz", a), ("b.kmz", b)]);
    let merged = MergeCoordinator::new().merge_to_vec(&sources, "All").unwrap();
    let archive = unpack(&merged).unwrap();

    assert!(archive.kml.contains("<name>All</name>"));
    assert!(archive.kml.contains("Points with icon: Birds (2 points)"));
    assert!(archive.kml.contains("Points with icon: Pins (1 points)"));
    assert_eq!(archive.entries.get("files/image_1.jpg"), Some(&[1u8, 2, 3][..]));
    assert_eq!(archive.entries.get("files/image_2.jpg"), Some(&[4u8, 5, 6][..]));

    let records = import_kmz(&merged).unwrap();
    assert_eq!(records.len(), 3);
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Nest", "Other nest", "Pin"]);
}

#[test]
fn test_remerge_keeps_single_image_tag() {
    let (sources, _) = load_sources(vec![("a.kmz", source_with_foo("P", b"img"))]);
    let once = MergeCoordinator::new().merge_to_vec(&sources, "Once").unwrap();

    let (sources, _) = load_sources(vec![("once.kmz", once)]);
    let twice = MergeCoordinator::new().merge_to_vec(&sources, "Twice").unwrap();

    let archive = unpack(&twice).unwrap();
    assert_eq!(archive.kml.matches("<img").count(), 1);
    assert_eq!(archive.kml.matches("<br/>").count(), 1);

    let source = parse_for_merge(&twice, "twice.kmz").unwrap();
    let description = &source.placemarks[0].description;
    assert_eq!(image_reference(description).as_deref(), Some("files/image_1.jpg"));
}

// ============================================================================
// Batch behavior
// ============================================================================

#[test]
fn test_bad_source_does_not_stop_merge() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.kmz");
    let bad = dir.path().join("bad.kmz");
    std::fs::write(&good, source_with_foo("P", b"x")).unwrap();
    std::fs::write(&bad, b"this is not a zip").unwrap();

    let inputs = [&bad, &good]
        .into_iter()
        .map(|p| (p.file_name().unwrap().to_string_lossy().into_owned(), std::fs::read(p).unwrap()));
    let (sources, report) = load_sources(inputs);

    assert_eq!(sources.len(), 1);
    assert_eq!(report.succeeded, 1);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].file, "bad.kmz");
    assert!(report.failed[0].reason.starts_with("Invalid KMZ"));
    assert_eq!(report.to_string(), "1 succeeded, 0 skipped, 1 failed");

    let out = dir.path().join(merge_file_name("Survivors"));
    let file = std::fs::File::create(&out).unwrap();
    let summary = MergeCoordinator::new()
        .merge(&sources, "Survivors", file)
        .unwrap();
    assert_eq!(summary.placemarks, 1);
    assert_eq!(import_kmz(&std::fs::read(&out).unwrap()).unwrap().len(), 1);
}

#[test]
fn test_merge_nothing() {
    let merged = MergeCoordinator::new().merge_to_vec(&[], "").unwrap();
    let archive = unpack(&merged).unwrap();
    assert!(archive.kml.contains("<name>merged</name>"));
    assert!(archive.entries.is_empty());
}
