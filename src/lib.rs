//! # kmzgen
//!
//! Build, read and merge KMZ archives of geotagged placemarks.
//!
//! A KMZ is a zip holding one KML document plus the photos it references.
//! This crate writes placemarks grouped into one folder per icon category,
//! reads KMZ files from several producers back into records, and merges any
//! number of archives into one without image name collisions.
//!
//! ## Quick Start
//!
//! ```
//! use kmzgen::{IconCategory, PlacemarkRecord};
//! use kmzgen::export::export_kmz;
//! use kmzgen::import::import_kmz;
//!
//! let records = vec![
//!     PlacemarkRecord::new("Heron nest", 43.21, -8.41).with_icon(IconCategory::Bird),
//!     PlacemarkRecord::new("Cabin", 43.30, -8.50).with_icon(IconCategory::House),
//! ];
//! let bytes = export_kmz(&records, "Survey")?;
//!
//! let back = import_kmz(&bytes)?;
//! assert_eq!(back.len(), 2);
//! # Ok::<(), kmzgen::Error>(())
//! ```
//!
//! ## Merging
//!
//! ```
//! use kmzgen::PlacemarkRecord;
//! use kmzgen::export::export_kmz;
//! use kmzgen::merge::{MergeCoordinator, load_sources};
//!
//! let a = export_kmz(&[PlacemarkRecord::new("A", 1.0, 1.0)], "A")?;
//! let b = export_kmz(&[PlacemarkRecord::new("B", 2.0, 2.0)], "B")?;
//!
//! let (sources, report) = load_sources([("a.kmz", a), ("b.kmz", b)]);
//! assert!(report.is_clean());
//! let merged = MergeCoordinator::new().merge_to_vec(&sources, "Both")?;
//! assert_eq!(kmzgen::import::import_kmz(&merged)?.len(), 2);
//! # Ok::<(), kmzgen::Error>(())
//! ```

pub mod batch;
pub mod error;
pub mod export;
pub mod geo;
pub mod import;
pub mod kml;
pub mod kmz;
pub mod merge;
pub mod model;
pub mod photo;
pub mod util;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use batch::{BatchIssue, BatchReport};
pub use error::{Error, Result};
pub use kml::IconCategory;
pub use model::{GeoPoint, PlacemarkId, PlacemarkList, PlacemarkRecord};
