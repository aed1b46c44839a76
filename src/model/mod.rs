//! Placemark data model shared by every flow.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::kml::IconCategory;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a placemark, assigned once at creation.
///
/// Ids are unique within the process and never reused, so edits and
/// deletions stay unambiguous even if the list is reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlacemarkId(u64);

impl PlacemarkId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for handing across FFI boundaries.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PlacemarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pm-{}", self.0)
    }
}

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A single point of interest.
///
/// Coordinates are not validated here; out-of-range or NaN values pass
/// through the codec unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacemarkRecord {
    pub id: PlacemarkId,
    pub name: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub icon: IconCategory,
    /// Encoded image bytes (JPEG for anything this crate produces).
    pub image: Option<Vec<u8>>,
}

impl PlacemarkRecord {
    /// Create a record with a fresh id, empty description, default icon and no image.
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: PlacemarkId::next(),
            name: name.into(),
            description: String::new(),
            latitude,
            longitude,
            icon: IconCategory::default(),
            image: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: IconCategory) -> Self {
        self.icon = icon;
        self
    }

    pub fn with_image(mut self, data: Vec<u8>) -> Self {
        self.image = Some(data);
        self
    }

    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Ordered working collection of placemarks, addressed by [`PlacemarkId`].
#[derive(Debug, Clone, Default)]
pub struct PlacemarkList {
    records: Vec<PlacemarkRecord>,
}

impl PlacemarkList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and return its id.
    pub fn push(&mut self, record: PlacemarkRecord) -> PlacemarkId {
        let id = record.id;
        self.records.push(record);
        id
    }

    pub fn get(&self, id: PlacemarkId) -> Option<&PlacemarkRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Replace the record with `id` wholesale, keeping its position and id.
    ///
    /// Returns the previous record, or `None` (and drops `record`) if no such id exists.
    pub fn replace(&mut self, id: PlacemarkId, mut record: PlacemarkRecord) -> Option<PlacemarkRecord> {
        let slot = self.records.iter_mut().find(|r| r.id == id)?;
        record.id = id;
        Some(std::mem::replace(slot, record))
    }

    pub fn remove(&mut self, id: PlacemarkId) -> Option<PlacemarkRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        Some(self.records.remove(index))
    }

    pub fn records(&self) -> &[PlacemarkRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl Extend<PlacemarkRecord> for PlacemarkList {
    fn extend<I: IntoIterator<Item = PlacemarkRecord>>(&mut self, iter: I) {
        self.records.extend(iter);
    }
}

impl FromIterator<PlacemarkRecord> for PlacemarkList {
    fn from_iter<I: IntoIterator<Item = PlacemarkRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
