//! Geotagged photos to placemark records.
//!
//! Two collaborators sit behind traits so callers can swap them out:
//! [`GpsExtractor`] pulls a position out of image metadata and
//! [`ImageCompressor`] re-encodes the image to bound archive size.
//! [`records_from_photos`] drives both over a batch of files.

use std::io::Cursor;

use exif::{In, Reader, Tag, Value};
use image::GenericImageView;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

use crate::batch::BatchReport;
use crate::error::Result;
use crate::geo::{Hemisphere, dms_to_decimal, is_valid_latitude, is_valid_longitude};
use crate::kml::IconCategory;
use crate::model::{GeoPoint, PlacemarkRecord};

/// Default long-edge bound for re-encoded photos.
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// Default JPEG quality (0-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 80;

/// Reads a position out of an encoded image.
///
/// Absence of a geotag is not an error; implementations return `None`.
pub trait GpsExtractor {
    fn extract(&self, data: &[u8]) -> Option<GeoPoint>;
}

/// Re-encodes an image for packing.
pub trait ImageCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Reads `GPSLatitude`/`GPSLongitude` and their reference tags from EXIF.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifGpsExtractor;

impl ExifGpsExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl GpsExtractor for ExifGpsExtractor {
    fn extract(&self, data: &[u8]) -> Option<GeoPoint> {
        let exif = Reader::new()
            .read_from_container(&mut Cursor::new(data))
            .ok()?;

        let latitude = exif_coordinate(&exif, Tag::GPSLatitude, Tag::GPSLatitudeRef, Hemisphere::North)?;
        let longitude = exif_coordinate(&exif, Tag::GPSLongitude, Tag::GPSLongitudeRef, Hemisphere::East)?;
        Some(GeoPoint::new(latitude, longitude))
    }
}

fn exif_coordinate(exif: &exif::Exif, tag: Tag, ref_tag: Tag, default: Hemisphere) -> Option<f64> {
    let field = exif.get_field(tag, In::PRIMARY)?;
    let Value::Rational(ref parts) = field.value else {
        return None;
    };
    let part = |i: usize| parts.get(i).map(|r| r.to_f64()).unwrap_or(0.0);
    if parts.is_empty() {
        return None;
    }

    let hemisphere = exif
        .get_field(ref_tag, In::PRIMARY)
        .and_then(|f| match f.value {
            Value::Ascii(ref v) => v.first().and_then(|s| std::str::from_utf8(s).ok()),
            _ => None,
        })
        .and_then(Hemisphere::from_ref)
        .unwrap_or(default);

    let value = dms_to_decimal(part(0), part(1), part(2), hemisphere);
    value.is_finite().then_some(value)
}

/// Downscales to a bounded long edge and re-encodes as JPEG.
#[derive(Debug, Clone, Copy)]
pub struct JpegCompressor {
    pub max_dimension: u32,
    pub quality: u8,
}

impl Default for JpegCompressor {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl JpegCompressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension.max(1);
        self
    }

    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality.clamp(1, 100);
        self
    }
}

impl ImageCompressor for JpegCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut img = image::load_from_memory(data)?;

        let (width, height) = img.dimensions();
        if width.max(height) > self.max_dimension {
            // resize() keeps the aspect ratio inside the bounding box.
            img = img.resize(self.max_dimension, self.max_dimension, FilterType::Triangle);
        }

        let rgb = img.to_rgb8();
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality).encode_image(&rgb)?;
        log::debug!(
            "re-encoded {}x{} image to {}x{} ({} -> {} bytes)",
            width,
            height,
            rgb.width(),
            rgb.height(),
            data.len(),
            out.len()
        );
        Ok(out)
    }
}

/// Fields shared by every record of a photo batch.
#[derive(Debug, Clone, Default)]
pub struct PhotoTemplate {
    pub name: String,
    pub icon: IconCategory,
}

impl PhotoTemplate {
    pub fn new(name: impl Into<String>, icon: IconCategory) -> Self {
        Self {
            name: name.into(),
            icon,
        }
    }
}

/// Turn a batch of photos into records, one file at a time.
///
/// A photo without a usable geotag is skipped; a photo that fails to
/// decode or re-encode is recorded as failed. Neither stops the batch.
pub fn records_from_photos<I, S, G, C>(
    files: I,
    template: &PhotoTemplate,
    gps: &G,
    compressor: &C,
) -> (Vec<PlacemarkRecord>, BatchReport)
where
    I: IntoIterator<Item = (S, Vec<u8>)>,
    S: Into<String>,
    G: GpsExtractor + ?Sized,
    C: ImageCompressor + ?Sized,
{
    let mut records = Vec::new();
    let mut report = BatchReport::new();

    for (file_name, data) in files {
        let file_name = file_name.into();

        let Some(point) = gps.extract(&data) else {
            report.record_skip(file_name, "no GPS data");
            continue;
        };
        if !is_valid_latitude(point.latitude) || !is_valid_longitude(point.longitude) {
            report.record_skip(file_name, "GPS data out of range");
            continue;
        }

        let image = match compressor.compress(&data) {
            Ok(image) => image,
            Err(e) => {
                report.record_failure(file_name, &e);
                continue;
            }
        };

        let name = if template.name.trim().is_empty() {
            file_stem(&file_name).to_string()
        } else {
            template.name.clone()
        };
        records.push(
            PlacemarkRecord::new(name, point.latitude, point.longitude)
                .with_description(file_name)
                .with_icon(template.icon)
                .with_image(image),
        );
        report.record_success();
    }

    log::info!("photo batch: {report}");
    (records, report)
}

fn file_stem(file_name: &str) -> &str {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    }
}
