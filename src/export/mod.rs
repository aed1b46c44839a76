//! Single-file export: placemark records to a KMZ archive.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use kmzgen::{PlacemarkRecord, IconCategory};
//! use kmzgen::export::KmzExporter;
//!
//! let records = vec![PlacemarkRecord::new("A", 10.5, -20.25).with_icon(IconCategory::Star)];
//! let mut out = Cursor::new(Vec::new());
//! KmzExporter::new().export(&records, "Test", &mut out)?;
//! # Ok::<(), kmzgen::Error>(())
//! ```

use std::io::{Cursor, Seek, Write};

use chrono::NaiveDate;

use crate::error::Result;
use crate::kml::{DEFAULT_DOCUMENT_DESCRIPTION, SerializeOptions, serialize_with};
use crate::kmz::{ImagePathPolicy, KmzConfig, KmzWriter};
use crate::model::PlacemarkRecord;
use crate::util::iso_date;

/// Project name used when none is given.
pub const DEFAULT_PROJECT_NAME: &str = "Proyecto";

/// Configuration for KMZ export.
#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub kmz: KmzConfig,
    /// Names packed images by record position.
    pub image_policy: ImagePathPolicy,
    /// Fixed `Document` description.
    pub description: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            kmz: KmzConfig::default(),
            image_policy: ImagePathPolicy::CANONICAL,
            description: DEFAULT_DOCUMENT_DESCRIPTION.to_string(),
        }
    }
}

/// Writes a record collection as a KMZ archive.
#[derive(Debug, Clone, Default)]
pub struct KmzExporter {
    config: ExportConfig,
}

impl KmzExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Serialize `records` and pack them with their images into `writer`.
    pub fn export<W: Write + Seek>(
        &self,
        records: &[PlacemarkRecord],
        project_name: &str,
        writer: W,
    ) -> Result<()> {
        let project_name = if project_name.trim().is_empty() {
            DEFAULT_PROJECT_NAME
        } else {
            project_name
        };

        let kml = serialize_with(
            records,
            project_name,
            &SerializeOptions {
                description: &self.config.description,
                image_policy: self.config.image_policy,
            },
        );

        let images: Vec<(String, Vec<u8>)> = records
            .iter()
            .enumerate()
            .filter_map(|(index, record)| {
                let data = record.image.as_ref()?;
                Some((self.config.image_policy.file_name(index), data.clone()))
            })
            .collect();

        KmzWriter::new()
            .with_config(self.config.kmz.clone())
            .write(&kml, &images, writer)?;

        log::info!(
            "exported {} placemark(s) with {} image(s) as '{}'",
            records.len(),
            images.len(),
            project_name
        );
        Ok(())
    }

    /// Export to an in-memory KMZ.
    pub fn export_to_vec(&self, records: &[PlacemarkRecord], project_name: &str) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.export(records, project_name, &mut out)?;
        Ok(out.into_inner())
    }
}

/// Export records with default settings.
pub fn export_kmz(records: &[PlacemarkRecord], project_name: &str) -> Result<Vec<u8>> {
    KmzExporter::new().export_to_vec(records, project_name)
}

/// Download name for an export: `{base}_{YYYY-MM-DD}.kmz`.
///
/// `base` is `custom` when given, otherwise the project name with
/// whitespace runs replaced by `_`.
pub fn export_file_name(project_name: &str, custom: Option<&str>, date: NaiveDate) -> String {
    let base = match custom.map(str::trim).filter(|c| !c.is_empty()) {
        Some(custom) => custom.to_string(),
        None => {
            let joined = project_name.split_whitespace().collect::<Vec<_>>().join("_");
            if joined.is_empty() {
                DEFAULT_PROJECT_NAME.to_string()
            } else {
                joined
            }
        }
    };
    format!("{}_{}.kmz", base, iso_date(date))
}
