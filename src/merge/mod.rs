//! Merging several KMZ archives into one.
//!
//! Each input is parsed on its own with [`parse_for_merge`], which keeps the
//! raw marker URL and the unresolved image reference of every placemark.
//! [`MergeCoordinator`] then concatenates the sources in order, copies every
//! image it can resolve under a fresh name, regroups by icon and writes a
//! single archive.

mod description;

pub use description::merged_body;

use std::io::{Cursor, Seek, Write};

use crate::batch::BatchReport;
use crate::error::Result;
use crate::kml::{
    IconCategory, KmlDocument, KmlPlacemark, image_reference, image_src, parse_raw_placemarks,
};
use crate::kmz::{ImagePathPolicy, KmzConfig, KmzWriter, find_image, image_extension, unpack};

/// Document description of merged archives.
pub const MERGED_DOCUMENT_DESCRIPTION: &str = "Merged KMZ archive - generated with kmzgen";

/// Output name used when none is given.
pub const DEFAULT_MERGE_NAME: &str = "merged";

/// A placemark read for merging.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlacemark {
    pub name: String,
    /// Description text exactly as found, markup included.
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    pub icon: IconCategory,
    /// Marker URL as written in the source.
    pub icon_url: String,
    /// `src` of the first image tag in the description, not yet resolved.
    pub image_ref: Option<String>,
}

/// One parsed input archive.
#[derive(Debug, Clone, Default)]
pub struct ParsedSource {
    /// Original file name, for reporting.
    pub name: String,
    pub placemarks: Vec<MergePlacemark>,
    /// Image entries of the archive, in archive order.
    pub images: Vec<(String, Vec<u8>)>,
}

impl ParsedSource {
    fn find_image(&self, reference: &str) -> Option<(&str, &[u8])> {
        find_image(
            self.images.iter().map(|(p, d)| (p.as_str(), d.as_slice())),
            reference,
        )
    }
}

/// Parse one archive for merging.
///
/// Placemarks without coordinates are dropped, as on import.
pub fn parse_for_merge(data: &[u8], source_name: &str) -> Result<ParsedSource> {
    let archive = unpack(data)?;

    let images = archive
        .entries
        .images()
        .map(|(p, d)| (p.to_string(), d.to_vec()))
        .collect();

    let placemarks = parse_raw_placemarks(&archive.kml)?
        .into_iter()
        .filter_map(|pm| {
            let (latitude, longitude) = pm.position()?;
            let description = pm.description.clone().unwrap_or_default();
            Some(MergePlacemark {
                name: pm.display_name(),
                image_ref: image_reference(&description),
                description,
                latitude,
                longitude,
                icon: pm.icon(),
                icon_url: pm.href.unwrap_or_default(),
            })
        })
        .collect::<Vec<_>>();

    log::debug!(
        "{source_name}: {} placemark(s), {} image(s)",
        placemarks.len(),
        archive.entries.images().count()
    );

    Ok(ParsedSource {
        name: source_name.to_string(),
        placemarks,
        images,
    })
}

/// Parse every input in turn. A bad archive is reported and skipped; the
/// remaining inputs are still loaded.
pub fn load_sources<I, S>(inputs: I) -> (Vec<ParsedSource>, BatchReport)
where
    I: IntoIterator<Item = (S, Vec<u8>)>,
    S: Into<String>,
{
    let mut sources = Vec::new();
    let mut report = BatchReport::new();

    for (name, data) in inputs {
        let name = name.into();
        match parse_for_merge(&data, &name) {
            Ok(source) => {
                report.record_success();
                sources.push(source);
            }
            Err(e) => report.record_failure(name, &e),
        }
    }

    (sources, report)
}

/// Configuration for merging.
#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub kmz: KmzConfig,
    /// Names copied images by a counter shared across all sources.
    pub image_policy: ImagePathPolicy,
    pub description: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            kmz: KmzConfig::default(),
            image_policy: ImagePathPolicy::CANONICAL,
            description: MERGED_DOCUMENT_DESCRIPTION.to_string(),
        }
    }
}

/// Counts from a finished merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(serde::Serialize))]
pub struct MergeSummary {
    pub placemarks: usize,
    pub images: usize,
    /// Image references that matched nothing in their source and were dropped.
    pub unresolved_images: usize,
}

/// Combines parsed sources into one archive.
#[derive(Debug, Clone, Default)]
pub struct MergeCoordinator {
    config: MergeConfig,
}

impl MergeCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: MergeConfig) -> Self {
        self.config = config;
        self
    }

    /// Merge `sources` into a single KMZ written to `writer`.
    pub fn merge<W: Write + Seek>(
        &self,
        sources: &[ParsedSource],
        output_name: &str,
        writer: W,
    ) -> Result<MergeSummary> {
        let policy = self.config.image_policy;
        let mut images: Vec<(String, Vec<u8>)> = Vec::new();
        let mut placemarks = Vec::new();
        let mut summary = MergeSummary::default();

        for source in sources {
            for pm in &source.placemarks {
                let mut new_src = None;
                if let Some(reference) = pm.image_ref.as_deref() {
                    match source.find_image(reference) {
                        Some((path, data)) => {
                            let ext = image_extension(path).unwrap_or(policy.extension);
                            let file_name = policy.file_name_with_extension(images.len(), ext);
                            new_src = Some(image_src(&file_name));
                            images.push((file_name, data.to_vec()));
                        }
                        None => {
                            log::debug!(
                                "{}: image {reference} of '{}' not found, dropping reference",
                                source.name,
                                pm.name
                            );
                            summary.unresolved_images += 1;
                        }
                    }
                }

                placemarks.push(KmlPlacemark {
                    name: &pm.name,
                    body: merged_body(new_src.as_deref(), &pm.description),
                    longitude: pm.longitude,
                    latitude: pm.latitude,
                    icon: pm.icon,
                });
            }
        }

        summary.placemarks = placemarks.len();
        summary.images = images.len();

        let output_name = if output_name.trim().is_empty() {
            DEFAULT_MERGE_NAME
        } else {
            output_name
        };
        let kml = KmlDocument {
            name: output_name,
            description: &self.config.description,
            folder_counts: true,
        }
        .render(placemarks);

        KmzWriter::new()
            .with_config(self.config.kmz.clone())
            .write(&kml, &images, writer)?;

        log::info!(
            "merged {} source(s): {} placemark(s), {} image(s), {} unresolved",
            sources.len(),
            summary.placemarks,
            summary.images,
            summary.unresolved_images
        );
        Ok(summary)
    }

    pub fn merge_to_vec(&self, sources: &[ParsedSource], output_name: &str) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.merge(sources, output_name, &mut out)?;
        Ok(out.into_inner())
    }
}

/// Merge with default settings.
pub fn merge_kmz(sources: &[ParsedSource], output_name: &str) -> Result<Vec<u8>> {
    MergeCoordinator::new().merge_to_vec(sources, output_name)
}

/// Download name of a merged archive: `{name}.kmz`.
pub fn merge_file_name(output_name: &str) -> String {
    let name = output_name.trim();
    let name = if name.is_empty() { DEFAULT_MERGE_NAME } else { name };
    format!("{name}.kmz")
}
