//! kmzgen - KMZ builder, reader and merger

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use kmzgen::export::{ExportConfig, KmzExporter, export_file_name};
use kmzgen::geo::{is_valid_latitude, is_valid_longitude};
use kmzgen::kml::{CATALOG, parse_raw_placemarks};
use kmzgen::kmz::{ImagePathPolicy, KmzConfig, unpack};
use kmzgen::merge::{MergeConfig, MergeCoordinator, load_sources, merge_file_name};
use kmzgen::photo::{ExifGpsExtractor, JpegCompressor, PhotoTemplate, records_from_photos};
use kmzgen::util::today;
use kmzgen::{BatchReport, IconCategory, PlacemarkRecord};

#[derive(Parser)]
#[command(name = "kmzgen")]
#[command(version, about = "Build, read and merge KMZ placemark archives", long_about = None)]
#[command(after_help = "EXAMPLES:
    kmzgen export points.json -n Survey      Write Survey_<date>.kmz
    kmzgen import trip.kmz --images-dir out   Dump placemarks as JSON
    kmzgen merge a.kmz b.kmz -o all.kmz       Merge two archives
    kmzgen photos *.jpg -n Nest --icon bird   Placemarks from geotagged photos")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log progress (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Deflate compression level (0-9)
    #[arg(long, global = true, value_name = "LEVEL")]
    level: Option<i64>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a KMZ from a JSON array of placemarks
    Export {
        /// JSON file: [{"name", "latitude", "longitude", "description"?, "icon"?, "image_path"?}]
        input: PathBuf,
        /// Project name, used as the document name
        #[arg(short, long, default_value = kmzgen::export::DEFAULT_PROJECT_NAME)]
        name: String,
        /// Output file (default: <name>_<date>.kmz)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Name images files/foto{n}.jpg as older versions did
        #[arg(long)]
        legacy_paths: bool,
    },
    /// Print the placemarks of a KMZ as JSON
    Import {
        input: PathBuf,
        /// Write attached images into this directory
        #[arg(long, value_name = "DIR")]
        images_dir: Option<PathBuf>,
    },
    /// Merge several KMZ files into one
    Merge {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output document name
        #[arg(short, long, default_value = kmzgen::merge::DEFAULT_MERGE_NAME)]
        name: String,
        /// Output file (default: <name>.kmz)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Build a KMZ from geotagged photos
    Photos {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Name given to every placemark (default: photo file name)
        #[arg(short, long, default_value = "")]
        name: String,
        /// Icon id, see `kmzgen icons`
        #[arg(long, default_value = "pushpin")]
        icon: String,
        /// Project name
        #[arg(short, long, default_value = kmzgen::export::DEFAULT_PROJECT_NAME)]
        project: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Longest image edge in pixels
        #[arg(long, default_value_t = kmzgen::photo::DEFAULT_MAX_DIMENSION)]
        max_size: u32,
        /// JPEG quality (1-100)
        #[arg(long, default_value_t = kmzgen::photo::DEFAULT_JPEG_QUALITY)]
        quality: u8,
    },
    /// List the icon catalog
    Icons,
    /// Summarize a KMZ without converting it
    Info { input: PathBuf },
}

#[derive(Deserialize)]
struct RecordInput {
    name: String,
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    image_path: Option<PathBuf>,
}

#[derive(Serialize)]
struct RecordSummary {
    name: String,
    description: String,
    latitude: f64,
    longitude: f64,
    icon: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();

    let kmz = KmzConfig {
        compression_level: cli.level.map(|l| l.clamp(0, 9)),
    };

    let result = match cli.command {
        Command::Export {
            input,
            name,
            output,
            legacy_paths,
        } => export(&input, &name, output, legacy_paths, kmz),
        Command::Import { input, images_dir } => import(&input, images_dir.as_deref()),
        Command::Merge {
            inputs,
            name,
            output,
        } => merge(&inputs, &name, output, kmz),
        Command::Photos {
            inputs,
            name,
            icon,
            project,
            output,
            max_size,
            quality,
        } => photos(
            &inputs,
            PhotoTemplate::new(name, icon_from_id(&icon)),
            &project,
            output,
            JpegCompressor::new()
                .with_max_dimension(max_size)
                .with_quality(quality),
            kmz,
        ),
        Command::Icons => {
            list_icons();
            Ok(())
        }
        Command::Info { input } => show_info(&input),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn icon_from_id(id: &str) -> IconCategory {
    IconCategory::from_id(id).unwrap_or_else(|| {
        log::warn!(
            "unknown icon '{id}' (would be filed under {}), using pushpin",
            IconCategory::folder_label_for_id(id)
        );
        IconCategory::default()
    })
}

fn read_file(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("{}: {e}", path.display()))
}

fn write_file(path: &Path, data: &[u8]) -> Result<(), String> {
    fs::write(path, data).map_err(|e| format!("{}: {e}", path.display()))?;
    println!("Wrote {} ({} bytes)", path.display(), data.len());
    Ok(())
}

fn export(
    input: &Path,
    name: &str,
    output: Option<PathBuf>,
    legacy_paths: bool,
    kmz: KmzConfig,
) -> Result<(), String> {
    let json = read_file(input)?;
    let inputs: Vec<RecordInput> =
        serde_json::from_slice(&json).map_err(|e| format!("{}: {e}", input.display()))?;

    let base = input.parent().unwrap_or(Path::new("."));
    let mut records = Vec::with_capacity(inputs.len());
    for item in inputs {
        if !is_valid_latitude(item.latitude) || !is_valid_longitude(item.longitude) {
            log::warn!(
                "'{}' has coordinates out of range ({}, {})",
                item.name,
                item.latitude,
                item.longitude
            );
        }
        let icon = item.icon.as_deref().map_or_else(IconCategory::default, icon_from_id);
        let mut record = PlacemarkRecord::new(item.name, item.latitude, item.longitude)
            .with_description(item.description)
            .with_icon(icon);
        if let Some(image_path) = item.image_path {
            record = record.with_image(read_file(&base.join(image_path))?);
        }
        records.push(record);
    }

    let exporter = KmzExporter::new().with_config(ExportConfig {
        kmz,
        image_policy: if legacy_paths {
            ImagePathPolicy::LEGACY_EXPORT
        } else {
            ImagePathPolicy::CANONICAL
        },
        ..Default::default()
    });
    let bytes = exporter
        .export_to_vec(&records, name)
        .map_err(|e| e.to_string())?;

    let output = output.unwrap_or_else(|| PathBuf::from(export_file_name(name, None, today())));
    write_file(&output, &bytes)
}

fn import(input: &Path, images_dir: Option<&Path>) -> Result<(), String> {
    let data = read_file(input)?;
    let records = kmzgen::import::import_kmz(&data).map_err(|e| e.to_string())?;

    if let Some(dir) = images_dir {
        fs::create_dir_all(dir).map_err(|e| format!("{}: {e}", dir.display()))?;
    }

    let mut summaries = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let image = match (images_dir, &record.image) {
            (Some(dir), Some(data)) => {
                let path = dir.join(ImagePathPolicy::CANONICAL.file_name(index));
                fs::write(&path, data).map_err(|e| format!("{}: {e}", path.display()))?;
                Some(path.display().to_string())
            }
            (None, Some(data)) => Some(format!("{} bytes", data.len())),
            _ => None,
        };
        summaries.push(RecordSummary {
            name: record.name,
            description: record.description,
            latitude: record.latitude,
            longitude: record.longitude,
            icon: record.icon.id(),
            image,
        });
    }

    let json = serde_json::to_string_pretty(&summaries).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn merge(inputs: &[PathBuf], name: &str, output: Option<PathBuf>, kmz: KmzConfig) -> Result<(), String> {
    let mut report = BatchReport::new();
    let mut loaded = Vec::with_capacity(inputs.len());
    for path in inputs {
        let file = path.display().to_string();
        match fs::read(path) {
            Ok(data) => loaded.push((file, data)),
            Err(e) => report.record_failure(file, &kmzgen::Error::from(e)),
        }
    }

    let (sources, load_report) = load_sources(loaded);
    report.succeeded += load_report.succeeded;
    report.failed.extend(load_report.failed);
    print_report(&report);

    if sources.is_empty() {
        return Err("no readable KMZ files to merge".to_string());
    }

    let coordinator = MergeCoordinator::new().with_config(MergeConfig {
        kmz,
        ..Default::default()
    });
    let bytes = coordinator
        .merge_to_vec(&sources, name)
        .map_err(|e| e.to_string())?;

    let output = output.unwrap_or_else(|| PathBuf::from(merge_file_name(name)));
    write_file(&output, &bytes)
}

fn photos(
    inputs: &[PathBuf],
    template: PhotoTemplate,
    project: &str,
    output: Option<PathBuf>,
    compressor: JpegCompressor,
    kmz: KmzConfig,
) -> Result<(), String> {
    let mut report = BatchReport::new();
    let mut files = Vec::with_capacity(inputs.len());
    for path in inputs {
        let file = path.display().to_string();
        match fs::read(path) {
            Ok(data) => files.push((file, data)),
            Err(e) => report.record_failure(file, &kmzgen::Error::from(e)),
        }
    }

    let (records, batch) = records_from_photos(files, &template, &ExifGpsExtractor::new(), &compressor);
    report.succeeded += batch.succeeded;
    report.skipped.extend(batch.skipped);
    report.failed.extend(batch.failed);
    print_report(&report);

    if records.is_empty() {
        return Err("no photo carried usable GPS data".to_string());
    }

    let bytes = KmzExporter::new()
        .with_config(ExportConfig {
            kmz,
            ..Default::default()
        })
        .export_to_vec(&records, project)
        .map_err(|e| e.to_string())?;

    let output = output.unwrap_or_else(|| PathBuf::from(export_file_name(project, None, today())));
    write_file(&output, &bytes)
}

fn print_report(report: &BatchReport) {
    eprintln!("{report}");
    for issue in report.issues() {
        eprintln!("  {issue}");
    }
}

fn list_icons() {
    for icon in CATALOG {
        println!("{:<18} {:<8} {}", icon.id, icon.display_name, icon.marker_url);
    }
}

fn show_info(path: &Path) -> Result<(), String> {
    let data = read_file(path)?;
    let archive = unpack(&data).map_err(|e| e.to_string())?;
    let placemarks = parse_raw_placemarks(&archive.kml).map_err(|e| e.to_string())?;

    let located = placemarks.iter().filter(|p| p.position().is_some()).count();
    let with_images = placemarks
        .iter()
        .filter(|p| {
            p.description
                .as_deref()
                .and_then(kmzgen::kml::image_reference)
                .and_then(|r| archive.entries.find(&r))
                .is_some()
        })
        .count();

    println!("File: {}", path.display());
    println!("Document: {}", archive.kml_path);
    println!("Placemarks: {} ({} with coordinates)", placemarks.len(), located);
    println!("Images: {} ({} referenced)", archive.entries.images().count(), with_images);
    for descriptor in CATALOG {
        let count = placemarks
            .iter()
            .filter(|p| p.icon() == descriptor.category)
            .count();
        if count > 0 {
            println!("  {:<8} {count}", descriptor.display_name);
        }
    }
    Ok(())
}
