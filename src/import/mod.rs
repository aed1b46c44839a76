//! Single-file import: KMZ archive to placemark records.

use std::io::{Read, Seek};
use std::path::Path;

use crate::error::Result;
use crate::kml::{ImportConfig, parse_with};
use crate::kmz::{read_kmz_from_reader, unpack};
use crate::model::PlacemarkRecord;

/// Import a KMZ from memory with the default [`ImportConfig`].
///
/// # Example
///
/// ```
/// use kmzgen::PlacemarkRecord;
/// use kmzgen::export::export_kmz;
/// use kmzgen::import::import_kmz;
///
/// let bytes = export_kmz(&[PlacemarkRecord::new("A", 1.0, 2.0)], "P")?;
/// let records = import_kmz(&bytes)?;
/// assert_eq!(records[0].name, "A");
/// # Ok::<(), kmzgen::Error>(())
/// ```
pub fn import_kmz(data: &[u8]) -> Result<Vec<PlacemarkRecord>> {
    import_kmz_with(data, &ImportConfig::default())
}

pub fn import_kmz_with(data: &[u8], config: &ImportConfig) -> Result<Vec<PlacemarkRecord>> {
    let archive = unpack(data)?;
    parse_with(&archive.kml, &archive.entries, config)
}

/// Import a KMZ file from disk.
pub fn read_kmz<P: AsRef<Path>>(path: P) -> Result<Vec<PlacemarkRecord>> {
    let file = std::fs::File::open(path)?;
    read_kmz_records(std::io::BufReader::new(file), &ImportConfig::default())
}

/// Import from any [`Read`] + [`Seek`] source.
pub fn read_kmz_records<R: Read + Seek>(
    reader: R,
    config: &ImportConfig,
) -> Result<Vec<PlacemarkRecord>> {
    let archive = read_kmz_from_reader(reader)?;
    parse_with(&archive.kml, &archive.entries, config)
}
