//! KMZ container I/O.
//!
//! A KMZ is a zip archive holding one KML document (`doc.kml` at the root)
//! plus the media it references. [`KmzWriter`] packs a document and a set of
//! images; [`unpack`] reads any archive back into its KML text and a map of
//! every other entry.

mod paths;

pub use paths::{
    IMAGE_FOLDER, ImagePathPolicy, find_image, image_extension, reference_matches,
};

use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, Write};

use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

use crate::error::{Error, Result};
use crate::util::decode_kml;

/// Name of the KML document written at the archive root.
pub const DOC_KML: &str = "doc.kml";

/// Default DEFLATE level.
pub const DEFAULT_COMPRESSION_LEVEL: i64 = 6;

/// Configuration for KMZ packing.
#[derive(Debug, Clone, Default)]
pub struct KmzConfig {
    /// Compression level for deflate (0-9, default 6).
    pub compression_level: Option<i64>,
}

/// Writes KMZ archives.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use kmzgen::kmz::KmzWriter;
///
/// let images = vec![("image_1.jpg".to_string(), vec![0xFF, 0xD8])];
/// let mut out = Cursor::new(Vec::new());
/// KmzWriter::new().write("<kml/>", &images, &mut out)?;
/// assert!(!out.into_inner().is_empty());
/// # Ok::<(), kmzgen::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct KmzWriter {
    config: KmzConfig,
}

impl KmzWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: KmzConfig) -> Self {
        self.config = config;
        self
    }

    /// Write `doc.kml` followed by every image under `files/`.
    ///
    /// Images are keyed by file name; a repeated name fails with
    /// [`Error::DuplicateEntry`] instead of replacing the earlier entry.
    pub fn write<W: Write + Seek>(
        &self,
        kml: &str,
        images: &[(String, Vec<u8>)],
        writer: W,
    ) -> Result<()> {
        let mut zip = ZipWriter::new(writer);

        let level = self
            .config
            .compression_level
            .unwrap_or(DEFAULT_COMPRESSION_LEVEL);
        let deflated = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(level));

        zip.start_file(DOC_KML, deflated).map_err(codec_error)?;
        zip.write_all(kml.as_bytes())?;

        let mut seen = HashSet::with_capacity(images.len());
        for (name, data) in images {
            let path = format!("{}/{}", IMAGE_FOLDER, name.trim_start_matches('/'));
            if !seen.insert(path.clone()) {
                return Err(Error::DuplicateEntry(path));
            }
            zip.start_file(path.as_str(), deflated).map_err(codec_error)?;
            zip.write_all(data)?;
        }

        zip.finish().map_err(codec_error)?;
        log::debug!("packed {} with {} image(s)", DOC_KML, images.len());
        Ok(())
    }
}

/// Pack a KML document and its images into KMZ bytes with default settings.
pub fn pack(kml: &str, images: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    KmzWriter::new().write(kml, images, &mut out)?;
    Ok(out.into_inner())
}

/// Non-KML entries of an unpacked archive, in archive order.
#[derive(Debug, Clone, Default)]
pub struct KmzEntries {
    entries: Vec<(String, Vec<u8>)>,
}

impl KmzEntries {
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, d)| d.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> + Clone {
        self.entries.iter().map(|(p, d)| (p.as_str(), d.as_slice()))
    }

    /// Resolve an image reference from a description (see [`find_image`]).
    pub fn find(&self, reference: &str) -> Option<(&str, &[u8])> {
        find_image(self.iter(), reference)
    }

    /// Entries that look like images (`.jpg`, `.jpeg`, `.png`, `.gif`).
    pub fn images(&self) -> impl Iterator<Item = (&str, &[u8])> + Clone {
        self.iter().filter(|(p, _)| image_extension(p).is_some())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<(String, Vec<u8>)> {
        self.entries
    }
}

/// An unpacked KMZ archive.
#[derive(Debug, Clone)]
pub struct KmzArchive {
    /// Path of the KML document inside the archive.
    pub kml_path: String,
    pub kml: String,
    pub entries: KmzEntries,
}

/// Unpack KMZ bytes.
pub fn unpack(data: &[u8]) -> Result<KmzArchive> {
    read_kmz_from_reader(Cursor::new(data))
}

/// Unpack a KMZ from any [`Read`] + [`Seek`] source.
///
/// The first entry whose name ends in `.kml` is the document; every other
/// file entry is returned regardless of folder.
pub fn read_kmz_from_reader<R: Read + Seek>(reader: R) -> Result<KmzArchive> {
    let mut archive = ZipArchive::new(reader)
        .map_err(|e| Error::Format(format!("not a zip archive: {e}")))?;

    let mut kml: Option<(String, String)> = None;
    let mut entries = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(codec_error)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();
        // Declared sizes are untrusted; let the buffer grow with the data.
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| Error::Codec(format!("{name}: {e}")))?;

        if kml.is_none() && name.to_ascii_lowercase().ends_with(".kml") {
            let text = decode_kml(&data).into_owned();
            kml = Some((name, text));
        } else {
            entries.push((name, data));
        }
    }

    let (kml_path, kml) =
        kml.ok_or_else(|| Error::Format("no KML document found in archive".into()))?;
    log::debug!("unpacked {kml_path} and {} other entries", entries.len());

    Ok(KmzArchive {
        kml_path,
        kml,
        entries: KmzEntries { entries },
    })
}

fn codec_error(e: ZipError) -> Error {
    match e {
        ZipError::Io(io) => Error::Io(io),
        other => Error::Codec(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack() {
        let images = vec![
            ("image_1.jpg".to_string(), b"one".to_vec()),
            ("image_2.png".to_string(), b"two".to_vec()),
        ];
        let bytes = pack("<kml>é</kml>", &images).unwrap();
        let archive = unpack(&bytes).unwrap();

        assert_eq!(archive.kml_path, "doc.kml");
        assert_eq!(archive.kml, "<kml>é</kml>");
        assert_eq!(archive.entries.len(), 2);
        assert_eq!(archive.entries.get("files/image_1.jpg"), Some(&b"one"[..]));
        assert_eq!(archive.entries.get("files/image_2.png"), Some(&b"two"[..]));
    }

    #[test]
    fn test_duplicate_image_rejected() {
        let images = vec![
            ("a.jpg".to_string(), b"one".to_vec()),
            ("a.jpg".to_string(), b"two".to_vec()),
        ];
        let err = pack("<kml/>", &images).unwrap_err();
        assert!(matches!(err, Error::DuplicateEntry(ref p) if p == "files/a.jpg"));
    }

    #[test]
    fn test_not_a_zip() {
        let err = unpack(b"definitely not a zip").unwrap_err();
        assert!(err.is_format(), "{err}");
    }

    #[test]
    fn test_zip_without_kml() {
        let mut out = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut out);
            zip.start_file("files/a.jpg", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"x").unwrap();
            zip.finish().unwrap();
        }
        let err = unpack(&out.into_inner()).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_kml_found_in_subfolder() {
        let mut out = Cursor::new(Vec::new());
        {
            let mut zip = ZipWriter::new(&mut out);
            let opts = SimpleFileOptions::default();
            zip.start_file("images/image_0.jpg", opts).unwrap();
            zip.write_all(b"img").unwrap();
            zip.start_file("nested/Places.KML", opts).unwrap();
            zip.write_all(b"<kml/>").unwrap();
            zip.finish().unwrap();
        }
        let archive = unpack(&out.into_inner()).unwrap();
        assert_eq!(archive.kml_path, "nested/Places.KML");
        assert_eq!(archive.entries.get("images/image_0.jpg"), Some(&b"img"[..]));
    }

    /// Stored archive whose `files/a.jpg` central directory record declares a
    /// zip64 uncompressed size of 2^62 bytes while holding a single byte.
    fn zip_with_oversized_entry() -> Vec<u8> {
        let entries: [(&str, &[u8], Option<u64>); 2] = [
            ("files/a.jpg", b"x", Some(1 << 62)),
            ("doc.kml", b"<kml/>", None),
        ];
        let mut out = Vec::new();
        let mut central = Vec::new();

        for (name, data, declared) in entries {
            let mut crc = flate2::Crc::new();
            crc.update(data);
            let crc = crc.sum();
            let offset = out.len() as u32;
            let len = data.len() as u32;

            out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes());
            out.extend_from_slice(&[0; 8]); // flags, method, time, date
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(data);

            let mut extra = Vec::new();
            let mut uncompressed = len;
            if let Some(size) = declared {
                extra.extend_from_slice(&1u16.to_le_bytes());
                extra.extend_from_slice(&8u16.to_le_bytes());
                extra.extend_from_slice(&size.to_le_bytes());
                uncompressed = u32::MAX;
            }

            central.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
            central.extend_from_slice(&45u16.to_le_bytes());
            central.extend_from_slice(&45u16.to_le_bytes());
            central.extend_from_slice(&[0; 8]); // flags, method, time, date
            central.extend_from_slice(&crc.to_le_bytes());
            central.extend_from_slice(&len.to_le_bytes());
            central.extend_from_slice(&uncompressed.to_le_bytes());
            central.extend_from_slice(&(name.len() as u16).to_le_bytes());
            central.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            central.extend_from_slice(&[0; 10]); // comment, disk, attributes
            central.extend_from_slice(&offset.to_le_bytes());
            central.extend_from_slice(name.as_bytes());
            central.extend_from_slice(&extra);
        }

        let central_offset = out.len() as u32;
        out.extend_from_slice(&central);
        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&(central.len() as u32).to_le_bytes());
        out.extend_from_slice(&central_offset.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    #[test]
    fn test_oversized_declared_size_is_not_preallocated() {
        // Either outcome is fine as long as the process survives.
        match unpack(&zip_with_oversized_entry()) {
            Ok(archive) => {
                assert_eq!(archive.kml_path, "doc.kml");
                assert_eq!(archive.entries.get("files/a.jpg"), Some(&b"x"[..]));
            }
            Err(e) => assert!(
                matches!(e, Error::Codec(_) | Error::Io(_) | Error::Format(_)),
                "{e}"
            ),
        }
    }

    #[test]
    fn test_entries_images_filter() {
        let entries = KmzEntries {
            entries: vec![
                ("files/a.jpg".into(), vec![1]),
                ("readme.txt".into(), vec![2]),
                ("files/b.GIF".into(), vec![3]),
            ],
        };
        let names: Vec<_> = entries.images().map(|(p, _)| p).collect();
        assert_eq!(names, vec!["files/a.jpg", "files/b.GIF"]);
        assert_eq!(entries.find("b.GIF").map(|h| h.1), Some(&[3u8][..]));
    }
}
