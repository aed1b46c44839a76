//! Image naming inside KMZ archives.
//!
//! Writers name images through an [`ImagePathPolicy`]. Readers cannot trust
//! any single convention, so [`find_image`] resolves a reference taken from a
//! description by suffix matching against whatever the archive contains.

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Folder that packed images are placed under.
pub const IMAGE_FOLDER: &str = "files";

/// Maps an ordinal to an archive path such as `files/image_1.jpg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePathPolicy {
    pub folder: &'static str,
    pub prefix: &'static str,
    pub extension: &'static str,
    /// Number given to ordinal 0.
    pub first: usize,
}

impl ImagePathPolicy {
    /// `files/image_{n}.jpg`, numbered from 1. Used for export and merge.
    pub const CANONICAL: Self = Self::new(IMAGE_FOLDER, "image_", "jpg", 1);

    /// `files/foto{n}.jpg`, numbered from 1.
    pub const LEGACY_EXPORT: Self = Self::new(IMAGE_FOLDER, "foto", "jpg", 1);

    /// `images/image_{n}.jpg`, numbered from 0.
    pub const LEGACY_IMPORT: Self = Self::new("images", "image_", "jpg", 0);

    pub const fn new(
        folder: &'static str,
        prefix: &'static str,
        extension: &'static str,
        first: usize,
    ) -> Self {
        Self {
            folder,
            prefix,
            extension,
            first,
        }
    }

    /// File name (without folder) for the given 0-based ordinal.
    pub fn file_name(&self, ordinal: usize) -> String {
        self.file_name_with_extension(ordinal, self.extension)
    }

    /// File name with an explicit extension, for sources that are not JPEG.
    pub fn file_name_with_extension(&self, ordinal: usize, extension: &str) -> String {
        format!("{}{}.{}", self.prefix, ordinal + self.first, extension)
    }

    /// Full archive path for the given 0-based ordinal.
    pub fn path(&self, ordinal: usize) -> String {
        self.join(&self.file_name(ordinal))
    }

    /// Prefix `file_name` with this policy's folder.
    pub fn join(&self, file_name: &str) -> String {
        if self.folder.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.folder, file_name)
        }
    }
}

impl Default for ImagePathPolicy {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// Whether an archive path could be the target of `reference`.
///
/// Matches when the path ends with the reference, or the reference ends with
/// the path's file name, so `files/a.jpg` and `./a.jpg` find each other. Both
/// suffixes must start at a path segment: `a.jpg` never names `files/ba.jpg`.
pub fn reference_matches(path: &str, reference: &str) -> bool {
    if reference.is_empty() {
        return false;
    }
    let base = path.rsplit('/').next().unwrap_or(path);
    ends_with_segment(path, reference)
        || (!base.is_empty() && ends_with_segment(reference, base))
}

fn ends_with_segment(path: &str, suffix: &str) -> bool {
    match path.strip_suffix(suffix) {
        Some(head) => head.is_empty() || head.ends_with('/'),
        None => false,
    }
}

/// Find the first entry that `reference` points at.
///
/// Retries with the percent-decoded reference when the literal one misses.
pub fn find_image<'a, I>(entries: I, reference: &str) -> Option<(&'a str, &'a [u8])>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])> + Clone,
{
    let reference = normalize_reference(reference);
    if let Some(hit) = entries
        .clone()
        .into_iter()
        .find(|(path, _)| reference_matches(path, &reference))
    {
        return Some(hit);
    }

    let decoded = percent_decode_str(&reference).decode_utf8().ok()?;
    if decoded == reference {
        return None;
    }
    entries
        .into_iter()
        .find(|(path, _)| reference_matches(path, &decoded))
}

fn normalize_reference(reference: &str) -> Cow<'_, str> {
    let trimmed = reference.trim().trim_start_matches("./").trim_start_matches('/');
    if trimmed.contains('\\') {
        Cow::Owned(trimmed.replace('\\', "/"))
    } else {
        Cow::Borrowed(trimmed)
    }
}

/// Lowercased extension of an image path, if it is one we carry.
pub fn image_extension(path: &str) -> Option<&'static str> {
    let ext = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" => Some("jpg"),
        "jpeg" => Some("jpeg"),
        "png" => Some("png"),
        "gif" => Some("gif"),
        _ => None,
    }
}
