//! Error types for kmzgen operations.

use thiserror::Error;

/// Errors that can occur while packing, unpacking, parsing or merging KMZ data.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input is not a zip archive, or a zip archive without a KML document.
    #[error("Invalid KMZ: {0}")]
    Format(String),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Compression, decompression or image re-encoding failed.
    #[error("Codec error: {0}")]
    Codec(String),

    /// The same path was written twice into one archive.
    #[error("Duplicate archive entry: {0}")]
    DuplicateEntry(String),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// True for problems with the input file itself (not a KMZ, broken KML).
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_) | Error::Xml(_))
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Codec(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
