//! Error types for the geodem library.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Structural problems in a GeoTIFF byte stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The file does not start with the little-endian TIFF signature `II*\0`.
    #[error("bad magic: expected 49492a00, found {found}")]
    BadMagic { found: String },

    /// A tag id outside the supported set.
    #[error("unknown tag: {0}")]
    UnknownTag(u16),

    /// A field type id outside the TIFF 6.0 table.
    #[error("unknown field type: {0}")]
    UnknownType(u16),

    /// Directory entries must be sorted by strictly increasing tag id.
    #[error("tag {tag} follows tag {previous} (entries must be in ascending order)")]
    OutOfOrderTag { previous: u16, tag: u16 },

    /// The tag carries a type or count it cannot be decoded from.
    #[error("cannot decode tag {tag} from {count} value(s) of type {field_type}")]
    BadValue {
        tag: u16,
        field_type: &'static str,
        count: u32,
    },

    /// A read ran past the end of the buffer.
    #[error("truncated: {len} byte(s) at offset {offset} exceed buffer of {size} bytes")]
    Truncated { offset: usize, len: usize, size: usize },
}

/// Errors that can occur when decoding, caching or querying elevation blocks.
#[derive(Error, Debug)]
pub enum DemError {
    /// IO error when reading or writing files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The GeoTIFF directory could not be parsed.
    #[error("GeoTIFF format error: {0}")]
    Format(#[from] FormatError),

    /// A tag required by the decode path is absent.
    #[error("missing required tag: {0}")]
    MissingTag(&'static str),

    /// Only single-band 16-bit integer samples are supported.
    #[error(
        "unsupported sample format: sampleFormat={sample_format}, \
         bitsPerSample={bits_per_sample}, samplesPerPixel={samples_per_pixel}"
    )]
    UnsupportedSampleFormat {
        sample_format: u32,
        bits_per_sample: u32,
        samples_per_pixel: u32,
    },

    /// Only uncompressed strips (compression = 1) are supported.
    #[error("unsupported compression: {0}")]
    UnsupportedCompression(u32),

    /// Georeferencing that cannot be expressed as an axis-aligned affine projection.
    #[error("unsupported projection: {0}")]
    UnsupportedProjection(String),

    /// Sample count doesn't match the block dimensions.
    #[error("size mismatch: {width}x{height} block needs {expected} samples, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// StripOffsets and StripByteCounts disagree on the number of strips.
    #[error("strip table mismatch: {offsets} offsets but {byte_counts} byte counts")]
    StripMismatch { offsets: usize, byte_counts: usize },

    /// A strip would be written past the end of the image buffer.
    #[error("strip {strip} ends at byte {end}, past image buffer of {size} bytes")]
    StripOverflow { strip: usize, end: usize, size: usize },

    /// The image buffer size does not fit in memory addressing.
    #[error("image of {width}x{height} pixels is too large")]
    ImageTooLarge { width: u32, height: u32 },

    /// Point query against a block without samples.
    #[error("block has no samples")]
    EmptyBlock,

    /// A cache record could not be decoded.
    #[error("corrupt cache record: {0}")]
    CorruptCache(String),

    /// The block source returned without writing the cache record.
    #[error("block source did not write a cache record at {}", path.display())]
    BlockNotGenerated { path: PathBuf },

    /// Loading or generating a block failed. Shared by every caller that
    /// waited on the same in-flight load.
    #[error("failed to load block '{block_id}': {source}")]
    BlockLoad {
        block_id: String,
        #[source]
        source: Arc<DemError>,
    },

    /// The archive does not contain the requested entry.
    #[error("entry '{}' not found in archive {}", entry, archive.display())]
    ArchiveEntryNotFound { archive: PathBuf, entry: String },

    /// The archive could not be read.
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Download failed.
    #[cfg(feature = "download")]
    #[error("download of {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    /// HTTP client error.
    #[cfg(feature = "download")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias using [`DemError`].
pub type Result<T> = std::result::Result<T, DemError>;
