//! Cache record encoding.
//!
//! A cache record is a zlib stream wrapping
//!
//! ```text
//! [u32 LE header length][header: JSON][samples: row-major, little-endian]
//! ```
//!
//! The header looks like
//! `{"width":21601,"height":10801,"projection":{"type":"simple","x0":10800.0,...},"type":"Int16Array"}`.
//! There is no version field; any layout change breaks existing records.

use std::fs;
use std::io::{Read, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::block::{ElementType, RasterBlock, Samples};
use crate::error::{DemError, Result};
use crate::projection::AffineProjection;

/// zlib level used for new records.
const COMPRESSION_LEVEL: u32 = 5;

/// Length of the header size prefix.
const PREFIX_LEN: usize = 4;

#[derive(Debug, Serialize, Deserialize)]
struct RecordHeader {
    width: u32,
    height: u32,
    projection: ProjectionHeader,
    #[serde(rename = "type")]
    element_type: ElementTag,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
enum ProjectionHeader {
    #[serde(rename = "simple")]
    Simple(AffineProjection),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum ElementTag {
    #[serde(rename = "Uint16Array", alias = "UInt16Array")]
    Uint16Array,
    #[serde(rename = "Int16Array")]
    Int16Array,
}

impl From<ElementType> for ElementTag {
    fn from(t: ElementType) -> Self {
        match t {
            ElementType::U16 => ElementTag::Uint16Array,
            ElementType::I16 => ElementTag::Int16Array,
        }
    }
}

fn corrupt(reason: impl Into<String>) -> DemError {
    DemError::CorruptCache(reason.into())
}

/// Serialize and compress a block.
///
/// # Errors
///
/// [`DemError::UnsupportedProjection`] if any projection coefficient is NaN
/// or infinite, since JSON cannot represent it.
pub fn encode(block: &RasterBlock) -> Result<Vec<u8>> {
    if !block.projection().is_finite() {
        return Err(DemError::UnsupportedProjection(format!(
            "cannot encode non-finite projection {:?}",
            block.projection()
        )));
    }

    let header = RecordHeader {
        width: block.width(),
        height: block.height(),
        projection: ProjectionHeader::Simple(*block.projection()),
        element_type: block.element_type().into(),
    };
    let header = serde_json::to_vec(&header)
        .map_err(|e| corrupt(format!("cannot serialize header: {}", e)))?;

    let payload_len = block.samples().len() * block.element_type().size();
    let mut raw = Vec::with_capacity(PREFIX_LEN + header.len() + payload_len);
    let mut prefix = [0u8; PREFIX_LEN];
    LittleEndian::write_u32(&mut prefix, header.len() as u32);
    raw.extend_from_slice(&prefix);
    raw.extend_from_slice(&header);

    let start = raw.len();
    raw.resize(start + payload_len, 0);
    match block.samples() {
        Samples::U16(v) => LittleEndian::write_u16_into(v, &mut raw[start..]),
        Samples::I16(v) => LittleEndian::write_i16_into(v, &mut raw[start..]),
    }

    let mut encoder = ZlibEncoder::new(
        Vec::with_capacity(raw.len() / 4),
        Compression::new(COMPRESSION_LEVEL),
    );
    encoder.write_all(&raw)?;
    let compressed = encoder.finish()?;

    debug!(
        raw_bytes = raw.len(),
        compressed_bytes = compressed.len(),
        "Encoded cache record"
    );
    Ok(compressed)
}

/// Decompress and deserialize a block.
///
/// # Errors
///
/// [`DemError::CorruptCache`] for anything that is not a well-formed record,
/// [`DemError::SizeMismatch`] when the payload disagrees with the header's
/// dimensions.
pub fn decode(record: &[u8]) -> Result<RasterBlock> {
    let mut raw = Vec::new();
    ZlibDecoder::new(record)
        .read_to_end(&mut raw)
        .map_err(|e| corrupt(format!("decompression failed: {}", e)))?;

    if raw.len() < PREFIX_LEN {
        return Err(corrupt(format!("record is only {} bytes", raw.len())));
    }
    let header_len = LittleEndian::read_u32(&raw[..PREFIX_LEN]) as usize;
    let header_end = PREFIX_LEN
        .checked_add(header_len)
        .filter(|&end| end <= raw.len())
        .ok_or_else(|| {
            corrupt(format!(
                "header length {} exceeds record of {} bytes",
                header_len,
                raw.len()
            ))
        })?;

    let header: RecordHeader = serde_json::from_slice(&raw[PREFIX_LEN..header_end])
        .map_err(|e| corrupt(format!("invalid header: {}", e)))?;

    let payload = &raw[header_end..];
    if payload.len() % 2 != 0 {
        return Err(corrupt(format!(
            "payload of {} bytes is not a whole number of samples",
            payload.len()
        )));
    }

    let samples = match header.element_type {
        ElementTag::Uint16Array => {
            let mut out = vec![0u16; payload.len() / 2];
            LittleEndian::read_u16_into(payload, &mut out);
            Samples::U16(out)
        }
        ElementTag::Int16Array => {
            let mut out = vec![0i16; payload.len() / 2];
            LittleEndian::read_i16_into(payload, &mut out);
            Samples::I16(out)
        }
    };

    let ProjectionHeader::Simple(projection) = header.projection;
    RasterBlock::new(header.width, header.height, samples, projection)
}

/// Encode `block` and write it to `path`.
///
/// The record is written to a temporary file next to `path` and renamed
/// into place, so readers never observe a partial record.
pub fn save<P: AsRef<Path>>(block: &RasterBlock, path: P) -> Result<()> {
    let path = path.as_ref();
    let record = encode(block)?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&record)?;
    tmp.persist(path).map_err(|e| DemError::Io(e.error))?;

    debug!(path = %path.display(), bytes = record.len(), "Saved cache record");
    Ok(())
}

/// Read and decode the record at `path`.
pub fn load<P: AsRef<Path>>(path: P) -> Result<RasterBlock> {
    let path = path.as_ref();
    let record = fs::read(path)?;
    let block = decode(&record)?;
    debug!(
        path = %path.display(),
        width = block.width(),
        height = block.height(),
        "Loaded cache record"
    );
    Ok(block)
}
