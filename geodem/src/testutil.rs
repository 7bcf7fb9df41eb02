//! Synthetic GeoTIFF fixtures for unit tests.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::tags::*;

#[derive(Debug, Clone)]
enum Payload {
    /// Written straight into the 4-byte value field.
    Inline([u8; 4]),
    /// Written to the data area; the field holds its offset.
    Data(Vec<u8>),
}

/// One directory entry for [`TiffBuilder`].
#[derive(Debug, Clone)]
pub struct Entry {
    tag: u16,
    type_id: u16,
    count: u32,
    payload: Payload,
}

impl Entry {
    fn new(tag: u16, type_id: u16, count: u32, bytes: Vec<u8>) -> Self {
        let payload = if bytes.len() <= 4 {
            let mut field = [0u8; 4];
            field[..bytes.len()].copy_from_slice(&bytes);
            Payload::Inline(field)
        } else {
            Payload::Data(bytes)
        };
        Self {
            tag,
            type_id,
            count,
            payload,
        }
    }

    /// Entry with a verbatim value field.
    pub fn raw(tag: u16, type_id: u16, count: u32, field: [u8; 4]) -> Self {
        Self {
            tag,
            type_id,
            count,
            payload: Payload::Inline(field),
        }
    }

    pub fn short(tag: u16, value: u16) -> Self {
        Self::shorts(tag, &[value])
    }

    pub fn long(tag: u16, value: u32) -> Self {
        Self::longs(tag, &[value])
    }

    pub fn shorts(tag: u16, values: &[u16]) -> Self {
        let mut bytes = Vec::new();
        for v in values {
            bytes.write_u16::<LittleEndian>(*v).unwrap();
        }
        Self::new(tag, 3, values.len() as u32, bytes)
    }

    pub fn longs(tag: u16, values: &[u32]) -> Self {
        let mut bytes = Vec::new();
        for v in values {
            bytes.write_u32::<LittleEndian>(*v).unwrap();
        }
        Self::new(tag, 4, values.len() as u32, bytes)
    }

    pub fn rational(tag: u16, numerator: u32, denominator: u32) -> Self {
        let mut bytes = Vec::new();
        bytes.write_u32::<LittleEndian>(numerator).unwrap();
        bytes.write_u32::<LittleEndian>(denominator).unwrap();
        Self::new(tag, 5, 1, bytes)
    }

    pub fn doubles(tag: u16, values: &[f64]) -> Self {
        let mut bytes = Vec::new();
        for v in values {
            bytes.write_f64::<LittleEndian>(*v).unwrap();
        }
        Self::new(tag, 12, values.len() as u32, bytes)
    }

    pub fn ascii(tag: u16, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(0);
        let count = bytes.len() as u32;
        Self::new(tag, 2, count, bytes)
    }
}

/// Assembles a little-endian TIFF with one directory.
///
/// Entries are written in the order given, so tests can produce unsorted
/// directories. Strips added with [`TiffBuilder::strips`] get their
/// StripOffsets / StripByteCounts entries generated at build time.
#[derive(Debug, Clone, Default)]
pub struct TiffBuilder {
    entries: Vec<Entry>,
    strips: Vec<Vec<u8>>,
    byte_counts: Option<Vec<u32>>,
}

impl TiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Replace the entry with the same tag, or insert it in tag order.
    pub fn set(mut self, entry: Entry) -> Self {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.tag == entry.tag) {
            *existing = entry;
        } else {
            let at = self
                .entries
                .iter()
                .position(|e| e.tag > entry.tag)
                .unwrap_or(self.entries.len());
            self.entries.insert(at, entry);
        }
        self
    }

    pub fn remove(mut self, tag: u16) -> Self {
        self.entries.retain(|e| e.tag != tag);
        self
    }

    pub fn strips(mut self, strips: Vec<Vec<u8>>) -> Self {
        self.strips = strips;
        self
    }

    /// Declare byte counts that differ from the actual strip lengths.
    pub fn byte_counts(mut self, counts: Vec<u32>) -> Self {
        self.byte_counts = Some(counts);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut builder = self.clone();
        let strip_count = self.strips.len();
        if strip_count > 0 {
            let counts = self
                .byte_counts
                .clone()
                .unwrap_or_else(|| self.strips.iter().map(|s| s.len() as u32).collect());
            builder = builder
                .set(Entry::longs(TAG_STRIP_OFFSETS, &vec![0; strip_count]))
                .set(Entry::longs(TAG_STRIP_BYTE_COUNTS, &counts));
        }

        let ifd_len = 2 + 12 * builder.entries.len() + 4;
        let mut data_pos = 8 + ifd_len;
        let mut positions = Vec::with_capacity(builder.entries.len());
        for entry in &builder.entries {
            positions.push(data_pos);
            if let Payload::Data(bytes) = &entry.payload {
                data_pos += bytes.len();
            }
        }

        let mut strip_offsets = Vec::with_capacity(strip_count);
        let mut strip_pos = data_pos;
        for strip in &self.strips {
            strip_offsets.push(strip_pos as u32);
            strip_pos += strip.len();
        }
        if strip_count > 0 {
            let offsets = Entry::longs(TAG_STRIP_OFFSETS, &strip_offsets);
            if let Some(e) = builder
                .entries
                .iter_mut()
                .find(|e| e.tag == TAG_STRIP_OFFSETS)
            {
                *e = offsets;
            }
        }

        let mut out = Vec::new();
        out.extend_from_slice(&LITTLE_ENDIAN_MAGIC);
        out.write_u32::<LittleEndian>(8).unwrap();
        out.write_u16::<LittleEndian>(builder.entries.len() as u16)
            .unwrap();
        for (entry, pos) in builder.entries.iter().zip(&positions) {
            out.write_u16::<LittleEndian>(entry.tag).unwrap();
            out.write_u16::<LittleEndian>(entry.type_id).unwrap();
            out.write_u32::<LittleEndian>(entry.count).unwrap();
            match &entry.payload {
                Payload::Inline(field) => out.extend_from_slice(field),
                Payload::Data(_) => out.write_u32::<LittleEndian>(*pos as u32).unwrap(),
            }
        }
        out.write_u32::<LittleEndian>(0).unwrap();
        for entry in &builder.entries {
            if let Payload::Data(bytes) = &entry.payload {
                out.extend_from_slice(bytes);
            }
        }
        for strip in &self.strips {
            out.extend_from_slice(strip);
        }
        out
    }
}

/// Little-endian bytes of signed samples.
pub fn i16_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        bytes.write_i16::<LittleEndian>(*s).unwrap();
    }
    bytes
}

/// Little-endian bytes of unsigned samples.
pub fn u16_bytes(samples: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        bytes.write_u16::<LittleEndian>(*s).unwrap();
    }
    bytes
}

/// A north-up, signed 16-bit, single-band GeoTIFF whose top-left corner is
/// at (10°E, 50°N) with one degree per pixel. `pixels` is split into strips
/// of `rows_per_strip` rows.
pub fn georeferenced(width: u32, height: u32, rows_per_strip: u32, pixels: &[i16]) -> TiffBuilder {
    let row_bytes = width as usize * 2;
    let strips = i16_bytes(pixels)
        .chunks(row_bytes * rows_per_strip as usize)
        .map(|c| c.to_vec())
        .collect();

    TiffBuilder::new()
        .entry(Entry::long(TAG_IMAGE_WIDTH, width))
        .entry(Entry::long(TAG_IMAGE_HEIGHT, height))
        .entry(Entry::short(TAG_BITS_PER_SAMPLE, 16))
        .entry(Entry::short(TAG_COMPRESSION, 1))
        .entry(Entry::short(TAG_PHOTOMETRIC_INTERPRETATION, 1))
        .entry(Entry::short(TAG_ORIENTATION, 1))
        .entry(Entry::short(TAG_SAMPLES_PER_PIXEL, 1))
        .entry(Entry::long(TAG_ROWS_PER_STRIP, rows_per_strip))
        .entry(Entry::short(TAG_PLANAR_CONFIGURATION, 1))
        .entry(Entry::short(TAG_SAMPLE_FORMAT, 2))
        .entry(Entry::doubles(TAG_MODEL_PIXEL_SCALE, &[1.0, 1.0, 0.0]))
        .entry(Entry::doubles(
            TAG_MODEL_TIEPOINT,
            &[0.0, 0.0, 0.0, 10.0, 50.0, 0.0],
        ))
        .strips(strips)
}
