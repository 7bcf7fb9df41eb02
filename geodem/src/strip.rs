//! Reassembly of uncompressed strips into a flat sample array.

use byteorder::{ByteOrder, LittleEndian};
use tracing::debug;

use crate::block::{ElementType, Samples};
use crate::error::{DemError, Result};
use crate::reader::ByteReader;
use crate::tags::TagTable;

/// No compression.
const COMPRESSION_NONE: u32 = 1;

/// SampleFormat values.
const SAMPLE_FORMAT_UINT: u32 = 1;
const SAMPLE_FORMAT_INT: u32 = 2;

/// Determine the element type from SampleFormat / BitsPerSample.
///
/// SampleFormat defaults to unsigned, SamplesPerPixel to 1, as in TIFF 6.0.
pub fn element_type(tags: &TagTable) -> Result<ElementType> {
    let sample_format = tags.sample_format.unwrap_or(SAMPLE_FORMAT_UINT);
    let bits_per_sample = tags.bits_per_sample.unwrap_or(1);
    let samples_per_pixel = tags.samples_per_pixel.unwrap_or(1);

    match (sample_format, bits_per_sample, samples_per_pixel) {
        (SAMPLE_FORMAT_UINT, 16, 1) => Ok(ElementType::U16),
        (SAMPLE_FORMAT_INT, 16, 1) => Ok(ElementType::I16),
        _ => Err(DemError::UnsupportedSampleFormat {
            sample_format,
            bits_per_sample,
            samples_per_pixel,
        }),
    }
}

/// Copy every strip of `data` into a zero-filled image buffer and
/// reinterpret it as little-endian samples.
///
/// Strip `i` lands at `i * bytes_per_strip`. Only the declared byte count is
/// copied, so a short final strip leaves the tail of the image zeroed.
pub fn decode_strips(data: &[u8], tags: &TagTable) -> Result<Samples> {
    let element_type = element_type(tags)?;

    let compression = tags.compression.unwrap_or(COMPRESSION_NONE);
    if compression != COMPRESSION_NONE {
        return Err(DemError::UnsupportedCompression(compression));
    }

    let image_width = tags.image_width.ok_or(DemError::MissingTag("ImageWidth"))?;
    let image_height = tags.image_height.ok_or(DemError::MissingTag("ImageLength"))?;
    let too_large = || DemError::ImageTooLarge {
        width: image_width,
        height: image_height,
    };
    let width = image_width as usize;
    let height = image_height as usize;
    let offsets = tags
        .strip_offsets
        .as_deref()
        .ok_or(DemError::MissingTag("StripOffsets"))?;
    let byte_counts = tags
        .strip_byte_counts
        .as_deref()
        .ok_or(DemError::MissingTag("StripByteCounts"))?;

    if offsets.len() != byte_counts.len() {
        return Err(DemError::StripMismatch {
            offsets: offsets.len(),
            byte_counts: byte_counts.len(),
        });
    }

    let rows_per_strip = tags
        .rows_per_strip
        .map(|r| r as usize)
        .unwrap_or(height)
        .min(height.max(1));
    let bytes_per_pixel = element_type.size();
    let bytes_per_strip = width
        .checked_mul(rows_per_strip)
        .and_then(|n| n.checked_mul(bytes_per_pixel))
        .ok_or_else(too_large)?;
    let len = width.checked_mul(height).ok_or_else(too_large)?;
    let image_size = len.checked_mul(bytes_per_pixel).ok_or_else(too_large)?;

    let reader = ByteReader::new(data);
    let mut image = vec![0u8; image_size];

    for (strip, (&offset, &count)) in offsets.iter().zip(byte_counts).enumerate() {
        let src = reader.bytes(offset as usize, count as usize)?;
        let end = strip
            .checked_mul(bytes_per_strip)
            .and_then(|start| start.checked_add(src.len()))
            .unwrap_or(usize::MAX);
        let start = end - src.len();
        if end > image.len() {
            return Err(DemError::StripOverflow {
                strip,
                end,
                size: image.len(),
            });
        }
        image[start..end].copy_from_slice(src);
    }

    debug!(
        width,
        height,
        strips = offsets.len(),
        rows_per_strip,
        "Decoded strips"
    );

    Ok(match element_type {
        ElementType::U16 => {
            let mut out = vec![0u16; len];
            LittleEndian::read_u16_into(&image, &mut out);
            Samples::U16(out)
        }
        ElementType::I16 => {
            let mut out = vec![0i16; len];
            LittleEndian::read_i16_into(&image, &mut out);
            Samples::I16(out)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormatError;
    use crate::tags::*;
    use crate::testutil::{georeferenced, u16_bytes, Entry, TiffBuilder};

    fn decode(data: &[u8]) -> Result<Samples> {
        decode_strips(data, &TagTable::parse(data)?)
    }

    #[test]
    fn test_single_strip_unsigned() {
        let data = TiffBuilder::new()
            .entry(Entry::long(TAG_IMAGE_WIDTH, 2))
            .entry(Entry::long(TAG_IMAGE_HEIGHT, 2))
            .entry(Entry::short(TAG_BITS_PER_SAMPLE, 16))
            .strips(vec![u16_bytes(&[10, 20, 30, 40])])
            .build();

        assert_eq!(decode(&data).unwrap(), Samples::U16(vec![10, 20, 30, 40]));
    }

    #[test]
    fn test_multiple_strips_signed() {
        let pixels = [1, -2, 3, -4, 5, -6, 7, -8, 9];
        let data = georeferenced(3, 3, 1, &pixels).build();
        assert_eq!(decode(&data).unwrap(), Samples::I16(pixels.to_vec()));
    }

    #[test]
    fn test_partial_last_strip() {
        // 2 rows per strip over 3 rows: the last strip holds a single row
        let pixels = [1, 2, 3, 4, 5, 6];
        let data = georeferenced(2, 3, 2, &pixels).build();
        assert_eq!(decode(&data).unwrap(), Samples::I16(pixels.to_vec()));
    }

    #[test]
    fn test_short_strip_leaves_zeros() {
        let pixels = [7, 7, 7, 7];
        let data = georeferenced(2, 2, 2, &pixels)
            .byte_counts(vec![6])
            .build();
        assert_eq!(decode(&data).unwrap(), Samples::I16(vec![7, 7, 7, 0]));
    }

    #[test]
    fn test_lzw_is_rejected() {
        let data = georeferenced(2, 2, 2, &[1, 2, 3, 4])
            .set(Entry::short(TAG_COMPRESSION, 5))
            .build();
        assert!(matches!(
            decode(&data),
            Err(DemError::UnsupportedCompression(5))
        ));
    }

    #[test]
    fn test_unsupported_sample_formats() {
        let floats = georeferenced(2, 2, 2, &[1, 2, 3, 4])
            .set(Entry::short(TAG_SAMPLE_FORMAT, 3))
            .build();
        assert!(matches!(
            decode(&floats),
            Err(DemError::UnsupportedSampleFormat {
                sample_format: 3,
                ..
            })
        ));

        let bytes = georeferenced(2, 2, 2, &[1, 2, 3, 4])
            .set(Entry::short(TAG_BITS_PER_SAMPLE, 8))
            .build();
        assert!(matches!(
            decode(&bytes),
            Err(DemError::UnsupportedSampleFormat {
                bits_per_sample: 8,
                ..
            })
        ));

        let rgb = georeferenced(2, 2, 2, &[1, 2, 3, 4])
            .set(Entry::short(TAG_SAMPLES_PER_PIXEL, 3))
            .build();
        assert!(matches!(
            decode(&rgb),
            Err(DemError::UnsupportedSampleFormat {
                samples_per_pixel: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_strip_table_mismatch() {
        let tags = TagTable {
            image_width: Some(1),
            image_height: Some(1),
            bits_per_sample: Some(16),
            strip_offsets: Some(vec![0, 2]),
            strip_byte_counts: Some(vec![2]),
            ..Default::default()
        };
        assert!(matches!(
            decode_strips(&[0u8; 4], &tags),
            Err(DemError::StripMismatch {
                offsets: 2,
                byte_counts: 1
            })
        ));
    }

    #[test]
    fn test_strip_past_end_of_file() {
        let data = georeferenced(2, 2, 2, &[1, 2, 3, 4])
            .byte_counts(vec![4096])
            .build();
        assert!(matches!(
            decode(&data),
            Err(DemError::Format(FormatError::Truncated { .. }))
        ));
    }

    #[test]
    fn test_strip_overflows_image() {
        let tags = TagTable {
            image_width: Some(1),
            image_height: Some(1),
            bits_per_sample: Some(16),
            strip_offsets: Some(vec![0]),
            strip_byte_counts: Some(vec![4]),
            ..Default::default()
        };
        assert!(matches!(
            decode_strips(&[0u8; 4], &tags),
            Err(DemError::StripOverflow { strip: 0, .. })
        ));
    }

    #[test]
    fn test_huge_dimensions_fail_cleanly() {
        let tags = TagTable {
            image_width: Some(u32::MAX),
            image_height: Some(u32::MAX),
            bits_per_sample: Some(16),
            strip_offsets: Some(vec![0]),
            strip_byte_counts: Some(vec![2]),
            ..Default::default()
        };
        assert!(matches!(
            decode_strips(&[0u8; 4], &tags),
            Err(DemError::ImageTooLarge {
                width: u32::MAX,
                height: u32::MAX
            })
        ));
    }

    #[test]
    fn test_missing_dimensions() {
        let tags = TagTable {
            bits_per_sample: Some(16),
            ..Default::default()
        };
        assert!(matches!(
            decode_strips(&[], &tags),
            Err(DemError::MissingTag("ImageWidth"))
        ));
    }
}
