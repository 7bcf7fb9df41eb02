//! GeoTIFF header and tag directory parsing.
//!
//! Only the little-endian variant with a single image directory is read, and
//! only the whitelisted tags in [`KNOWN_TAGS`] are accepted. Anything else
//! aborts the decode: an unexpected tag usually means a layout (tiles, extra
//! bands, palettes) that the strip decoder would silently get wrong.
//!
//! Reference: TIFF 6.0 section 2 and OGC GeoTIFF 1.1 (19-008r4) section 7.

use tracing::debug;

use crate::error::{DemError, FormatError, Result};
use crate::reader::ByteReader;

/// Little-endian TIFF signature: `II`, then 42 as a u16.
pub const LITTLE_ENDIAN_MAGIC: [u8; 4] = [0x49, 0x49, 0x2a, 0x00];

/// Size of one directory entry in bytes.
const ENTRY_SIZE: usize = 12;

pub const TAG_IMAGE_WIDTH: u16 = 256;
pub const TAG_IMAGE_HEIGHT: u16 = 257;
pub const TAG_BITS_PER_SAMPLE: u16 = 258;
pub const TAG_COMPRESSION: u16 = 259;
pub const TAG_PHOTOMETRIC_INTERPRETATION: u16 = 262;
pub const TAG_STRIP_OFFSETS: u16 = 273;
pub const TAG_ORIENTATION: u16 = 274;
pub const TAG_SAMPLES_PER_PIXEL: u16 = 277;
pub const TAG_ROWS_PER_STRIP: u16 = 278;
pub const TAG_STRIP_BYTE_COUNTS: u16 = 279;
pub const TAG_X_RESOLUTION: u16 = 282;
pub const TAG_Y_RESOLUTION: u16 = 283;
pub const TAG_PLANAR_CONFIGURATION: u16 = 284;
pub const TAG_RESOLUTION_UNIT: u16 = 296;
pub const TAG_SOFTWARE: u16 = 305;
pub const TAG_SAMPLE_FORMAT: u16 = 339;
pub const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub const TAG_MODEL_TIEPOINT: u16 = 33922;
pub const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub const TAG_GEO_DOUBLE_PARAMS: u16 = 34736;
pub const TAG_GEO_ASCII_PARAMS: u16 = 34737;

/// How a recognized tag's value is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Exactly one value.
    Scalar,
    /// Any number of values, or text.
    Array,
    /// Accepted but not decoded.
    Ignored,
}

/// Every tag the parser accepts, with its display name and value shape.
const KNOWN_TAGS: &[(u16, &str, Shape)] = &[
    (TAG_IMAGE_WIDTH, "ImageWidth", Shape::Scalar),
    (TAG_IMAGE_HEIGHT, "ImageLength", Shape::Scalar),
    (TAG_BITS_PER_SAMPLE, "BitsPerSample", Shape::Scalar),
    (TAG_COMPRESSION, "Compression", Shape::Scalar),
    (TAG_PHOTOMETRIC_INTERPRETATION, "PhotometricInterpretation", Shape::Ignored),
    (TAG_STRIP_OFFSETS, "StripOffsets", Shape::Array),
    (TAG_ORIENTATION, "Orientation", Shape::Scalar),
    (TAG_SAMPLES_PER_PIXEL, "SamplesPerPixel", Shape::Scalar),
    (TAG_ROWS_PER_STRIP, "RowsPerStrip", Shape::Scalar),
    (TAG_STRIP_BYTE_COUNTS, "StripByteCounts", Shape::Array),
    (TAG_X_RESOLUTION, "XResolution", Shape::Scalar),
    (TAG_Y_RESOLUTION, "YResolution", Shape::Scalar),
    (TAG_PLANAR_CONFIGURATION, "PlanarConfiguration", Shape::Scalar),
    (TAG_RESOLUTION_UNIT, "ResolutionUnit", Shape::Scalar),
    (TAG_SOFTWARE, "Software", Shape::Array),
    (TAG_SAMPLE_FORMAT, "SampleFormat", Shape::Scalar),
    (TAG_MODEL_PIXEL_SCALE, "ModelPixelScale", Shape::Array),
    (TAG_MODEL_TIEPOINT, "ModelTiepoint", Shape::Array),
    (TAG_MODEL_TRANSFORMATION, "ModelTransformation", Shape::Array),
    (TAG_GEO_KEY_DIRECTORY, "GeoKeyDirectory", Shape::Array),
    (TAG_GEO_DOUBLE_PARAMS, "GeoDoubleParams", Shape::Array),
    (TAG_GEO_ASCII_PARAMS, "GeoAsciiParams", Shape::Array),
];

/// Display name of a supported tag.
pub fn tag_name(tag: u16) -> Option<&'static str> {
    KNOWN_TAGS
        .iter()
        .find(|(id, _, _)| *id == tag)
        .map(|(_, name, _)| *name)
}

fn tag_shape(tag: u16) -> Option<Shape> {
    KNOWN_TAGS
        .iter()
        .find(|(id, _, _)| *id == tag)
        .map(|(_, _, shape)| *shape)
}

/// TIFF field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
}

impl FieldType {
    /// Map a type id from a directory entry.
    pub fn from_id(id: u16) -> Result<Self> {
        Ok(match id {
            1 => FieldType::Byte,
            2 => FieldType::Ascii,
            3 => FieldType::Short,
            4 => FieldType::Long,
            5 => FieldType::Rational,
            6 => FieldType::SByte,
            7 => FieldType::Undefined,
            8 => FieldType::SShort,
            9 => FieldType::SLong,
            10 => FieldType::SRational,
            11 => FieldType::Float,
            12 => FieldType::Double,
            _ => return Err(FormatError::UnknownType(id).into()),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Byte => "BYTE",
            FieldType::Ascii => "ASCII",
            FieldType::Short => "SHORT",
            FieldType::Long => "LONG",
            FieldType::Rational => "RATIONAL",
            FieldType::SByte => "SBYTE",
            FieldType::Undefined => "UNDEFINED",
            FieldType::SShort => "SSHORT",
            FieldType::SLong => "SLONG",
            FieldType::SRational => "SRATIONAL",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
        }
    }

    /// Size of a single value in bytes.
    pub fn size(&self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double => 8,
        }
    }
}

/// A decoded tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Integer(u32),
    Float(f64),
    Integers(Vec<u32>),
    Floats(Vec<f64>),
    Text(String),
}

/// One decoded directory entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterTag {
    pub tag: u16,
    pub field_type: FieldType,
    pub count: u32,
    pub value: TagValue,
}

impl RasterTag {
    fn bad_value(&self) -> DemError {
        FormatError::BadValue {
            tag: self.tag,
            field_type: self.field_type.name(),
            count: self.count,
        }
        .into()
    }

    fn integer(&self) -> Result<u32> {
        match self.value {
            TagValue::Integer(v) => Ok(v),
            _ => Err(self.bad_value()),
        }
    }

    fn float(&self) -> Result<f64> {
        match self.value {
            TagValue::Integer(v) => Ok(v as f64),
            TagValue::Float(v) => Ok(v),
            _ => Err(self.bad_value()),
        }
    }

    fn integers(&self) -> Result<Vec<u32>> {
        match &self.value {
            TagValue::Integers(v) => Ok(v.clone()),
            _ => Err(self.bad_value()),
        }
    }

    fn floats(&self) -> Result<Vec<f64>> {
        match &self.value {
            TagValue::Floats(v) => Ok(v.clone()),
            _ => Err(self.bad_value()),
        }
    }

    fn text(&self) -> Result<String> {
        match &self.value {
            TagValue::Text(v) => Ok(v.clone()),
            _ => Err(self.bad_value()),
        }
    }
}

/// Raw 12-byte directory entry before its value is decoded.
struct RawEntry {
    tag: u16,
    field_type: FieldType,
    count: u32,
    /// Absolute position of the 4-byte value/offset field.
    field_pos: usize,
}

impl RawEntry {
    /// Position of the first value: inline when it fits in 4 bytes,
    /// otherwise the offset stored in the field.
    fn value_pos(&self, reader: &ByteReader<'_>) -> Result<usize> {
        let total = (self.count as usize).saturating_mul(self.field_type.size());
        if total <= 4 {
            Ok(self.field_pos)
        } else {
            Ok(reader.u32(self.field_pos)? as usize)
        }
    }

    fn bad_value(&self) -> DemError {
        FormatError::BadValue {
            tag: self.tag,
            field_type: self.field_type.name(),
            count: self.count,
        }
        .into()
    }

    fn scalar(&self, reader: &ByteReader<'_>) -> Result<TagValue> {
        if self.count != 1 {
            return Err(self.bad_value());
        }
        match self.field_type {
            FieldType::Short => Ok(TagValue::Integer(reader.u16(self.field_pos)? as u32)),
            FieldType::Long => Ok(TagValue::Integer(reader.u32(self.field_pos)?)),
            FieldType::Rational => {
                let offset = reader.u32(self.field_pos)? as usize;
                let numerator = reader.u32(offset)?;
                let denominator = reader.u32(offset + 4)?;
                Ok(TagValue::Float(numerator as f64 / denominator as f64))
            }
            FieldType::Double => {
                let offset = reader.u32(self.field_pos)? as usize;
                Ok(TagValue::Float(reader.f64(offset)?))
            }
            _ => Err(self.bad_value()),
        }
    }

    fn array(&self, reader: &ByteReader<'_>) -> Result<TagValue> {
        let count = self.count as usize;
        let pos = self.value_pos(reader)?;
        match self.field_type {
            FieldType::Ascii => Ok(TagValue::Text(reader.text(pos, count)?)),
            FieldType::Short => Ok(TagValue::Integers(
                reader
                    .u16_array(pos, count)?
                    .into_iter()
                    .map(u32::from)
                    .collect(),
            )),
            FieldType::Long => Ok(TagValue::Integers(reader.u32_array(pos, count)?)),
            FieldType::Double => Ok(TagValue::Floats(reader.f64_array(pos, count)?)),
            _ => Err(self.bad_value()),
        }
    }
}

/// Read the file header and decode the first image directory.
///
/// Returns the decoded entries in directory order. The
/// PhotometricInterpretation tag is accepted but not returned.
pub fn read_directory(data: &[u8]) -> Result<Vec<RasterTag>> {
    let reader = ByteReader::new(data);

    let magic = reader.bytes(0, 4).map_err(|_| FormatError::BadMagic {
        found: hex_prefix(data),
    })?;
    if magic != LITTLE_ENDIAN_MAGIC {
        return Err(FormatError::BadMagic {
            found: hex_prefix(data),
        }
        .into());
    }

    let ifd_offset = reader.u32(4)? as usize;
    let count = reader.u16(ifd_offset)? as usize;

    let mut tags = Vec::with_capacity(count);
    let mut previous: Option<u16> = None;

    for i in 0..count {
        let pos = ifd_offset + 2 + i * ENTRY_SIZE;
        let tag = reader.u16(pos)?;
        let field_type = FieldType::from_id(reader.u16(pos + 2)?)?;
        let entry = RawEntry {
            tag,
            field_type,
            count: reader.u32(pos + 4)?,
            field_pos: pos + 8,
        };

        if let Some(previous) = previous {
            if tag <= previous {
                return Err(FormatError::OutOfOrderTag { previous, tag }.into());
            }
        }
        previous = Some(tag);

        let value = match tag_shape(tag) {
            Some(Shape::Scalar) => entry.scalar(&reader)?,
            Some(Shape::Array) => entry.array(&reader)?,
            Some(Shape::Ignored) => continue,
            None => return Err(FormatError::UnknownTag(tag).into()),
        };

        tags.push(RasterTag {
            tag,
            field_type,
            count: entry.count,
            value,
        });
    }

    debug!(ifd_offset, entries = count, "Read GeoTIFF directory");
    Ok(tags)
}

fn hex_prefix(data: &[u8]) -> String {
    data.iter().take(4).map(|b| format!("{:02x}", b)).collect()
}

/// Typed view of a decoded directory: one optional field per supported tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagTable {
    pub image_width: Option<u32>,
    pub image_height: Option<u32>,
    pub bits_per_sample: Option<u32>,
    pub compression: Option<u32>,
    pub strip_offsets: Option<Vec<u32>>,
    pub orientation: Option<u32>,
    pub samples_per_pixel: Option<u32>,
    pub rows_per_strip: Option<u32>,
    pub strip_byte_counts: Option<Vec<u32>>,
    pub x_resolution: Option<f64>,
    pub y_resolution: Option<f64>,
    pub planar_configuration: Option<u32>,
    pub resolution_unit: Option<u32>,
    pub software: Option<String>,
    pub sample_format: Option<u32>,
    pub model_pixel_scale: Option<Vec<f64>>,
    pub model_tiepoint: Option<Vec<f64>>,
    pub model_transformation: Option<Vec<f64>>,
    pub geo_key_directory: Option<Vec<u32>>,
    pub geo_double_params: Option<Vec<f64>>,
    pub geo_ascii_params: Option<String>,
}

impl TagTable {
    /// Parse the header and directory of a GeoTIFF buffer.
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::from_tags(&read_directory(data)?)
    }

    /// Build the table from decoded entries.
    pub fn from_tags(tags: &[RasterTag]) -> Result<Self> {
        let mut table = TagTable::default();
        for entry in tags {
            match entry.tag {
                TAG_IMAGE_WIDTH => table.image_width = Some(entry.integer()?),
                TAG_IMAGE_HEIGHT => table.image_height = Some(entry.integer()?),
                TAG_BITS_PER_SAMPLE => table.bits_per_sample = Some(entry.integer()?),
                TAG_COMPRESSION => table.compression = Some(entry.integer()?),
                TAG_STRIP_OFFSETS => table.strip_offsets = Some(entry.integers()?),
                TAG_ORIENTATION => table.orientation = Some(entry.integer()?),
                TAG_SAMPLES_PER_PIXEL => table.samples_per_pixel = Some(entry.integer()?),
                TAG_ROWS_PER_STRIP => table.rows_per_strip = Some(entry.integer()?),
                TAG_STRIP_BYTE_COUNTS => table.strip_byte_counts = Some(entry.integers()?),
                TAG_X_RESOLUTION => table.x_resolution = Some(entry.float()?),
                TAG_Y_RESOLUTION => table.y_resolution = Some(entry.float()?),
                TAG_PLANAR_CONFIGURATION => table.planar_configuration = Some(entry.integer()?),
                TAG_RESOLUTION_UNIT => table.resolution_unit = Some(entry.integer()?),
                TAG_SOFTWARE => table.software = Some(entry.text()?),
                TAG_SAMPLE_FORMAT => table.sample_format = Some(entry.integer()?),
                TAG_MODEL_PIXEL_SCALE => table.model_pixel_scale = Some(entry.floats()?),
                TAG_MODEL_TIEPOINT => table.model_tiepoint = Some(entry.floats()?),
                TAG_MODEL_TRANSFORMATION => table.model_transformation = Some(entry.floats()?),
                TAG_GEO_KEY_DIRECTORY => table.geo_key_directory = Some(entry.integers()?),
                TAG_GEO_DOUBLE_PARAMS => table.geo_double_params = Some(entry.floats()?),
                TAG_GEO_ASCII_PARAMS => table.geo_ascii_params = Some(entry.text()?),
                other => return Err(FormatError::UnknownTag(other).into()),
            }
        }
        Ok(table)
    }
}
