//! GeoTIFF → [`RasterBlock`] decoding.

use tracing::debug;

use crate::block::RasterBlock;
use crate::error::{DemError, Result};
use crate::projection::AffineProjection;
use crate::strip::decode_strips;
use crate::tags::TagTable;

impl RasterBlock {
    /// Decode a little-endian, stripped, single-band 16-bit GeoTIFF.
    ///
    /// # Errors
    ///
    /// Any format violation or unsupported variant aborts the decode; see
    /// [`DemError`] for the full list.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use geodem::RasterBlock;
    ///
    /// let bytes = std::fs::read("ETOPO1_Bed_c_geotiff.tif")?;
    /// let block = RasterBlock::from_geotiff(&bytes)?;
    /// println!("{}x{}", block.width(), block.height());
    /// ```
    pub fn from_geotiff(data: &[u8]) -> Result<Self> {
        let tags = TagTable::parse(data)?;
        Self::from_tag_table(data, &tags)
    }

    /// Decode using an already parsed tag table of `data`.
    pub fn from_tag_table(data: &[u8], tags: &TagTable) -> Result<Self> {
        let samples = decode_strips(data, tags)?;
        let projection = AffineProjection::from_tags(tags)?;
        let width = tags.image_width.ok_or(DemError::MissingTag("ImageWidth"))?;
        let height = tags
            .image_height
            .ok_or(DemError::MissingTag("ImageLength"))?;

        debug!(width, height, ?projection, "Decoded GeoTIFF");
        RasterBlock::new(width, height, samples, projection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Samples;
    use crate::error::FormatError;
    use crate::tags::*;
    use crate::testutil::{georeferenced, Entry};

    #[test]
    fn test_decode_georeferenced() {
        let pixels = [100, 200, 300, -10, -20, -30];
        let block = RasterBlock::from_geotiff(&georeferenced(3, 2, 2, &pixels).build()).unwrap();

        assert_eq!(block.width(), 3);
        assert_eq!(block.height(), 2);
        assert_eq!(block.samples(), &Samples::I16(pixels.to_vec()));
        assert_eq!(
            block.projection(),
            &AffineProjection::new(-10.0, 50.0, 1.0, -1.0)
        );

        // Top-left pixel covers 10..11°E, 49..50°N
        assert_eq!(block.get_elevation(10.5, 49.5).unwrap(), 100);
        assert_eq!(block.get_elevation(12.9, 48.1).unwrap(), -30);
    }

    #[test]
    fn test_rotated_raster_is_rejected() {
        let data = georeferenced(2, 2, 2, &[1, 2, 3, 4])
            .entry(Entry::doubles(TAG_MODEL_TRANSFORMATION, &[0.0; 16]))
            .build();
        assert!(matches!(
            RasterBlock::from_geotiff(&data),
            Err(DemError::UnsupportedProjection(_))
        ));
    }

    #[test]
    fn test_out_of_order_aborts_decode() {
        let data = georeferenced(2, 2, 2, &[1, 2, 3, 4])
            .remove(TAG_IMAGE_WIDTH)
            .set(Entry::long(TAG_IMAGE_WIDTH, 2))
            .remove(TAG_IMAGE_HEIGHT)
            .entry(Entry::long(TAG_IMAGE_HEIGHT, 2))
            .build();
        assert!(matches!(
            RasterBlock::from_geotiff(&data),
            Err(DemError::Format(FormatError::OutOfOrderTag { .. }))
        ));
    }

    #[test]
    fn test_missing_georeferencing() {
        let data = georeferenced(2, 2, 2, &[1, 2, 3, 4])
            .remove(TAG_MODEL_TIEPOINT)
            .build();
        assert!(matches!(
            RasterBlock::from_geotiff(&data),
            Err(DemError::MissingTag("ModelTiepoint"))
        ));
    }
}
