//! In-memory elevation grid and point queries.
//!
//! This module provides [`RasterBlock`], a decoded raster with its
//! projection, and [`Samples`], its 16-bit sample storage.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{DemError, Result};
use crate::projection::AffineProjection;

/// Sample element type of a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    /// 16-bit unsigned integers.
    U16,
    /// 16-bit signed integers.
    I16,
}

impl ElementType {
    /// Bytes per sample.
    pub fn size(&self) -> usize {
        2
    }
}

/// Row-major sample storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Samples {
    U16(Vec<u16>),
    I16(Vec<i16>),
}

impl Samples {
    pub fn len(&self) -> usize {
        match self {
            Samples::U16(v) => v.len(),
            Samples::I16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            Samples::U16(_) => ElementType::U16,
            Samples::I16(_) => ElementType::I16,
        }
    }

    /// Sample at a flat index, widened to `i32` so both element types share
    /// one return type.
    pub fn get(&self, index: usize) -> Option<i32> {
        match self {
            Samples::U16(v) => v.get(index).map(|&s| s as i32),
            Samples::I16(v) => v.get(index).map(|&s| s as i32),
        }
    }
}

/// A decoded elevation grid.
///
/// The sample array is immutable; the only mutable state is the access
/// counter, which is bumped once per [`get_elevation`](Self::get_elevation)
/// call and read by the owning cache.
///
/// # Example
///
/// ```
/// use geodem::{AffineProjection, RasterBlock, Samples};
///
/// let block = RasterBlock::new(
///     2,
///     2,
///     Samples::U16(vec![10, 20, 30, 40]),
///     AffineProjection::new(0.0, 0.0, 1.0, 1.0),
/// )?;
/// assert_eq!(block.get_elevation(5.0, 5.0)?, 40);
/// # Ok::<(), geodem::DemError>(())
/// ```
#[derive(Debug)]
pub struct RasterBlock {
    width: u32,
    height: u32,
    samples: Samples,
    projection: AffineProjection,
    access_count: AtomicU64,
}

impl RasterBlock {
    /// Create a block, checking that there is exactly one sample per pixel.
    ///
    /// # Errors
    ///
    /// Returns [`DemError::SizeMismatch`] if `samples.len() != width * height`.
    pub fn new(
        width: u32,
        height: u32,
        samples: Samples,
        projection: AffineProjection,
    ) -> Result<Self> {
        let expected = width as usize * height as usize;
        if samples.len() != expected {
            return Err(DemError::SizeMismatch {
                width,
                height,
                expected,
                actual: samples.len(),
            });
        }

        Ok(Self {
            width,
            height,
            samples,
            projection,
            access_count: AtomicU64::new(0),
        })
    }

    /// Replace the projection, e.g. when a data source knows better than
    /// the embedded georeferencing.
    pub fn with_projection(mut self, projection: AffineProjection) -> Self {
        self.projection = projection;
        self
    }

    /// Get the sample at the given geographic coordinates.
    ///
    /// The coordinates are projected and floored to a pixel. Positions off
    /// the grid clamp to the nearest edge pixel rather than failing.
    ///
    /// # Errors
    ///
    /// Returns [`DemError::EmptyBlock`] if the block has no samples.
    pub fn get_elevation(&self, lng: f64, lat: f64) -> Result<i32> {
        if self.samples.is_empty() {
            return Err(DemError::EmptyBlock);
        }
        self.access_count.fetch_add(1, Ordering::Relaxed);

        let (px, py) = self.projection.to_pixel(lng, lat);
        let col = clamp_index(px.floor(), self.width);
        let row = clamp_index(py.floor(), self.height);

        self.sample(col, row).ok_or(DemError::EmptyBlock)
    }

    /// Sample at a column/row index, `None` outside the grid.
    pub fn sample(&self, col: usize, row: usize) -> Option<i32> {
        if col >= self.width as usize || row >= self.height as usize {
            return None;
        }
        self.samples.get(col + row * self.width as usize)
    }

    /// Smallest and largest sample, `None` for an empty block.
    pub fn min_max(&self) -> Option<(i32, i32)> {
        fn fold<T: Copy + Into<i32>>(v: &[T]) -> Option<(i32, i32)> {
            v.iter().fold(None, |acc, &s| {
                let s: i32 = s.into();
                Some(match acc {
                    None => (s, s),
                    Some((lo, hi)) => (lo.min(s), hi.max(s)),
                })
            })
        }
        match &self.samples {
            Samples::U16(v) => fold(v),
            Samples::I16(v) => fold(v),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn element_type(&self) -> ElementType {
        self.samples.element_type()
    }

    pub fn projection(&self) -> &AffineProjection {
        &self.projection
    }

    /// Number of point queries served by this block.
    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }
}

/// Clamp a floored pixel coordinate into `[0, len - 1]`. NaN maps to 0.
fn clamp_index(pixel: f64, len: u32) -> usize {
    let max = len.saturating_sub(1) as f64;
    // `as` saturates and sends NaN to 0
    pixel.clamp(0.0, max) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> AffineProjection {
        AffineProjection::new(0.0, 0.0, 1.0, 1.0)
    }

    fn block_2x2() -> RasterBlock {
        RasterBlock::new(2, 2, Samples::U16(vec![10, 20, 30, 40]), identity()).unwrap()
    }

    #[test]
    fn test_size_mismatch() {
        assert!(RasterBlock::new(2, 2, Samples::I16(vec![0; 4]), identity()).is_ok());
        assert!(RasterBlock::new(0, 5, Samples::I16(vec![]), identity()).is_ok());

        match RasterBlock::new(2, 2, Samples::I16(vec![0; 3]), identity()) {
            Err(DemError::SizeMismatch {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("Expected SizeMismatch, got {:?}", other),
        }

        assert!(RasterBlock::new(3, 1, Samples::U16(vec![0; 4]), identity()).is_err());
    }

    #[test]
    fn test_get_elevation_clamps() {
        let block = block_2x2();

        assert_eq!(block.get_elevation(0.0, 0.0).unwrap(), 10);
        assert_eq!(block.get_elevation(1.0, 0.0).unwrap(), 20);
        assert_eq!(block.get_elevation(0.0, 1.0).unwrap(), 30);
        assert_eq!(block.get_elevation(5.0, 5.0).unwrap(), 40);
        assert_eq!(block.get_elevation(-5.0, -5.0).unwrap(), 10);
        assert_eq!(block.get_elevation(5.0, -5.0).unwrap(), 20);
    }

    #[test]
    fn test_get_elevation_floors() {
        let block = block_2x2();
        assert_eq!(block.get_elevation(0.99, 0.99).unwrap(), 10);
        assert_eq!(block.get_elevation(-0.01, 1.5).unwrap(), 30);
    }

    #[test]
    fn test_get_elevation_nan_clamps_to_origin() {
        let block = block_2x2();
        assert_eq!(block.get_elevation(f64::NAN, f64::NAN).unwrap(), 10);
        assert_eq!(block.get_elevation(f64::INFINITY, 0.0).unwrap(), 20);
    }

    #[test]
    fn test_north_up_projection() {
        // 3x2 grid, top-left at (10°E, 50°N), one degree per pixel
        let block = RasterBlock::new(
            3,
            2,
            Samples::I16(vec![1, 2, 3, -4, -5, -6]),
            AffineProjection::new(-10.0, 50.0, 1.0, -1.0),
        )
        .unwrap();

        assert_eq!(block.get_elevation(10.5, 49.5).unwrap(), 1);
        assert_eq!(block.get_elevation(12.5, 49.5).unwrap(), 3);
        assert_eq!(block.get_elevation(11.5, 48.5).unwrap(), -5);
    }

    #[test]
    fn test_access_count() {
        let block = block_2x2();
        assert_eq!(block.access_count(), 0);
        block.get_elevation(0.0, 0.0).unwrap();
        block.get_elevation(9.0, 9.0).unwrap();
        assert_eq!(block.access_count(), 2);
    }

    #[test]
    fn test_empty_block() {
        let block = RasterBlock::new(0, 0, Samples::U16(vec![]), identity()).unwrap();
        assert!(matches!(
            block.get_elevation(0.0, 0.0),
            Err(DemError::EmptyBlock)
        ));
        assert_eq!(block.min_max(), None);
    }

    #[test]
    fn test_sample_and_min_max() {
        let block = block_2x2();
        assert_eq!(block.sample(1, 1), Some(40));
        assert_eq!(block.sample(2, 0), None);
        assert_eq!(block.min_max(), Some((10, 40)));
        assert_eq!(block.element_type(), ElementType::U16);
    }

    #[test]
    fn test_with_projection() {
        let block = block_2x2().with_projection(AffineProjection::new(1.0, 1.0, 1.0, 1.0));
        assert_eq!(block.get_elevation(0.0, 0.0).unwrap(), 40);
    }
}
