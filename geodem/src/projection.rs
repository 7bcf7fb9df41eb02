//! Geographic-to-pixel projection.
//!
//! Only north-up rasters georeferenced by a single tie point at the raster
//! origin plus a pixel scale are supported, which reduces the GeoTIFF model
//! transformation to an axis-aligned scale and offset.

use serde::{Deserialize, Serialize};

use crate::error::{DemError, Result};
use crate::tags::TagTable;

/// Axis-aligned affine mapping from (lng, lat) to pixel coordinates.
///
/// `px = lng * xs + x0`, `py = lat * ys + y0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineProjection {
    pub x0: f64,
    pub y0: f64,
    pub xs: f64,
    pub ys: f64,
}

impl AffineProjection {
    pub fn new(x0: f64, y0: f64, xs: f64, ys: f64) -> Self {
        Self { x0, y0, xs, ys }
    }

    /// Continuous pixel coordinates of a geographic position.
    pub fn to_pixel(&self, lng: f64, lat: f64) -> (f64, f64) {
        (lng * self.xs + self.x0, lat * self.ys + self.y0)
    }

    /// Derive the projection from ModelPixelScale / ModelTiepoint.
    ///
    /// Rows grow downward while latitude grows upward, hence the negative
    /// `ys`.
    ///
    /// # Errors
    ///
    /// [`DemError::UnsupportedProjection`] for a ModelTransformation tag,
    /// wrong scale/tie point lengths, an orientation other than top-left, a
    /// tie point not anchored at raster (0, 0), or a degenerate pixel scale.
    /// [`DemError::MissingTag`] when the scale or tie point is absent.
    pub fn from_tags(tags: &TagTable) -> Result<Self> {
        if let Some(transformation) = &tags.model_transformation {
            return Err(unsupported(format!(
                "ModelTransformation is not supported ({} values)",
                transformation.len()
            )));
        }

        let scale = tags
            .model_pixel_scale
            .as_deref()
            .ok_or(DemError::MissingTag("ModelPixelScale"))?;
        let tiepoint = tags
            .model_tiepoint
            .as_deref()
            .ok_or(DemError::MissingTag("ModelTiepoint"))?;

        if scale.len() != 3 {
            return Err(unsupported(format!(
                "ModelPixelScale has {} values, expected 3",
                scale.len()
            )));
        }
        if tiepoint.len() != 6 {
            return Err(unsupported(format!(
                "ModelTiepoint has {} values, expected 6",
                tiepoint.len()
            )));
        }

        let orientation = tags.orientation.unwrap_or(1);
        if orientation != 1 {
            return Err(unsupported(format!(
                "Orientation {} is not supported, expected 1 (top-left)",
                orientation
            )));
        }
        if tiepoint[0] != 0.0 || tiepoint[1] != 0.0 {
            return Err(unsupported(format!(
                "tie point must be anchored at raster (0, 0), found ({}, {})",
                tiepoint[0], tiepoint[1]
            )));
        }
        if !scale[..2].iter().all(|s| s.is_finite() && *s != 0.0) {
            return Err(unsupported(format!(
                "degenerate pixel scale ({}, {})",
                scale[0], scale[1]
            )));
        }

        let projection = Self {
            x0: -tiepoint[3] / scale[0] + tiepoint[0],
            y0: tiepoint[4] / scale[1] + tiepoint[1],
            xs: 1.0 / scale[0],
            ys: -1.0 / scale[1],
        };
        if !projection.is_finite() {
            return Err(unsupported(format!(
                "non-finite projection derived from tie point ({}, {}) and scale ({}, {})",
                tiepoint[3], tiepoint[4], scale[0], scale[1]
            )));
        }
        Ok(projection)
    }

    /// Whether all four coefficients are finite numbers.
    pub fn is_finite(&self) -> bool {
        [self.x0, self.y0, self.xs, self.ys]
            .iter()
            .all(|v| v.is_finite())
    }
}

fn unsupported(reason: String) -> DemError {
    DemError::UnsupportedProjection(reason)
}
