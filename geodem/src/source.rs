//! Producers of cache records.
//!
//! A [`BlockSource`] decides which block covers a coordinate and knows how to
//! write that block's cache record when it is missing. [`BlockCache`] calls
//! into it on a miss.
//!
//! [`BlockCache`]: crate::BlockCache

use std::path::{Path, PathBuf};

use tracing::info;

use crate::archive;
use crate::block::RasterBlock;
use crate::codec;
use crate::error::Result;
use crate::projection::AffineProjection;

/// Block id used by sources made of a single raster covering everything.
pub const WHOLE_BLOCK_ID: &str = "world";

/// Something that can materialize cache records on demand.
pub trait BlockSource: Send + Sync {
    /// Folder name for this source's records under the cache directory.
    fn name(&self) -> &str;

    /// Id of the block holding `(lng, lat)`.
    fn block_id(&self, lng: f64, lat: f64) -> String;

    /// Write the cache record for `block_id` to `path`.
    ///
    /// Called only when `path` does not exist yet. Implementations should
    /// write via [`codec::save`] so a failed generation never leaves a
    /// partial record behind.
    fn generate(&self, block_id: &str, lng: f64, lat: f64, path: &Path) -> Result<()>;
}

/// A GeoTIFF on local disk, either plain or packed inside a zip archive.
///
/// The whole file becomes one block with id [`WHOLE_BLOCK_ID`].
#[derive(Debug, Clone)]
pub struct LocalGeoTiff {
    name: String,
    path: PathBuf,
    entry: Option<String>,
    projection: Option<AffineProjection>,
}

impl LocalGeoTiff {
    /// Use the GeoTIFF at `path`. The source is named after the file stem.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("local")
            .to_string();
        Self {
            name,
            path,
            entry: None,
            projection: None,
        }
    }

    /// Use the entry named `entry` inside the zip archive at `archive`.
    pub fn from_zip<P: Into<PathBuf>>(archive: P, entry: &str) -> Self {
        Self {
            entry: Some(entry.to_string()),
            ..Self::new(archive)
        }
    }

    /// Replace the source's name (and so its cache folder).
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Ignore the file's own georeferencing and use `projection` instead.
    pub fn with_projection(mut self, projection: AffineProjection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the raster.
    pub fn read_block(&self) -> Result<RasterBlock> {
        let data = match &self.entry {
            Some(entry) => archive::read_entry(&self.path, entry)?,
            None => std::fs::read(&self.path)?,
        };
        let block = RasterBlock::from_geotiff(&data)?;
        Ok(match self.projection {
            Some(projection) => block.with_projection(projection),
            None => block,
        })
    }
}

impl BlockSource for LocalGeoTiff {
    fn name(&self) -> &str {
        &self.name
    }

    fn block_id(&self, _lng: f64, _lat: f64) -> String {
        WHOLE_BLOCK_ID.to_string()
    }

    fn generate(&self, block_id: &str, _lng: f64, _lat: f64, path: &Path) -> Result<()> {
        info!(
            source = %self.name,
            block_id,
            input = %self.path.display(),
            "Converting GeoTIFF"
        );
        let block = self.read_block()?;
        codec::save(&block, path)
    }
}
