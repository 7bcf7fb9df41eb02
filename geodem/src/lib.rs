//! # geodem - Gridded Elevation Lookups
//!
//! Point elevation queries over single-band 16-bit GeoTIFF grids, with a
//! compressed on-disk cache of decoded rasters.
//!
//! ## Features
//!
//! - **Self-contained decoding**: little-endian, stripped, uncompressed
//!   GeoTIFFs with tie-point/pixel-scale georeferencing
//! - **Fast restarts**: decoded grids are persisted as zlib-compressed cache
//!   records and reloaded instead of re-parsed
//! - **Lazy**: a block is generated the first time a coordinate inside it is
//!   queried, and at most once even under concurrent queries
//! - **ETOPO1 / ETOPO5**: world relief grids downloaded on demand (requires
//!   the `download` feature)
//!
//! ## Quick Start
//!
//! ```ignore
//! use geodem::{BlockCache, LocalGeoTiff};
//!
//! let cache = BlockCache::new("/var/cache/geodem", LocalGeoTiff::new("/data/alps.tif"))?;
//! let elevation = cache.get_elevation(7.6586, 45.9763)?; // Matterhorn
//! println!("Elevation: {}m", elevation);
//! ```
//!
//! Decoding a file directly:
//!
//! ```ignore
//! use geodem::RasterBlock;
//!
//! let block = RasterBlock::from_geotiff(&std::fs::read("/data/alps.tif")?)?;
//! println!("{}x{} samples", block.width(), block.height());
//! ```
//!
//! ## Cache Records
//!
//! A record is the zlib compression of a little-endian `u32` header length,
//! a JSON header with the dimensions, projection and sample type, and the
//! raw little-endian samples. See [`codec`].

pub mod archive;
pub mod block;
pub mod cache;
pub mod codec;
pub mod error;
pub mod geotiff;
pub mod projection;
pub mod reader;
pub mod source;
pub mod strip;
pub mod tags;

#[cfg(feature = "download")]
pub mod download;
#[cfg(feature = "download")]
pub mod etopo;

#[cfg(test)]
mod testutil;

// Re-export main types at crate root for convenience
pub use block::{ElementType, RasterBlock, Samples};
pub use cache::{BlockCache, BlockCacheBuilder, CacheStats};
pub use error::{DemError, FormatError, Result};
pub use projection::AffineProjection;
pub use source::{BlockSource, LocalGeoTiff, WHOLE_BLOCK_ID};
pub use tags::TagTable;

#[cfg(feature = "download")]
pub use etopo::{EtopoGrid, EtopoSource};
