//! Block cache with on-disk records and lazy generation.
//!
//! [`BlockCache`] answers point queries by resolving the covering block
//! through a [`BlockSource`], loading its cache record from disk (asking the
//! source to generate it first if necessary) and keeping the decoded block in
//! memory.
//!
//! ```ignore
//! use geodem::{BlockCacheBuilder, LocalGeoTiff};
//!
//! let cache = BlockCacheBuilder::new("/var/cache/geodem", LocalGeoTiff::new("alps.tif"))
//!     .build()?;
//!
//! // First query converts alps.tif to /var/cache/geodem/alps/world.blk
//! let elevation = cache.get_elevation(7.65, 45.97)?;
//! println!("Elevation: {}m", elevation);
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;
use tracing::{debug, info, warn};

use crate::block::RasterBlock;
use crate::codec;
use crate::error::{DemError, Result};
use crate::source::BlockSource;

/// Extension of cache record files.
pub const RECORD_EXTENSION: &str = "blk";

/// Statistics about cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of blocks currently held in memory.
    pub entry_count: u64,
    /// Number of requests served from memory.
    pub hit_count: u64,
    /// Number of requests that had to load a record.
    pub miss_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Elevation lookups backed by a [`BlockSource`].
///
/// Blocks stay in memory for the lifetime of the cache unless a capacity is
/// configured. Loading is coalesced per block id: concurrent queries for a
/// block that is not in memory yet wait for a single generation/load and
/// share its result. Only the caller that performs the load counts as a
/// miss; callers that waited on it count as hits.
///
/// A record on disk that fails to decode is deleted and regenerated once.
pub struct BlockCache {
    /// `<cache_dir>/<source name>`
    record_dir: PathBuf,
    source: Arc<dyn BlockSource>,
    blocks: Cache<String, Arc<RasterBlock>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl BlockCache {
    /// Create an unbounded cache under `cache_dir` for `source`.
    ///
    /// # Errors
    ///
    /// Fails if the record directory cannot be created.
    pub fn new<P, S>(cache_dir: P, source: S) -> Result<Self>
    where
        P: AsRef<Path>,
        S: BlockSource + 'static,
    {
        BlockCacheBuilder::new(cache_dir, source).build()
    }

    pub fn builder<P, S>(cache_dir: P, source: S) -> BlockCacheBuilder
    where
        P: AsRef<Path>,
        S: BlockSource + 'static,
    {
        BlockCacheBuilder::new(cache_dir, source)
    }

    /// Elevation at the given coordinates.
    ///
    /// # Errors
    ///
    /// [`DemError::BlockLoad`] if the covering block could not be generated
    /// or loaded.
    pub fn get_elevation(&self, lng: f64, lat: f64) -> Result<i32> {
        let block_id = self.source.block_id(lng, lat);
        self.block(&block_id, lng, lat)?.get_elevation(lng, lat)
    }

    /// Elevations for many coordinates, in input order.
    ///
    /// Coordinates are grouped by block so each block is looked up once.
    /// Positions whose block fails to load get `default`.
    pub fn get_elevations_batch(&self, coords: &[(f64, f64)], default: i32) -> Vec<i32> {
        let mut results = vec![default; coords.len()];

        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, &(lng, lat)) in coords.iter().enumerate() {
            groups
                .entry(self.source.block_id(lng, lat))
                .or_default()
                .push(i);
        }

        for (block_id, indices) in &groups {
            let (lng, lat) = coords[indices[0]];
            let block = match self.block(block_id, lng, lat) {
                Ok(b) => b,
                Err(e) => {
                    debug!(block_id = %block_id, error = %e, "Skipping block in batch");
                    continue;
                }
            };

            for &i in indices {
                let (lng, lat) = coords[i];
                if let Ok(v) = block.get_elevation(lng, lat) {
                    results[i] = v;
                }
            }
        }

        results
    }

    /// The block `block_id`, generating and loading it if needed.
    ///
    /// `lng`/`lat` are passed through to [`BlockSource::generate`].
    pub fn block(&self, block_id: &str, lng: f64, lat: f64) -> Result<Arc<RasterBlock>> {
        if let Some(block) = self.blocks.get(block_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(block);
        }

        let mut loaded = false;
        let block = self
            .blocks
            .try_get_with(block_id.to_string(), || {
                loaded = true;
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                self.load_record(block_id, lng, lat).map(Arc::new)
            })
            .map_err(|source| DemError::BlockLoad {
                block_id: block_id.to_string(),
                source,
            })?;

        if !loaded {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(block)
    }

    fn load_record(&self, block_id: &str, lng: f64, lat: f64) -> Result<RasterBlock> {
        let path = self.record_path(block_id);

        let existing = path.exists();
        if !existing {
            self.generate_record(block_id, lng, lat, &path)?;
        }

        let block = match codec::load(&path) {
            Err(e @ (DemError::CorruptCache(_) | DemError::SizeMismatch { .. })) if existing => {
                warn!(
                    block_id,
                    path = %path.display(),
                    error = %e,
                    "Discarding unreadable cache record"
                );
                std::fs::remove_file(&path)?;
                self.generate_record(block_id, lng, lat, &path)?;
                codec::load(&path)?
            }
            result => result?,
        };
        debug!(
            block_id,
            width = block.width(),
            height = block.height(),
            "Block loaded"
        );
        Ok(block)
    }

    fn generate_record(&self, block_id: &str, lng: f64, lat: f64, path: &Path) -> Result<()> {
        info!(
            source = self.source.name(),
            block_id,
            path = %path.display(),
            "Generating block"
        );
        self.source.generate(block_id, lng, lat, path)?;
        if !path.exists() {
            return Err(DemError::BlockNotGenerated {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Path of the cache record for `block_id`.
    pub fn record_path(&self, block_id: &str) -> PathBuf {
        self.record_dir
            .join(format!("{}.{}", block_id, RECORD_EXTENSION))
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.blocks.run_pending_tasks();
        CacheStats {
            entry_count: self.blocks.entry_count(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    /// Directory holding this source's records.
    pub fn cache_dir(&self) -> &Path {
        &self.record_dir
    }

    pub fn source(&self) -> &dyn BlockSource {
        self.source.as_ref()
    }

    /// Maximum number of blocks kept in memory, 0 if unbounded.
    pub fn cache_capacity(&self) -> u64 {
        self.blocks.policy().max_capacity().unwrap_or(0)
    }

    /// Drop a block from memory. Its record on disk is kept.
    pub fn invalidate_block(&self, block_id: &str) {
        self.blocks.invalidate(block_id);
    }

    /// Drop all blocks from memory.
    pub fn clear_cache(&self) {
        self.blocks.invalidate_all();
    }
}

impl std::fmt::Debug for BlockCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCache")
            .field("record_dir", &self.record_dir)
            .field("source", &self.source.name())
            .field("entries", &self.blocks.entry_count())
            .finish()
    }
}

/// Builder for [`BlockCache`].
pub struct BlockCacheBuilder {
    cache_dir: PathBuf,
    cache_size: Option<u64>,
    source: Arc<dyn BlockSource>,
}

impl BlockCacheBuilder {
    pub fn new<P, S>(cache_dir: P, source: S) -> Self
    where
        P: AsRef<Path>,
        S: BlockSource + 'static,
    {
        Self {
            cache_dir: cache_dir.as_ref().to_path_buf(),
            cache_size: None,
            source: Arc::new(source),
        }
    }

    /// Create a builder from environment variables.
    ///
    /// - `GEODEM_CACHE_DIR`: cache directory (required)
    /// - `GEODEM_CACHE_SIZE`: blocks kept in memory, 0 or unset for unbounded
    pub fn from_env<S: BlockSource + 'static>(source: S) -> Result<Self> {
        let cache_dir = std::env::var("GEODEM_CACHE_DIR").map_err(|_| {
            DemError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "GEODEM_CACHE_DIR environment variable not set",
            ))
        })?;

        let cache_size: u64 = std::env::var("GEODEM_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);

        Ok(Self::new(cache_dir, source).cache_size(cache_size))
    }

    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = path.as_ref().to_path_buf();
        self
    }

    /// Maximum number of blocks kept in memory. 0 means unbounded.
    pub fn cache_size(mut self, size: u64) -> Self {
        self.cache_size = (size > 0).then_some(size);
        self
    }

    /// Build the cache, creating `<cache_dir>/<source name>` if missing.
    pub fn build(self) -> Result<BlockCache> {
        let record_dir = self.cache_dir.join(self.source.name());
        std::fs::create_dir_all(&record_dir)?;

        let mut builder = Cache::builder();
        if let Some(size) = self.cache_size {
            builder = builder.max_capacity(size);
        }

        Ok(BlockCache {
            record_dir,
            source: self.source,
            blocks: builder.build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }
}
