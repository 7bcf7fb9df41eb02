pub mod batch;
pub mod convert;
pub mod info;
pub mod query;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use geodem::{BlockCache, BlockCacheBuilder, BlockSource, LocalGeoTiff};
use std::path::PathBuf;

/// Where elevations come from.
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Local GeoTIFF (or zip archive with --entry)
    #[arg(long, conflicts_with = "source")]
    pub tiff: Option<PathBuf>,

    /// GeoTIFF file name inside a zip archive
    #[arg(long, requires = "tiff")]
    pub entry: Option<String>,

    /// Downloadable world grid
    #[arg(long, value_enum)]
    pub source: Option<WorldGrid>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum WorldGrid {
    Etopo1,
    Etopo5,
}

/// Build a cache for the selected source.
pub fn build_cache(
    cache_dir: Option<PathBuf>,
    cache_size: u64,
    args: &SourceArgs,
) -> Result<BlockCache> {
    match (&args.tiff, args.source) {
        (Some(tiff), _) => {
            let source = match &args.entry {
                Some(entry) => LocalGeoTiff::from_zip(tiff, entry),
                None => LocalGeoTiff::new(tiff),
            };
            build_with(cache_dir, cache_size, source)
        }
        (None, Some(grid)) => build_world(cache_dir, cache_size, grid),
        (None, None) => bail!("No elevation source. Use --tiff <file> or --source <grid>"),
    }
}

#[cfg(feature = "download")]
fn build_world(cache_dir: Option<PathBuf>, cache_size: u64, grid: WorldGrid) -> Result<BlockCache> {
    use geodem::{EtopoGrid, EtopoSource};

    let grid = match grid {
        WorldGrid::Etopo1 => EtopoGrid::Etopo1,
        WorldGrid::Etopo5 => EtopoGrid::Etopo5,
    };
    let source = EtopoSource::new(grid).context("Failed to create downloader")?;
    build_with(cache_dir, cache_size, source)
}

#[cfg(not(feature = "download"))]
fn build_world(
    _cache_dir: Option<PathBuf>,
    _cache_size: u64,
    grid: WorldGrid,
) -> Result<BlockCache> {
    bail!(
        "{:?} requires downloading; rebuild with the `download` feature",
        grid
    )
}

fn build_with<S: BlockSource + 'static>(
    cache_dir: Option<PathBuf>,
    cache_size: u64,
    source: S,
) -> Result<BlockCache> {
    let builder = match cache_dir {
        Some(dir) => BlockCacheBuilder::new(dir, source),
        None => BlockCacheBuilder::from_env(source).context(
            "GEODEM_CACHE_DIR environment variable not set. Use --cache-dir or set GEODEM_CACHE_DIR",
        )?,
    };

    let cache = builder
        .cache_size(cache_size)
        .build()
        .context("Failed to create block cache")?;

    tracing::info!(
        cache_dir = %cache.cache_dir().display(),
        cache_capacity = cache.cache_capacity(),
        "Block cache ready"
    );
    Ok(cache)
}

/// Read a GeoTIFF, either directly or from inside a zip archive.
pub fn read_geotiff(path: &std::path::Path, entry: Option<&str>) -> Result<Vec<u8>> {
    match entry {
        Some(entry) => geodem::archive::read_entry(path, entry)
            .with_context(|| format!("Failed to extract {} from {}", entry, path.display())),
        None => std::fs::read(path).with_context(|| format!("Failed to read {}", path.display())),
    }
}
