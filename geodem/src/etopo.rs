//! ETOPO1 / ETOPO5 global relief grids.
//!
//! Each is a single world-wide block. The first miss downloads the zipped
//! GeoTIFF, converts it to a cache record and removes the archive.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::archive;
use crate::block::RasterBlock;
use crate::codec;
use crate::download::{DownloadConfig, Downloader};
use crate::error::Result;
use crate::projection::AffineProjection;
use crate::source::{BlockSource, WHOLE_BLOCK_ID};

const ETOPO1_URL: &str = "https://www.ngdc.noaa.gov/mgg/global/relief/ETOPO1/data/bedrock/cell_registered/georeferenced_tiff/ETOPO1_Bed_c_geotiff.zip";
const ETOPO5_URL: &str = "https://www.eea.europa.eu/data-and-maps/data/world-digital-elevation-model-etopo5/zipped-dem-geotiff-raster-geographic-tag-image-file-format-raster-data/zipped-dem-geotiff-raster-geographic-tag-image-file-format-raster-data/at_download/file";

/// Which ETOPO grid to serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtopoGrid {
    /// 1 arc-minute bedrock relief, NOAA.
    Etopo1,
    /// 5 arc-minute relief, EEA mirror.
    Etopo5,
}

impl EtopoGrid {
    pub fn name(&self) -> &'static str {
        match self {
            EtopoGrid::Etopo1 => "ETOPO1",
            EtopoGrid::Etopo5 => "ETOPO5",
        }
    }

    pub fn url(&self) -> &'static str {
        match self {
            EtopoGrid::Etopo1 => ETOPO1_URL,
            EtopoGrid::Etopo5 => ETOPO5_URL,
        }
    }

    /// GeoTIFF entry inside the downloaded archive.
    pub fn entry(&self) -> &'static str {
        match self {
            EtopoGrid::Etopo1 => "ETOPO1_Bed_c_geotiff.tif",
            EtopoGrid::Etopo5 => "alwdgg.tif",
        }
    }

    /// Cell-registered world grid at `cells` pixels per degree.
    ///
    /// The embedded georeferencing of both files is unreliable, so it is
    /// replaced by this.
    pub fn projection(&self) -> AffineProjection {
        let cells = match self {
            EtopoGrid::Etopo1 => 60.0,
            EtopoGrid::Etopo5 => 12.0,
        };
        AffineProjection::new(180.0 * cells, 90.0 * cells, cells, -cells)
    }

    fn archive_name(&self) -> String {
        format!("{}.zip", self.name().to_lowercase())
    }
}

/// Downloading [`BlockSource`] for an ETOPO grid.
#[derive(Debug, Clone)]
pub struct EtopoSource {
    grid: EtopoGrid,
    downloader: Downloader,
    download_dir: Option<PathBuf>,
}

impl EtopoSource {
    pub fn new(grid: EtopoGrid) -> Result<Self> {
        Self::with_config(grid, DownloadConfig::default())
    }

    pub fn with_config(grid: EtopoGrid, config: DownloadConfig) -> Result<Self> {
        Ok(Self {
            grid,
            downloader: Downloader::new(config)?,
            download_dir: None,
        })
    }

    /// Put the temporary archive in `dir` instead of next to the record.
    pub fn download_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn grid(&self) -> EtopoGrid {
        self.grid
    }

    fn archive_path(&self, record: &Path) -> PathBuf {
        let dir = match &self.download_dir {
            Some(dir) => dir.as_path(),
            None => record.parent().unwrap_or_else(|| Path::new(".")),
        };
        dir.join(self.grid.archive_name())
    }

    /// Decode the GeoTIFF from an already downloaded archive.
    pub fn read_archive(&self, archive_path: &Path) -> Result<RasterBlock> {
        let data = archive::read_entry(archive_path, self.grid.entry())?;
        Ok(RasterBlock::from_geotiff(&data)?.with_projection(self.grid.projection()))
    }
}

impl BlockSource for EtopoSource {
    fn name(&self) -> &str {
        self.grid.name()
    }

    fn block_id(&self, _lng: f64, _lat: f64) -> String {
        WHOLE_BLOCK_ID.to_string()
    }

    fn generate(&self, block_id: &str, _lng: f64, _lat: f64, path: &Path) -> Result<()> {
        let archive_path = self.archive_path(path);

        if archive_path.exists() {
            info!(archive = %archive_path.display(), "Reusing downloaded archive");
        } else {
            info!(grid = self.grid.name(), url = self.grid.url(), "Downloading");
            self.downloader.download(self.grid.url(), &archive_path)?;
        }

        let block = self.read_archive(&archive_path)?;
        codec::save(&block, path)?;
        info!(
            grid = self.grid.name(),
            block_id,
            width = block.width(),
            height = block.height(),
            "Block generated"
        );

        if let Err(e) = fs::remove_file(&archive_path) {
            warn!(archive = %archive_path.display(), error = %e, "Failed to remove archive");
        }
        Ok(())
    }
}
