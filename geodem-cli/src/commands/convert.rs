use anyhow::{Context, Result};
use geodem::{codec, RasterBlock};
use std::path::PathBuf;

use super::read_geotiff;

pub fn run(input: PathBuf, output: PathBuf, entry: Option<String>) -> Result<()> {
    let data = read_geotiff(&input, entry.as_deref())?;
    let block = RasterBlock::from_geotiff(&data)
        .with_context(|| format!("Failed to decode {}", input.display()))?;

    codec::save(&block, &output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let size = std::fs::metadata(&output)?.len();
    println!(
        "{}x{} {:?} samples written to {} ({})",
        block.width(),
        block.height(),
        block.element_type(),
        output.display(),
        super::info::format_size(size)
    );
    Ok(())
}
