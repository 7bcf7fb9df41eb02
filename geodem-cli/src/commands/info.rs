use anyhow::{bail, Context, Result};
use geodem::tags::{read_directory, tag_name, TagValue};
use geodem::{codec, RasterBlock, TagTable};
use std::path::PathBuf;

use super::read_geotiff;

/// Values shown per array tag before eliding.
const MAX_VALUES: usize = 8;

pub fn run(file: PathBuf, entry: Option<String>) -> Result<()> {
    if !file.exists() {
        bail!("File not found: {}", file.display());
    }

    let is_record = file
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(geodem::cache::RECORD_EXTENSION));

    let file_size = std::fs::metadata(&file)?.len();
    println!("File: {}", file.display());
    println!("File size: {}", format_size(file_size));
    println!();

    let block = if is_record {
        codec::load(&file).context("Failed to load cache record")?
    } else {
        let data = read_geotiff(&file, entry.as_deref())?;
        print_tags(&data)?;
        println!();
        let tags = TagTable::parse(&data)?;
        RasterBlock::from_tag_table(&data, &tags).context("Failed to decode GeoTIFF")?
    };

    print_block(&block);
    Ok(())
}

fn print_tags(data: &[u8]) -> Result<()> {
    let tags = read_directory(data).context("Failed to read TIFF directory")?;

    println!("Tags:");
    for tag in &tags {
        println!(
            "  {:>5} {:<26} {:<9} {:>6}  {}",
            tag.tag,
            tag_name(tag.tag).unwrap_or("?"),
            tag.field_type.name(),
            tag.count,
            format_value(&tag.value)
        );
    }
    Ok(())
}

fn format_value(value: &TagValue) -> String {
    fn list<T: ToString>(values: &[T]) -> String {
        let shown: Vec<String> = values.iter().take(MAX_VALUES).map(T::to_string).collect();
        if values.len() > MAX_VALUES {
            format!("[{}, ... ({} more)]", shown.join(", "), values.len() - MAX_VALUES)
        } else {
            format!("[{}]", shown.join(", "))
        }
    }

    match value {
        TagValue::Integer(v) => v.to_string(),
        TagValue::Float(v) => v.to_string(),
        TagValue::Integers(v) => list(v),
        TagValue::Floats(v) => list(v),
        TagValue::Text(s) => format!("{:?}", s),
    }
}

fn print_block(block: &RasterBlock) {
    let projection = block.projection();
    println!(
        "Raster: {}x{} samples ({:?})",
        block.width(),
        block.height(),
        block.element_type()
    );
    println!(
        "Projection: x = lng * {} + {}, y = lat * {} + {}",
        projection.xs, projection.x0, projection.ys, projection.y0
    );

    // Geographic extent of the grid edges
    let west = -projection.x0 / projection.xs;
    let east = (block.width() as f64 - projection.x0) / projection.xs;
    let north = -projection.y0 / projection.ys;
    let south = (block.height() as f64 - projection.y0) / projection.ys;
    println!(
        "Coverage: lng {:.4}..{:.4}, lat {:.4}..{:.4}",
        west.min(east),
        west.max(east),
        north.min(south),
        north.max(south)
    );

    if let Some((min, max)) = block.min_max() {
        println!("Min elevation: {}m", min);
        println!("Max elevation: {}m", max);
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn test_format_value_elides_long_arrays() {
        assert_eq!(format_value(&TagValue::Integer(16)), "16");
        assert_eq!(format_value(&TagValue::Floats(vec![1.0, 0.5])), "[1, 0.5]");
        assert_eq!(
            format_value(&TagValue::Integers((0..10).collect())),
            "[0, 1, 2, 3, 4, 5, 6, 7, ... (2 more)]"
        );
    }
}
