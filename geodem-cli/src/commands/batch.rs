use anyhow::{Context, Result};
use geodem::BlockCache;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{build_cache, SourceArgs};

/// Records per batch lookup.
const CHUNK_SIZE: usize = 4096;

pub fn run(
    cache_dir: Option<PathBuf>,
    cache_size: u64,
    source: &SourceArgs,
    input: PathBuf,
    output: Option<PathBuf>,
    lng_col: String,
    lat_col: String,
) -> Result<()> {
    let cache = build_cache(cache_dir, cache_size, source)?;

    let output_path = output.unwrap_or_else(|| default_output(&input));
    let rows = process_csv(&cache, &input, &output_path, &lng_col, &lat_col)?;

    println!("{} rows written to: {}", rows, output_path.display());
    Ok(())
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_elevation.csv", stem))
}

fn process_csv(
    cache: &BlockCache,
    input: &Path,
    output: &Path,
    lng_col: &str,
    lat_col: &str,
) -> Result<u64> {
    let file = File::open(input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    // Find column indices
    let headers = reader.headers()?.clone();
    let lng_idx = headers
        .iter()
        .position(|h| h == lng_col)
        .with_context(|| format!("Column '{}' not found in CSV", lng_col))?;
    let lat_idx = headers
        .iter()
        .position(|h| h == lat_col)
        .with_context(|| format!("Column '{}' not found in CSV", lat_col))?;

    // Collect records for progress bar
    let records: Vec<_> = reader.records().collect::<Result<_, _>>()?;
    let total = records.len() as u64;

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let output_file = File::create(output).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.push("elevation");
    writer.write_record(&new_headers)?;

    for (chunk_idx, chunk) in records.chunks(CHUNK_SIZE).enumerate() {
        let mut coords = Vec::with_capacity(chunk.len());
        for (i, record) in chunk.iter().enumerate() {
            let line = chunk_idx * CHUNK_SIZE + i + 2;
            let lng: f64 = record
                .get(lng_idx)
                .context("Missing longitude")?
                .trim()
                .parse()
                .with_context(|| format!("Invalid longitude on line {}", line))?;
            let lat: f64 = record
                .get(lat_idx)
                .context("Missing latitude")?
                .trim()
                .parse()
                .with_context(|| format!("Invalid latitude on line {}", line))?;
            coords.push((lng, lat));
        }

        // Blocks that fail to load leave the cell empty
        let elevations = cache.get_elevations_batch(&coords, i32::MIN);

        for (record, elevation) in chunk.iter().zip(elevations) {
            let elevation = if elevation == i32::MIN {
                String::new()
            } else {
                elevation.to_string()
            };
            let mut new_record: Vec<&str> = record.iter().collect();
            new_record.push(&elevation);
            writer.write_record(&new_record)?;
        }

        pb.inc(chunk.len() as u64);
    }

    pb.finish_with_message("done");
    writer.flush()?;

    Ok(total)
}
