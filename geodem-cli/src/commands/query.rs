use anyhow::{Context, Result};
use geodem::BlockSource;
use serde::Serialize;
use std::path::PathBuf;

use super::{build_cache, SourceArgs};

#[derive(Serialize)]
struct ElevationResponse<'a> {
    lng: f64,
    lat: f64,
    elevation: i32,
    source: &'a str,
}

pub fn run(
    cache_dir: Option<PathBuf>,
    cache_size: u64,
    source: &SourceArgs,
    lng: f64,
    lat: f64,
    json: bool,
) -> Result<()> {
    let cache = build_cache(cache_dir, cache_size, source)?;

    let elevation = cache
        .get_elevation(lng, lat)
        .context("Failed to get elevation")?;

    if json {
        let response = ElevationResponse {
            lng,
            lat,
            elevation,
            source: cache.source().name(),
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("{}", elevation);
    }

    Ok(())
}
