//! Basic example demonstrating geodem library usage.
//!
//! Run with: cargo run --example basic -- /path/to/dem.tif /path/to/cache

use geodem::{BlockCache, DemError, LocalGeoTiff};
use std::env;

fn main() -> Result<(), DemError> {
    let mut args = env::args().skip(1);
    let (tiff, cache_dir) = match (args.next(), args.next()) {
        (Some(tiff), Some(cache_dir)) => (tiff, cache_dir),
        _ => {
            eprintln!("Usage: cargo run --example basic -- /path/to/dem.tif /path/to/cache");
            std::process::exit(1);
        }
    };

    // First query converts the GeoTIFF into a cache record
    let cache = BlockCache::new(&cache_dir, LocalGeoTiff::new(&tiff))?;

    let locations = [
        ("Mount Fuji, Japan", 138.7274, 35.3606),
        ("Mount Everest, Nepal", 86.9250, 27.9881),
        ("Denali, Alaska", -151.0074, 63.0695),
        ("Dead Sea shore", 35.5, 31.5),
    ];

    println!("{:<25} {:>10}", "Location", "Elevation");
    println!("{:-<36}", "");

    for (name, lng, lat) in &locations {
        match cache.get_elevation(*lng, *lat) {
            Ok(elevation) => println!("{:<25} {:>9}m", name, elevation),
            Err(e) => println!("{:<25} error: {}", name, e),
        }
    }

    let stats = cache.cache_stats();
    println!();
    println!(
        "Cache: {} blocks, {} hits, {} misses ({:.1}% hit rate)",
        stats.entry_count,
        stats.hit_count,
        stats.miss_count,
        stats.hit_rate() * 100.0
    );
    println!("Records in: {}", cache.cache_dir().display());

    Ok(())
}
