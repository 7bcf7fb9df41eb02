use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::SourceArgs;

/// GeoTIFF elevation lookup tool
#[derive(Parser)]
#[command(name = "geodem")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding cache records
    #[arg(short = 'd', long, env = "GEODEM_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Maximum blocks kept in memory (0 = unbounded)
    #[arg(
        short,
        long,
        env = "GEODEM_CACHE_SIZE",
        default_value = "0",
        global = true
    )]
    cache_size: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query elevation for a single coordinate
    Query {
        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,

        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[command(flatten)]
        source: SourceArgs,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Add an elevation column to a CSV file
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Output file (defaults to <input>_elevation.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column name for longitude
        #[arg(long, default_value = "lng")]
        lng_col: String,

        /// Column name for latitude
        #[arg(long, default_value = "lat")]
        lat_col: String,

        #[command(flatten)]
        source: SourceArgs,
    },

    /// Convert a GeoTIFF to a cache record
    Convert {
        /// Input GeoTIFF, or zip archive with --entry
        input: PathBuf,

        /// Output cache record
        output: PathBuf,

        /// GeoTIFF file name inside a zip archive
        #[arg(long)]
        entry: Option<String>,
    },

    /// Display information about a GeoTIFF or cache record
    Info {
        /// Path to a .tif file or .blk cache record
        file: PathBuf,

        /// GeoTIFF file name inside a zip archive
        #[arg(long)]
        entry: Option<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geodem=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Query {
            lng,
            lat,
            source,
            json,
        } => commands::query::run(cli.cache_dir, cli.cache_size, &source, lng, lat, json),
        Commands::Batch {
            input,
            output,
            lng_col,
            lat_col,
            source,
        } => commands::batch::run(
            cli.cache_dir,
            cli.cache_size,
            &source,
            input,
            output,
            lng_col,
            lat_col,
        ),
        Commands::Convert {
            input,
            output,
            entry,
        } => commands::convert::run(input, output, entry),
        Commands::Info { file, entry } => commands::info::run(file, entry),
    }
}
