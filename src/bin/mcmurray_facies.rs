//! Fetch the McMurray facies dataset and show what was loaded
//!
//! Usage:
//!   cargo run --bin mcmurray_facies -- [options]
//!
//! Prints the table shape, columns, and leading rows, or the extracted
//! archive members with `--path-only`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use rockhound::data::{
    default_cache_dir, HttpDownloader, Registry, DEFAULT_BASE_URL, MCMURRAY_FACIES_ARCHIVE,
};
use rockhound::datasets::{Dataset, McMurrayLoader};

#[derive(Parser)]
#[command(
    name = "mcmurray_facies",
    about = "Fetch, cache, and load the McMurray/Wabiskaw well-log facies dataset"
)]
struct Cli {
    /// Cache directory (defaults to $ROCKHOUND_DATA_DIR or ~/.cache/rockhound)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Base URL the archive is downloaded from
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Registry file pinning digests or mirror URLs (`<name> <hash> [<url>]`)
    #[arg(long)]
    registry: Option<PathBuf>,

    /// Rename columns to their spelled-out forms (e.g. `GR=Gamma Ray`)
    #[arg(long)]
    spelled_out: bool,

    /// Only fetch and extract; print the extracted paths
    #[arg(long)]
    path_only: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout: u64,

    /// Number of rows to print
    #[arg(long, default_value_t = 5)]
    rows: usize,

    /// Print a JSON summary instead of text
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Summary {
    rows: usize,
    columns: Vec<String>,
}

fn build_registry(cli: &Cli) -> rockhound::Result<Registry> {
    let cache_dir = cli.cache_dir.clone().unwrap_or_else(default_cache_dir);
    let downloader = HttpDownloader::new().with_timeout(Duration::from_secs(cli.timeout));
    let mut registry =
        Registry::new(cache_dir, &cli.base_url).with_downloader(Box::new(downloader));
    registry.register(MCMURRAY_FACIES_ARCHIVE, None);
    log::debug!("Using cache directory {}", registry.cache_dir().display());

    if let Some(path) = &cli.registry {
        let loaded = registry.load_registry_file(path)?;
        log::info!("Loaded {} registry entries from {}", loaded, path.display());
    }
    Ok(registry)
}

fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let registry = build_registry(cli)?;
    let dataset = McMurrayLoader::new()
        .abbreviations_only(!cli.spelled_out)
        .load(!cli.path_only)
        .fetch(&registry)?;

    match dataset {
        Dataset::Table(df) => {
            let columns: Vec<String> = df
                .get_column_names()
                .iter()
                .map(|s| s.to_string())
                .collect();
            if cli.json {
                let summary = Summary {
                    rows: df.height(),
                    columns,
                };
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("McMurray facies: {} rows x {} columns", df.height(), df.width());
                for (i, name) in columns.iter().enumerate() {
                    println!("  {:>2}. {}", i, name);
                }
                println!("{}", df.head(Some(cli.rows)));
            }
            Ok(true)
        }
        Dataset::Path(path) => {
            print_paths(&[path], cli.json)?;
            Ok(true)
        }
        Dataset::PathList(paths) => {
            print_paths(&paths, cli.json)?;
            Ok(true)
        }
        Dataset::LoadError(message) => {
            eprintln!("Failed to load table: {}", message);
            Ok(false)
        }
    }
}

fn print_paths(paths: &[PathBuf], json: bool) -> serde_json::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(paths)?);
    } else {
        for path in paths {
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
