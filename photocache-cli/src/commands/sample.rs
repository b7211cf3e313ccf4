//! Sample command - pick a spatially even subset of a photo file.
//!
//! The selected photos are written as JSON to `--output` or stdout; the
//! summary goes to stderr so stdout stays machine-readable.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Args;
use photocache::config::ConfigFile;
use photocache::geo::BoundingBox;
use photocache::photo::write_photos;
use photocache::sampling::SpatialSampler;

use super::common::{load_photos, resolve_grid, within};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct SampleArgs {
    /// Query box as min_lon,min_lat,max_lon,max_lat
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: BoundingBox,

    /// JSON photo file
    #[arg(long)]
    pub photos: PathBuf,

    /// Number of photos to select
    #[arg(long)]
    pub count: usize,

    /// Cells per axis (defaults to [cache] grid_size)
    #[arg(long)]
    pub grid_size: Option<u16>,

    /// Seed for a reproducible cell order
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the sample here instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Run the sample command.
pub fn run(args: SampleArgs, config: &ConfigFile) -> Result<(), CliError> {
    let grid = resolve_grid(args.grid_size, config)?;
    let photos = within(load_photos(&args.photos)?, &args.bbox);

    let mut sampler = SpatialSampler::new(grid);
    if let Some(seed) = args.seed {
        sampler = sampler.with_seed(seed);
    }
    let result = sampler.sample(&photos, &args.bbox, args.count)?;

    match &args.output {
        Some(path) => {
            let file = File::create(path).map_err(|e| CliError::Output(e.into()))?;
            write_photos(BufWriter::new(file), &result.photos).map_err(CliError::Output)?;
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            write_photos(&mut out, &result.photos).map_err(CliError::Output)?;
            writeln!(out).map_err(|e| CliError::Output(e.into()))?;
        }
    }

    eprintln!(
        "Sampled {} of {} photos, score {:.4}",
        result.photos.len(),
        photos.len(),
        result.distribution_score
    );
    Ok(())
}
