//! Score command - distribution score of a photo file for a bounding box.

use std::path::PathBuf;

use clap::Args;
use photocache::config::ConfigFile;
use photocache::distribution;
use photocache::geo::BoundingBox;

use super::common::{load_photos, resolve_grid, within};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ScoreArgs {
    /// Query box as min_lon,min_lat,max_lon,max_lat
    #[arg(long, allow_hyphen_values = true)]
    pub bbox: BoundingBox,

    /// JSON photo file
    #[arg(long)]
    pub photos: PathBuf,

    /// Cells per axis (defaults to [cache] grid_size)
    #[arg(long)]
    pub grid_size: Option<u16>,
}

/// Run the score command.
pub fn run(args: ScoreArgs, config: &ConfigFile) -> Result<(), CliError> {
    let grid = resolve_grid(args.grid_size, config)?;
    let loaded = load_photos(&args.photos)?;
    let total = loaded.len();
    let photos = within(loaded, &args.bbox);

    let counts = distribution::cell_counts(&photos, &args.bbox, grid);
    let score = distribution::score(&photos, &args.bbox, grid);
    let busiest = counts.values().copied().max().unwrap_or(0);

    println!("Bounding box:   {}", args.bbox);
    println!("Photos:         {} inside ({} in file)", photos.len(), total);
    println!(
        "Occupied cells: {}/{} (grid {}x{})",
        counts.len(),
        grid.total_cells(),
        grid.size(),
        grid.size()
    );
    println!("Busiest cell:   {} photos", busiest);
    println!("Score:          {:.4}", score);

    Ok(())
}
