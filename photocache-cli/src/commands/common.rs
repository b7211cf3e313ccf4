//! Helpers shared across CLI commands.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use photocache::config::ConfigFile;
use photocache::geo::{BoundingBox, Grid};
use photocache::photo::{read_photos, CachedPhoto};

use crate::error::CliError;

/// Read a JSON photo file.
pub fn load_photos(path: &Path) -> Result<Vec<CachedPhoto>, CliError> {
    let file = File::open(path).map_err(|e| CliError::PhotoFile {
        path: path.to_path_buf(),
        source: e.into(),
    })?;
    read_photos(BufReader::new(file)).map_err(|source| CliError::PhotoFile {
        path: path.to_path_buf(),
        source,
    })
}

/// Photos that fall inside `bbox`.
pub fn within(photos: Vec<CachedPhoto>, bbox: &BoundingBox) -> Vec<CachedPhoto> {
    photos.into_iter().filter(|p| p.is_within(bbox)).collect()
}

/// Grid from the CLI flag, falling back to `[cache] grid_size`.
pub fn resolve_grid(cli_size: Option<u16>, config: &ConfigFile) -> Result<Grid, CliError> {
    let size = cli_size.unwrap_or(config.cache.grid_size);
    Grid::new(size).map_err(|e| CliError::InvalidArgument(e.to_string()))
}
