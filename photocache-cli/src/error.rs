//! CLI error type.

use std::path::PathBuf;
use std::process::ExitCode;

use photocache::config::ConfigError;
use photocache::logging::LoggingError;
use photocache::photo::PhotoFileError;
use photocache::sampling::SampleError;
use photocache::ResolveError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to read photos from {}: {source}", path.display())]
    PhotoFile {
        path: PathBuf,
        #[source]
        source: PhotoFileError,
    },

    #[error("Failed to write photos: {0}")]
    Output(#[source] PhotoFileError),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Failed to start async runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl CliError {
    /// Usage problems exit with 2, everything else with 1.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Config(_) | CliError::InvalidArgument(_) | CliError::Sample(_) => {
                ExitCode::from(2)
            }
            CliError::Resolve(ResolveError::InvalidArgument(_)) => ExitCode::from(2),
            _ => ExitCode::FAILURE,
        }
    }
}
