//! Configuration file loading.
//!
//! Settings live in an INI file, by default `~/.photocache/config.ini`:
//!
//! ```ini
//! [cache]
//! enabled = true
//! grid_size = 10
//! distribution_threshold = 0.9
//! region_cell_degrees = 0.01
//! max_regions = 100000
//! region_ttl_secs = 86400
//!
//! [logging]
//! level = info
//! file = /var/log/photocache.log
//! ```
//!
//! Missing keys fall back to defaults; a malformed value is an error naming
//! the key. The `ENABLE_CACHE` environment variable overrides
//! `[cache] enabled`, but only when [`ConfigFile::apply_env`] is called.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

use crate::coverage::DEFAULT_REGION_CELL_DEGREES;
use crate::engine::{EngineConfig, DEFAULT_DISTRIBUTION_THRESHOLD};
use crate::geo::DEFAULT_GRID_SIZE;
use crate::logging::LoggingConfig;
use crate::store::DEFAULT_MAX_REGIONS;

/// Environment variable that switches the cache on or off.
pub const ENABLE_CACHE_ENV: &str = "ENABLE_CACHE";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Read { path: PathBuf, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for [{section}] {key}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
    },
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub grid_size: u16,
    pub distribution_threshold: f64,
    pub region_cell_degrees: f64,
    pub max_regions: u64,
    pub region_ttl: Option<Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            grid_size: DEFAULT_GRID_SIZE,
            distribution_threshold: DEFAULT_DISTRIBUTION_THRESHOLD,
            region_cell_degrees: DEFAULT_REGION_CELL_DEGREES,
            max_regions: DEFAULT_MAX_REGIONS,
            region_ttl: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub cache: CacheSettings,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Default config path, `~/.photocache/config.ini`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".photocache").join("config.ini"))
    }

    /// Load from the default path; a missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("cache")) {
            let cache = &mut config.cache;
            if let Some(v) = section.get("enabled") {
                cache.enabled = parse_bool(v).ok_or_else(|| invalid("cache", "enabled", v))?;
            }
            cache.grid_size = parse_key(section, "cache", "grid_size", cache.grid_size)?;
            cache.distribution_threshold = parse_key(
                section,
                "cache",
                "distribution_threshold",
                cache.distribution_threshold,
            )?;
            cache.region_cell_degrees = parse_key(
                section,
                "cache",
                "region_cell_degrees",
                cache.region_cell_degrees,
            )?;
            cache.max_regions = parse_key(section, "cache", "max_regions", cache.max_regions)?;
            if section.contains_key("region_ttl_secs") {
                let secs: u64 = parse_key(section, "cache", "region_ttl_secs", 0)?;
                cache.region_ttl = (secs > 0).then(|| Duration::from_secs(secs));
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(level) = section.get("level") {
                config.logging.level = level.trim().to_string();
            }
            if let Some(file) = section.get("file") {
                let file = file.trim();
                config.logging.file = (!file.is_empty()).then(|| PathBuf::from(file));
            }
        }

        Ok(config)
    }

    /// Apply `ENABLE_CACHE` from the process environment, if set.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        match std::env::var(ENABLE_CACHE_ENV) {
            Ok(value) => self.apply_enable_cache(&value),
            Err(_) => Ok(()),
        }
    }

    /// Apply an `ENABLE_CACHE` value.
    pub fn apply_enable_cache(&mut self, value: &str) -> Result<(), ConfigError> {
        self.cache.enabled = parse_bool(value).ok_or_else(|| ConfigError::InvalidValue {
            section: "env",
            key: ENABLE_CACHE_ENV,
            value: value.to_string(),
        })?;
        Ok(())
    }

    /// Engine settings derived from the `[cache]` section.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cache_enabled: self.cache.enabled,
            grid_size: self.cache.grid_size,
            distribution_threshold: self.cache.distribution_threshold,
            region_cell_degrees: self.cache.region_cell_degrees,
            sampler_seed: None,
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_key<T: FromStr>(
    section: &Properties,
    section_name: &'static str,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match section.get(key) {
        Some(v) => v.trim().parse().map_err(|_| invalid(section_name, key, v)),
        None => Ok(default),
    }
}

fn invalid(section: &'static str, key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert!(config.cache.enabled);
        assert_eq!(config.cache.grid_size, 10);
        assert_eq!(config.cache.distribution_threshold, 0.9);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.engine_config(), EngineConfig::default());
    }

    #[test]
    fn test_parse_full_file() {
        let config = ConfigFile::parse(
            "[cache]\n\
             enabled = false\n\
             grid_size = 16\n\
             distribution_threshold = 0.85\n\
             region_cell_degrees = 0.05\n\
             max_regions = 500\n\
             region_ttl_secs = 3600\n\
             [logging]\n\
             level = debug\n\
             file = /tmp/photocache.log\n",
        )
        .unwrap();

        assert!(!config.cache.enabled);
        assert_eq!(config.cache.grid_size, 16);
        assert_eq!(config.cache.distribution_threshold, 0.85);
        assert_eq!(config.cache.region_cell_degrees, 0.05);
        assert_eq!(config.cache.max_regions, 500);
        assert_eq!(config.cache.region_ttl, Some(Duration::from_secs(3600)));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/photocache.log")));

        let engine = config.engine_config();
        assert!(!engine.cache_enabled);
        assert_eq!(engine.grid_size, 16);
    }

    #[test]
    fn test_missing_keys_keep_defaults() {
        let config = ConfigFile::parse("[cache]\ngrid_size = 12\n").unwrap();
        assert_eq!(config.cache.grid_size, 12);
        assert!(config.cache.enabled);
        assert_eq!(config.cache.region_ttl, None);
    }

    #[test]
    fn test_invalid_value_names_key() {
        let err = ConfigFile::parse("[cache]\ngrid_size = lots\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "grid_size",
                ..
            }
        ));
        assert!(err.to_string().contains("grid_size"));
    }

    #[test]
    fn test_enable_cache_override() {
        let mut config = ConfigFile::default();
        config.apply_enable_cache("FALSE").unwrap();
        assert!(!config.cache.enabled);
        config.apply_enable_cache("yes").unwrap();
        assert!(config.cache.enabled);
        assert!(config.apply_enable_cache("maybe").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[cache]\nenabled = no\n").unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
