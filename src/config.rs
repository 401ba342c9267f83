//! Magpi configuration.
//!
//! Loaded from `~/.magpi/config.toml`. Every key is optional; a missing file
//! means all defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::model::Thresholds;

/// Queue size for each notification sink when not configured.
pub const DEFAULT_SINK_CAPACITY: usize = 256;

/// Magpi configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Where history and the catalog live. Defaults to `~/.magpi`.
    pub data_dir: Option<PathBuf>,

    /// Session identity defaults, used when not given on the command line.
    pub machine_id: String,
    pub company: String,
    pub supervisor_id: String,

    /// Bounded queue size for each sink.
    pub sink_capacity: usize,

    /// Thresholds used when neither the command line nor the catalog has any.
    pub default_headshot_threshold: f64,
    pub default_coilshot_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            machine_id: String::new(),
            company: String::new(),
            supervisor_id: String::new(),
            sink_capacity: DEFAULT_SINK_CAPACITY,
            default_headshot_threshold: 0.0,
            default_coilshot_threshold: 0.0,
        }
    }
}

impl Config {
    /// Load config from `~/.magpi/config.toml`.
    /// Returns defaults if the file is missing, an error if it is invalid.
    pub fn load() -> Result<Self, String> {
        let path = Self::path().ok_or("could not determine home directory")?;
        Self::load_from(&path)
    }

    /// Load config from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        toml::from_str(&contents).map_err(|e| format!("invalid config at {}: {e}", path.display()))
    }

    /// The config file path: `~/.magpi/config.toml`.
    pub fn path() -> Option<PathBuf> {
        Self::default_data_dir().map(|d| d.join("config.toml"))
    }

    /// The configured data directory, falling back to `~/.magpi`.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data_dir.clone().or_else(Self::default_data_dir)
    }

    pub fn default_thresholds(&self) -> Thresholds {
        Thresholds::new(
            self.default_headshot_threshold,
            self.default_coilshot_threshold,
        )
    }

    fn default_data_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".magpi"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.sink_capacity, DEFAULT_SINK_CAPACITY);
        assert_eq!(config.default_thresholds(), Thresholds::default());
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "machine-id = \"MPI-3\"\ndefault-headshot-threshold = 4.5\ndata-dir = \"/srv/magpi\"\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.machine_id, "MPI-3");
        assert_eq!(config.default_thresholds(), Thresholds::new(4.5, 0.0));
        assert_eq!(config.data_dir(), Some(PathBuf::from("/srv/magpi")));
        assert_eq!(config.sink_capacity, DEFAULT_SINK_CAPACITY);
    }

    #[test]
    fn invalid_file_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "sink-capacity = \"lots\"\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.contains("invalid config at"));
        assert!(err.contains("config.toml"));
    }
}
