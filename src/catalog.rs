//! Catalog: operators, part descriptions, and per-description thresholds.
//!
//! The catalog is handed to whoever needs it; there is no process-wide
//! instance. [`FileCatalog`] keeps everything in one JSON file:
//!
//! ```text
//! <data-dir>/catalog.json
//! ```

use std::{
    collections::{BTreeMap, BTreeSet},
    fs, io,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::model::Thresholds;

/// Errors that can occur while reading or writing the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, CatalogError>;

/// Read/write access to the lists operators pick from.
pub trait Catalog {
    /// Known operators, sorted.
    fn operators(&self) -> Vec<String>;

    fn add_operator(&mut self, operator: &str) -> Result<()>;

    /// Known part descriptions, sorted.
    fn part_descriptions(&self) -> Vec<String>;

    fn add_part_description(&mut self, description: &str) -> Result<()>;

    /// Current thresholds saved for a part description.
    fn part_parameters(&self, description: &str) -> Option<Thresholds>;

    /// Saves thresholds for a description and appends them to its history.
    fn save_part_parameters(&mut self, description: &str, thresholds: Thresholds) -> Result<()>;

    /// Every threshold pair ever saved for a description, oldest first.
    fn parameter_history(&self, description: &str) -> Vec<Thresholds>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Contents {
    operators: BTreeSet<String>,
    part_descriptions: BTreeSet<String>,
    parameters: BTreeMap<String, Thresholds>,
    parameter_history: BTreeMap<String, Vec<Thresholds>>,
}

/// A catalog persisted to a JSON file. Every mutation rewrites the file.
pub struct FileCatalog {
    path: PathBuf,
    contents: Contents,
}

impl FileCatalog {
    /// Opens the catalog at the given path. A missing file is an empty catalog.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let contents = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Contents::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, contents })
    }

    /// The catalog file inside a data directory.
    pub fn default_path(data_dir: &Path) -> PathBuf {
        data_dir.join("catalog.json")
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.contents)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl Catalog for FileCatalog {
    fn operators(&self) -> Vec<String> {
        self.contents.operators.iter().cloned().collect()
    }

    fn add_operator(&mut self, operator: &str) -> Result<()> {
        let operator = operator.trim();
        if operator.is_empty() || !self.contents.operators.insert(operator.to_string()) {
            return Ok(());
        }
        self.save()
    }

    fn part_descriptions(&self) -> Vec<String> {
        self.contents.part_descriptions.iter().cloned().collect()
    }

    fn add_part_description(&mut self, description: &str) -> Result<()> {
        let description = description.trim();
        if description.is_empty()
            || !self
                .contents
                .part_descriptions
                .insert(description.to_string())
        {
            return Ok(());
        }
        self.save()
    }

    fn part_parameters(&self, description: &str) -> Option<Thresholds> {
        self.contents.parameters.get(description).copied()
    }

    fn save_part_parameters(&mut self, description: &str, thresholds: Thresholds) -> Result<()> {
        self.contents
            .parameters
            .insert(description.to_string(), thresholds);
        self.contents
            .parameter_history
            .entry(description.to_string())
            .or_default()
            .push(thresholds);
        self.save()
    }

    fn parameter_history(&self, description: &str) -> Vec<Thresholds> {
        self.contents
            .parameter_history
            .get(description)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn test_catalog() -> (TempDir, FileCatalog) {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::open(FileCatalog::default_path(dir.path())).unwrap();
        (dir, catalog)
    }

    #[test]
    fn empty_when_no_file() {
        let (_dir, catalog) = test_catalog();
        assert!(catalog.operators().is_empty());
        assert!(catalog.part_descriptions().is_empty());
        assert_eq!(catalog.part_parameters("Axle"), None);
        assert!(catalog.parameter_history("Axle").is_empty());
    }

    #[test]
    fn operators_are_deduplicated_and_sorted() {
        let (_dir, mut catalog) = test_catalog();
        catalog.add_operator("Sam").unwrap();
        catalog.add_operator("Dana").unwrap();
        catalog.add_operator(" Sam ").unwrap();
        catalog.add_operator("").unwrap();

        assert_eq!(catalog.operators(), vec!["Dana", "Sam"]);
    }

    #[test]
    fn parameters_update_current_and_history() {
        let (_dir, mut catalog) = test_catalog();
        catalog
            .save_part_parameters("Axle", Thresholds::new(5.0, 3.0))
            .unwrap();
        catalog
            .save_part_parameters("Axle", Thresholds::new(5.5, 3.0))
            .unwrap();

        assert_eq!(
            catalog.part_parameters("Axle"),
            Some(Thresholds::new(5.5, 3.0))
        );
        assert_eq!(
            catalog.parameter_history("Axle"),
            vec![Thresholds::new(5.0, 3.0), Thresholds::new(5.5, 3.0)]
        );
    }

    #[test]
    fn reopening_reads_saved_contents() {
        let (dir, mut catalog) = test_catalog();
        catalog.add_operator("Dana").unwrap();
        catalog.add_part_description("Crankshaft").unwrap();
        catalog
            .save_part_parameters("Crankshaft", Thresholds::new(4.0, 2.0))
            .unwrap();
        drop(catalog);

        let reopened = FileCatalog::open(FileCatalog::default_path(dir.path())).unwrap();
        assert_eq!(reopened.operators(), vec!["Dana"]);
        assert_eq!(reopened.part_descriptions(), vec!["Crankshaft"]);
        assert_eq!(
            reopened.part_parameters("Crankshaft"),
            Some(Thresholds::new(4.0, 2.0))
        );
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "{ not json").unwrap();

        let err = FileCatalog::open(&path).err().unwrap();
        assert!(matches!(err, CatalogError::Json(_)));
    }
}
