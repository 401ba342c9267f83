//! Journal: every event appended as one line of JSONL.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::warn;

use super::{ChangeEvent, ChangeSink};

/// Append-only event log on disk.
pub struct Journal {
    path: PathBuf,
    file: fs::File,
}

impl Journal {
    /// Opens the journal for appending, creating the file if needed.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&mut self, event: &ChangeEvent) -> io::Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())
    }
}

impl ChangeSink for Journal {
    fn notify(&mut self, event: &ChangeEvent) {
        if let Err(e) = self.append(event) {
            warn!("journal {} write failed: {e}", self.path.display());
        }
    }
}
