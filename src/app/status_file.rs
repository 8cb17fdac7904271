//! Status file for external monitoring.
//!
//! Holds the latest [`Report`] as pretty JSON. External tools poll it; it is
//! rewritten whole on every tick.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::report::Report;
use crate::error::Result;

/// Writer for the status file.
#[derive(Debug, Clone)]
pub struct StatusWriter {
    path: PathBuf,
}

impl StatusWriter {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `report` to the file atomically.
    ///
    /// Uses write-to-temp-then-rename pattern for atomicity.
    /// Creates parent directory if it doesn't exist.
    #[allow(clippy::result_large_err)]
    pub fn write(&self, report: &Report) -> Result<()> {
        let json = serde_json::to_string_pretty(report)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;

        let cleanup_and_err = |e| {
            let _ = fs::remove_file(&temp_path);
            e
        };

        file.write_all(json.as_bytes()).map_err(cleanup_and_err)?;
        file.sync_all().map_err(cleanup_and_err)?;

        fs::rename(&temp_path, &self.path).map_err(cleanup_and_err)?;

        Ok(())
    }

    /// Read a status file written by [`StatusWriter::write`].
    #[allow(clippy::result_large_err)]
    pub fn read(path: &Path) -> Result<Report> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::{election_registry, epoch};
    use tempfile::tempdir;

    #[test]
    fn write_creates_parent_and_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("status.json");
        let writer = StatusWriter::new(path.clone());

        let report = Report::empty(&election_registry(), epoch());
        writer.write(&report).unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(StatusWriter::read(&path).unwrap(), report);
    }

    #[test]
    fn rewrite_replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.json");
        let writer = StatusWriter::new(path.clone());
        let registry = election_registry();

        writer.write(&Report::empty(&registry, epoch())).unwrap();
        let mut later = Report::empty(&registry, epoch() + chrono::Duration::seconds(5));
        later.healthy = true;
        writer.write(&later).unwrap();

        let read = StatusWriter::read(&path).unwrap();
        assert!(read.healthy);
        assert_eq!(read.generated_at, later.generated_at);
    }
}
