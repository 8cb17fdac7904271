//! Append-only snapshot files.
//!
//! Layout: `<directory>/<market_id>/<YYYY-MM-DD>.jsonl`, one JSON record per
//! line, dated in UTC.
//!
//! A tick's full book snapshot is split by market: the record in a market's
//! file carries that market's book entries and the metrics that read them.
//! Joining every market's records for one `timestamp` gives the complete
//! book at that tick; restore rebuilds the book from each market's latest
//! record the same way.
//!
//! Each record is encoded fully in memory and written with
//! a single `write_all`, then synced. A crash mid-write can only leave a
//! truncated last line; readers skip it and the next append starts on a fresh
//! line.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::report::{BookView, Report};
use crate::domain::{DerivedMetric, MarketId};
use crate::error::SnapshotError;

/// One market at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub timestamp: DateTime<Utc>,
    pub market_id: MarketId,
    pub books: Vec<BookView>,
    /// Metrics that read this market.
    pub metrics: Vec<DerivedMetric>,
}

impl SnapshotRecord {
    /// Split a report into one record per market, in first-seen order.
    pub fn from_report(report: &Report) -> Vec<Self> {
        let mut markets: Vec<MarketId> = Vec::new();
        for view in &report.books {
            if !markets.contains(&view.market_id) {
                markets.push(view.market_id.clone());
            }
        }

        markets
            .into_iter()
            .map(|market_id| Self {
                timestamp: report.generated_at,
                books: report.books_for(&market_id).cloned().collect(),
                metrics: report.metrics_for(&market_id).cloned().collect(),
                market_id,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    directory: PathBuf,
}

impl SnapshotStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File holding `market`'s records for `date`.
    pub fn path_for(&self, market: &MarketId, date: NaiveDate) -> PathBuf {
        self.market_dir(market)
            .join(format!("{}.jsonl", date.format("%Y-%m-%d")))
    }

    fn market_dir(&self, market: &MarketId) -> PathBuf {
        let name: String = market
            .as_str()
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
                _ => '_',
            })
            .collect();
        self.directory.join(name)
    }

    /// Append one record per market. Every market is attempted; the first
    /// failure is returned.
    pub fn persist(&self, report: &Report) -> Result<usize, SnapshotError> {
        let mut written = 0;
        let mut first_error = None;
        for record in SnapshotRecord::from_report(report) {
            match self.append(&record) {
                Ok(()) => written += 1,
                Err(err) => {
                    warn!(market = %record.market_id, error = %err, "Snapshot write failed");
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(written),
        }
    }

    /// Append a single record to its market's file for the record's date.
    pub fn append(&self, record: &SnapshotRecord) -> Result<(), SnapshotError> {
        let path = self.path_for(&record.market_id, record.timestamp.date_naive());
        let io_err = |source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        };

        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        if !ends_with_newline(&mut file).map_err(io_err)? {
            line.insert(0, '\n');
        }
        file.write_all(line.as_bytes()).map_err(io_err)?;
        file.sync_data().map_err(io_err)?;
        debug!(path = %path.display(), "Snapshot record appended");
        Ok(())
    }

    /// Every complete record of `market` on `date`, oldest first.
    pub fn history(&self, market: &MarketId, date: NaiveDate) -> Result<Vec<SnapshotRecord>, SnapshotError> {
        let path = self.path_for(market, date);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let mut records = Vec::new();
        for (number, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|source| SnapshotError::Io {
                path: path.display().to_string(),
                source,
            })?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => debug!(path = %path.display(), line = number + 1, error = %e, "Skipping incomplete record"),
            }
        }
        Ok(records)
    }

    /// Most recent complete record of `market`, searching back through days.
    pub fn latest(&self, market: &MarketId) -> Result<Option<SnapshotRecord>, SnapshotError> {
        let dir = self.market_dir(market);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SnapshotError::Io {
                    path: dir.display().to_string(),
                    source,
                })
            }
        };

        let mut dates: Vec<NaiveDate> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name();
                let stem = name.to_str()?.strip_suffix(".jsonl")?;
                NaiveDate::parse_from_str(stem, "%Y-%m-%d").ok()
            })
            .collect();
        dates.sort_unstable_by(|a, b| b.cmp(a));

        for date in dates {
            if let Some(record) = self.history(market, date)?.pop() {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

fn ends_with_newline(file: &mut File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::Start(len - 1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
