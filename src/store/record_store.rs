//! Record store with append-and-merge persistence
//!
//! Rows are kept as an ordered log plus an index by (process, document).
//! A flush re-reads the file, appends the pending batch and replaces the file
//! through a temporary sibling, so a failed merge never touches the original.

use chrono::Utc;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::core::{ExtractedItem, ProcessNumber, Result, SeiError};
use crate::store::sheet::{CsvSheet, ItemSheet};

/// What happened to the store at the end of a process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing to write
    Skipped,
    /// Rows appended to the store
    Merged { rows: usize, total: usize },
    /// The store could not be merged; the batch went to a backup file
    BackedUp { path: PathBuf, rows: usize },
    /// Neither the store nor a backup could be written
    Lost { rows: usize },
}

/// Persistent item rows of a run
pub struct RecordStore {
    path: PathBuf,
    backup_dir: PathBuf,
    sheet: Box<dyn ItemSheet>,
    log: Vec<ExtractedItem>,
    index: BTreeMap<(String, String), Vec<usize>>,
    pending: Vec<ExtractedItem>,
}

impl RecordStore {
    /// Open the CSV store at `path`, creating it header-only when absent
    pub fn open(path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_sheet(path, backup_dir, Box::new(CsvSheet))
    }

    /// Open a store using a specific sheet format
    pub fn with_sheet(
        path: impl Into<PathBuf>,
        backup_dir: impl Into<PathBuf>,
        sheet: Box<dyn ItemSheet>,
    ) -> Result<Self> {
        let mut store = Self {
            path: path.into(),
            backup_dir: backup_dir.into(),
            sheet,
            log: Vec::new(),
            index: BTreeMap::new(),
            pending: Vec::new(),
        };

        if !store.path.exists() {
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            store.sheet.write_items(&store.path, &[])?;
            info!(path = %store.path.display(), "Record store created");
        }

        store.load()?;
        Ok(store)
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the store file into memory
    pub fn load(&mut self) -> Result<()> {
        let items = self.sheet.read_items(&self.path)?;
        self.replace_log(items);
        Ok(())
    }

    /// Stage a batch for the next flush
    pub fn append_batch(&mut self, items: Vec<ExtractedItem>) {
        self.pending.extend(items);
    }

    /// Rows staged and not yet flushed
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Merge the staged rows into the file.
    ///
    /// On any merge failure the staged rows go to a time-stamped backup
    /// instead. The staged rows are dropped in every case.
    pub fn flush(&mut self, process: &ProcessNumber) -> FlushOutcome {
        let batch = std::mem::take(&mut self.pending);
        if batch.is_empty() {
            return FlushOutcome::Skipped;
        }
        let rows = batch.len();

        match self.merge(&batch) {
            Ok(total) => {
                info!(process = %process, rows, total, "Items saved");
                FlushOutcome::Merged { rows, total }
            }
            Err(e) => {
                error!(process = %process, error = %e, "Could not merge items into the store");
                match self.write_backup(process, &batch) {
                    Ok(path) => {
                        error!(process = %process, backup = %path.display(), "Items written to backup");
                        FlushOutcome::BackedUp { path, rows }
                    }
                    Err(backup_err) => {
                        error!(process = %process, error = %backup_err, rows, "Backup failed, items lost");
                        FlushOutcome::Lost { rows }
                    }
                }
            }
        }
    }

    fn merge(&mut self, batch: &[ExtractedItem]) -> Result<usize> {
        let mut merged = self
            .sheet
            .read_items(&self.path)
            .map_err(|e| SeiError::persistence(format!("Reading {}: {}", self.path.display(), e)))?;
        merged.extend_from_slice(batch);

        let tmp = self.temp_path();
        if let Err(e) = self.sheet.write_items(&tmp, &merged) {
            let _ = fs::remove_file(&tmp);
            return Err(SeiError::persistence(format!("Writing {}: {}", tmp.display(), e)));
        }
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            SeiError::persistence(format!("Replacing {}: {}", self.path.display(), e))
        })?;

        let total = merged.len();
        self.replace_log(merged);
        Ok(total)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_backup(&self, process: &ProcessNumber, batch: &[ExtractedItem]) -> Result<PathBuf> {
        fs::create_dir_all(&self.backup_dir)?;

        let stem = format!("backup_{}_{}", process.file_stem(), Utc::now().timestamp());
        let ext = self.sheet.extension();
        let mut path = self.backup_dir.join(format!("{}.{}", stem, ext));
        let mut n = 1;
        while path.exists() {
            warn!(path = %path.display(), "Backup name taken, trying next");
            path = self.backup_dir.join(format!("{}_{}.{}", stem, n, ext));
            n += 1;
        }

        self.sheet.write_items(&path, batch)?;
        Ok(path)
    }

    fn replace_log(&mut self, items: Vec<ExtractedItem>) {
        self.index.clear();
        for (pos, item) in items.iter().enumerate() {
            self.index.entry(item.key()).or_default().push(pos);
        }
        self.log = items;
    }

    /// All rows, in file order
    pub fn rows(&self) -> &[ExtractedItem] {
        &self.log
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }

    /// Rows of one document of one process
    pub fn rows_for(&self, process: &str, document_title: &str) -> Vec<&ExtractedItem> {
        self.index
            .get(&(process.to_string(), document_title.to_string()))
            .map(|positions| positions.iter().map(|&p| &self.log[p]).collect())
            .unwrap_or_default()
    }

    /// Distinct (process, document) pairs present in the store
    pub fn documents(&self) -> impl Iterator<Item = &(String, String)> {
        self.index.keys()
    }
}
