//! Process work list loading
//!
//! The list comes from a sheet (.xlsx or .csv) with one column of process
//! numbers. Blank cells are skipped; order and repeats are preserved.

use calamine::{open_workbook, Reader, Xlsx};
use csv::ReaderBuilder;
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::core::{ProcessNumber, Result, SeiError};

/// Column names accepted when the configured one is absent
const COLUMN_ALIASES: [&str; 2] = ["PROCESSO", "PROCESSO SEI"];

/// Ordered list of process numbers to drive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkList {
    processes: Vec<ProcessNumber>,
}

impl WorkList {
    pub fn new(processes: Vec<ProcessNumber>) -> Self {
        Self { processes }
    }

    /// Load the list from `path`, picking the format by extension
    pub fn load(path: &Path, column: &str) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let list = match ext.as_str() {
            "csv" => Self::from_csv(path, column)?,
            "xlsx" => Self::from_xlsx(path, column)?,
            other => {
                return Err(SeiError::sheet(format!(
                    "Unsupported work list format '{}'",
                    other
                )))
            }
        };

        info!(path = %path.display(), processes = list.len(), "Work list loaded");
        Ok(list)
    }

    fn from_csv(path: &Path, column: &str) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let col = column_index(&headers, column)?;

        let mut processes = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(pn) = record.get(col).and_then(ProcessNumber::parse) {
                processes.push(pn);
            }
        }
        Ok(Self::new(processes))
    }

    fn from_xlsx(path: &Path, column: &str) -> Result<Self> {
        let mut workbook: Xlsx<_> =
            open_workbook(path).map_err(|e: calamine::XlsxError| SeiError::sheet(e.to_string()))?;

        // First sheet whose header row carries the column wins
        for name in workbook.sheet_names() {
            let range = workbook
                .worksheet_range(&name)
                .map_err(|e| SeiError::sheet(e.to_string()))?;

            let mut rows = range.rows();
            let Some(header_row) = rows.next() else {
                continue;
            };
            let headers: Vec<String> = header_row.iter().map(|c| c.to_string()).collect();
            let Ok(col) = column_index(&headers, column) else {
                continue;
            };

            let processes = rows
                .filter_map(|row| row.get(col))
                .filter_map(|cell| ProcessNumber::parse(&cell.to_string()))
                .collect();
            return Ok(Self::new(processes));
        }

        Err(SeiError::sheet(format!(
            "No sheet in {} has a '{}' column",
            path.display(),
            column
        )))
    }

    pub fn processes(&self) -> &[ProcessNumber] {
        &self.processes
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

fn column_index(headers: &[String], column: &str) -> Result<usize> {
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
    };

    find(column)
        .or_else(|| COLUMN_ALIASES.iter().find_map(|alias| find(*alias)))
        .ok_or_else(|| SeiError::sheet(format!("Column '{}' not found", column)))
}
