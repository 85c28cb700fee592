//! Process driver state and run bookkeeping
//!
//! Tracks the state machine of one process, the item batch it collects, and
//! the per-run summary.

use std::path::PathBuf;
use tracing::debug;

use crate::core::{ExtractedItem, ProcessNumber, RawRow};
use crate::store::FlushOutcome;

/// Stage of the per-process workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Idle,
    Searching,
    ListingDocuments,
    NoDocumentsFound,
    PerDocumentLoop,
    Flushing,
}

/// Stage of a single document inside the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    Selected,
    FrameDescent,
    NameLookup,
    TableScan,
    Collected,
    Failed,
}

/// State machine of one process, with its transition history
#[derive(Debug, Clone)]
pub struct ProcessTracker {
    process: ProcessNumber,
    state: ProcessState,
    history: Vec<ProcessState>,
}

impl ProcessTracker {
    pub fn new(process: ProcessNumber) -> Self {
        Self {
            process,
            state: ProcessState::Idle,
            history: vec![ProcessState::Idle],
        }
    }

    /// Move to `next`, logging the transition
    pub fn advance(&mut self, next: ProcessState) {
        debug!(process = %self.process, from = ?self.state, to = ?next, "Process state");
        self.state = next;
        self.history.push(next);
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Every state visited, starting with `Idle`
    pub fn history(&self) -> &[ProcessState] {
        &self.history
    }
}

/// Items collected for one process, not yet persisted
#[derive(Debug, Clone)]
pub struct ProcessBatch {
    process: ProcessNumber,
    items: Vec<ExtractedItem>,
    employee: Option<String>,
}

impl ProcessBatch {
    pub fn new(process: ProcessNumber) -> Self {
        Self {
            process,
            items: Vec::new(),
            employee: None,
        }
    }

    pub fn process(&self) -> &ProcessNumber {
        &self.process
    }

    /// Remember the latest successful name lookup
    pub fn record_employee(&mut self, name: impl Into<String>) {
        self.employee = Some(name.into());
    }

    /// Name attached to new items, empty until a lookup succeeds
    pub fn current_employee(&self) -> &str {
        self.employee.as_deref().unwrap_or_default()
    }

    /// Turn rows of one document into items; returns how many were added
    pub fn push_rows(&mut self, document_title: &str, rows: Vec<RawRow>) -> usize {
        let employee = self.current_employee().to_string();
        let before = self.items.len();
        self.items.extend(
            rows.into_iter()
                .map(|row| ExtractedItem::new(&self.process, document_title, employee.clone(), row)),
        );
        self.items.len() - before
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Release the items, stamping the process-level employee name on each
    pub fn into_items(self) -> Vec<ExtractedItem> {
        let employee = self.employee.unwrap_or_default();
        self.items
            .into_iter()
            .map(|mut item| {
                item.process_employee = employee.clone();
                item
            })
            .collect()
    }
}

/// Result of one document
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub index: usize,
    pub title: String,
    /// `Collected` or `Failed`
    pub state: DocumentState,
    /// Last stage reached before the failure
    pub failed_at: Option<DocumentState>,
    pub items: usize,
    pub error: Option<String>,
}

impl DocumentReport {
    pub fn collected(index: usize, title: impl Into<String>, items: usize) -> Self {
        Self {
            index,
            title: title.into(),
            state: DocumentState::Collected,
            failed_at: None,
            items,
            error: None,
        }
    }

    pub fn failure(
        index: usize,
        title: impl Into<String>,
        stage: DocumentState,
        error: impl Into<String>,
    ) -> Self {
        Self {
            index,
            title: title.into(),
            state: DocumentState::Failed,
            failed_at: Some(stage),
            items: 0,
            error: Some(error.into()),
        }
    }

    pub fn failed(&self) -> bool {
        self.state == DocumentState::Failed
    }
}

/// Result of one process number
#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub process: ProcessNumber,
    pub documents: Vec<DocumentReport>,
    pub items: usize,
    pub flush: FlushOutcome,
    /// Set when the process was aborted
    pub error: Option<String>,
    /// Page dump written for this process
    pub diagnostic: Option<PathBuf>,
    pub states: Vec<ProcessState>,
}

/// Totals of a run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub processes: usize,
    pub processes_failed: usize,
    pub documents: usize,
    pub documents_failed: usize,
    pub items_saved: usize,
    pub backups: Vec<PathBuf>,
    pub reports: Vec<ProcessReport>,
}

impl RunSummary {
    pub fn record(&mut self, report: ProcessReport) {
        self.processes += 1;
        if report.error.is_some() {
            self.processes_failed += 1;
        }
        self.documents += report.documents.len();
        self.documents_failed += report.documents.iter().filter(|d| d.failed()).count();
        match &report.flush {
            FlushOutcome::Merged { rows, .. } => self.items_saved += rows,
            FlushOutcome::BackedUp { path, .. } => self.backups.push(path.clone()),
            FlushOutcome::Skipped | FlushOutcome::Lost { .. } => {}
        }
        self.reports.push(report);
    }
}
