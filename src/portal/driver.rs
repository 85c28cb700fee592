//! Process driver
//!
//! Runs the per-process workflow: search, list matching documents, open each
//! one, scrape its tables and flush the batch into the record store.

use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::browser::BrowserSession;
use crate::core::{Config, FailureScope, ProcessNumber, Result, SeiError};
use crate::diagnostics::Diagnostics;
use crate::portal::documents::{Document, DocumentLocator};
use crate::portal::frames::FrameNavigator;
use crate::portal::state::{
    DocumentReport, DocumentState, ProcessBatch, ProcessReport, ProcessState, ProcessTracker,
    RunSummary,
};
use crate::portal::table::TableExtractor;
use crate::store::RecordStore;

/// Drives one browser session over a list of process numbers
pub struct ProcessDriver {
    navigator: FrameNavigator,
    locator: DocumentLocator,
    extractor: TableExtractor,
    diagnostics: Diagnostics,
    store: RecordStore,
    viewer_path: Vec<String>,
    courtesy_delay: Duration,
}

impl ProcessDriver {
    pub fn new(session: Arc<dyn BrowserSession>, config: &Config, store: RecordStore) -> Self {
        Self {
            navigator: FrameNavigator::new(session.clone(), config.timeouts.step_policy()),
            locator: DocumentLocator::from_config(config),
            extractor: TableExtractor::new(config.extraction.employee_class.clone()),
            diagnostics: Diagnostics::new(
                session,
                config.paths.diagnostics_dir.clone(),
                config.paths.diagnostic_screenshots,
            ),
            store,
            viewer_path: config.frames.viewer_path.clone(),
            courtesy_delay: config.timeouts.courtesy_delay(),
        }
    }

    /// Record store the driver appends to
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Process every number in order; failures never stop the run
    pub async fn run(&mut self, processes: &[ProcessNumber]) -> RunSummary {
        let mut summary = RunSummary::default();

        for (i, process) in processes.iter().enumerate() {
            info!(process = %process, position = i + 1, total = processes.len(), "Processing");
            let report = self.process(process).await;
            summary.record(report);

            if i + 1 < processes.len() && !self.courtesy_delay.is_zero() {
                tokio::time::sleep(self.courtesy_delay).await;
            }
        }

        info!(
            processes = summary.processes,
            failed = summary.processes_failed,
            documents = summary.documents,
            documents_failed = summary.documents_failed,
            items = summary.items_saved,
            backups = summary.backups.len(),
            "Run finished"
        );
        summary
    }

    /// Run the full workflow for one process number.
    ///
    /// A failure inside a document skips that document unless its
    /// [`SeiError::scope`] is `Process`, which ends the document loop. The
    /// items collected until then are still flushed.
    pub async fn process(&mut self, process: &ProcessNumber) -> ProcessReport {
        let mut tracker = ProcessTracker::new(process.clone());
        let mut batch = ProcessBatch::new(process.clone());
        let mut documents = Vec::new();
        let mut diagnostic = None;

        let outcome = self
            .collect(&mut tracker, &mut batch, &mut documents)
            .await;

        let error = match outcome {
            Ok(()) => None,
            Err(e) => {
                error!(process = %process, error = %e, "Process aborted");
                if e.wants_diagnostics() {
                    match self.diagnostics.dump_page(process).await {
                        Ok(path) => diagnostic = Some(path),
                        Err(dump_err) => {
                            warn!(process = %process, error = %dump_err, "Page dump failed")
                        }
                    }
                }
                Some(e.to_string())
            }
        };

        tracker.advance(ProcessState::Flushing);
        let items = batch.len();
        self.store.append_batch(batch.into_items());
        let flush = self.store.flush(process);

        if let Err(e) = self.navigator.reset_to_root().await {
            warn!(process = %process, error = %e, "Could not return to root context");
        }
        tracker.advance(ProcessState::Idle);

        ProcessReport {
            process: process.clone(),
            documents,
            items,
            flush,
            error,
            diagnostic,
            states: tracker.history().to_vec(),
        }
    }

    async fn collect(
        &mut self,
        tracker: &mut ProcessTracker,
        batch: &mut ProcessBatch,
        reports: &mut Vec<DocumentReport>,
    ) -> Result<()> {
        let process = batch.process().clone();

        tracker.advance(ProcessState::Searching);
        self.locator.submit_search(&mut self.navigator, &process).await?;

        tracker.advance(ProcessState::ListingDocuments);
        let documents = self.locator.list_documents(&mut self.navigator, &process).await?;

        if documents.is_empty() {
            tracker.advance(ProcessState::NoDocumentsFound);
            info!(process = %process, "Nothing to extract");
            return Ok(());
        }

        tracker.advance(ProcessState::PerDocumentLoop);
        for document in &documents {
            let mut stage = DocumentState::Selected;
            match self.open_document(document, batch, &mut stage).await {
                Ok(items) => {
                    info!(process = %process, index = document.index, document = %document.title, items, "Document collected");
                    reports.push(DocumentReport::collected(document.index, &document.title, items));
                }
                Err(e) => {
                    let message = match &e {
                        SeiError::DocumentInteraction { .. } => e.to_string(),
                        other => SeiError::document(document.index, &document.title, other).to_string(),
                    };
                    error!(process = %process, index = document.index, document = %document.title, stage = ?stage, error = %message, "Document failed");
                    reports.push(DocumentReport::failure(document.index, &document.title, stage, message));

                    if e.scope() == FailureScope::Process {
                        return Err(e);
                    }
                }
            }

            self.return_to_list().await?;
        }

        Ok(())
    }

    /// Open one document and collect its rows; `stage` tracks how far it got
    async fn open_document(
        &mut self,
        document: &Document,
        batch: &mut ProcessBatch,
        stage: &mut DocumentState,
    ) -> Result<usize> {
        document
            .link
            .click()
            .await
            .map_err(|e| match e {
                // Transport failures end the process
                SeiError::Http(_) | SeiError::Io(_) => e,
                other => SeiError::document(document.index, &document.title, &other),
            })?;

        *stage = DocumentState::FrameDescent;
        self.navigator.reset_to_root().await?;
        self.navigator.enter_path(&self.viewer_path).await?;

        *stage = DocumentState::NameLookup;
        let session = self.navigator.session().clone();
        match self.extractor.employee_name(session.as_ref()).await {
            Ok(Some(name)) => batch.record_employee(name),
            Ok(None) => {}
            Err(e) => warn!(index = document.index, document = %document.title, error = %e, "Employee name lookup failed"),
        }

        *stage = DocumentState::TableScan;
        let rows = self.extractor.extract_rows(session.as_ref()).await?;
        Ok(batch.push_rows(&document.title, rows))
    }

    async fn return_to_list(&mut self) -> Result<()> {
        self.navigator.reset_to_root().await?;
        self.navigator
            .enter(self.locator.list_frame())
            .await
            .map_err(|e| SeiError::Other(format!("Could not re-enter the document list: {}", e)))?;
        Ok(())
    }
}
