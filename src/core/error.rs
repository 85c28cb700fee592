//! Error types for sei-termos
//!
//! One error enum covers the navigation, extraction and persistence steps.
//! The process driver inspects [`SeiError::scope`] to decide whether a failure
//! ends the current document or the whole process.

use thiserror::Error;

/// Main error type for extraction runs
#[derive(Error, Debug)]
pub enum SeiError {
    /// An element did not appear within the bounded wait
    #[error("Timed out after {timeout_ms} ms waiting for {locator}")]
    ElementWaitTimeout { locator: String, timeout_ms: u128 },

    /// A frame could not be entered
    #[error("Frame '{0}' not found")]
    FrameNotFound(String),

    /// The document tree for a process could not be located
    #[error("Document tree not found for process {0}")]
    TreeNotFound(String),

    /// Clicking or descending into a document failed
    #[error("Document {index} '{title}' failed: {reason}")]
    DocumentInteraction {
        index: usize,
        title: String,
        reason: String,
    },

    /// Reading the item table failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Writing the record store failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Element lookup returned nothing
    #[error("No element matches {0}")]
    NoSuchElement(String),

    /// WebDriver protocol errors
    #[error("WebDriver error: {0}")]
    WebDriver(String),

    /// Locator strategy not supported by a session implementation
    #[error("Unsupported locator: {0}")]
    Unsupported(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Spreadsheet reading errors
    #[error("Sheet error: {0}")]
    Sheet(String),

    /// CSV errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for sei-termos operations
pub type Result<T> = std::result::Result<T, SeiError>;

/// How far a failure reaches inside the process loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScope {
    /// Skip the current document, keep processing the process
    Document,
    /// Abandon the remaining documents of the current process
    Process,
}

impl SeiError {
    /// Create a WebDriver error
    pub fn webdriver(msg: impl Into<String>) -> Self {
        Self::WebDriver(msg.into())
    }

    /// Create an extraction error
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a persistence error
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a sheet error
    pub fn sheet(msg: impl Into<String>) -> Self {
        Self::Sheet(msg.into())
    }

    /// Wrap any step failure as a document interaction failure
    pub fn document(index: usize, title: impl Into<String>, source: &SeiError) -> Self {
        Self::DocumentInteraction {
            index,
            title: title.into(),
            reason: source.to_string(),
        }
    }

    /// Classify the failure for the process driver.
    ///
    /// Search timeouts and tree failures end the process; everything that can
    /// only happen while a single document is open ends that document.
    pub fn scope(&self) -> FailureScope {
        match self {
            Self::DocumentInteraction { .. }
            | Self::Extraction(_)
            | Self::FrameNotFound(_)
            | Self::NoSuchElement(_) => FailureScope::Document,
            _ => FailureScope::Process,
        }
    }

    /// Whether this failure calls for a page-markup dump
    pub fn wants_diagnostics(&self) -> bool {
        matches!(self, Self::TreeNotFound(_))
    }
}
