//! Page dumps for failed tree lookups
//!
//! Writes the markup of the current context (and optionally a screenshot)
//! under a name derived from the process number.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::browser::BrowserSession;
use crate::core::{ProcessNumber, Result, SeiError};

/// Writes debugging artifacts for a process
pub struct Diagnostics {
    session: Arc<dyn BrowserSession>,
    dir: PathBuf,
    screenshots: bool,
}

impl Diagnostics {
    pub fn new(session: Arc<dyn BrowserSession>, dir: impl Into<PathBuf>, screenshots: bool) -> Self {
        Self {
            session,
            dir: dir.into(),
            screenshots,
        }
    }

    /// Path of the markup dump for `process`
    pub fn dump_path(&self, process: &ProcessNumber) -> PathBuf {
        self.dir.join(format!("erro_{}.html", process.file_stem()))
    }

    /// Save the markup of the current context; returns the dump path.
    ///
    /// A failed screenshot is logged and does not fail the dump.
    pub async fn dump_page(&self, process: &ProcessNumber) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let source = self.session.page_source().await?;
        let path = self.dump_path(process);
        tokio::fs::write(&path, source).await?;
        info!(process = %process, path = %path.display(), "Page markup saved");

        if self.screenshots {
            if let Err(e) = self.save_screenshot(process).await {
                warn!(process = %process, error = %e, "Screenshot not saved");
            }
        }

        Ok(path)
    }

    async fn save_screenshot(&self, process: &ProcessNumber) -> Result<PathBuf> {
        let encoded = self.session.screenshot().await?;
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| SeiError::webdriver(format!("Invalid screenshot payload: {}", e)))?;

        let path = self.dir.join(format!("erro_{}.png", process.file_stem()));
        tokio::fs::write(&path, bytes).await?;
        info!(process = %process, path = %path.display(), "Screenshot saved");
        Ok(path)
    }
}
