//! Configuration management for sei-termos
//!
//! Supports environment variables, config files, and runtime overrides.
//! Portal element ids are settings so a deployment with a different layout
//! only needs a new config file.
//!
//! Config file location: ~/.config/sei-termos/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::browser::WaitPolicy;
use crate::core::error::{Result, SeiError};

/// Main configuration for an extraction run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Portal address and top-level element ids
    #[serde(default)]
    pub portal: PortalConfig,
    /// Frame ids along the navigation path
    #[serde(default)]
    pub frames: FrameConfig,
    /// Document matching and table scraping
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Wait and pacing settings
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// WebDriver endpoint
    #[serde(default)]
    pub webdriver: WebDriverConfig,
    /// Input, output and diagnostic locations
    #[serde(default)]
    pub paths: PathConfig,
}

/// Portal configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Login page URL
    pub url: String,
    /// Id of the quick-search input
    pub search_input_id: String,
    /// Id of the element that marks the workspace as ready after login
    pub ready_element_id: String,
}

/// Frame identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Frame holding the document tree
    pub list_frame: String,
    /// Container of the tree anchors, inside the list frame
    pub tree_container: String,
    /// Frames entered from the root after a document is clicked
    pub viewer_path: Vec<String>,
}

/// Extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Case-insensitive title prefix of the documents to process
    pub title_prefix: String,
    /// Class of the paragraph carrying the employee name
    pub employee_class: String,
}

/// Timeouts, in the units named by each field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Bounded wait for each navigation step
    pub step_secs: u64,
    /// Wait for the workspace after login
    pub page_ready_secs: u64,
    /// Polling interval while waiting
    pub poll_ms: u64,
    /// Pause between process numbers
    pub courtesy_delay_ms: u64,
    /// HTTP timeout for a single WebDriver command
    pub command_secs: u64,
}

/// WebDriver endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDriverConfig {
    /// Base URL of chromedriver (or any W3C WebDriver server)
    pub url: String,
    /// Whether to show the browser window
    pub headed: bool,
    /// Extra browser arguments
    #[serde(default)]
    pub args: Vec<String>,
}

/// File locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathConfig {
    /// Sheet listing the process numbers
    pub worklist: PathBuf,
    /// Column of the work list holding process numbers
    pub worklist_column: String,
    /// Record store written by the run
    pub store: PathBuf,
    /// Where backups go when the store cannot be merged
    pub backup_dir: PathBuf,
    /// Where page dumps go
    pub diagnostics_dir: PathBuf,
    /// Also capture a screenshot next to each page dump
    #[serde(default)]
    pub diagnostic_screenshots: bool,
    /// Append-only log file
    pub log_file: PathBuf,
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            url: env::var("SEI_URL").unwrap_or_else(|_| "http://sei.antt.gov.br/".to_string()),
            search_input_id: "txtPesquisaRapida".to_string(),
            ready_element_id: "divInfraAreaTela".to_string(),
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            list_frame: "ifrArvore".to_string(),
            tree_container: "frmArvore".to_string(),
            viewer_path: vec!["ifrVisualizacao".to_string(), "ifrArvoreHtml".to_string()],
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            title_prefix: env::var("SEI_TITLE_PREFIX")
                .unwrap_or_else(|_| "termo recebimento".to_string()),
            employee_class: "Texto_Justificado".to_string(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            step_secs: 10,
            page_ready_secs: 240,
            poll_ms: 250,
            courtesy_delay_ms: 1000,
            command_secs: 60,
        }
    }
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: env::var("SEI_WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".to_string()),
            headed: env_flag("SEI_HEADED", true),
            args: Vec::new(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        let base = env::var("SEI_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));
        Self {
            worklist: base.join("excel").join("processos.xlsx"),
            worklist_column: "PROCESSO".to_string(),
            store: base.join("excel").join("itens_extraidos.csv"),
            backup_dir: base.join("excel"),
            diagnostics_dir: base.join("diagnostics"),
            diagnostic_screenshots: env_flag("SEI_DIAGNOSTIC_SCREENSHOTS", false),
            log_file: base.join("extracao_itens_sei.log"),
        }
    }
}

impl TimeoutConfig {
    /// Wait policy for ordinary navigation steps
    pub fn step_policy(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_secs(self.step_secs),
            Duration::from_millis(self.poll_ms),
        )
    }

    /// Wait policy for the workspace after login
    pub fn page_ready_policy(&self) -> WaitPolicy {
        WaitPolicy::new(
            Duration::from_secs(self.page_ready_secs),
            Duration::from_millis(self.poll_ms),
        )
    }

    /// Pause between process numbers
    pub fn courtesy_delay(&self) -> Duration {
        Duration::from_millis(self.courtesy_delay_ms)
    }

    /// HTTP timeout for a single WebDriver command
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sei-termos")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        if let Ok(config) = Self::load_from(&Self::config_file()) {
            return config;
        }

        Self::default()
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SeiError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| SeiError::config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| SeiError::config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the driver cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.extraction.title_prefix.trim().is_empty() {
            return Err(SeiError::config("extraction.title_prefix must not be empty"));
        }
        if self.frames.viewer_path.is_empty() {
            return Err(SeiError::config("frames.viewer_path needs at least one frame"));
        }
        if self.timeouts.poll_ms == 0 {
            return Err(SeiError::config("timeouts.poll_ms must be positive"));
        }
        Ok(())
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        toml::to_string_pretty(&Config::default())
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}
