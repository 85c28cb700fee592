//! sei-termos - item extraction from SEI "termo" documents
//!
//! Drives a logged-in browser session through the SEI portal: for each
//! process number of a work list it searches the process, opens the
//! documents whose title starts with a configured prefix, scrapes their item
//! tables and appends the rows to a CSV record store.
//!
//! # Architecture
//!
//! - **Core**: data model, configuration, and error handling
//! - **Browser**: element/session traits, WebDriver adapter, in-memory page
//! - **Portal**: frame navigation, document lookup, table scraping, driver
//! - **Store**: record store, sheet formats, work list
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sei_termos::browser::WebDriverSession;
//! use sei_termos::core::ProcessNumber;
//! use sei_termos::{Config, ProcessDriver, RecordStore};
//!
//! #[tokio::main]
//! async fn main() -> sei_termos::Result<()> {
//!     let config = Config::load();
//!     let store = RecordStore::open(&config.paths.store, &config.paths.backup_dir)?;
//!     let session = WebDriverSession::connect(&config.webdriver, config.timeouts.command_timeout()).await?;
//!
//!     let mut driver = ProcessDriver::new(Arc::new(session), &config, store);
//!     let processes: Vec<_> = ProcessNumber::parse("00001.000123/2024-00").into_iter().collect();
//!     let summary = driver.run(&processes).await;
//!     println!("{} items saved", summary.items_saved);
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod core;
pub mod diagnostics;
pub mod logging;
pub mod portal;
pub mod store;

// Re-export commonly used items
pub use core::{Config, Result, SeiError};
pub use portal::ProcessDriver;
pub use store::RecordStore;
