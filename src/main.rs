//! sei-termos - item extraction from SEI "termo" documents
//!
//! Main entry point for the CLI application.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use sei_termos::browser::{BrowserSession, WebDriverSession};
use sei_termos::portal::{Login, PortalLogin, StartGate};
use sei_termos::store::WorkList;
use sei_termos::{logging, Config, ProcessDriver, RecordStore};

/// Extract received-items tables from SEI "termo" documents
#[derive(Parser, Debug)]
#[command(name = "sei-termos")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (default: ~/.config/sei-termos/config.toml)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Work list sheet (.xlsx or .csv)
    #[arg(long, short = 'w')]
    worklist: Option<PathBuf>,

    /// Record store CSV
    #[arg(long, short = 's')]
    store: Option<PathBuf>,

    /// WebDriver server URL
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Document title prefix to match
    #[arg(long, short = 'p')]
    prefix: Option<String>,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// Start right after the portal is ready, without asking
    #[arg(long)]
    no_prompt: bool,

    /// Enable debug output
    #[arg(long, short = 'd')]
    debug: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = match &args.config {
        Some(path) => {
            let _ = dotenvy::dotenv();
            Config::load_from(path)?
        }
        None => Config::load(),
    };

    // Apply CLI overrides
    if let Some(ref worklist) = args.worklist {
        config.paths.worklist = worklist.clone();
    }

    if let Some(ref store) = args.store {
        config.paths.store = store.clone();
    }

    if let Some(ref url) = args.webdriver_url {
        config.webdriver.url = url.clone();
    }

    if let Some(ref prefix) = args.prefix {
        config.extraction.title_prefix = prefix.clone();
    }

    if args.headless {
        config.webdriver.headed = false;
    }

    config.validate()?;

    if args.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init(&config.paths.log_file, args.debug)?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting");

    let store = RecordStore::open(&config.paths.store, &config.paths.backup_dir)
        .with_context(|| format!("Opening record store {}", config.paths.store.display()))?;
    let worklist = WorkList::load(&config.paths.worklist, &config.paths.worklist_column)
        .with_context(|| format!("Loading work list {}", config.paths.worklist.display()))?;

    if worklist.is_empty() {
        warn!(path = %config.paths.worklist.display(), "Work list has no process numbers");
        return Ok(());
    }

    let session = WebDriverSession::connect(&config.webdriver, config.timeouts.command_timeout()).await?;
    let session: Arc<dyn BrowserSession> = Arc::new(session);

    let gate = if args.no_prompt {
        StartGate::open()
    } else {
        StartGate::console("Log in to SEI in the browser window, then press Enter to start...")
    };

    let login = PortalLogin::from_config(&config);
    if let Err(e) = tokio::try_join!(login.login(session.as_ref(), &config.portal.url), gate.wait()) {
        error!(error = %e, "Portal not ready, nothing processed");
        let _ = session.close().await;
        return Err(e.into());
    }

    let mut driver = ProcessDriver::new(session.clone(), &config, store);
    let summary = driver.run(worklist.processes()).await;

    for path in &summary.backups {
        warn!(backup = %path.display(), "Items written to backup instead of the store");
    }
    println!(
        "{} processes ({} failed), {} documents ({} failed), {} items saved",
        summary.processes,
        summary.processes_failed,
        summary.documents,
        summary.documents_failed,
        summary.items_saved
    );

    if let Err(e) = session.close().await {
        warn!(error = %e, "Browser session not closed cleanly");
    }

    Ok(())
}
