//! Process driver integration tests
//!
//! Runs the full workflow against the in-memory page model laid out like the
//! SEI workspace: a search box, the `ifrArvore` tree frame and the
//! `ifrVisualizacao > ifrArvoreHtml` viewer.

use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sei_termos::browser::{BrowserSession, By, Effect, Element, MemoryBrowser, NodeId, NodeSpec, UiElement};
use sei_termos::core::{Config, ProcessNumber, SeiError};
use sei_termos::portal::{DocumentState, ProcessState};
use sei_termos::store::{CsvSheet, FlushOutcome, ItemSheet};
use sei_termos::{ProcessDriver, RecordStore};

/// Page model with the SEI frame layout
struct Portal {
    browser: MemoryBrowser,
    input: NodeId,
    tree_frame: NodeId,
    content_frame: NodeId,
}

impl Portal {
    fn new() -> Self {
        let browser = MemoryBrowser::new();
        let root = browser.root();
        let input = browser.append(root, NodeSpec::new("input").id("txtPesquisaRapida"));
        let tree_frame = browser.append_frame(root, "ifrArvore", None);
        let viewer = browser.new_document();
        let content_frame = browser.append_frame(viewer, "ifrArvoreHtml", None);
        browser.append_frame(root, "ifrVisualizacao", Some(viewer));

        Self {
            browser,
            input,
            tree_frame,
            content_frame,
        }
    }

    /// Register a process whose tree lists `documents` (title, content)
    fn process(&self, number: &str, documents: Vec<(&str, NodeId)>) -> Vec<NodeId> {
        let tree = self.browser.new_document();
        let form = self.browser.append(tree, NodeSpec::new("form").id("frmArvore"));

        let anchors = documents
            .into_iter()
            .map(|(title, content)| {
                let anchor = self.browser.append(form, NodeSpec::new("a").text(title));
                self.browser.on_click(
                    anchor,
                    Effect::LoadFrame {
                        frame: self.content_frame,
                        document: content,
                    },
                );
                anchor
            })
            .collect();

        self.browser.on_submit(
            self.input,
            number,
            Effect::LoadFrame {
                frame: self.tree_frame,
                document: tree,
            },
        );
        anchors
    }

    /// A document body with an employee paragraph and an item table
    fn termo(&self, employee: &str, rows: &[&[&str]]) -> NodeId {
        let doc = self.browser.new_document();
        if !employee.is_empty() {
            self.browser
                .append(doc, NodeSpec::new("p").class("Texto_Justificado").text(employee));
        }
        let mut table: Vec<&[&str]> = vec![&["MATERIAL", "MODELO", "TAMANHO/GÊNERO", "QUANTIDADE"]];
        table.extend_from_slice(rows);
        self.browser.append_table(doc, &table);
        doc
    }
}

fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.timeouts.step_secs = 0;
    config.timeouts.poll_ms = 1;
    config.timeouts.courtesy_delay_ms = 0;
    config.paths.store = dir.join("itens_extraidos.csv");
    config.paths.backup_dir = dir.join("backups");
    config.paths.diagnostics_dir = dir.join("diagnostics");
    config.paths.diagnostic_screenshots = false;
    config
}

fn driver(portal: &Portal, config: &Config) -> ProcessDriver {
    let store = RecordStore::open(&config.paths.store, &config.paths.backup_dir).unwrap();
    ProcessDriver::new(Arc::new(portal.browser.clone()), config, store)
}

fn pn(raw: &str) -> ProcessNumber {
    ProcessNumber::parse(raw).unwrap()
}

/// Page model session with injected faults
struct FaultySession {
    inner: MemoryBrowser,
    /// Lookups of the search input that come back empty
    hidden_search_lookups: AtomicUsize,
    /// Returns to the root document that fail with an IO error
    failing_resets: AtomicUsize,
}

impl FaultySession {
    fn new(inner: MemoryBrowser) -> Self {
        Self {
            inner,
            hidden_search_lookups: AtomicUsize::new(0),
            failing_resets: AtomicUsize::new(0),
        }
    }
}

fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl BrowserSession for FaultySession {
    async fn goto(&self, url: &str) -> sei_termos::Result<()> {
        self.inner.goto(url).await
    }

    async fn find_elements(&self, by: &By) -> sei_termos::Result<Vec<Element>> {
        if *by == By::id("txtPesquisaRapida") && take(&self.hidden_search_lookups) {
            return Ok(Vec::new());
        }
        self.inner.find_elements(by).await
    }

    async fn enter_frame(&self, frame: &dyn UiElement) -> sei_termos::Result<()> {
        self.inner.enter_frame(frame).await
    }

    async fn default_content(&self) -> sei_termos::Result<()> {
        if take(&self.failing_resets) {
            return Err(SeiError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "session connection lost",
            )));
        }
        self.inner.default_content().await
    }

    async fn page_source(&self) -> sei_termos::Result<String> {
        self.inner.page_source().await
    }

    async fn screenshot(&self) -> sei_termos::Result<String> {
        self.inner.screenshot().await
    }
}

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn test_only_termo_documents_are_scraped() {
    sei_termos::logging::init_test();
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let portal = Portal::new();

    let termo = portal.termo(
        "Ana Souza",
        &[&["Camisa", "Polo", "M", "10"], &["Calça", "Jeans", "42", ""]],
    );
    let relatorio = portal.termo("Outro", &[&["Bota", "Couro", "40", "1"]]);
    portal.process(
        "00001.000123/2024-00",
        vec![("Termo Recebimento A", termo), ("Relatório B", relatorio)],
    );

    let mut driver = driver(&portal, &config);
    let summary = driver.run(&[pn("00001.000123/2024-00")]).await;

    assert_eq!(summary.processes, 1);
    assert_eq!(summary.processes_failed, 0);
    assert_eq!(summary.documents, 1);
    assert_eq!(summary.items_saved, 2);

    let rows = CsvSheet.read_items(&config.paths.store).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.document_title == "Termo Recebimento A"));
    assert!(rows.iter().all(|r| r.process_number == "00001.000123/2024-00"));
    assert!(rows.iter().all(|r| r.employee_name == "Ana Souza"));
    assert!(rows.iter().all(|r| r.process_employee == "Ana Souza"));
    assert_eq!(rows[0].quantity, "10");
    assert_eq!(rows[1].quantity, "");
    assert_eq!(rows[1].model, "Jeans");

    let report = &summary.reports[0];
    assert_eq!(report.documents[0].state, DocumentState::Collected);
    assert_eq!(
        report.states,
        vec![
            ProcessState::Idle,
            ProcessState::Searching,
            ProcessState::ListingDocuments,
            ProcessState::PerDocumentLoop,
            ProcessState::Flushing,
            ProcessState::Idle,
        ]
    );
}

#[tokio::test]
async fn test_zero_matches_leaves_store_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let portal = Portal::new();
    let despacho = portal.termo("", &[&["Camisa", "Polo", "M", "1"]]);
    portal.process("42", vec![("Despacho", despacho)]);

    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut driver = driver(&portal, &config);
    let before = std::fs::read(&config.paths.store).unwrap();
    let summary = driver.run(&[pn("42")]).await;

    assert_eq!(std::fs::read(&config.paths.store).unwrap(), before);
    assert_eq!(summary.reports[0].flush, FlushOutcome::Skipped);
    assert!(summary.reports[0].states.contains(&ProcessState::NoDocumentsFound));

    let output = log.contents();
    assert!(output.contains("INFO"));
    assert!(output.contains("No matching documents found"));
}

#[tokio::test]
async fn test_missing_tree_dumps_page_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    // The tree frame only appears once a known process is searched
    let browser = MemoryBrowser::new();
    let root = browser.root();
    let input = browser.append(root, NodeSpec::new("input").id("txtPesquisaRapida"));
    let viewer = browser.new_document();
    let content_frame = browser.append_frame(viewer, "ifrArvoreHtml", None);
    browser.append_frame(root, "ifrVisualizacao", Some(viewer));
    let tree_frame = browser.detached(NodeSpec::new("iframe").id("ifrArvore"));

    let portal = Portal {
        browser: browser.clone(),
        input,
        tree_frame,
        content_frame,
    };
    let termo = portal.termo("José", &[&["Luva", "Nitrílica", "G", "2"]]);
    portal.process("2", vec![("Termo Recebimento X", termo)]);
    browser.on_submit(input, "2", Effect::Attach { parent: root, node: tree_frame });

    let mut driver = driver(&portal, &config);
    let summary = driver.run(&[pn("1"), pn("2")]).await;

    assert_eq!(summary.processes, 2);
    assert_eq!(summary.processes_failed, 1);

    let failed = &summary.reports[0];
    assert!(failed.error.as_deref().unwrap().contains("Document tree not found"));
    let dump = failed.diagnostic.clone().unwrap();
    assert_eq!(dump, config.paths.diagnostics_dir.join("erro_1.html"));
    assert!(std::fs::read_to_string(&dump).unwrap().contains("txtPesquisaRapida"));

    let rows = CsvSheet.read_items(&config.paths.store).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].process_number, "2");
    assert_eq!(browser.submitted(), vec!["1", "2"]);
}

#[tokio::test]
async fn test_failed_document_does_not_stop_the_process() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let portal = Portal::new();

    let first = portal.termo("Ana", &[&["Camisa", "Polo", "M", "1"]]);
    let second = portal.termo("Bruno", &[&["Boné", "Aba", "U", "3"]]);
    let anchors = portal.process(
        "7",
        vec![("Termo Recebimento 1", first), ("Termo Recebimento 2", second)],
    );
    // Clicks on the first link report an error
    portal.browser.on_click(anchors[0], Effect::Fail("stale element".into()));

    let mut driver = driver(&portal, &config);
    let report = driver.process(&pn("7")).await;

    assert!(report.error.is_none());
    assert_eq!(report.documents.len(), 2);
    assert!(report.documents[0].failed());
    assert_eq!(report.documents[0].state, DocumentState::Failed);
    assert_eq!(report.documents[0].failed_at, Some(DocumentState::Selected));
    assert!(report.documents[0]
        .error
        .as_deref()
        .unwrap()
        .contains("Termo Recebimento 1"));
    assert_eq!(report.documents[1].state, DocumentState::Collected);

    let rows = driver.store().rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].model, "Aba");
    assert_eq!(rows[0].process_employee, "Bruno");
}

#[tokio::test]
async fn test_missing_viewer_frame_fails_only_that_document() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let portal = Portal::new();

    let loaded = portal.termo("Ana", &[&["Camisa", "Polo", "M", "1"]]);
    let anchors = portal.process("8", vec![("Termo Recebimento 1", loaded), ("Termo Recebimento 2", loaded)]);
    // The second link tears down the inner viewer frame
    portal.browser.on_click(anchors[1], Effect::Detach(portal.content_frame));

    let mut driver = driver(&portal, &config);
    let report = driver.process(&pn("8")).await;

    assert!(report.error.is_none());
    assert_eq!(report.documents[0].state, DocumentState::Collected);
    assert_eq!(report.documents[1].state, DocumentState::Failed);
    assert_eq!(report.documents[1].failed_at, Some(DocumentState::FrameDescent));
    assert!(report.documents[1].error.as_deref().unwrap().contains("ifrArvoreHtml"));
    assert_eq!(report.items, 1);
}

#[tokio::test]
async fn test_lost_list_frame_flushes_partial_batch() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let portal = Portal::new();

    let first = portal.termo("Ana", &[&["Camisa", "Polo", "M", "1"]]);
    let second = portal.termo("Ana", &[&["Boné", "Aba", "U", "3"]]);
    let anchors = portal.process(
        "11",
        vec![("Termo Recebimento 1", first), ("Termo Recebimento 2", second)],
    );
    // Opening the first document unloads the tree frame
    portal.browser.on_click(anchors[0], Effect::Detach(portal.tree_frame));

    let mut driver = driver(&portal, &config);
    let report = driver.process(&pn("11")).await;

    assert!(report.error.as_deref().unwrap().contains("ifrArvore"));
    assert_eq!(report.documents.len(), 1);
    assert!(!report.documents[0].failed());
    assert!(matches!(report.flush, FlushOutcome::Merged { rows: 1, .. }));
    assert!(report.diagnostic.is_none());

    let rows = CsvSheet.read_items(&config.paths.store).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].model, "Polo");
}

#[tokio::test]
async fn test_process_scope_error_ends_document_loop() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let portal = Portal::new();

    let first = portal.termo("Ana", &[&["Camisa", "Polo", "M", "1"]]);
    let second = portal.termo("Ana", &[&["Boné", "Aba", "U", "3"]]);
    portal.process(
        "12",
        vec![("Termo Recebimento 1", first), ("Termo Recebimento 2", second)],
    );

    let session = FaultySession::new(portal.browser.clone());
    session.failing_resets.store(1, Ordering::SeqCst);
    let store = RecordStore::open(&config.paths.store, &config.paths.backup_dir).unwrap();
    let mut driver = ProcessDriver::new(Arc::new(session), &config, store);

    let report = driver.process(&pn("12")).await;

    assert!(report.error.as_deref().unwrap().contains("session connection lost"));
    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0].failed_at, Some(DocumentState::FrameDescent));
    assert_eq!(report.flush, FlushOutcome::Skipped);
    assert!(report.states.ends_with(&[ProcessState::Flushing, ProcessState::Idle]));
}

#[tokio::test]
async fn test_search_timeout_moves_on_to_next_process() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let portal = Portal::new();
    let termo = portal.termo("Ana", &[&["Camisa", "Polo", "M", "1"]]);
    portal.process("2", vec![("Termo Recebimento", termo)]);

    let session = FaultySession::new(portal.browser.clone());
    session.hidden_search_lookups.store(1, Ordering::SeqCst);
    let store = RecordStore::open(&config.paths.store, &config.paths.backup_dir).unwrap();
    let mut driver = ProcessDriver::new(Arc::new(session), &config, store);

    let summary = driver.run(&[pn("1"), pn("2")]).await;

    assert_eq!(summary.processes_failed, 1);
    let failed = &summary.reports[0];
    assert!(failed.error.as_deref().unwrap().contains("txtPesquisaRapida"));
    assert!(failed.diagnostic.is_none());
    assert_eq!(failed.states[1], ProcessState::Searching);
    assert!(!failed.states.contains(&ProcessState::ListingDocuments));

    assert!(summary.reports[1].error.is_none());
    assert_eq!(summary.items_saved, 1);
    assert_eq!(portal.browser.submitted(), vec!["2"]);
}

#[tokio::test]
async fn test_employee_name_keeps_last_successful_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let portal = Portal::new();

    let named = portal.termo("Carla Dias", &[&["Camisa", "Polo", "M", "1"]]);
    let unnamed = portal.termo("", &[&["Calça", "Jeans", "40", "2"]]);
    portal.process("9", vec![("Termo Recebimento 1", named), ("Termo Recebimento 2", unnamed)]);

    let mut driver = driver(&portal, &config);
    driver.process(&pn("9")).await;

    let rows = driver.store().rows_for("9", "Termo Recebimento 2");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].employee_name, "Carla Dias");
    assert_eq!(rows[0].process_employee, "Carla Dias");
}

#[tokio::test]
async fn test_repeated_runs_append_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let portal = Portal::new();
    let termo = portal.termo("Ana", &[&["Camisa", "Polo", "M", "1"]]);
    portal.process("5", vec![("Termo Recebimento", termo)]);

    driver(&portal, &config).run(&[pn("5")]).await;
    driver(&portal, &config).run(&[pn("5")]).await;

    let store = RecordStore::open(&config.paths.store, &config.paths.backup_dir).unwrap();
    assert_eq!(store.len(), 2);
    assert_eq!(store.rows()[0], store.rows()[1]);
}

#[tokio::test]
async fn test_unwritable_store_falls_back_to_backup() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let portal = Portal::new();
    let termo = portal.termo("Ana", &[&["Camisa", "Polo", "M", "1"], &["Calça", "Jeans", "42", "2"]]);
    portal.process("00003.000001/2025-10", vec![("Termo Recebimento", termo)]);

    let mut driver = driver(&portal, &config);
    // The store is corrupted while the run is in progress
    std::fs::write(&config.paths.store, "PROCESSO\n1,2,3\n").unwrap();
    let before = std::fs::read(&config.paths.store).unwrap();

    let summary = driver.run(&[pn("00003.000001/2025-10")]).await;

    assert_eq!(std::fs::read(&config.paths.store).unwrap(), before);
    assert_eq!(summary.backups.len(), 1);
    assert_eq!(summary.items_saved, 0);

    let backup = &summary.backups[0];
    assert!(backup.starts_with(&config.paths.backup_dir));
    assert!(backup
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("backup_00003.000001_2F2025-10_"));
    let saved = CsvSheet.read_items(backup).unwrap();
    assert_eq!(saved.len(), 2);
}

/// Drives a real browser through a WebDriver server
#[tokio::test]
#[ignore] // Requires chromedriver on SEI_WEBDRIVER_URL and a reachable portal
async fn test_live_portal_login() {
    use sei_termos::browser::{BrowserSession, WebDriverSession};
    use sei_termos::portal::{Login, PortalLogin};

    let config = Config::load();
    let session = match WebDriverSession::connect(&config.webdriver, config.timeouts.command_timeout()).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Skipping test: {}", e);
            return;
        }
    };

    let result = PortalLogin::from_config(&config)
        .login(&session, &config.portal.url)
        .await;
    let _ = session.close().await;
    assert!(result.is_ok(), "Portal did not become ready: {:?}", result.err());
}
