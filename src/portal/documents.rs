//! Document lookup in the process tree
//!
//! Searches a process number and lists the tree anchors whose title starts
//! with the configured prefix.

use tracing::{info, warn};

use crate::browser::{keys, wait_for_element, By, Element};
use crate::core::{Config, ProcessNumber, Result, SeiError};
use crate::portal::frames::FrameNavigator;

/// A matching document in the tree of the current process
pub struct Document {
    /// Position among the matching documents, starting at 1
    pub index: usize,
    /// Trimmed anchor text
    pub title: String,
    /// Anchor to click to open the document
    pub link: Element,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("index", &self.index)
            .field("title", &self.title)
            .field("link", &self.link.reference())
            .finish()
    }
}

/// Finds the documents of a process
#[derive(Debug, Clone)]
pub struct DocumentLocator {
    search_input: By,
    list_frame: String,
    tree_container: By,
    /// Lower-cased title prefix
    prefix: String,
}

impl DocumentLocator {
    pub fn new(
        search_input_id: impl Into<String>,
        list_frame: impl Into<String>,
        tree_container_id: impl Into<String>,
        prefix: &str,
    ) -> Self {
        Self {
            search_input: By::Id(search_input_id.into()),
            list_frame: list_frame.into(),
            tree_container: By::Id(tree_container_id.into()),
            prefix: prefix.trim().to_lowercase(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.portal.search_input_id.clone(),
            config.frames.list_frame.clone(),
            config.frames.tree_container.clone(),
            &config.extraction.title_prefix,
        )
    }

    /// Frame holding the tree
    pub fn list_frame(&self) -> &str {
        &self.list_frame
    }

    /// Case-insensitive prefix test on a trimmed title
    pub fn matches_prefix(&self, title: &str) -> bool {
        title.trim().to_lowercase().starts_with(&self.prefix)
    }

    /// Search, enter the tree and return the matching documents
    pub async fn find_matching_documents(
        &self,
        nav: &mut FrameNavigator,
        process: &ProcessNumber,
    ) -> Result<Vec<Document>> {
        self.submit_search(nav, process).await?;
        self.list_documents(nav, process).await
    }

    /// Type the process number into the quick search and press Enter.
    ///
    /// Runs from the root document.
    pub async fn submit_search(&self, nav: &mut FrameNavigator, process: &ProcessNumber) -> Result<()> {
        if !nav.at_root() {
            nav.reset_to_root().await?;
        }

        let input = wait_for_element(nav.session().as_ref(), &self.search_input, nav.policy()).await?;
        input
            .send_keys(&format!("{}{}", process.as_str(), keys::ENTER))
            .await?;
        info!(process = %process, "Search submitted");
        Ok(())
    }

    /// Enter the list frame and collect the matching tree anchors.
    ///
    /// A missing frame or container is `TreeNotFound`; an empty match list is
    /// not an error.
    pub async fn list_documents(
        &self,
        nav: &mut FrameNavigator,
        process: &ProcessNumber,
    ) -> Result<Vec<Document>> {
        let tree_lost = |reason: &SeiError| {
            warn!(process = %process, error = %reason, "Document tree unavailable");
            SeiError::TreeNotFound(process.to_string())
        };

        nav.enter(&self.list_frame).await.map_err(|e| tree_lost(&e))?;

        let container = wait_for_element(nav.session().as_ref(), &self.tree_container, nav.policy())
            .await
            .map_err(|e| tree_lost(&e))?;
        info!(process = %process, "Document tree located");

        let anchors = container
            .find_children(&By::tag_name("a"))
            .await
            .map_err(|e| tree_lost(&e))?;

        let mut documents = Vec::new();
        for anchor in anchors {
            let title = match anchor.text().await {
                Ok(text) => text.trim().to_string(),
                Err(e) => {
                    warn!(process = %process, error = %e, "Skipping unreadable tree entry");
                    continue;
                }
            };

            if self.matches_prefix(&title) {
                documents.push(Document {
                    index: documents.len() + 1,
                    title,
                    link: anchor,
                });
            }
        }

        if documents.is_empty() {
            info!(process = %process, prefix = %self.prefix, "No matching documents found");
        } else {
            info!(process = %process, count = documents.len(), "Matching documents found");
        }

        Ok(documents)
    }
}
