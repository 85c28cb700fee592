//! Capability traits the portal workflow is written against
//!
//! Enables swapping the WebDriver adapter for the in-memory page model.

use async_trait::async_trait;

use crate::browser::locator::By;
use crate::core::{Result, SeiError};

/// Owned handle to an element of some session
pub type Element = Box<dyn UiElement>;

/// An element on the current page
#[async_trait]
pub trait UiElement: Send + Sync {
    /// Session-scoped reference, stable for the lifetime of the element
    fn reference(&self) -> &str;

    /// Rendered text of the element and its descendants
    async fn text(&self) -> Result<String>;

    /// Click the element
    async fn click(&self) -> Result<()>;

    /// Type into the element
    async fn send_keys(&self, keys: &str) -> Result<()>;

    /// Descendants matching a locator, in document order
    async fn find_children(&self, by: &By) -> Result<Vec<Element>>;

    /// Base64 PNG of the element
    async fn screenshot(&self) -> Result<String>;
}

/// A browsing session with a current frame context
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate the top-level context
    async fn goto(&self, url: &str) -> Result<()>;

    /// Elements of the current context matching a locator
    async fn find_elements(&self, by: &By) -> Result<Vec<Element>>;

    /// Switch into the frame backed by `frame`, relative to the current context
    async fn enter_frame(&self, frame: &dyn UiElement) -> Result<()>;

    /// Switch back to the top-level document
    async fn default_content(&self) -> Result<()>;

    /// Markup of the current context
    async fn page_source(&self) -> Result<String>;

    /// Base64 PNG of the viewport
    async fn screenshot(&self) -> Result<String>;

    /// End the session
    async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// First element matching a locator, without waiting
    async fn find_element(&self, by: &By) -> Result<Element> {
        self.find_elements(by)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| SeiError::NoSuchElement(by.to_string()))
    }
}
