//! Browser automation module
//!
//! Capability traits for pages and elements, a W3C WebDriver adapter, and an
//! in-memory page model that implements the same traits without a browser.

mod element;
mod locator;
mod memory;
mod wait;
mod webdriver;

pub use element::{BrowserSession, Element, UiElement};
pub use locator::{keys, By};
pub use memory::{Effect, MemoryBrowser, NodeId, NodeSpec};
pub use wait::{wait_for_element, WaitPolicy};
pub use webdriver::WebDriverSession;
