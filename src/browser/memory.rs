//! In-memory page model
//!
//! A tiny DOM with documents, iframes and scripted click/submit effects. It
//! implements [`BrowserSession`] and [`UiElement`] with the same frame rules a
//! real browser applies: lookups only see the current frame, and elements of
//! another frame cannot be used until that frame is entered again.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::browser::element::{BrowserSession, Element, UiElement};
use crate::browser::locator::{keys, By};
use crate::core::{Result, SeiError};

/// Index of a node in the page model
pub type NodeId = usize;

/// Description of a node to append
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    text: String,
}

impl NodeSpec {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_lowercase(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// Scripted reaction to a click or a submitted search
#[derive(Debug, Clone)]
pub enum Effect {
    /// Point an iframe at another document
    LoadFrame { frame: NodeId, document: NodeId },
    /// Attach a detached node under `parent`
    Attach { parent: NodeId, node: NodeId },
    /// Remove a node from its parent
    Detach(NodeId),
    /// Make the interaction itself fail
    Fail(String),
}

#[derive(Debug, Default)]
struct Node {
    spec: NodeSpec,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Document shown by an iframe
    content: Option<NodeId>,
    on_click: Vec<Effect>,
    on_submit: HashMap<String, Vec<Effect>>,
    typed: String,
}

#[derive(Debug)]
struct PageState {
    nodes: Vec<Node>,
    root: NodeId,
    current: NodeId,
    visited: Vec<String>,
    submitted: Vec<String>,
}

impl PageState {
    fn new() -> Self {
        let mut state = Self {
            nodes: Vec::new(),
            root: 0,
            current: 0,
            visited: Vec::new(),
            submitted: Vec::new(),
        };
        state.root = state.document();
        state.current = state.root;
        state
    }

    fn document(&mut self) -> NodeId {
        self.nodes.push(Node {
            spec: NodeSpec::new("#document"),
            ..Default::default()
        });
        self.nodes.len() - 1
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| SeiError::NoSuchElement(format!("node {}", id)))
    }

    fn attach(&mut self, parent: NodeId, node: NodeId) {
        if self.nodes[node].parent == Some(parent) {
            return;
        }
        self.detach(node);
        self.nodes[node].parent = Some(parent);
        self.nodes[parent].children.push(node);
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node].parent.take() {
            self.nodes[parent].children.retain(|&c| c != node);
        }
    }

    /// Document a node currently lives in, if it is attached to one
    fn owner_document(&self, mut node: NodeId) -> Option<NodeId> {
        loop {
            let n = self.nodes.get(node)?;
            match n.parent {
                Some(parent) => node = parent,
                None => return (n.spec.tag == "#document").then_some(node),
            }
        }
    }

    /// Reject elements that are not part of the current frame
    fn ensure_current(&self, node: NodeId) -> Result<()> {
        if self.owner_document(node) == Some(self.current) {
            Ok(())
        } else {
            Err(SeiError::NoSuchElement(format!(
                "node {} is not in the current frame",
                node
            )))
        }
    }

    fn matches(&self, node: NodeId, by: &By) -> Result<bool> {
        let spec = &self.nodes[node].spec;
        Ok(match by {
            By::Id(id) => spec.id.as_deref() == Some(id.as_str()),
            By::ClassName(class) => spec.classes.iter().any(|c| c == class),
            By::TagName(tag) => spec.tag.eq_ignore_ascii_case(tag),
            By::Css(selector) => {
                if let Some(id) = selector.strip_prefix('#') {
                    spec.id.as_deref() == Some(id)
                } else if let Some(class) = selector.strip_prefix('.') {
                    spec.classes.iter().any(|c| c == class)
                } else if selector.chars().all(|c| c.is_ascii_alphanumeric()) {
                    spec.tag.eq_ignore_ascii_case(selector)
                } else {
                    return Err(SeiError::Unsupported(by.to_string()));
                }
            }
            By::XPath(_) => return Err(SeiError::Unsupported(by.to_string())),
        })
    }

    /// Descendants of `from` in document order, not crossing into iframes
    fn descendants(&self, from: NodeId, by: &By) -> Result<Vec<NodeId>> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[from].children.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.matches(node, by)? {
                found.push(node);
            }
            stack.extend(self.nodes[node].children.iter().rev().copied());
        }
        Ok(found)
    }

    fn text(&self, node: NodeId) -> String {
        let n = &self.nodes[node];
        let mut parts = Vec::new();
        if !n.spec.text.is_empty() {
            parts.push(n.spec.text.clone());
        }
        for &child in &n.children {
            let t = self.text(child);
            if !t.is_empty() {
                parts.push(t);
            }
        }
        parts.join(" ")
    }

    fn apply(&mut self, effects: &[Effect]) -> Result<()> {
        for effect in effects {
            match effect {
                Effect::LoadFrame { frame, document } => self.nodes[*frame].content = Some(*document),
                Effect::Attach { parent, node } => self.attach(*parent, *node),
                Effect::Detach(node) => self.detach(*node),
                Effect::Fail(message) => return Err(SeiError::webdriver(message.clone())),
            }
        }
        Ok(())
    }

    fn markup(&self, node: NodeId, out: &mut String) {
        let n = &self.nodes[node];
        let is_document = n.spec.tag == "#document";
        if !is_document {
            out.push('<');
            out.push_str(&n.spec.tag);
            if let Some(id) = &n.spec.id {
                out.push_str(&format!(" id=\"{}\"", id));
            }
            if !n.spec.classes.is_empty() {
                out.push_str(&format!(" class=\"{}\"", n.spec.classes.join(" ")));
            }
            out.push('>');
        }
        out.push_str(&n.spec.text);
        for &child in &n.children {
            self.markup(child, out);
        }
        if !is_document {
            out.push_str(&format!("</{}>", n.spec.tag));
        }
    }
}

/// Headless page model implementing the browser traits
#[derive(Clone)]
pub struct MemoryBrowser {
    state: Arc<Mutex<PageState>>,
}

impl MemoryBrowser {
    /// Create a model with an empty top-level document
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PageState::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Top-level document
    pub fn root(&self) -> NodeId {
        self.lock().root
    }

    /// Create a detached document, e.g. for an iframe to load later
    pub fn new_document(&self) -> NodeId {
        self.lock().document()
    }

    /// Append a node under `parent` and return its id
    pub fn append(&self, parent: NodeId, spec: NodeSpec) -> NodeId {
        let node = self.detached(spec);
        self.lock().attach(parent, node);
        node
    }

    /// Create a node that is not attached anywhere yet
    pub fn detached(&self, spec: NodeSpec) -> NodeId {
        let mut state = self.lock();
        state.nodes.push(Node {
            spec,
            ..Default::default()
        });
        state.nodes.len() - 1
    }

    /// Append an iframe showing `document`
    pub fn append_frame(&self, parent: NodeId, id: &str, document: Option<NodeId>) -> NodeId {
        let frame = self.append(parent, NodeSpec::new("iframe").id(id));
        self.lock().nodes[frame].content = document;
        frame
    }

    /// Append a table; the first row is the header
    pub fn append_table(&self, parent: NodeId, rows: &[&[&str]]) -> NodeId {
        let table = self.append(parent, NodeSpec::new("table"));
        let body = self.append(table, NodeSpec::new("tbody"));
        for row in rows {
            let tr = self.append(body, NodeSpec::new("tr"));
            for cell in row.iter() {
                self.append(tr, NodeSpec::new("td").text(*cell));
            }
        }
        table
    }

    /// Register an effect for clicks on `node`
    pub fn on_click(&self, node: NodeId, effect: Effect) {
        self.lock().nodes[node].on_click.push(effect);
    }

    /// Register an effect for `query` submitted with Enter in `input`
    pub fn on_submit(&self, input: NodeId, query: &str, effect: Effect) {
        self.lock().nodes[input]
            .on_submit
            .entry(query.to_string())
            .or_default()
            .push(effect);
    }

    /// Document the session currently looks at
    pub fn current_document(&self) -> NodeId {
        self.lock().current
    }

    /// Queries submitted so far
    pub fn submitted(&self) -> Vec<String> {
        self.lock().submitted.clone()
    }

    /// URLs navigated to so far
    pub fn visited(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    fn element(&self, node: NodeId) -> Element {
        Box::new(MemoryElement {
            browser: self.clone(),
            node,
            reference: node.to_string(),
        })
    }
}

impl Default for MemoryBrowser {
    fn default() -> Self {
        Self::new()
    }
}

/// Element handle into a [`MemoryBrowser`]
pub struct MemoryElement {
    browser: MemoryBrowser,
    node: NodeId,
    reference: String,
}

#[async_trait]
impl BrowserSession for MemoryBrowser {
    async fn goto(&self, url: &str) -> Result<()> {
        let mut state = self.lock();
        state.visited.push(url.to_string());
        state.current = state.root;
        Ok(())
    }

    async fn find_elements(&self, by: &By) -> Result<Vec<Element>> {
        let ids = {
            let state = self.lock();
            state.descendants(state.current, by)?
        };
        Ok(ids.into_iter().map(|id| self.element(id)).collect())
    }

    async fn enter_frame(&self, frame: &dyn UiElement) -> Result<()> {
        let node: NodeId = frame
            .reference()
            .parse()
            .map_err(|_| SeiError::FrameNotFound(frame.reference().to_string()))?;

        let mut state = self.lock();
        state.ensure_current(node)?;
        let content = state
            .node(node)?
            .content
            .ok_or_else(|| SeiError::FrameNotFound(node.to_string()))?;
        state.current = content;
        Ok(())
    }

    async fn default_content(&self) -> Result<()> {
        let mut state = self.lock();
        state.current = state.root;
        Ok(())
    }

    async fn page_source(&self) -> Result<String> {
        let state = self.lock();
        let mut out = String::from("<html>");
        state.markup(state.current, &mut out);
        out.push_str("</html>");
        Ok(out)
    }

    async fn screenshot(&self) -> Result<String> {
        Ok(String::new())
    }
}

#[async_trait]
impl UiElement for MemoryElement {
    fn reference(&self) -> &str {
        &self.reference
    }

    async fn text(&self) -> Result<String> {
        let state = self.browser.lock();
        state.ensure_current(self.node)?;
        Ok(state.text(self.node))
    }

    async fn click(&self) -> Result<()> {
        let mut state = self.browser.lock();
        state.ensure_current(self.node)?;
        let effects = state.nodes[self.node].on_click.clone();
        state.apply(&effects)
    }

    async fn send_keys(&self, keys: &str) -> Result<()> {
        let mut state = self.browser.lock();
        state.ensure_current(self.node)?;

        for ch in keys.chars() {
            if ch == keys::ENTER {
                let query = std::mem::take(&mut state.nodes[self.node].typed);
                let query = query.trim().to_string();
                let effects = state.nodes[self.node]
                    .on_submit
                    .get(&query)
                    .cloned()
                    .unwrap_or_default();
                state.submitted.push(query);
                state.apply(&effects)?;
            } else {
                state.nodes[self.node].typed.push(ch);
            }
        }
        Ok(())
    }

    async fn find_children(&self, by: &By) -> Result<Vec<Element>> {
        let ids = {
            let state = self.browser.lock();
            state.ensure_current(self.node)?;
            state.descendants(self.node, by)?
        };
        Ok(ids.into_iter().map(|id| self.browser.element(id)).collect())
    }

    async fn screenshot(&self) -> Result<String> {
        self.browser.lock().ensure_current(self.node)?;
        Ok(String::new())
    }
}
