//! Frame navigation with a tracked context stack
//!
//! Frame switches are relative to the current context, so the navigator keeps
//! the path it descended and can always return to the top-level document.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::browser::{wait_for_element, BrowserSession, By, WaitPolicy};
use crate::core::{Result, SeiError};

/// Proof of a successful frame entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHandle {
    /// Identifier of the entered frame
    pub id: String,
    /// Nesting depth after entering (1 = child of the root document)
    pub depth: usize,
}

/// Tracks which frame the session is looking at
pub struct FrameNavigator {
    session: Arc<dyn BrowserSession>,
    policy: WaitPolicy,
    stack: Vec<String>,
}

impl FrameNavigator {
    /// Create a navigator that assumes the session is at the root document
    pub fn new(session: Arc<dyn BrowserSession>, policy: WaitPolicy) -> Self {
        Self {
            session,
            policy,
            stack: Vec::new(),
        }
    }

    /// Session the navigator switches
    pub fn session(&self) -> &Arc<dyn BrowserSession> {
        &self.session
    }

    /// Wait policy used for frame lookups
    pub fn policy(&self) -> WaitPolicy {
        self.policy
    }

    /// Wait for the frame with id `frame_id` in the current context and enter it
    pub async fn enter(&mut self, frame_id: &str) -> Result<FrameHandle> {
        let frame = match wait_for_element(self.session.as_ref(), &By::id(frame_id), self.policy).await {
            Ok(frame) => frame,
            Err(SeiError::ElementWaitTimeout { .. }) => {
                error!(frame = frame_id, "Frame not found");
                return Err(SeiError::FrameNotFound(frame_id.to_string()));
            }
            Err(e) => return Err(e),
        };

        if let Err(e) = self.session.enter_frame(frame.as_ref()).await {
            error!(frame = frame_id, error = %e, "Could not switch into frame");
            return Err(match e {
                SeiError::FrameNotFound(_) | SeiError::NoSuchElement(_) | SeiError::WebDriver(_) => {
                    SeiError::FrameNotFound(frame_id.to_string())
                }
                other => other,
            });
        }

        self.stack.push(frame_id.to_string());
        info!(frame = frame_id, depth = self.stack.len(), "Frame selected");

        Ok(FrameHandle {
            id: frame_id.to_string(),
            depth: self.stack.len(),
        })
    }

    /// Enter each frame of `path` in order; stops at the first failure
    pub async fn enter_path(&mut self, path: &[String]) -> Result<FrameHandle> {
        let mut handle = None;
        for frame_id in path {
            handle = Some(self.enter(frame_id).await?);
        }
        handle.ok_or_else(|| SeiError::config("Empty frame path"))
    }

    /// Return to the top-level document, whatever the depth
    pub async fn reset_to_root(&mut self) -> Result<()> {
        let depth = self.stack.len();
        self.stack.clear();
        self.session.default_content().await?;
        debug!(from_depth = depth, "Returned to root context");
        Ok(())
    }

    /// Frames entered since the root, outermost first
    pub fn current_context(&self) -> &[String] {
        &self.stack
    }

    /// Whether the session is at the top-level document
    pub fn at_root(&self) -> bool {
        self.stack.is_empty()
    }
}
