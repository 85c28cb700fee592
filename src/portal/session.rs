//! Portal login
//!
//! The operator authenticates by hand in the headed browser; the login step
//! only opens the portal and waits for the workspace to show up.

use async_trait::async_trait;
use tracing::info;

use crate::browser::{wait_for_element, BrowserSession, By, WaitPolicy};
use crate::core::{Config, Result};

/// Gets a session to the point where processes can be searched
#[async_trait]
pub trait Login: Send + Sync {
    async fn login(&self, session: &dyn BrowserSession, url: &str) -> Result<()>;
}

/// Opens the portal URL and waits for the workspace element
#[derive(Debug, Clone)]
pub struct PortalLogin {
    ready: By,
    policy: WaitPolicy,
}

impl PortalLogin {
    pub fn new(ready_element_id: impl Into<String>, policy: WaitPolicy) -> Self {
        Self {
            ready: By::Id(ready_element_id.into()),
            policy,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.portal.ready_element_id.clone(),
            config.timeouts.page_ready_policy(),
        )
    }
}

#[async_trait]
impl Login for PortalLogin {
    async fn login(&self, session: &dyn BrowserSession, url: &str) -> Result<()> {
        session.goto(url).await?;
        info!(url, timeout_secs = self.policy.timeout.as_secs(), "Waiting for the portal workspace");
        wait_for_element(session, &self.ready, self.policy).await?;
        info!("Portal ready");
        Ok(())
    }
}
