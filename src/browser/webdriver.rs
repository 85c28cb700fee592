//! W3C WebDriver adapter
//!
//! Async HTTP client for chromedriver (or any W3C WebDriver server)
//! implementing the browser capability traits.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::element::{BrowserSession, Element, UiElement};
use crate::browser::locator::By;
use crate::core::config::WebDriverConfig;
use crate::core::{Result, SeiError};

/// Key under which W3C servers return element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Envelope of every WebDriver response
#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    value: Value,
}

/// Error payload inside `value`
#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

/// New-session response payload
#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// Connection shared by a session and its elements
struct Connection {
    client: Client,
    /// `<server>/session/<id>/`
    session_url: Url,
}

impl Connection {
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = self
            .session_url
            .join(path)
            .map_err(|e| SeiError::webdriver(format!("Bad command path '{}': {}", path, e)))?;

        send(&self.client, method, url, body).await
    }

    async fn find(&self, path: &str, by: &By) -> Result<Vec<String>> {
        let (using, value) = by.to_w3c();
        let found = self
            .command(Method::POST, path, Some(json!({ "using": using, "value": value })))
            .await?;
        element_refs(&found)
    }
}

async fn send(client: &Client, method: Method, url: Url, body: Option<Value>) -> Result<Value> {
    let mut request = client.request(method.clone(), url.clone());
    if method == Method::POST {
        request = request.json(&body.unwrap_or_else(|| json!({})));
    }

    let response = request.send().await?;
    let status = response.status();
    let payload: WireResponse = response.json().await?;

    if status.is_success() {
        Ok(payload.value)
    } else {
        Err(wire_error(payload.value))
    }
}

fn wire_error(value: Value) -> SeiError {
    match serde_json::from_value::<WireError>(value) {
        Ok(err) if err.error == "no such element" => SeiError::NoSuchElement(err.message),
        Ok(err) if err.error == "no such frame" => SeiError::FrameNotFound(err.message),
        Ok(err) => SeiError::webdriver(format!("{}: {}", err.error, err.message)),
        Err(_) => SeiError::webdriver("Malformed error response"),
    }
}

fn element_refs(value: &Value) -> Result<Vec<String>> {
    let list = value
        .as_array()
        .ok_or_else(|| SeiError::webdriver("Expected a list of elements"))?;

    list.iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
                .ok_or_else(|| SeiError::webdriver("Element reference missing"))
        })
        .collect()
}

/// Session on a WebDriver server
pub struct WebDriverSession {
    conn: Arc<Connection>,
    session_id: String,
}

/// Element reference bound to a session
pub struct WebDriverElement {
    conn: Arc<Connection>,
    id: String,
}

impl Connection {
    fn element(self: &Arc<Self>, id: String) -> Element {
        Box::new(WebDriverElement {
            conn: Arc::clone(self),
            id,
        })
    }

    fn elements(self: &Arc<Self>, ids: Vec<String>) -> Vec<Element> {
        ids.into_iter().map(|id| self.element(id)).collect()
    }
}

impl WebDriverSession {
    /// Start a new browser session on the server named by `config.url`
    pub async fn connect(config: &WebDriverConfig, command_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(command_timeout)
            .build()
            .map_err(|e| SeiError::webdriver(format!("Failed to create HTTP client: {}", e)))?;

        let base = server_url(&config.url)?;
        let url = base
            .join("session")
            .map_err(|e| SeiError::webdriver(e.to_string()))?;

        let created = send(&client, Method::POST, url, Some(Self::capabilities(config)))
            .await
            .map_err(|e| match e {
                SeiError::Http(err) if err.is_connect() => SeiError::webdriver(format!(
                    "Cannot reach WebDriver at {}. Is chromedriver running?",
                    config.url
                )),
                other => other,
            })?;
        let created: NewSession = serde_json::from_value(created)?;

        let session_url = base
            .join(&format!("session/{}/", created.session_id))
            .map_err(|e| SeiError::webdriver(e.to_string()))?;

        info!(session = %created.session_id, headed = config.headed, "WebDriver session started");

        Ok(Self {
            conn: Arc::new(Connection {
                client,
                session_url,
            }),
            session_id: created.session_id,
        })
    }

    /// Session id assigned by the server
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn capabilities(config: &WebDriverConfig) -> Value {
        let mut args = config.args.clone();
        if !config.headed {
            args.push("--headless=new".to_string());
        }

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

/// Parse the server URL so that relative joins keep any path prefix
fn server_url(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized)
        .map_err(|e| SeiError::config(format!("Invalid WebDriver URL '{}': {}", raw, e)))
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&self, url: &str) -> Result<()> {
        debug!(url, "Navigating");
        self.conn
            .command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn find_elements(&self, by: &By) -> Result<Vec<Element>> {
        let ids = self.conn.find("elements", by).await?;
        Ok(self.conn.elements(ids))
    }

    async fn enter_frame(&self, frame: &dyn UiElement) -> Result<()> {
        self.conn
            .command(
                Method::POST,
                "frame",
                Some(json!({ "id": { ELEMENT_KEY: frame.reference() } })),
            )
            .await?;
        Ok(())
    }

    async fn default_content(&self) -> Result<()> {
        self.conn
            .command(Method::POST, "frame", Some(json!({ "id": null })))
            .await?;
        Ok(())
    }

    async fn page_source(&self) -> Result<String> {
        let value = self.conn.command(Method::GET, "source", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn screenshot(&self) -> Result<String> {
        let value = self.conn.command(Method::GET, "screenshot", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn close(&self) -> Result<()> {
        let url = Url::parse(self.conn.session_url.as_str().trim_end_matches('/'))
            .map_err(|e| SeiError::webdriver(e.to_string()))?;
        if let Err(e) = send(&self.conn.client, Method::DELETE, url, None).await {
            warn!(error = %e, "Failed to close WebDriver session");
            return Err(e);
        }
        info!(session = %self.session_id, "WebDriver session closed");
        Ok(())
    }
}

#[async_trait]
impl UiElement for WebDriverElement {
    fn reference(&self) -> &str {
        &self.id
    }

    async fn text(&self) -> Result<String> {
        let value = self
            .conn
            .command(Method::GET, &format!("element/{}/text", self.id), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn click(&self) -> Result<()> {
        self.conn
            .command(Method::POST, &format!("element/{}/click", self.id), None)
            .await?;
        Ok(())
    }

    async fn send_keys(&self, keys: &str) -> Result<()> {
        self.conn
            .command(
                Method::POST,
                &format!("element/{}/value", self.id),
                Some(json!({ "text": keys })),
            )
            .await?;
        Ok(())
    }

    async fn find_children(&self, by: &By) -> Result<Vec<Element>> {
        let ids = self
            .conn
            .find(&format!("element/{}/elements", self.id), by)
            .await?;
        Ok(self.conn.elements(ids))
    }

    async fn screenshot(&self) -> Result<String> {
        let value = self
            .conn
            .command(Method::GET, &format!("element/{}/screenshot", self.id), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_url_keeps_prefix() {
        let url = server_url("http://localhost:4444/wd/hub").unwrap();
        assert_eq!(
            url.join("session").unwrap().as_str(),
            "http://localhost:4444/wd/hub/session"
        );
    }

    #[test]
    fn test_element_refs() {
        let value = json!([{ ELEMENT_KEY: "a1" }, { ELEMENT_KEY: "b2" }]);
        assert_eq!(element_refs(&value).unwrap(), vec!["a1", "b2"]);
        assert!(element_refs(&json!({})).is_err());
    }

    #[test]
    fn test_wire_error_mapping() {
        let err = wire_error(json!({
            "error": "no such frame",
            "message": "frame ifrArvore",
            "stacktrace": ""
        }));
        assert!(matches!(err, SeiError::FrameNotFound(_)));

        let err = wire_error(json!({ "error": "stale element reference", "message": "gone" }));
        assert!(matches!(err, SeiError::WebDriver(_)));
    }

    #[test]
    fn test_headless_capabilities() {
        let config = WebDriverConfig {
            url: "http://localhost:9515".into(),
            headed: false,
            args: vec!["--window-size=1280,900".into()],
        };
        let caps = WebDriverSession::capabilities(&config);
        let args = &caps["capabilities"]["alwaysMatch"]["goog:chromeOptions"]["args"];
        assert_eq!(args[0], "--window-size=1280,900");
        assert_eq!(args[1], "--headless=new");
    }
}
