//! W3C WebDriver client
//!
//! Speaks the WebDriver JSON wire protocol over HTTP. Each client owns one
//! WebDriver session (one isolated browser profile). When no endpoint is
//! configured, the client spawns its own `chromedriver` child on a free
//! local port and kills it on `quit()` (or on drop, as a last resort).

use super::{DriverFactory, EditorDriver, ElementHandle, FrameTarget, Key, KeyInput, Selector};
use crate::error::DriverError;
use async_trait::async_trait;
use bpub_common::config::{ShortcutModifier, WebDriverConfig};
use bpub_common::{Clock, PollWait, WaitPolicy};
use reqwest::Method;
use serde_json::{json, Value};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// W3C element reference key
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Focus a form field, set its value and fire the input event
const FILL_SCRIPT: &str = "arguments[0].focus();\
     arguments[0].value = arguments[1];\
     arguments[0].dispatchEvent(new Event('input', { bubbles: true }));\
     return true;";

// Normalized key codepoints from the W3C WebDriver key table
const KEY_NULL: char = '\u{E000}';
const KEY_ENTER: char = '\u{E007}';
const KEY_CONTROL: char = '\u{E009}';
const KEY_END: char = '\u{E010}';
const KEY_ARROW_DOWN: char = '\u{E015}';
const KEY_META: char = '\u{E03D}';

/// Encode key input as a WebDriver "send keys" text payload
///
/// Modifiers are sticky within one payload, so every chord is closed with
/// the NULL key to release them.
pub fn encode_keys(input: &[KeyInput]) -> String {
    let mut out = String::new();
    for step in input {
        match step {
            KeyInput::Text(text) => out.push_str(text),
            KeyInput::Key(key) => out.push(key_char(*key)),
            KeyInput::Chord(modifier, key) => {
                out.push(match modifier {
                    ShortcutModifier::Control => KEY_CONTROL,
                    ShortcutModifier::Meta => KEY_META,
                });
                out.push(key_char(*key));
                out.push(KEY_NULL);
            }
        }
    }
    out
}

fn key_char(key: Key) -> char {
    match key {
        Key::Enter => KEY_ENTER,
        Key::ArrowDown => KEY_ARROW_DOWN,
        Key::End => KEY_END,
        Key::Char(c) => c,
    }
}

/// Script argument referring to an element
fn element_arg(element: &ElementHandle) -> Value {
    json!({ ELEMENT_KEY: element.0 })
}

fn map_error(status: u16, body: &Value) -> DriverError {
    let error = body["value"]["error"].as_str().unwrap_or("unknown error");
    let message = body["value"]["message"]
        .as_str()
        .unwrap_or_default()
        .lines()
        .next()
        .unwrap_or_default()
        .to_string();

    match error {
        "no such element" => DriverError::NoSuchElement(message),
        "stale element reference" => DriverError::StaleElement(message),
        "invalid session id" | "no such window" => DriverError::SessionLost(message),
        _ => DriverError::Command {
            error: format!("{} (HTTP {})", error, status),
            message,
        },
    }
}

fn parse_element(value: &Value) -> Option<ElementHandle> {
    value[ELEMENT_KEY].as_str().map(|id| ElementHandle(id.to_string()))
}

fn free_local_port() -> Result<u16, DriverError> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| DriverError::Launch(format!("no free port: {}", e)))?;
    let port = listener
        .local_addr()
        .map_err(|e| DriverError::Launch(format!("no free port: {}", e)))?
        .port();
    Ok(port)
}

/// WebDriver-backed [`EditorDriver`]
pub struct WebDriverClient {
    http: reqwest::Client,
    config: WebDriverConfig,
    clock: Arc<dyn Clock>,
    base_url: Option<String>,
    session_id: Option<String>,
    process: Option<Child>,
}

impl WebDriverClient {
    pub fn new(config: WebDriverConfig, clock: Arc<dyn Clock>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            http,
            config,
            clock,
            base_url: None,
            session_id: None,
            process: None,
        }
    }

    /// True while a WebDriver session is open
    pub fn is_active(&self) -> bool {
        self.session_id.is_some()
    }

    fn capabilities(&self) -> Value {
        let mut args = Vec::new();
        if self.config.headless {
            args.push("--headless=new".to_string());
        }
        args.push("--disable-blink-features=AutomationControlled".to_string());
        args.extend(self.config.browser_args.iter().cloned());

        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }

    async fn raw(
        &self,
        method: Method,
        url: String,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if status.is_success() {
            Ok(payload.get("value").cloned().unwrap_or(Value::Null))
        } else {
            Err(map_error(status.as_u16(), &payload))
        }
    }

    /// Issue a command scoped to the current session
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        let (Some(base), Some(session)) = (&self.base_url, &self.session_id) else {
            return Err(DriverError::NotStarted);
        };
        let url = format!("{}/session/{}{}", base, session, path);
        self.raw(method, url, body).await
    }

    async fn spawn_chromedriver(&mut self) -> Result<String, DriverError> {
        let port = free_local_port()?;
        let child = Command::new(&self.config.chromedriver_path)
            .arg(format!("--port={}", port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                DriverError::Launch(format!(
                    "{}: {}",
                    self.config.chromedriver_path.display(),
                    e
                ))
            })?;
        self.process = Some(child);

        let base = format!("http://127.0.0.1:{}", port);
        let policy = WaitPolicy::backoff(
            Duration::from_millis(self.config.startup_timeout_ms),
            Duration::from_millis(100),
            Duration::from_millis(1000),
        );
        let clock = self.clock.clone();
        let mut wait = PollWait::new(clock.as_ref(), policy, "chromedriver ready");
        loop {
            let ready = self
                .raw(Method::GET, format!("{}/status", base), None)
                .await
                .map(|v| v["ready"].as_bool().unwrap_or(false))
                .unwrap_or(false);
            if ready {
                break;
            }
            wait.tick()
                .await
                .map_err(|e| DriverError::Launch(e.to_string()))?;
        }

        info!(port, "chromedriver started");
        Ok(base)
    }

    async fn active_element(&self) -> Result<ElementHandle, DriverError> {
        let value = self.command(Method::GET, "/element/active", None).await?;
        parse_element(&value)
            .ok_or_else(|| DriverError::NoSuchElement("no focused element".to_string()))
    }
}

#[async_trait]
impl EditorDriver for WebDriverClient {
    async fn start(&mut self) -> Result<(), DriverError> {
        let base = match &self.config.url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => self.spawn_chromedriver().await?,
        };
        self.base_url = Some(base.clone());

        let value = self
            .raw(Method::POST, format!("{}/session", base), Some(self.capabilities()))
            .await?;
        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| DriverError::Launch("session response without sessionId".to_string()))?
            .to_string();

        info!(session_id = %session_id, "WebDriver session created");
        self.session_id = Some(session_id);
        Ok(())
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        let mut result = Ok(());

        if let (Some(base), Some(session)) = (self.base_url.clone(), self.session_id.take()) {
            let url = format!("{}/session/{}", base, session);
            if let Err(e) = self.raw(Method::DELETE, url, None).await {
                warn!(session_id = %session, error = %e, "Failed to delete WebDriver session");
                result = Err(e);
            } else {
                debug!(session_id = %session, "WebDriver session deleted");
            }
        }

        if let Some(mut child) = self.process.take() {
            if let Err(e) = child.kill().await {
                warn!("Failed to stop chromedriver: {}", e);
            }
        }
        result
    }

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(|_| ())
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        let value = self.command(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn delete_cookie(&mut self, name: &str) -> Result<(), DriverError> {
        self.command(Method::DELETE, &format!("/cookie/{}", name), None)
            .await
            .map(|_| ())
    }

    async fn find_all(&mut self, selector: &Selector) -> Result<Vec<ElementHandle>, DriverError> {
        let using = match selector {
            Selector::Css(_) => "css selector",
            Selector::XPath(_) => "xpath",
        };
        let value = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": using, "value": selector.value() })),
            )
            .await?;
        Ok(value
            .as_array()
            .map(|items| items.iter().filter_map(parse_element).collect())
            .unwrap_or_default())
    }

    async fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let value = self
            .command(
                Method::GET,
                &format!("/element/{}/attribute/{}", element.0, name),
                None,
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            &format!("/element/{}/click", element.0),
            Some(json!({})),
        )
        .await
        .map(|_| ())
    }

    async fn send_keys_to(
        &mut self,
        element: &ElementHandle,
        input: &[KeyInput],
    ) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.0),
            Some(json!({ "text": encode_keys(input) })),
        )
        .await
        .map(|_| ())
    }

    async fn send_keys(&mut self, input: &[KeyInput]) -> Result<(), DriverError> {
        let focused = self.active_element().await?;
        self.send_keys_to(&focused, input).await
    }

    async fn upload_file(
        &mut self,
        input: &ElementHandle,
        path: &Path,
    ) -> Result<(), DriverError> {
        let absolute = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.command(
            Method::POST,
            &format!("/element/{}/value", input.0),
            Some(json!({ "text": absolute.to_string_lossy() })),
        )
        .await
        .map(|_| ())
    }

    async fn switch_frame(&mut self, target: &FrameTarget) -> Result<(), DriverError> {
        let id = match target {
            FrameTarget::Top => Value::Null,
            FrameTarget::Element(element) => element_arg(element),
        };
        self.command(Method::POST, "/frame", Some(json!({ "id": id })))
            .await
            .map(|_| ())
    }

    async fn fill(&mut self, element: &ElementHandle, value: &str) -> Result<(), DriverError> {
        let args = json!([element_arg(element), value]);
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": FILL_SCRIPT, "args": args })),
        )
        .await
        .map(|_| ())
    }
}

/// Creates one [`WebDriverClient`] per publish attempt
#[derive(Clone)]
pub struct WebDriverFactory {
    config: WebDriverConfig,
    clock: Arc<dyn Clock>,
}

impl WebDriverFactory {
    pub fn new(config: WebDriverConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }
}

impl DriverFactory for WebDriverFactory {
    type Driver = WebDriverClient;

    fn create(&self) -> WebDriverClient {
        WebDriverClient::new(self.config.clone(), self.clock.clone())
    }
}
