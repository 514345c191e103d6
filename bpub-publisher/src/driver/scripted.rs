//! In-memory scripted driver
//!
//! Simulates just enough of a browser for the publish protocol to run
//! end-to-end without one: selectors resolve from a presence table, clicks
//! and uploads trigger scripted effects (navigation, elements appearing or
//! disappearing), and every command is appended to an action log.
//!
//! Used by the test suites and by `bpub publish --dry-run`, which rehearses
//! the full action sequence against [`ScriptedDriver::rehearsal`].

use super::{DriverFactory, EditorDriver, ElementHandle, FrameTarget, KeyInput, Selector};
use crate::affordances;
use crate::error::DriverError;
use async_trait::async_trait;
use bpub_common::config::EditorConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// One recorded driver command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverAction {
    Start,
    Quit,
    Navigate(String),
    DeleteCookie(String),
    /// Selector text of the clicked element
    Click(String),
    SendKeysTo(String, Vec<KeyInput>),
    SendKeys(Vec<KeyInput>),
    Upload(String, PathBuf),
    /// `None` = top-level page
    SwitchFrame(Option<String>),
    Fill(String, String),
}

/// Scripted reaction to a click or upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Top-level location changes
    Navigate(String),
    /// Selector starts matching one element
    Show(String),
    /// Selector stops matching
    Hide(String),
}

pub type ActionLog = Arc<Mutex<Vec<DriverAction>>>;

/// Scripted [`EditorDriver`]
#[derive(Debug, Clone)]
pub struct ScriptedDriver {
    permissive: bool,
    present: HashMap<String, usize>,
    attributes: HashMap<(String, String), String>,
    click_effects: HashMap<String, Vec<Effect>>,
    upload_effects: Vec<Effect>,
    failing_text: Vec<String>,
    fatal_text: Option<String>,
    fail_start: Option<String>,
    lose_session_after: Option<usize>,
    commands: usize,
    lost: bool,
    url: String,
    started: bool,
    log: ActionLog,
}

impl Default for ScriptedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedDriver {
    /// Strict driver: no selector matches unless declared
    pub fn new() -> Self {
        Self {
            permissive: false,
            present: HashMap::new(),
            attributes: HashMap::new(),
            click_effects: HashMap::new(),
            upload_effects: Vec::new(),
            failing_text: Vec::new(),
            fatal_text: None,
            fail_start: None,
            lose_session_after: None,
            commands: 0,
            lost: false,
            url: "about:blank".to_string(),
            started: false,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every selector matches one element unless declared otherwise
    pub fn permissive(mut self) -> Self {
        self.permissive = true;
        self
    }

    /// Declare how many elements a selector matches (0 = absent)
    pub fn with_elements(mut self, selector: &Selector, count: usize) -> Self {
        self.present.insert(selector.value().to_string(), count);
        self
    }

    pub fn with_element(self, selector: &Selector) -> Self {
        self.with_elements(selector, 1)
    }

    pub fn without(self, selector: &Selector) -> Self {
        self.with_elements(selector, 0)
    }

    pub fn with_attribute(mut self, selector: &Selector, name: &str, value: &str) -> Self {
        self.attributes.insert(
            (selector.value().to_string(), name.to_string()),
            value.to_string(),
        );
        self
    }

    pub fn on_click(mut self, selector: &Selector, effect: Effect) -> Self {
        self.click_effects
            .entry(selector.value().to_string())
            .or_default()
            .push(effect);
        self
    }

    pub fn on_upload(mut self, effect: Effect) -> Self {
        self.upload_effects.push(effect);
        self
    }

    /// Typing text containing `needle` fails with a command error
    pub fn failing_text(mut self, needle: impl Into<String>) -> Self {
        self.failing_text.push(needle.into());
        self
    }

    /// Typing text containing `needle` kills the session
    pub fn losing_session_on(mut self, needle: impl Into<String>) -> Self {
        self.fatal_text = Some(needle.into());
        self
    }

    pub fn failing_start(mut self, message: impl Into<String>) -> Self {
        self.fail_start = Some(message.into());
        self
    }

    /// After `n` commands every further command reports a lost session
    pub fn lose_session_after(mut self, n: usize) -> Self {
        self.lose_session_after = Some(n);
        self
    }

    pub fn at_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Give this driver its own, empty action log
    pub fn with_fresh_log(mut self) -> Self {
        self.log = Arc::new(Mutex::new(Vec::new()));
        self
    }

    /// Shared handle to the action log
    pub fn log_handle(&self) -> ActionLog {
        self.log.clone()
    }

    /// Snapshot of the recorded actions
    pub fn actions(&self) -> Vec<DriverAction> {
        snapshot(&self.log)
    }

    /// Rehearsal surface for dry runs: the whole editor is present, login
    /// succeeds, media settles immediately and publishing redirects to a
    /// placeholder post URL.
    pub fn rehearsal(editor: &EditorConfig) -> Self {
        let mut driver = Self::new().permissive();
        for selector in affordances::media_in_progress().strategies() {
            driver = driver.without(selector);
        }
        if let Some(submit) = affordances::login_submit().strategies().first() {
            driver = driver.on_click(submit, Effect::Navigate(home_url(editor)));
        }
        if let Some(confirm) = affordances::publish_confirm().strategies().first() {
            driver = driver.on_click(
                confirm,
                Effect::Navigate(format!("{}rehearsal/PostView", home_url(editor))),
            );
        }
        driver
    }

    fn record(&self, action: DriverAction) {
        self.log
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(action);
    }

    /// Bookkeeping shared by all commands
    fn command(&mut self) -> Result<(), DriverError> {
        if !self.started {
            return Err(DriverError::NotStarted);
        }
        self.commands += 1;
        if let Some(limit) = self.lose_session_after {
            if self.commands > limit {
                self.lost = true;
            }
        }
        if self.lost {
            return Err(DriverError::SessionLost("scripted session loss".to_string()));
        }
        Ok(())
    }

    fn count(&self, selector: &str) -> usize {
        match self.present.get(selector) {
            Some(count) => *count,
            None if self.permissive => 1,
            None => 0,
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Navigate(url) => self.url = url,
                Effect::Show(selector) => {
                    self.present.insert(selector, 1);
                }
                Effect::Hide(selector) => {
                    self.present.insert(selector, 0);
                }
            }
        }
    }

    fn check_text(&mut self, input: &[KeyInput]) -> Result<(), DriverError> {
        for step in input {
            if let KeyInput::Text(text) = step {
                if self.fatal_text.as_deref().is_some_and(|n| text.contains(n)) {
                    self.lost = true;
                    return Err(DriverError::SessionLost("browser window closed".to_string()));
                }
                if let Some(needle) = self.failing_text.iter().find(|n| text.contains(n.as_str())) {
                    return Err(DriverError::Command {
                        error: "element not interactable".to_string(),
                        message: format!("scripted failure on {:?}", needle),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Snapshot of a shared action log
pub fn snapshot(log: &ActionLog) -> Vec<DriverAction> {
    log.lock().unwrap_or_else(|p| p.into_inner()).clone()
}

fn home_url(editor: &EditorConfig) -> String {
    let write = &editor.write_url;
    match write.find("://").and_then(|i| write[i + 3..].find('/').map(|j| i + 3 + j)) {
        Some(end) => format!("{}/", &write[..end]),
        None => "about:blank".to_string(),
    }
}

fn selector_of(element: &ElementHandle) -> &str {
    element
        .0
        .rsplit_once("::")
        .map(|(selector, _)| selector)
        .unwrap_or(&element.0)
}

#[async_trait]
impl EditorDriver for ScriptedDriver {
    async fn start(&mut self) -> Result<(), DriverError> {
        if let Some(message) = &self.fail_start {
            return Err(DriverError::Launch(message.clone()));
        }
        self.started = true;
        self.record(DriverAction::Start);
        Ok(())
    }

    async fn quit(&mut self) -> Result<(), DriverError> {
        if self.started {
            self.started = false;
            self.record(DriverAction::Quit);
        }
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.command()?;
        self.url = url.to_string();
        self.record(DriverAction::Navigate(url.to_string()));
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        self.command()?;
        Ok(self.url.clone())
    }

    async fn delete_cookie(&mut self, name: &str) -> Result<(), DriverError> {
        self.command()?;
        self.record(DriverAction::DeleteCookie(name.to_string()));
        Ok(())
    }

    async fn find_all(&mut self, selector: &Selector) -> Result<Vec<ElementHandle>, DriverError> {
        self.command()?;
        let count = self.count(selector.value());
        Ok((0..count)
            .map(|i| ElementHandle(format!("{}::{}", selector.value(), i)))
            .collect())
    }

    async fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.command()?;
        let key = (selector_of(element).to_string(), name.to_string());
        Ok(self.attributes.get(&key).cloned())
    }

    async fn click(&mut self, element: &ElementHandle) -> Result<(), DriverError> {
        self.command()?;
        let selector = selector_of(element).to_string();
        self.record(DriverAction::Click(selector.clone()));
        let effects = self.click_effects.get(&selector).cloned().unwrap_or_default();
        self.apply(effects);
        Ok(())
    }

    async fn send_keys_to(
        &mut self,
        element: &ElementHandle,
        input: &[KeyInput],
    ) -> Result<(), DriverError> {
        self.command()?;
        self.check_text(input)?;
        self.record(DriverAction::SendKeysTo(
            selector_of(element).to_string(),
            input.to_vec(),
        ));
        Ok(())
    }

    async fn send_keys(&mut self, input: &[KeyInput]) -> Result<(), DriverError> {
        self.command()?;
        self.check_text(input)?;
        self.record(DriverAction::SendKeys(input.to_vec()));
        Ok(())
    }

    async fn upload_file(
        &mut self,
        input: &ElementHandle,
        path: &Path,
    ) -> Result<(), DriverError> {
        self.command()?;
        self.record(DriverAction::Upload(
            selector_of(input).to_string(),
            path.to_path_buf(),
        ));
        let effects = self.upload_effects.clone();
        self.apply(effects);
        Ok(())
    }

    async fn switch_frame(&mut self, target: &FrameTarget) -> Result<(), DriverError> {
        self.command()?;
        let frame = match target {
            FrameTarget::Top => None,
            FrameTarget::Element(element) => Some(selector_of(element).to_string()),
        };
        self.record(DriverAction::SwitchFrame(frame));
        Ok(())
    }

    async fn fill(&mut self, element: &ElementHandle, value: &str) -> Result<(), DriverError> {
        self.command()?;
        self.check_text(&[KeyInput::Text(value.to_string())])?;
        self.record(DriverAction::Fill(
            selector_of(element).to_string(),
            value.to_string(),
        ));
        Ok(())
    }
}

/// Hands out clones of a template driver, each with its own action log
#[derive(Debug, Clone)]
pub struct ScriptedDriverFactory {
    template: ScriptedDriver,
    logs: Arc<Mutex<Vec<ActionLog>>>,
}

impl ScriptedDriverFactory {
    pub fn new(template: ScriptedDriver) -> Self {
        Self {
            template,
            logs: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Action logs of every driver created so far, in creation order
    pub fn logs(&self) -> Vec<Vec<DriverAction>> {
        self.logs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .map(snapshot)
            .collect()
    }
}

impl DriverFactory for ScriptedDriverFactory {
    type Driver = ScriptedDriver;

    fn create(&self) -> ScriptedDriver {
        let driver = self.template.clone().with_fresh_log();
        self.logs
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(driver.log_handle());
        driver
    }
}
