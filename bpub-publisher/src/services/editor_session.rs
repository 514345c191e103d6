//! Editor session
//!
//! Owns one [`EditorDriver`] for the lifetime of one publish attempt and
//! exposes the lifecycle (open, authenticate, resolve the editor, close)
//! plus the input primitives the renderer and scheduling planner build on.
//!
//! # Lifecycle
//! CLOSED → OPENED → AUTHENTICATED → EDITOR_READY, with FAILED reachable
//! from any step. `close()` returns to CLOSED from anywhere.

use crate::affordances;
use crate::driver::{EditorDriver, ElementHandle, FrameTarget, Key, KeyInput};
use crate::error::{DriverError, PublishError, PublishResult};
use crate::locator::Locator;
use crate::models::Credentials;
use bpub_common::config::{EditorConfig, TimingConfig};
use bpub_common::wait::{settle, PollWait, WaitPolicy};
use bpub_common::Clock;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;


/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    Closed,
    Opened,
    Authenticated,
    EditorReady,
    Failed,
}

/// Where the editor was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorContext {
    /// The configured, named frame
    NamedFrame,
    /// An unnamed frame whose `src` suggests the editor
    EditorFrame { src: String },
    /// The top-level page itself
    TopLevel,
}

/// Authenticated control handle over one editor instance
pub struct EditorSession<D: EditorDriver> {
    driver: D,
    editor: EditorConfig,
    timing: TimingConfig,
    clock: Arc<dyn Clock>,
    state: SessionState,
    context: Option<EditorContext>,
    write_url: Option<String>,
}

impl<D: EditorDriver> EditorSession<D> {
    pub fn new(
        driver: D,
        editor: EditorConfig,
        timing: TimingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            driver,
            editor,
            timing,
            clock,
            state: SessionState::Closed,
            context: None,
            write_url: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn context(&self) -> Option<&EditorContext> {
        self.context.as_ref()
    }

    pub fn editor(&self) -> &EditorConfig {
        &self.editor
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// URL the editor was loaded from (set by `resolve_editor_context`)
    pub fn write_url(&self) -> Option<&str> {
        self.write_url.as_deref()
    }

    /// Launch an isolated browsing context
    ///
    /// Only valid from CLOSED; a second `open()` is a caller error.
    pub async fn open(&mut self) -> PublishResult<()> {
        if self.state != SessionState::Closed {
            return Err(PublishError::InvalidState(format!(
                "open() called in state {:?}",
                self.state
            )));
        }

        match self.driver.start().await {
            Ok(()) => {
                self.state = SessionState::Opened;
                tracing::debug!("Editor session opened");
                Ok(())
            }
            Err(e) => {
                self.state = SessionState::Failed;
                tracing::error!(error = %e, "Failed to open editor session");
                Err(e.into())
            }
        }
    }

    /// Log in with fresh cookies and wait to leave the login surface
    pub async fn authenticate(&mut self, credentials: &Credentials) -> PublishResult<()> {
        self.require(SessionState::Opened, "authenticate")?;

        let result = self.login(credentials).await;
        match &result {
            Ok(()) => {
                self.state = SessionState::Authenticated;
                tracing::info!(username = %credentials.username, "Authenticated");
            }
            Err(e) => {
                self.state = SessionState::Failed;
                tracing::error!(
                    username = %credentials.username,
                    error = %e,
                    "Authentication failed"
                );
            }
        }
        result
    }

    async fn login(&mut self, credentials: &Credentials) -> PublishResult<()> {
        let login_url = self.editor.login_url.clone();
        self.driver.navigate(&login_url).await?;

        // Reusing an expired session fails silently later; always start clean
        for name in self.editor.auth_cookies.clone() {
            if let Err(e) = self.driver.delete_cookie(&name).await {
                if e.is_session_fatal() {
                    return Err(e.into());
                }
                tracing::debug!(cookie = %name, error = %e, "Could not delete cookie");
            }
        }
        self.driver.navigate(&login_url).await?;

        let id_field = self
            .find_with_wait(&affordances::login_id(), self.timing.element_wait())
            .await?
            .ok_or_else(|| PublishError::Auth("login form not found".to_string()))?;
        self.fill(&id_field, &credentials.username).await?;

        let pw_field = self
            .find(&affordances::login_password())
            .await?
            .ok_or_else(|| PublishError::Auth("password field not found".to_string()))?;
        self.fill(&pw_field, &credentials.password).await?;

        match self.find(&affordances::login_submit()).await? {
            Some(submit) => self.driver.click(&submit).await?,
            None => {
                self.driver
                    .send_keys_to(&pw_field, &[KeyInput::Key(Key::Enter)])
                    .await?
            }
        }

        let clock = self.clock.clone();
        let mut wait = PollWait::new(clock.as_ref(), self.timing.login_wait(), "login redirect");
        loop {
            let url = self.driver.current_url().await?;
            if !self.is_login_surface(&url) {
                return Ok(());
            }
            if wait.tick().await.is_err() {
                // Wrong credentials and an unsolved captcha look identical here
                return Err(PublishError::Auth(format!(
                    "still on the login page after {:?}",
                    wait.elapsed()
                )));
            }
        }
    }

    /// Set a form field's value the way a paste would, falling back to typing
    async fn fill(&mut self, field: &ElementHandle, value: &str) -> PublishResult<()> {
        match self.driver.fill(field, value).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_session_fatal() => Err(e.into()),
            Err(e) => {
                tracing::debug!(error = %e, "Field fill failed, typing instead");
                self.driver
                    .send_keys_to(field, &[KeyInput::Text(value.to_string())])
                    .await?;
                Ok(())
            }
        }
    }

    fn is_login_surface(&self, url: &str) -> bool {
        let login_base = self
            .editor
            .login_url
            .split('?')
            .next()
            .unwrap_or(&self.editor.login_url);
        url.starts_with(login_base) || url.contains(affordances::LOGIN_SURFACE_HINT)
    }

    /// Load the write page and switch into the editor's browsing context
    ///
    /// Probes the named frame, then any editor-looking frame, then the top
    /// level page. One re-navigation retry window, then `EditorUnavailable`.
    pub async fn resolve_editor_context(&mut self, username: &str) -> PublishResult<EditorContext> {
        self.require(SessionState::Authenticated, "resolve_editor_context")?;

        let write_url = self.editor.write_url_for(username);
        self.write_url = Some(write_url.clone());
        let clock = self.clock.clone();

        for round in 1..=2 {
            self.driver.navigate(&write_url).await?;
            let mut wait =
                PollWait::new(clock.as_ref(), self.timing.editor_wait(), "editor context");
            loop {
                if let Some(context) = self.look_for_editor().await? {
                    tracing::info!(context = ?context, round, "Editor context resolved");
                    self.context = Some(context.clone());
                    self.state = SessionState::EditorReady;
                    return Ok(context);
                }
                if wait.tick().await.is_err() {
                    break;
                }
            }
            tracing::warn!(round, url = %write_url, "Editor not found in time");
        }

        self.state = SessionState::Failed;
        Err(PublishError::EditorUnavailable(format!(
            "no editor found at {}",
            write_url
        )))
    }

    async fn look_for_editor(&mut self) -> Result<Option<EditorContext>, DriverError> {
        match self.look_for_editor_inner().await {
            Ok(found) => Ok(found),
            Err(e) if e.is_session_fatal() => Err(e),
            Err(e) => {
                tracing::debug!(error = %e, "Editor lookup failed");
                Ok(None)
            }
        }
    }

    async fn look_for_editor_inner(&mut self) -> Result<Option<EditorContext>, DriverError> {
        self.driver.switch_frame(&FrameTarget::Top).await?;

        let named = affordances::editor_frame(&self.editor.editor_frame);
        if let Some(frame) = named.locate(&mut self.driver).await? {
            if self.enter_frame_with_editor(frame).await? {
                return Ok(Some(EditorContext::NamedFrame));
            }
        }

        for frame in affordances::any_frame().locate_all(&mut self.driver).await? {
            let src = self.driver.attribute(&frame, "src").await?.unwrap_or_default();
            if affordances::EDITOR_SRC_HINTS.iter().any(|hint| src.contains(hint))
                && self.enter_frame_with_editor(frame).await?
            {
                return Ok(Some(EditorContext::EditorFrame { src }));
            }
        }

        if affordances::editor_signature()
            .locate(&mut self.driver)
            .await?
            .is_some()
        {
            return Ok(Some(EditorContext::TopLevel));
        }
        Ok(None)
    }

    /// Switch into `frame`; stay there only if it hosts the editor
    async fn enter_frame_with_editor(&mut self, frame: ElementHandle) -> Result<bool, DriverError> {
        self.driver.switch_frame(&FrameTarget::Element(frame)).await?;
        if affordances::editor_signature()
            .locate(&mut self.driver)
            .await?
            .is_some()
        {
            return Ok(true);
        }
        self.driver.switch_frame(&FrameTarget::Top).await?;
        Ok(false)
    }

    /// Click every known close/cancel affordance that is present
    ///
    /// Never fails; returns the number of dialogs dismissed.
    pub async fn dismiss_transient_dialogs(&mut self) -> usize {
        let mut dismissed = 0;
        for locator in affordances::dialog_dismiss() {
            let found = match locator.locate_all(&mut self.driver).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::debug!(dialog = %locator.name(), error = %e, "Dialog lookup failed");
                    continue;
                }
            };
            for element in found {
                match self.driver.click(&element).await {
                    Ok(()) => dismissed += 1,
                    Err(e) => {
                        tracing::debug!(
                            dialog = %locator.name(),
                            error = %e,
                            "Dialog dismiss failed"
                        )
                    }
                }
            }
        }
        if dismissed > 0 {
            tracing::debug!(dismissed, "Dismissed transient dialogs");
        }
        dismissed
    }

    /// Release the browsing context; safe to call repeatedly
    pub async fn close(&mut self) {
        if let Err(e) = self.driver.quit().await {
            tracing::warn!(error = %e, "Driver quit failed");
        }
        if self.state != SessionState::Closed {
            tracing::debug!(from = ?self.state, "Editor session closed");
        }
        self.state = SessionState::Closed;
        self.context = None;
    }

    fn require(&self, expected: SessionState, operation: &str) -> PublishResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PublishError::InvalidState(format!(
                "{}() requires {:?}, session is {:?}",
                operation, expected, self.state
            )))
        }
    }

    // ------------------------------------------------------------------
    // Primitives
    // ------------------------------------------------------------------

    pub async fn find(&mut self, locator: &Locator) -> Result<Option<ElementHandle>, DriverError> {
        locator.locate(&mut self.driver).await
    }

    /// Poll for an element until the policy budget is spent
    pub async fn find_with_wait(
        &mut self,
        locator: &Locator,
        policy: WaitPolicy,
    ) -> Result<Option<ElementHandle>, DriverError> {
        let clock = self.clock.clone();
        let mut wait = PollWait::new(clock.as_ref(), policy, locator.name());
        loop {
            if let Some(element) = locator.locate(&mut self.driver).await? {
                return Ok(Some(element));
            }
            if wait.tick().await.is_err() {
                return Ok(None);
            }
        }
    }

    /// Wait for the element, then click it
    pub async fn click(&mut self, locator: &Locator) -> Result<(), DriverError> {
        let element = self
            .find_with_wait(locator, self.timing.element_wait())
            .await?
            .ok_or_else(|| DriverError::NoSuchElement(locator.name().to_string()))?;
        self.driver.click(&element).await
    }

    /// Click the element if it is present right now
    pub async fn click_if_present(&mut self, locator: &Locator) -> Result<bool, DriverError> {
        match self.find(locator).await? {
            Some(element) => {
                self.driver.click(&element).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn press(&mut self, key: Key) -> Result<(), DriverError> {
        self.driver.send_keys(&[KeyInput::Key(key)]).await
    }

    /// Editor shortcut with the configured modifier
    pub async fn chord(&mut self, key: Key) -> Result<(), DriverError> {
        let modifier = self.editor.shortcut_modifier;
        self.driver.send_keys(&[KeyInput::Chord(modifier, key)]).await
    }

    pub async fn type_text(&mut self, text: &str) -> Result<(), DriverError> {
        if text.is_empty() {
            return Ok(());
        }
        self.driver.send_keys(&[KeyInput::Text(text.to_string())]).await
    }

    /// Type one character at a time with the configured typing delay
    pub async fn type_text_slowly(&mut self, text: &str) -> Result<(), DriverError> {
        let delay = self.timing.typing_delay();
        if delay.is_zero() {
            return self.type_text(text).await;
        }
        for ch in text.chars() {
            self.driver.send_keys(&[KeyInput::Text(ch.to_string())]).await?;
            self.clock.sleep(delay).await;
        }
        Ok(())
    }

    /// Attach a file through the upload input
    pub async fn upload(&mut self, input: &Locator, path: &Path) -> Result<(), DriverError> {
        let element = self
            .find_with_wait(input, self.timing.element_wait())
            .await?
            .ok_or_else(|| DriverError::NoSuchElement(input.name().to_string()))?;
        self.driver.upload_file(&element, path).await
    }

    /// Poll until the media loading indicator is gone
    pub async fn wait_for_media(&mut self, image: &str) -> PublishResult<()> {
        let clock = self.clock.clone();
        let policy = self.timing.media_wait();
        // Processing UI appears asynchronously after the upload
        settle(clock.as_ref(), policy.initial_interval).await;

        let indicator = affordances::media_in_progress();
        let mut wait = PollWait::new(
            clock.as_ref(),
            policy,
            format!("media processing of {}", image),
        );
        loop {
            if indicator.locate(&mut self.driver).await?.is_none() {
                return Ok(());
            }
            if let Err(timeout) = wait.tick().await {
                return Err(PublishError::MediaProcessingTimeout {
                    image: image.to_string(),
                    timeout,
                });
            }
        }
    }

    /// Fixed pause after a UI-mutating action
    pub async fn settle(&self) {
        settle(self.clock.as_ref(), self.timing.settle()).await;
    }

    pub async fn settle_for(&self, duration: Duration) {
        settle(self.clock.as_ref(), duration).await;
    }

    pub async fn current_url(&mut self) -> Result<String, DriverError> {
        self.driver.current_url().await
    }
}
