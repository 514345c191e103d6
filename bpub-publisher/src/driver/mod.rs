//! Browser automation driver abstraction
//!
//! [`EditorDriver`] is the primitive surface the publisher needs from a
//! browser: navigation, element lookup, clicks, keystrokes, file attachment,
//! nested-context switching and cookie removal. Everything above it
//! (sessions, rendering, scheduling) is written against this trait.
//!
//! Implementations:
//! - [`webdriver::WebDriverClient`]: W3C WebDriver over HTTP
//! - [`scripted::ScriptedDriver`]: in-memory scripted surface for tests and
//!   dry-run rehearsals

pub mod scripted;
pub mod webdriver;

use crate::error::DriverError;
use async_trait::async_trait;
use bpub_common::config::ShortcutModifier;
use std::fmt;
use std::path::Path;

pub use scripted::{DriverAction, ScriptedDriver, ScriptedDriverFactory};
pub use webdriver::{WebDriverClient, WebDriverFactory};

/// Element lookup strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(s: impl Into<String>) -> Self {
        Selector::Css(s.into())
    }

    pub fn xpath(s: impl Into<String>) -> Self {
        Selector::XPath(s.into())
    }

    /// Raw selector text
    pub fn value(&self) -> &str {
        match self {
            Selector::Css(s) | Selector::XPath(s) => s,
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css={}", s),
            Selector::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// Opaque reference to an element in the current browsing context
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub String);

/// Browsing context to direct commands at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameTarget {
    /// The top-level page
    Top,
    /// A nested browsing context hosted by the given frame element
    Element(ElementHandle),
}

/// Non-text key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    ArrowDown,
    End,
    Char(char),
}

/// One step of keyboard input sent to the focused element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    /// Literal text
    Text(String),
    /// Single key press
    Key(Key),
    /// Modifier held while pressing a key (e.g. Control+B)
    Chord(ShortcutModifier, Key),
}

/// Primitive browser operations
///
/// One driver instance backs exactly one browsing session; it is never
/// shared between publish attempts.
#[async_trait]
pub trait EditorDriver: Send {
    /// Launch/attach an isolated browsing context
    async fn start(&mut self) -> Result<(), DriverError>;

    /// Release the browsing context and any process behind it
    ///
    /// Must be safe to call repeatedly and without a prior `start`.
    async fn quit(&mut self) -> Result<(), DriverError>;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Top-level document location
    async fn current_url(&mut self) -> Result<String, DriverError>;

    /// Remove a cookie of the current document's domain (no-op if absent)
    async fn delete_cookie(&mut self, name: &str) -> Result<(), DriverError>;

    /// All matches in the current browsing context, in document order
    async fn find_all(&mut self, selector: &Selector) -> Result<Vec<ElementHandle>, DriverError>;

    async fn attribute(
        &mut self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    async fn click(&mut self, element: &ElementHandle) -> Result<(), DriverError>;

    /// Send keystrokes to a specific element (form fields)
    async fn send_keys_to(
        &mut self,
        element: &ElementHandle,
        input: &[KeyInput],
    ) -> Result<(), DriverError>;

    /// Send keystrokes to whatever element currently has focus
    async fn send_keys(&mut self, input: &[KeyInput]) -> Result<(), DriverError>;

    /// Attach a local file to a file-upload input
    async fn upload_file(&mut self, input: &ElementHandle, path: &Path)
        -> Result<(), DriverError>;

    async fn switch_frame(&mut self, target: &FrameTarget) -> Result<(), DriverError>;

    /// Set a form field's value in one step, the way a paste would
    async fn fill(&mut self, element: &ElementHandle, value: &str) -> Result<(), DriverError>;
}

/// Produces a fresh, independent driver per publish attempt
pub trait DriverFactory: Send + Sync {
    type Driver: EditorDriver + 'static;

    fn create(&self) -> Self::Driver;
}
