//! Configuration loading and config file resolution
//!
//! Config file resolution priority order:
//! 1. Command-line argument (highest priority)
//! 2. `BPUB_CONFIG` environment variable
//! 3. Per-user config file (`~/.config/bpub/config.toml` on Linux)
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is never fatal: a warning is logged and the
//! compiled defaults are used.

use crate::{wait::WaitPolicy, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "BPUB_CONFIG";

/// Top-level TOML configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub logging: LoggingConfig,
    pub webdriver: WebDriverConfig,
    pub editor: EditorConfig,
    pub timing: TimingConfig,
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// `[webdriver]` section: how browser sessions are obtained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverConfig {
    /// Existing WebDriver endpoint. When unset, a dedicated
    /// `chromedriver` process is spawned per session.
    pub url: Option<String>,
    /// Binary spawned when `url` is unset
    pub chromedriver_path: PathBuf,
    /// Run the browser without a window
    pub headless: bool,
    /// Extra browser command-line arguments
    pub browser_args: Vec<String>,
    /// Per-command HTTP timeout
    pub request_timeout_ms: u64,
    /// How long a spawned chromedriver may take to report ready
    pub startup_timeout_ms: u64,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            url: None,
            chromedriver_path: PathBuf::from("chromedriver"),
            headless: true,
            browser_args: vec![
                "--window-size=1400,1000".to_string(),
                "--lang=ko-KR".to_string(),
            ],
            request_timeout_ms: 30_000,
            startup_timeout_ms: 10_000,
        }
    }
}

/// Keyboard modifier used for editor shortcuts (bold, end-of-document)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortcutModifier {
    #[default]
    Control,
    Meta,
}

/// `[editor]` section: where the remote editor lives and how it is styled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Login form page
    pub login_url: String,
    /// Write page; `{blog_id}` is substituted
    pub write_url: String,
    /// Blog identifier; defaults to the login username
    pub blog_id: Option<String>,
    /// Name/id of the nested browsing context hosting the editor
    pub editor_frame: String,
    /// Authentication cookies cleared before logging in
    pub auth_cookies: Vec<String>,
    /// Font size step restored after structural blocks
    pub base_font_size: String,
    /// Font size step used for headings
    pub large_font_size: String,
    pub shortcut_modifier: ShortcutModifier,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            login_url: "https://nid.naver.com/nidlogin.login".to_string(),
            write_url: "https://blog.naver.com/{blog_id}?Redirect=Write".to_string(),
            blog_id: None,
            editor_frame: "mainFrame".to_string(),
            auth_cookies: vec![
                "NID_AUT".to_string(),
                "NID_SES".to_string(),
                "NID_JKL".to_string(),
            ],
            base_font_size: "15".to_string(),
            large_font_size: "24".to_string(),
            shortcut_modifier: ShortcutModifier::Control,
        }
    }
}

impl EditorConfig {
    /// Write URL for the given account
    pub fn write_url_for(&self, username: &str) -> String {
        let blog_id = self.blog_id.as_deref().unwrap_or(username);
        self.write_url.replace("{blog_id}", blog_id)
    }
}

/// `[timing]` section (all values in milliseconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Per-character delay for plain paragraphs
    pub typing_delay_ms: u64,
    /// Pause after a UI-mutating action
    pub settle_ms: u64,
    /// Pause after the title is confirmed
    pub title_settle_ms: u64,
    /// Budget for leaving the login surface
    pub login_timeout_ms: u64,
    /// Budget for locating the editor context (per retry window)
    pub editor_timeout_ms: u64,
    /// Budget for a control to appear
    pub element_timeout_ms: u64,
    /// Budget for uploaded media to finish processing
    pub media_timeout_ms: u64,
    /// Fixed polling interval while media is processing
    pub media_poll_ms: u64,
    /// Budget for the post-publish redirect
    pub redirect_timeout_ms: u64,
    /// First backoff interval of condition waits
    pub poll_initial_ms: u64,
    /// Backoff cap of condition waits
    pub poll_max_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            typing_delay_ms: 30,
            settle_ms: 500,
            title_settle_ms: 1_000,
            login_timeout_ms: 15_000,
            editor_timeout_ms: 20_000,
            element_timeout_ms: 5_000,
            media_timeout_ms: 8_000,
            media_poll_ms: 500,
            redirect_timeout_ms: 10_000,
            poll_initial_ms: 200,
            poll_max_ms: 2_000,
        }
    }
}

impl TimingConfig {
    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.typing_delay_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn title_settle(&self) -> Duration {
        Duration::from_millis(self.title_settle_ms)
    }

    /// Backoff policy with the given budget
    pub fn condition_wait(&self, timeout_ms: u64) -> WaitPolicy {
        WaitPolicy::backoff(
            Duration::from_millis(timeout_ms),
            Duration::from_millis(self.poll_initial_ms),
            Duration::from_millis(self.poll_max_ms),
        )
    }

    pub fn login_wait(&self) -> WaitPolicy {
        self.condition_wait(self.login_timeout_ms)
    }

    pub fn editor_wait(&self) -> WaitPolicy {
        self.condition_wait(self.editor_timeout_ms)
    }

    pub fn element_wait(&self) -> WaitPolicy {
        self.condition_wait(self.element_timeout_ms)
    }

    pub fn redirect_wait(&self) -> WaitPolicy {
        self.condition_wait(self.redirect_timeout_ms)
    }

    /// Fixed-interval poll for asynchronous media processing
    pub fn media_wait(&self) -> WaitPolicy {
        WaitPolicy::fixed(
            Duration::from_millis(self.media_timeout_ms),
            Duration::from_millis(self.media_poll_ms),
        )
    }

    /// Reject poll intervals that would make a wait spin
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("poll_initial_ms", self.poll_initial_ms),
            ("poll_max_ms", self.poll_max_ms),
            ("media_poll_ms", self.media_poll_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(Error::Config(format!("[timing] {} must be greater than 0", name)));
            }
        }
        if self.poll_max_ms < self.poll_initial_ms {
            return Err(Error::Config(format!(
                "[timing] poll_max_ms ({}) is below poll_initial_ms ({})",
                self.poll_max_ms, self.poll_initial_ms
            )));
        }
        Ok(())
    }

    /// Timings with every delay and budget scaled to zero-cost values,
    /// used for rehearsals against the scripted driver
    pub fn instant() -> Self {
        Self {
            typing_delay_ms: 0,
            settle_ms: 0,
            title_settle_ms: 0,
            ..Self::default()
        }
    }
}

/// Resolves which config file (if any) should be loaded
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Config file path by priority, or `None` when only defaults apply
    pub fn resolve(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Per-user config file
        default_config_path().filter(|p| p.exists())
    }

    /// Resolve and load, falling back to compiled defaults
    pub fn load(&self) -> Result<TomlConfig> {
        match self.resolve() {
            Some(path) => load_toml_config(&path),
            None => {
                info!("No config file found, using compiled defaults");
                Ok(TomlConfig::default())
            }
        }
    }
}

/// Per-user config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("bpub").join("config.toml"))
}

/// Load a TOML config file
///
/// A missing file logs a warning and yields defaults; a malformed file or
/// an invalid `[timing]` section is an error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found: {} (using compiled defaults)",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    config.timing.validate()?;
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write config to disk atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        Error::Config(format!("Failed to replace {}: {}", path.display(), e))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_url_substitutes_username() {
        let editor = EditorConfig::default();
        assert_eq!(
            editor.write_url_for("marketer01"),
            "https://blog.naver.com/marketer01?Redirect=Write"
        );
    }

    #[test]
    fn test_write_url_prefers_configured_blog_id() {
        let editor = EditorConfig {
            blog_id: Some("brand_blog".to_string()),
            ..EditorConfig::default()
        };
        assert_eq!(
            editor.write_url_for("marketer01"),
            "https://blog.naver.com/brand_blog?Redirect=Write"
        );
    }

    #[test]
    fn test_instant_timing_keeps_budgets() {
        let timing = TimingConfig::instant();
        assert_eq!(timing.typing_delay_ms, 0);
        assert_eq!(timing.settle_ms, 0);
        assert_eq!(timing.media_timeout_ms, TimingConfig::default().media_timeout_ms);
    }

    #[test]
    fn test_default_and_instant_timing_validate() {
        assert!(TimingConfig::default().validate().is_ok());
        assert!(TimingConfig::instant().validate().is_ok());
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let timing = TimingConfig {
            media_poll_ms: 0,
            ..TimingConfig::default()
        };
        let err = timing.validate().unwrap_err();
        assert!(err.to_string().contains("media_poll_ms"));
    }

    #[test]
    fn test_media_wait_is_fixed_interval() {
        let policy = TimingConfig::default().media_wait();
        assert_eq!(policy.multiplier, 1);
        assert_eq!(policy.initial_interval, Duration::from_millis(500));
        assert_eq!(policy.timeout, Duration::from_millis(8_000));
    }
}
