//! Scripted editor fixtures

use bpub_common::config::{EditorConfig, TimingConfig};
use bpub_common::{Clock, ManualClock};
use bpub_publisher::driver::scripted::{snapshot, ActionLog};
use bpub_publisher::driver::{DriverAction, Key, KeyInput, ScriptedDriver};
use bpub_publisher::models::{Credentials, ImageSpec, ModeKind, PublishRequest};
use bpub_publisher::services::EditorSession;
use chrono::{NaiveDate, NaiveDateTime};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Virtual "now" for every test: 2026-10-16 09:00
pub const TEST_START: (i32, u32, u32, u32) = (2026, 10, 16, 9);

/// 1x1 PNG header, enough for MIME sniffing
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

pub fn start_time() -> NaiveDateTime {
    let (y, m, d, h) = TEST_START;
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

pub fn test_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(start_time()))
}

pub fn editor_config() -> EditorConfig {
    EditorConfig::default()
}

/// Scripted editor where every control exists and login succeeds
pub fn rehearsal_driver() -> ScriptedDriver {
    ScriptedDriver::rehearsal(&editor_config())
}

/// Session that is already open, logged in and inside the editor
pub async fn ready_session(
    driver: ScriptedDriver,
    timing: TimingConfig,
    clock: Arc<dyn Clock>,
) -> (EditorSession<ScriptedDriver>, ActionLog) {
    let log = driver.log_handle();
    let mut session = EditorSession::new(driver, editor_config(), timing, clock);
    session.open().await.unwrap();
    session
        .authenticate(&Credentials::new("tester", "secret"))
        .await
        .unwrap();
    session.resolve_editor_context("tester").await.unwrap();
    log.lock().unwrap().clear();
    (session, log)
}

pub fn request(title: &str, content: &str, mode: ModeKind) -> PublishRequest {
    PublishRequest {
        credentials: Credentials::new("tester", "secret"),
        title: title.to_string(),
        content: content.to_string(),
        images: Vec::new(),
        mode,
        scheduled_at: None,
    }
}

/// Write a small PNG file and return an image reference to it
pub fn write_image(dir: &Path, name: &str) -> ImageSpec {
    let path: PathBuf = dir.join(name);
    std::fs::write(&path, PNG_MAGIC).unwrap();
    ImageSpec { path, mime: None }
}

/// Number of bold shortcut chords sent
pub fn bold_toggles(log: &ActionLog) -> usize {
    snapshot(log)
        .iter()
        .filter_map(|a| match a {
            DriverAction::SendKeys(keys) => Some(keys),
            _ => None,
        })
        .flatten()
        .filter(|k| matches!(k, KeyInput::Chord(_, Key::Char('b'))))
        .count()
}

/// All literal text typed into the focused element, concatenated
pub fn typed_text(log: &ActionLog) -> String {
    snapshot(log)
        .iter()
        .filter_map(|a| match a {
            DriverAction::SendKeys(keys) => Some(keys.clone()),
            _ => None,
        })
        .flatten()
        .filter_map(|k| match k {
            KeyInput::Text(t) => Some(t),
            _ => None,
        })
        .collect()
}
