//! Editor Session Tests
//! Test File: session_tests.rs
//! Covers: lifecycle, authentication, editor resolution, teardown

mod helpers;

use bpub_common::config::TimingConfig;
use bpub_publisher::driver::scripted::{snapshot, Effect};
use bpub_publisher::driver::{DriverAction, ScriptedDriver, Selector};
use bpub_publisher::models::Credentials;
use bpub_publisher::services::{EditorContext, EditorSession, SessionState};
use bpub_publisher::PublishError;
use helpers::{editor_config, rehearsal_driver, test_clock};

fn session(driver: ScriptedDriver) -> EditorSession<ScriptedDriver> {
    EditorSession::new(driver, editor_config(), TimingConfig::instant(), test_clock())
}

/// TC-SES-001: close() without open() is a no-op
/// **Type:** Unit | **Priority:** P0
#[tokio::test]
async fn tc_ses_001_close_without_open() {
    let driver = ScriptedDriver::new();
    let log = driver.log_handle();
    let mut s = session(driver);

    s.close().await;
    s.close().await;

    assert_eq!(s.state(), SessionState::Closed);
    assert!(snapshot(&log).is_empty());
}

/// TC-SES-002: close() after a failed open() is safe and repeatable
/// **Type:** Unit | **Priority:** P0
#[tokio::test]
async fn tc_ses_002_close_after_failed_open() {
    let mut s = session(ScriptedDriver::new().failing_start("chromedriver not found"));

    let err = s.open().await.unwrap_err();
    assert_eq!(err.code(), "DRIVER_ERROR");
    s.close().await;
    s.close().await;

    assert_eq!(s.state(), SessionState::Closed);
}

/// TC-SES-003: close() after a successful open() quits exactly once
/// **Type:** Unit | **Priority:** P0
#[tokio::test]
async fn tc_ses_003_close_quits_once() {
    let driver = ScriptedDriver::new();
    let log = driver.log_handle();
    let mut s = session(driver);

    s.open().await.unwrap();
    s.close().await;
    s.close().await;

    let quits = snapshot(&log)
        .iter()
        .filter(|a| **a == DriverAction::Quit)
        .count();
    assert_eq!(quits, 1);
}

/// TC-SES-004: Staying on the login page is an AuthError after the bound
/// **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_ses_004_auth_error_when_login_page_remains() {
    // Given: Submit does not navigate anywhere (wrong password / captcha)
    let clock = test_clock();
    let driver = ScriptedDriver::new().permissive();
    let mut s = EditorSession::new(driver, editor_config(), TimingConfig::instant(), clock.clone());
    s.open().await.unwrap();

    // When: Authenticating
    let err = s
        .authenticate(&Credentials::new("tester", "wrong"))
        .await
        .unwrap_err();

    // Then: AuthError after exactly the login budget
    assert!(matches!(err, PublishError::Auth(_)));
    assert_eq!(s.state(), SessionState::Failed);
    assert_eq!(clock.total_slept(), TimingConfig::instant().login_wait().timeout);
}

/// TC-SES-005: Missing login form is an AuthError
/// **Type:** Integration | **Priority:** P1
#[tokio::test]
async fn tc_ses_005_missing_login_form() {
    let mut s = session(ScriptedDriver::new());
    s.open().await.unwrap();

    let err = s
        .authenticate(&Credentials::new("tester", "secret"))
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Auth(_)));
}

/// TC-SES-006: Editor found through an editor-looking frame src
/// **Type:** Integration | **Priority:** P1
#[tokio::test]
async fn tc_ses_006_editor_in_unnamed_frame() {
    // Given: No named frame, one iframe whose src points at the write page
    let frame = Selector::css("iframe");
    let submit = bpub_publisher::affordances::login_submit().strategies()[0].clone();
    let driver = ScriptedDriver::new()
        .permissive()
        .without(&Selector::css("iframe#mainFrame"))
        .without(&Selector::css("iframe[name='mainFrame']"))
        .with_attribute(&frame, "src", "/PostWriteForm.naver?blogId=tester")
        .on_click(&submit, Effect::Navigate("https://blog.naver.com/".into()));
    let mut s = session(driver);
    s.open().await.unwrap();
    s.authenticate(&Credentials::new("tester", "secret")).await.unwrap();

    // When/Then
    let context = s.resolve_editor_context("tester").await.unwrap();
    assert!(matches!(context, EditorContext::EditorFrame { ref src } if src.contains("PostWrite")));
    assert_eq!(s.state(), SessionState::EditorReady);
}

/// TC-SES-007: No editor anywhere is EditorUnavailable after one retry
/// **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_ses_007_editor_unavailable_after_retry() {
    let clock = test_clock();
    let driver = rehearsal_driver()
        .without(&Selector::css(".se-content"))
        .without(&Selector::css(".se-documentTitle"));
    let log = driver.log_handle();
    let mut s = EditorSession::new(driver, editor_config(), TimingConfig::instant(), clock.clone());
    s.open().await.unwrap();
    s.authenticate(&Credentials::new("tester", "secret")).await.unwrap();

    let err = s.resolve_editor_context("tester").await.unwrap_err();

    assert!(matches!(err, PublishError::EditorUnavailable(_)));
    let write_navigations = snapshot(&log)
        .iter()
        .filter(|a| matches!(a, DriverAction::Navigate(url) if url.contains("Redirect=Write")))
        .count();
    assert_eq!(write_navigations, 2);
    assert_eq!(clock.total_slept(), TimingConfig::instant().editor_wait().timeout * 2);
}

/// TC-SES-008: Operations out of order are InvalidState
/// **Type:** Unit | **Priority:** P1
#[tokio::test]
async fn tc_ses_008_out_of_order_calls() {
    let mut s = session(rehearsal_driver());
    s.open().await.unwrap();

    let err = s.resolve_editor_context("tester").await.unwrap_err();
    assert!(matches!(err, PublishError::InvalidState(_)));
    assert!(matches!(s.open().await, Err(PublishError::InvalidState(_))));
}

/// TC-SES-009: Credentials are set through the driver's fill, not raw keystrokes
/// **Type:** Unit | **Priority:** P1
#[tokio::test]
async fn tc_ses_009_credentials_filled_through_driver() {
    // Given: An open session against the rehearsal editor
    let driver = rehearsal_driver();
    let log = driver.log_handle();
    let mut s = session(driver);
    s.open().await.unwrap();

    // When: Authenticating
    s.authenticate(&Credentials::new("tester", "secret")).await.unwrap();

    // Then: Both fields were filled with their values and never typed into
    let actions = snapshot(&log);
    assert!(actions.contains(&DriverAction::Fill("#id".into(), "tester".into())));
    assert!(actions.contains(&DriverAction::Fill("#pw".into(), "secret".into())));
    assert!(!actions.iter().any(|a| matches!(a, DriverAction::SendKeysTo(s, _) if s == "#pw")));
}
