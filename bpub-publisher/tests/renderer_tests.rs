//! Block Renderer Tests
//! Test File: renderer_tests.rs
//! Covers: per-block action sequences, bold toggling, image resolution,
//! failure grading

mod helpers;

use bpub_common::config::TimingConfig;
use bpub_publisher::driver::scripted::snapshot;
use bpub_publisher::driver::{DriverAction, Key, KeyInput, Selector};
use bpub_publisher::models::{Block, ImageAsset, RenderOutcome};
use bpub_publisher::parser;
use bpub_publisher::services::BlockRenderer;
use bpub_publisher::PublishError;
use helpers::{bold_toggles, ready_session, rehearsal_driver, test_clock, typed_text, write_image};
use std::time::Duration;
use tempfile::TempDir;

fn keys_sent(actions: &[DriverAction]) -> Vec<KeyInput> {
    actions
        .iter()
        .filter_map(|a| match a {
            DriverAction::SendKeys(keys) => Some(keys.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

fn clicks(actions: &[DriverAction]) -> Vec<String> {
    actions
        .iter()
        .filter_map(|a| match a {
            DriverAction::Click(selector) => Some(selector.clone()),
            _ => None,
        })
        .collect()
}

fn uploads(actions: &[DriverAction]) -> Vec<std::path::PathBuf> {
    actions
        .iter()
        .filter_map(|a| match a {
            DriverAction::Upload(_, path) => Some(path.clone()),
            _ => None,
        })
        .collect()
}

/// TC-RND-001: MixedText toggles bold once per delimiter
/// **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_rnd_001_mixed_text_bold_toggles() {
    // Given: A line with two balanced bold pairs (4 delimiters)
    let (mut session, log) =
        ready_session(rehearsal_driver(), TimingConfig::instant(), test_clock()).await;
    let block = parser::parse_line("이 제품은 **정말** 좋고 **가격도** 착해요");
    assert!(matches!(block, Block::MixedText { .. }));

    // When: Rendered
    let outcome = BlockRenderer::new().render(&mut session, &block, &[]).await;

    // Then: Bold activated 4/2 = 2 times (on+off each), text preserved in order
    assert!(outcome.is_ok(), "{:?}", outcome);
    assert_eq!(bold_toggles(&log), 4);
    assert_eq!(typed_text(&log), "이 제품은 정말 좋고 가격도 착해요");
    assert_eq!(keys_sent(&snapshot(&log)).last(), Some(&KeyInput::Key(Key::Enter)));
}

/// TC-RND-002: Heading raises, then restores the font size
/// **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_rnd_002_heading_sequence() {
    let (mut session, log) =
        ready_session(rehearsal_driver(), TimingConfig::instant(), test_clock()).await;
    let block = Block::Heading {
        text: "제목".to_string(),
    };

    let outcome = BlockRenderer::new().render(&mut session, &block, &[]).await;

    assert!(outcome.is_ok());
    let actions = snapshot(&log);
    let clicked = clicks(&actions);
    let large = clicked
        .iter()
        .position(|c| c.contains("fs24"))
        .expect("large font selected");
    let base = clicked
        .iter()
        .position(|c| c.contains("fs15"))
        .expect("base font restored");
    assert!(large < base);

    let keys = keys_sent(&actions);
    assert!(matches!(keys[0], KeyInput::Chord(_, Key::Char('b'))));
    assert_eq!(keys[1], KeyInput::Text("제목".to_string()));
    assert_eq!(keys[2], KeyInput::Key(Key::Enter));
    assert!(matches!(keys[3], KeyInput::Chord(_, Key::Char('b'))));
}

/// TC-RND-003: Quote exits its container with the escape sequence
/// **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_rnd_003_quote_escape_sequence() {
    let (mut session, log) =
        ready_session(rehearsal_driver(), TimingConfig::instant(), test_clock()).await;
    let block = parser::parse_line("> 인용구");

    let outcome = BlockRenderer::new().render(&mut session, &block, &[]).await;

    assert!(outcome.is_ok());
    let actions = snapshot(&log);
    assert!(clicks(&actions)[0].contains("quotation"));

    let keys = keys_sent(&actions);
    let tail: Vec<_> = keys.iter().rev().take(3).rev().cloned().collect();
    assert_eq!(
        tail,
        vec![
            KeyInput::Key(Key::ArrowDown),
            KeyInput::Key(Key::ArrowDown),
            KeyInput::Key(Key::Enter)
        ]
    );
    // Bold never stays on across the block boundary
    assert_eq!(bold_toggles(&log) % 2, 0);
}

/// TC-RND-004: [이미지2] with images [A, B, C] uploads B
/// **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_rnd_004_explicit_image_index() {
    // Given: Three staged images
    let dir = TempDir::new().unwrap();
    let images: Vec<ImageAsset> = ["a.png", "b.png", "c.png"]
        .iter()
        .map(|n| ImageAsset::resolve(&write_image(dir.path(), n)))
        .collect();
    let (mut session, log) =
        ready_session(rehearsal_driver(), TimingConfig::instant(), test_clock()).await;

    // When: The second image is referenced explicitly
    let block = parser::parse_line("[이미지2]");
    let outcome = BlockRenderer::new().render(&mut session, &block, &images).await;

    // Then: B is attached and two newlines follow
    assert!(outcome.is_ok(), "{:?}", outcome);
    let actions = snapshot(&log);
    assert_eq!(uploads(&actions), vec![dir.path().join("b.png")]);
    let keys = keys_sent(&actions);
    assert_eq!(
        &keys[keys.len() - 2..],
        &[KeyInput::Key(Key::Enter), KeyInput::Key(Key::Enter)]
    );
}

/// TC-RND-005: Marker without images is skipped with a warning
/// **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_rnd_005_unresolved_image_skipped() {
    let (mut session, log) =
        ready_session(rehearsal_driver(), TimingConfig::instant(), test_clock()).await;
    let block = parser::parse_line("[이미지2]");

    let outcome = BlockRenderer::new().render(&mut session, &block, &[]).await;

    assert!(matches!(outcome, RenderOutcome::Warn(_)));
    assert!(snapshot(&log).is_empty(), "nothing may be sent for a skipped image");
}

/// TC-RND-006: Unindexed markers consume the shared counter in order
/// **Type:** Integration | **Priority:** P1
#[tokio::test]
async fn tc_rnd_006_sequential_images() {
    let dir = TempDir::new().unwrap();
    let images: Vec<ImageAsset> = ["a.png", "b.png"]
        .iter()
        .map(|n| ImageAsset::resolve(&write_image(dir.path(), n)))
        .collect();
    let (mut session, log) =
        ready_session(rehearsal_driver(), TimingConfig::instant(), test_clock()).await;
    let mut renderer = BlockRenderer::new();

    for block in parser::parse("[이미지]\n[이미지]\n[이미지]") {
        renderer.render(&mut session, &block, &images).await;
    }

    assert_eq!(
        uploads(&snapshot(&log)),
        vec![dir.path().join("a.png"), dir.path().join("b.png")]
    );
    assert_eq!(renderer.image_counter(), 3);
}

/// TC-RND-007: Media that never settles degrades to a warning
/// **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_rnd_007_media_timeout_is_warning() {
    // Given: The loading indicator never disappears
    let dir = TempDir::new().unwrap();
    let images = vec![ImageAsset::resolve(&write_image(dir.path(), "a.png"))];
    let driver = rehearsal_driver().with_element(&Selector::css(".se-image-loading"));
    let clock = test_clock();
    let (mut session, log) = ready_session(driver, TimingConfig::instant(), clock.clone()).await;

    // When: The image block is rendered
    let block = parser::parse_line("[이미지1]");
    let outcome = BlockRenderer::new().render(&mut session, &block, &images).await;

    // Then: Warn after the bounded wait, and the cursor still leaves the image
    match outcome {
        RenderOutcome::Warn(reason) => assert!(reason.contains("timed out"), "{}", reason),
        other => panic!("expected Warn, got {:?}", other),
    }
    let media_budget = TimingConfig::instant().media_wait().timeout;
    assert!(clock.total_slept() >= media_budget);
    assert!(clock.total_slept() <= media_budget + Duration::from_secs(1));
    let keys = keys_sent(&snapshot(&log));
    assert_eq!(
        &keys[keys.len() - 2..],
        &[KeyInput::Key(Key::Enter), KeyInput::Key(Key::Enter)]
    );
}

/// TC-RND-008: Typing failure is a block error, not a session error
/// **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_rnd_008_typing_failure_is_block_error() {
    let driver = rehearsal_driver().failing_text("실패");
    let (mut session, _log) = ready_session(driver, TimingConfig::instant(), test_clock()).await;

    let block = parser::parse_line("실패하는 줄");
    let outcome = BlockRenderer::new().render(&mut session, &block, &[]).await;

    match outcome {
        RenderOutcome::Error(e) => {
            assert!(matches!(e, PublishError::BlockRender { kind: "plain_text", .. }));
            assert!(!e.aborts_body());
        }
        other => panic!("expected Error, got {:?}", other),
    }
}

/// TC-RND-009: Empty block is one newline and nothing else
/// **Type:** Integration | **Priority:** P1
#[tokio::test]
async fn tc_rnd_009_empty_block() {
    let (mut session, log) =
        ready_session(rehearsal_driver(), TimingConfig::instant(), test_clock()).await;

    let outcome = BlockRenderer::new().render(&mut session, &Block::Empty, &[]).await;

    assert!(outcome.is_ok());
    assert_eq!(
        snapshot(&log),
        vec![DriverAction::SendKeys(vec![KeyInput::Key(Key::Enter)])]
    );
}

/// TC-RND-010: Plain text is typed one character at a time
/// **Type:** Integration | **Priority:** P1
#[tokio::test]
async fn tc_rnd_010_plain_text_typing_cadence() {
    let clock = test_clock();
    let timing = TimingConfig::default();
    let (mut session, log) = ready_session(rehearsal_driver(), timing.clone(), clock.clone()).await;
    let slept_before = clock.total_slept();

    let outcome = BlockRenderer::new()
        .render(&mut session, &parser::parse_line("천천히"), &[])
        .await;

    assert!(outcome.is_ok());
    let per_char: Vec<_> = keys_sent(&snapshot(&log))
        .into_iter()
        .filter(|k| matches!(k, KeyInput::Text(_)))
        .collect();
    assert_eq!(per_char.len(), 3);
    assert!(clock.total_slept() - slept_before >= timing.typing_delay() * 3);
}

/// TC-RND-011: Base font size is applied once, before the first body text
/// **Type:** Integration | **Priority:** P1
#[tokio::test]
async fn tc_rnd_011_base_font_reset_once() {
    let (mut session, log) =
        ready_session(rehearsal_driver(), TimingConfig::instant(), test_clock()).await;
    let mut renderer = BlockRenderer::new();

    for block in parser::parse("첫 줄\n둘째 줄") {
        assert!(renderer.render(&mut session, &block, &[]).await.is_ok());
    }

    let base_clicks = clicks(&snapshot(&log))
        .iter()
        .filter(|c| c.contains("fs15"))
        .count();
    assert_eq!(base_clicks, 1);
}

/// TC-RND-012: Missing font controls degrade to a warning
/// **Type:** Integration | **Priority:** P1
#[tokio::test]
async fn tc_rnd_012_missing_font_control_warns() {
    let driver = rehearsal_driver()
        .without(&Selector::css(".se-font-size-code-toolbar-button"))
        .without(&Selector::css("button[data-name='font-size']"));
    let (mut session, log) = ready_session(driver, TimingConfig::instant(), test_clock()).await;

    let outcome = BlockRenderer::new()
        .render(&mut session, &Block::Heading { text: "제목".into() }, &[])
        .await;

    assert!(matches!(outcome, RenderOutcome::Warn(_)));
    assert_eq!(typed_text(&log), "제목");
}

/// TC-RND-013: Attachments that are not images are skipped with a warning
/// **Type:** Integration | **Priority:** P2
#[tokio::test]
async fn tc_rnd_013_non_image_attachment_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "그냥 텍스트").unwrap();
    let images = vec![ImageAsset::new(path.clone(), "text/plain")];
    let (mut session, log) =
        ready_session(rehearsal_driver(), TimingConfig::instant(), test_clock()).await;

    let outcome = BlockRenderer::new()
        .render(&mut session, &parser::parse_line("[이미지1]"), &images)
        .await;

    assert!(matches!(outcome, RenderOutcome::Warn(ref w) if w.contains("text/plain")));
    assert!(uploads(&snapshot(&log)).is_empty());
}

/// TC-RND-014: An empty bold pair still toggles and keeps later pairs aligned
/// **Type:** Integration | **Priority:** P1
#[tokio::test]
async fn tc_rnd_014_empty_bold_pair() {
    let (mut session, log) =
        ready_session(rehearsal_driver(), TimingConfig::instant(), test_clock()).await;
    let block = parser::parse_line("a **** b **c**");

    let outcome = BlockRenderer::new().render(&mut session, &block, &[]).await;

    assert!(outcome.is_ok());
    assert_eq!(bold_toggles(&log), 4);
    assert_eq!(typed_text(&log), "a  b c");
}
