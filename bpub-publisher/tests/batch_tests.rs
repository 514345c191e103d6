//! Batch Publishing Tests
//! Test File: batch_tests.rs
//! Covers: request ordering, isolation between attempts

mod helpers;

use bpub_common::config::TimingConfig;
use bpub_publisher::batch;
use bpub_publisher::driver::{DriverAction, ScriptedDriverFactory};
use bpub_publisher::models::ModeKind;
use bpub_publisher::services::PublishCoordinator;
use helpers::{editor_config, rehearsal_driver, request, test_clock};
use tokio_util::sync::CancellationToken;

fn coordinator() -> (PublishCoordinator<ScriptedDriverFactory>, ScriptedDriverFactory) {
    let factory = ScriptedDriverFactory::new(rehearsal_driver());
    let coordinator = PublishCoordinator::new(
        factory.clone(),
        editor_config(),
        TimingConfig::instant(),
        test_clock(),
    );
    (coordinator, factory)
}

/// TC-BAT-001: Outcomes come back in request order
/// **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_bat_001_outcomes_in_request_order() {
    // Given: Three requests, the middle one invalid
    let (coordinator, _factory) = coordinator();
    let requests = vec![
        request("첫 번째", "본문 하나", ModeKind::Immediate),
        request("", "본문 둘", ModeKind::Immediate),
        request("세 번째", "본문 셋", ModeKind::Draft),
    ];

    // When: Publishing with full concurrency
    let outcomes = batch::publish_all(&coordinator, &requests, 3, &CancellationToken::new()).await;

    // Then: The invalid request fails alone, order preserved
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].success);
    assert_eq!(outcomes[1].error_code, Some("INVALID_OPTIONS"));
    assert!(outcomes[2].success);
    assert!(outcomes[0].published_url.is_some());
    assert!(outcomes[2].published_url.is_none());
}

/// TC-BAT-002: Each attempt drives its own browser session
/// **Type:** Integration | **Priority:** P0
#[tokio::test]
async fn tc_bat_002_one_session_per_attempt() {
    let (coordinator, factory) = coordinator();
    let requests: Vec<_> = (0..4)
        .map(|i| request(&format!("글 {}", i), "본문", ModeKind::Immediate))
        .collect();

    let outcomes = batch::publish_all(&coordinator, &requests, 2, &CancellationToken::new()).await;

    assert!(outcomes.iter().all(|o| o.success));
    let logs = factory.logs();
    assert_eq!(logs.len(), 4);
    for log in &logs {
        assert_eq!(log.iter().filter(|a| **a == DriverAction::Start).count(), 1);
        assert_eq!(log.last(), Some(&DriverAction::Quit));
    }
    let mut ids: Vec<_> = outcomes.iter().map(|o| o.attempt_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
}

/// TC-BAT-003: A cancelled batch fails every attempt without a browser
/// **Type:** Integration | **Priority:** P1
#[tokio::test]
async fn tc_bat_003_cancelled_batch() {
    let (coordinator, factory) = coordinator();
    let requests = vec![
        request("하나", "본문", ModeKind::Immediate),
        request("둘", "본문", ModeKind::Draft),
    ];
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcomes = batch::publish_all(&coordinator, &requests, 0, &cancel).await;

    assert!(outcomes.iter().all(|o| o.error_code == Some("CANCELLED")));
    assert!(factory.logs().iter().all(|log| log.is_empty()));
}
