//! Concurrent batch publishing
//!
//! N requests run as N independent attempts, each with its own driver and
//! session. Nothing mutable is shared between attempts.

use crate::driver::DriverFactory;
use crate::models::{PublishOutcome, PublishRequest};
use crate::services::PublishCoordinator;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

/// Publish every request with at most `concurrency` attempts in flight
///
/// Outcomes are returned in request order.
pub async fn publish_all<F: DriverFactory>(
    coordinator: &PublishCoordinator<F>,
    requests: &[PublishRequest],
    concurrency: usize,
    cancel: &CancellationToken,
) -> Vec<PublishOutcome> {
    let concurrency = concurrency.max(1);
    tracing::info!(jobs = requests.len(), concurrency, "Starting batch publish");

    let mut outcomes: Vec<(usize, PublishOutcome)> = stream::iter(requests.iter().enumerate())
        .map(|(index, request)| async move { (index, coordinator.publish(request, cancel).await) })
        .buffer_unordered(concurrency)
        .collect()
        .await;
    outcomes.sort_by_key(|(index, _)| *index);

    let succeeded = outcomes.iter().filter(|(_, o)| o.success).count();
    tracing::info!(
        succeeded,
        failed = outcomes.len() - succeeded,
        "Batch publish finished"
    );
    outcomes.into_iter().map(|(_, outcome)| outcome).collect()
}
