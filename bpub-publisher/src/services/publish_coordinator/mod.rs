//! Publish coordinator
//!
//! Drives one publish attempt through its state machine:
//!
//! # State Progression
//! IDLE → AUTHENTICATED → EDITOR_READY → TITLE_SET → BODY_RENDERED →
//! {SUBMITTING | SAVING | SCHEDULING} → DONE, or FAILED from any step.
//!
//! # Architecture
//! Each stage lives in a dedicated `phase_*` file:
//!
//! - **phase_auth**: open the session, log in, resolve the editor
//! - **phase_body**: title and block-by-block body rendering
//! - **phase_finalize**: draft save, immediate publish or scheduling
//!
//! Failures before the body abort the attempt. Block failures are recorded
//! and rendering continues, unless the browser session itself is gone.
//! The session is closed on every exit path, including a panic inside a
//! phase, which is reported as `UNKNOWN_FAILURE`.

use crate::driver::DriverFactory;
use crate::error::{PublishError, PublishResult};
use crate::models::{
    Credentials, PublishAttempt, PublishMode, PublishOptions, PublishOutcome, PublishRequest,
    PublishState,
};
use crate::services::editor_session::EditorSession;
use crate::services::scheduling_planner::{self, ScheduleTarget};
use bpub_common::config::{EditorConfig, TimingConfig};
use bpub_common::Clock;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

// Phase modules (internal implementation)
mod phase_auth;
mod phase_body;
mod phase_finalize;

/// How the attempt ends, with the schedule already validated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinalizePlan {
    Immediate,
    Draft,
    Scheduled(ScheduleTarget),
}

/// Publish coordinator service
pub struct PublishCoordinator<F: DriverFactory> {
    factory: F,
    editor: EditorConfig,
    timing: TimingConfig,
    clock: Arc<dyn Clock>,
}

impl<F: DriverFactory> PublishCoordinator<F> {
    /// Create a coordinator
    ///
    /// # Arguments
    /// * `factory` - Produces one fresh driver per attempt
    /// * `editor` - Editor endpoints and styling settings
    /// * `timing` - Settle delays and wait budgets
    /// * `clock` - Time source for every wait
    pub fn new(
        factory: F,
        editor: EditorConfig,
        timing: TimingConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            factory,
            editor,
            timing,
            clock,
        }
    }

    /// Validate a producer request and run it
    pub async fn publish(
        &self,
        request: &PublishRequest,
        cancel: &CancellationToken,
    ) -> PublishOutcome {
        let now = self.clock.now();
        match PublishOptions::from_request(request, now) {
            Ok(options) => self.run(&request.credentials, &options, cancel).await,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected publish request");
                let mut attempt = PublishAttempt::new(now);
                attempt.transition_to(PublishState::Failed, now);
                PublishOutcome::failed(attempt, &e)
            }
        }
    }

    /// Execute a complete publish attempt
    ///
    /// Never returns an error: failures are folded into the outcome.
    pub async fn run(
        &self,
        credentials: &Credentials,
        options: &PublishOptions,
        cancel: &CancellationToken,
    ) -> PublishOutcome {
        let mut attempt = PublishAttempt::new(self.clock.now());
        let span = tracing::info_span!("publish", attempt_id = %attempt.attempt_id);

        async move {
            tracing::info!(
                title = %options.title,
                blocks = options.blocks.len(),
                images = options.images.len(),
                mode = ?options.mode.kind(),
                "Publish attempt started"
            );

            let mut session = EditorSession::new(
                self.factory.create(),
                self.editor.clone(),
                self.timing.clone(),
                self.clock.clone(),
            );
            let result = AssertUnwindSafe(self.execute(
                &mut session,
                &mut attempt,
                credentials,
                options,
                cancel,
            ))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                Err(PublishError::Unknown(panic_message(payload.as_ref())))
            });
            session.close().await;

            self.conclude(attempt, result)
        }
        .instrument(span)
        .await
    }

    async fn execute(
        &self,
        session: &mut EditorSession<F::Driver>,
        attempt: &mut PublishAttempt,
        credentials: &Credentials,
        options: &PublishOptions,
        cancel: &CancellationToken,
    ) -> PublishResult<Option<String>> {
        // Reject unschedulable targets before a browser is launched
        let plan = match options.mode {
            PublishMode::Immediate => FinalizePlan::Immediate,
            PublishMode::Draft => FinalizePlan::Draft,
            PublishMode::Scheduled { at } => {
                FinalizePlan::Scheduled(scheduling_planner::validate_target(self.clock.now(), at)?)
            }
        };

        checkpoint(cancel)?;
        self.phase_authenticating(session, attempt, credentials, cancel)
            .await?;

        checkpoint(cancel)?;
        self.phase_title(session, attempt, &options.title).await?;
        self.phase_body(session, attempt, options, cancel).await?;

        checkpoint(cancel)?;
        self.phase_finalizing(session, attempt, plan).await
    }

    fn conclude(
        &self,
        mut attempt: PublishAttempt,
        result: PublishResult<Option<String>>,
    ) -> PublishOutcome {
        match result {
            Ok(url) => {
                self.transition(&mut attempt, PublishState::Done);
                tracing::info!(
                    published_url = ?url,
                    warnings = attempt.warnings.len(),
                    "Publish attempt completed"
                );
                PublishOutcome::succeeded(attempt, url)
            }
            Err(e) => {
                let failed_in = attempt.state;
                self.transition(&mut attempt, PublishState::Failed);
                tracing::error!(
                    error = %e,
                    code = e.code(),
                    failed_in = ?failed_in,
                    "Publish attempt failed"
                );
                PublishOutcome::failed(attempt, &e)
            }
        }
    }

    fn transition(&self, attempt: &mut PublishAttempt, to: PublishState) {
        attempt.transition_to(to, self.clock.now());
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic during publish: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic during publish: {}", message)
    } else {
        "panic during publish".to_string()
    }
}

/// Cooperative cancellation point (between phases and between blocks)
fn checkpoint(cancel: &CancellationToken) -> PublishResult<()> {
    if cancel.is_cancelled() {
        Err(PublishError::Cancelled)
    } else {
        Ok(())
    }
}
