//! Phase 3: FINALIZING
//!
//! Draft save, immediate publish with redirect read-back, or scheduling.
//! The confirm control is clicked at most once per attempt.

use super::{FinalizePlan, PublishCoordinator};
use crate::affordances;
use crate::driver::DriverFactory;
use crate::error::{DriverError, PublishResult};
use crate::models::{PublishAttempt, PublishState};
use crate::services::editor_session::EditorSession;
use crate::services::scheduling_planner;
use bpub_common::PollWait;

impl<F: DriverFactory> PublishCoordinator<F> {
    /// Phase 3: BODY_RENDERED → SAVING | SUBMITTING | SCHEDULING
    ///
    /// Returns the published URL when one was observed.
    pub(super) async fn phase_finalizing(
        &self,
        session: &mut EditorSession<F::Driver>,
        attempt: &mut PublishAttempt,
        plan: FinalizePlan,
    ) -> PublishResult<Option<String>> {
        tracing::info!(plan = ?plan, "Phase 3: FINALIZING");

        match plan {
            FinalizePlan::Draft => {
                self.transition(attempt, PublishState::Saving);
                self.save_draft(session, attempt).await
            }
            FinalizePlan::Immediate => {
                self.transition(attempt, PublishState::Submitting);
                self.submit(session, attempt).await
            }
            FinalizePlan::Scheduled(target) => {
                self.transition(attempt, PublishState::Scheduling);
                let mut warnings = Vec::new();
                let result = scheduling_planner::drive(session, &target, &mut warnings).await;
                for warning in warnings {
                    attempt.warn(warning);
                }
                result?;
                // The post does not exist yet, so there is no URL
                Ok(None)
            }
        }
    }

    async fn save_draft(
        &self,
        session: &mut EditorSession<F::Driver>,
        attempt: &mut PublishAttempt,
    ) -> PublishResult<Option<String>> {
        match session.click(&affordances::save_draft()).await {
            Ok(()) => {
                session.settle().await;
                tracing::info!("Draft saved");
            }
            Err(DriverError::NoSuchElement(_)) => {
                attempt.warn("save control not found; body left unsaved in the editor");
            }
            Err(e) => return Err(e.into()),
        }
        Ok(None)
    }

    async fn submit(
        &self,
        session: &mut EditorSession<F::Driver>,
        attempt: &mut PublishAttempt,
    ) -> PublishResult<Option<String>> {
        session.click(&affordances::publish_panel()).await?;
        session.settle().await;
        session.click(&affordances::publish_confirm()).await?;
        tracing::info!("Publish confirmed");

        // Past this point nothing may retry the confirm: read-back problems
        // only cost the URL
        let editor_url = session.write_url().unwrap_or_default().to_string();
        let clock = self.clock.clone();
        let mut wait = PollWait::new(
            clock.as_ref(),
            self.timing.redirect_wait(),
            "publish redirect",
        );
        loop {
            match session.current_url().await {
                Ok(url) if is_published_location(&url, &editor_url) => {
                    tracing::info!(published_url = %url, "Redirect observed");
                    return Ok(Some(url));
                }
                Ok(_) => {}
                Err(e) => {
                    attempt.warn(format!("could not read published location: {}", e));
                    return Ok(None);
                }
            }
            if wait.tick().await.is_err() {
                attempt.warn("no redirect observed after publishing; URL unknown");
                return Ok(None);
            }
        }
    }
}

fn is_published_location(url: &str, editor_url: &str) -> bool {
    !url.is_empty()
        && url != editor_url
        && !affordances::WRITE_PAGE_HINTS
            .iter()
            .any(|hint| url.contains(hint))
}
