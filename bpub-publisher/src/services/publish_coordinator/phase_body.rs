//! Phase 2: TITLE + BODY
//!
//! Title entry (fatal on failure) and sequential block rendering

use super::{checkpoint, PublishCoordinator};
use crate::affordances;
use crate::driver::{DriverFactory, Key};
use crate::error::PublishResult;
use crate::models::{PublishAttempt, PublishOptions, PublishState, RenderOutcome, RenderStatus};
use crate::services::block_renderer::BlockRenderer;
use crate::services::editor_session::EditorSession;
use tokio_util::sync::CancellationToken;

impl<F: DriverFactory> PublishCoordinator<F> {
    /// Phase 2a: EDITOR_READY → TITLE_SET
    pub(super) async fn phase_title(
        &self,
        session: &mut EditorSession<F::Driver>,
        attempt: &mut PublishAttempt,
        title: &str,
    ) -> PublishResult<()> {
        tracing::info!(title = %title, "Phase 2a: TITLE");

        session.click(&affordances::title_field()).await?;
        session.type_text(title).await?;
        session.press(Key::Enter).await?;
        session.settle_for(session.timing().title_settle()).await;

        self.transition(attempt, PublishState::TitleSet);
        Ok(())
    }

    /// Phase 2b: TITLE_SET → BODY_RENDERED
    ///
    /// Block failures become warnings; only a lost session or cancellation
    /// stops the loop.
    pub(super) async fn phase_body(
        &self,
        session: &mut EditorSession<F::Driver>,
        attempt: &mut PublishAttempt,
        options: &PublishOptions,
        cancel: &CancellationToken,
    ) -> PublishResult<()> {
        tracing::info!(
            blocks = options.blocks.len(),
            images = options.images.len(),
            "Phase 2b: BODY"
        );

        // The title's Enter usually lands in the body; click it if it did not
        match session.click_if_present(&affordances::body_root()).await {
            Ok(_) => {}
            Err(e) if e.is_session_fatal() => return Err(e.into()),
            Err(e) => tracing::debug!(error = %e, "Body focus click failed"),
        }

        let mut renderer = BlockRenderer::new();
        for (index, block) in options.blocks.iter().enumerate() {
            checkpoint(cancel)?;

            let outcome = renderer.render(session, block, &options.images).await;
            tracing::debug!(
                block = index,
                kind = block.kind(),
                status = ?outcome.status(),
                "Block rendered"
            );
            attempt.record_block(index, block.kind(), &outcome);

            if let RenderOutcome::Error(e) = outcome {
                if e.aborts_body() {
                    return Err(e);
                }
            }
        }

        tracing::info!(
            ok = attempt.count_blocks(RenderStatus::Ok),
            warned = attempt.count_blocks(RenderStatus::Warn),
            failed = attempt.count_blocks(RenderStatus::Error),
            "Body rendered"
        );
        self.transition(attempt, PublishState::BodyRendered);
        Ok(())
    }
}
