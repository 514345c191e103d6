//! Phase 1: AUTHENTICATING
//!
//! Browser launch, login and editor resolution

use super::{checkpoint, PublishCoordinator};
use crate::driver::DriverFactory;
use crate::error::PublishResult;
use crate::models::{Credentials, PublishAttempt, PublishState};
use crate::services::editor_session::EditorSession;
use tokio_util::sync::CancellationToken;

impl<F: DriverFactory> PublishCoordinator<F> {
    /// Phase 1: IDLE → AUTHENTICATED → EDITOR_READY
    pub(super) async fn phase_authenticating(
        &self,
        session: &mut EditorSession<F::Driver>,
        attempt: &mut PublishAttempt,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> PublishResult<()> {
        tracing::info!(username = %credentials.username, "Phase 1: AUTHENTICATING");

        session.open().await?;
        session.authenticate(credentials).await?;
        self.transition(attempt, PublishState::Authenticated);

        checkpoint(cancel)?;
        let context = session.resolve_editor_context(&credentials.username).await?;
        let dismissed = session.dismiss_transient_dialogs().await;
        self.transition(attempt, PublishState::EditorReady);

        tracing::info!(
            context = ?context,
            dialogs_dismissed = dismissed,
            "Editor ready"
        );
        Ok(())
    }
}
